//! End-to-end tests against a live PostgreSQL.
//!
//! Skipped unless `DATABASE_URL` is set.

use pgcrud::{
    ColumnAllowList, Columns, ConnectionConfig, CrudError, CrudResult, ORDERS_COMBINED_COLUMNS,
    RowData, Session, SessionState, Table, Value, run_sql_script,
};
use std::time::{SystemTime, UNIX_EPOCH};

fn try_config(test: &str) -> Option<ConnectionConfig> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(ConnectionConfig::from_url(&url).expect("invalid DATABASE_URL")),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

fn unique_table(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("{prefix}_{}_{nanos}", std::process::id())
}

fn create_orders(config: &ConnectionConfig, table: &str) -> CrudResult<()> {
    let schema = format!(
        "CREATE TABLE {table} (
            id INTEGER PRIMARY KEY,
            order_id INTEGER,
            timestamp TIMESTAMP,
            date_time TIMESTAMP,
            customer_id INTEGER,
            customer_name TEXT,
            customer_email TEXT,
            product_id INTEGER,
            product_name TEXT,
            product_price NUMERIC(10, 2),
            price NUMERIC(10, 2),
            email TEXT
        );"
    );
    Session::scope(config, |session| run_sql_script(session, &schema).map(|_| ()))
}

fn drop_table(config: &ConnectionConfig, table: &str) {
    let sql = format!("DROP TABLE IF EXISTS {table}");
    let _ = Session::scope(config, |session| run_sql_script(session, &sql));
}

fn orders<'s>(table: &str, session: &'s mut Session) -> CrudResult<Table<'s>> {
    Table::new(table, ColumnAllowList::new(ORDERS_COMBINED_COLUMNS)?, session)
}

#[test]
fn crud_roundtrip() -> CrudResult<()> {
    let Some(config) = try_config("crud_roundtrip") else {
        return Ok(());
    };
    let table = unique_table("pgcrud_rt");
    create_orders(&config, &table)?;

    let result = Session::scope(&config, |session| {
        let mut t = orders(&table, session)?;

        let inserted = t.insert(
            &RowData::new()
                .set("id", 1)
                .set("customer_name", "egan")
                .set("product_price", Value::Decimal("19.99".parse().unwrap())),
        )?;
        assert_eq!(inserted, 1);

        let rows = t.select(&["customer_name"].into(), &RowData::new().set("id", 1), Some(1))?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].try_get("customer_name")?, &Value::from("egan"));

        let updated = t.update(
            &RowData::new().set("customer_name", "nage"),
            &RowData::new().set("id", 1),
        )?;
        assert_eq!(updated, 1);

        let rows = t.select(&Columns::All, &RowData::new().set("id", 1), None)?;
        assert_eq!(rows[0].try_get("customer_name")?, &Value::from("nage"));
        assert_eq!(rows[0].columns().len(), ORDERS_COMBINED_COLUMNS.len());

        assert_eq!(t.delete(&RowData::new().set("id", 1))?, 1);
        let rows = t.select(&Columns::All, &RowData::new().set("id", 1), None)?;
        assert!(rows.is_empty());
        Ok(())
    });

    drop_table(&config, &table);
    result
}

#[test]
fn insert_many_and_limit() -> CrudResult<()> {
    let Some(config) = try_config("insert_many_and_limit") else {
        return Ok(());
    };
    let table = unique_table("pgcrud_batch");
    create_orders(&config, &table)?;

    let result = Session::scope(&config, |session| {
        let mut t = orders(&table, session)?;
        let rows: Vec<RowData> = (1..=5)
            .map(|i| {
                RowData::new()
                    .set("id", i)
                    .set("customer_name", format!("customer{i}"))
                    .set("price", Value::Null)
            })
            .collect();
        assert_eq!(t.insert_many(&rows)?, 5);

        let limited = t.select(&["id"].into(), &RowData::new(), Some(2))?;
        assert_eq!(limited.len(), 2);

        let n = t.update_all(&RowData::new().set("email", "x@example.com"))?;
        assert_eq!(n, 5);
        Ok(())
    });

    drop_table(&config, &table);
    result
}

#[test]
fn failed_unit_of_work_rolls_back() -> CrudResult<()> {
    let Some(config) = try_config("failed_unit_of_work_rolls_back") else {
        return Ok(());
    };
    let table = unique_table("pgcrud_rb");
    create_orders(&config, &table)?;

    // The second batch repeats a key; none of its rows may survive.
    let err = Session::scope(&config, |session| {
        let mut t = orders(&table, session)?;
        t.insert_many(&[RowData::new().set("id", 1)])
            .and_then(|_| t.insert_many(&[RowData::new().set("id", 2), RowData::new().set("id", 2)]))
    })
    .unwrap_err();
    assert!(err.is_unique_violation(), "unexpected error: {err}");

    let (committed, discarded) = Session::scope(&config, |session| {
        let mut t = orders(&table, session)?;
        let committed = t.select(&["id"].into(), &RowData::new().set("id", 1), None)?;
        let discarded = t.select(&["id"].into(), &RowData::new().set("id", 2), None)?;
        Ok((committed, discarded))
    })?;
    // The first batch committed on its own and is still visible.
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].try_get("id")?, &Value::Int(1));
    assert!(discarded.is_empty());

    drop_table(&config, &table);
    Ok(())
}

#[test]
fn failed_insert_does_not_poison_the_session() -> CrudResult<()> {
    let Some(config) = try_config("failed_insert_does_not_poison_the_session") else {
        return Ok(());
    };
    let table = unique_table("pgcrud_dup");
    create_orders(&config, &table)?;

    let result = Session::scope(&config, |session| {
        let mut t = orders(&table, session)?;
        t.insert(&RowData::new().set("id", 1))?;

        let err = t.insert(&RowData::new().set("id", 1)).unwrap_err();
        assert!(err.is_unique_violation(), "unexpected error: {err}");

        assert_eq!(t.insert(&RowData::new().set("id", 2))?, 1);
        Ok(())
    });

    let ids = Session::scope(&config, |session| {
        orders(&table, session)?.select(&["id"].into(), &RowData::new(), None)
    });

    drop_table(&config, &table);
    result?;
    let mut ids: Vec<Value> = ids?.into_iter().map(|r| r[0].clone()).collect();
    ids.sort_by_key(|v| v.to_string());
    assert_eq!(ids, [Value::Int(1), Value::Int(2)]);
    Ok(())
}

#[test]
fn unbuffered_session_guards_unread_results() -> CrudResult<()> {
    let Some(config) = try_config("unbuffered_session_guards_unread_results") else {
        return Ok(());
    };
    let mut session = Session::connect(&config.clone().buffered(false))?;
    assert_eq!(session.state(), SessionState::Connected);

    let err = session
        .with_cursor(|cur| {
            cur.execute(&pgcrud::Statement::raw("SELECT 1"))?;
            let allow = ColumnAllowList::new(["relname"])?;
            let select = pgcrud::QueryBuilder::new("pg_class", allow)?.build_select(
                &Columns::All,
                &RowData::new(),
                Some(1),
            )?;
            cur.execute(&select)?;
            cur.execute(&select)
        })
        .unwrap_err();
    assert!(matches!(err, CrudError::UnreadResult));

    session.close()?;
    session.close()?;
    assert!(!session.is_connected());
    Ok(())
}

#[test]
fn connect_failure_is_connection_error() {
    if try_config("connect_failure_is_connection_error").is_none() {
        return;
    }
    let config = ConnectionConfig::new()
        .host("127.0.0.1")
        .port(1)
        .connect_timeout(std::time::Duration::from_secs(2));
    let err = Session::connect(&config).unwrap_err();
    assert!(matches!(err, CrudError::Connection(_)));
}
