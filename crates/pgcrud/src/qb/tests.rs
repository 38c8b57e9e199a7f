//! Integration tests for the qb module.

use crate::allow_list::ColumnAllowList;
use crate::error::CrudError;
use crate::qb::QueryBuilder;
use crate::row::{Columns, RowData};
use crate::statement::{Placeholder, StatementKind};
use crate::value::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::subscriber::Interest;
use tracing::{Event, Level, Metadata, Subscriber, span};

fn qb() -> QueryBuilder {
    let allow = ColumnAllowList::new(["a", "b", "c", "id", "customer_name"]).unwrap();
    QueryBuilder::new("t", allow).unwrap()
}

fn positional() -> QueryBuilder {
    qb().placeholder(Placeholder::Positional)
}

#[test]
fn test_select_where_and_limit_positional() {
    let stmt = positional()
        .build_select(&["a", "b"].into(), &RowData::new().set("a", 1), Some(2))
        .unwrap();
    assert!(stmt.sql().ends_with("WHERE a = ? LIMIT ?"));
    assert_eq!(stmt.params(), [Value::Int(1), Value::Int(2)]);
    assert_eq!(stmt.kind(), StatementKind::Select);
}

#[test]
fn test_select_numbered() {
    let stmt = qb()
        .build_select(
            &["id"].into(),
            &RowData::new().set("a", 1).set("b", "x"),
            Some(5),
        )
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT id FROM t WHERE a = $1 AND b = $2 LIMIT $3"
    );
    assert_eq!(stmt.params().len(), 3);
}

#[test]
fn test_select_all_expands_allow_list() {
    let stmt = qb().build_select(&Columns::All, &RowData::new(), None).unwrap();
    assert_eq!(stmt.sql(), "SELECT a, b, c, id, customer_name FROM t");
    assert!(stmt.params().is_empty());
    assert!(!stmt.sql().contains('*'));
}

#[test]
fn test_select_rejects_bad_limit() {
    let err = qb()
        .build_select(&Columns::All, &RowData::new(), Some(0))
        .unwrap_err();
    assert!(matches!(err, CrudError::InvalidLimit(0)));

    let err = qb()
        .build_select(&Columns::All, &RowData::new(), Some(-3))
        .unwrap_err();
    assert!(matches!(err, CrudError::InvalidLimit(-3)));
}

#[test]
fn test_select_rejects_empty_column_list() {
    let err = qb()
        .build_select(&Columns::Named(vec![]), &RowData::new(), None)
        .unwrap_err();
    assert!(matches!(err, CrudError::EmptyInput(_)));
}

#[test]
fn test_select_rejects_unknown_filter_column() {
    let err = qb()
        .build_select(&["a"].into(), &RowData::new().set("zzz", 1), None)
        .unwrap_err();
    match err {
        CrudError::InvalidColumn { offending, .. } => {
            assert_eq!(offending.into_iter().collect::<Vec<_>>(), ["zzz"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_select_injection_in_column_is_rejected() {
    let err = qb()
        .build_select(&["a; DROP TABLE t"].into(), &RowData::new(), None)
        .unwrap_err();
    assert!(err.is_invalid_column());
}

#[test]
fn test_insert_basic() {
    let row = RowData::new().set("id", 1).set("customer_name", "egan");
    let stmt = qb().build_insert(&row).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO t (id, customer_name) VALUES ($1, $2)"
    );
    assert_eq!(stmt.params(), [Value::Int(1), Value::from("egan")]);
}

#[test]
fn test_insert_value_is_never_spliced() {
    let hostile = "x'); DROP TABLE t; --";
    let stmt = qb()
        .build_insert(&RowData::new().set("customer_name", hostile))
        .unwrap();
    assert!(!stmt.sql().contains("DROP"));
    assert_eq!(stmt.params(), [Value::from(hostile)]);
}

#[test]
fn test_insert_empty_row() {
    let err = qb().build_insert(&RowData::new()).unwrap_err();
    assert!(matches!(err, CrudError::EmptyInput(_)));
}

#[test]
fn test_insert_unknown_column() {
    let err = qb()
        .build_insert(&RowData::new().set("a", 1).set("nope", 2))
        .unwrap_err();
    assert!(err.is_invalid_column());
}

#[test]
fn test_insert_many_reorders_to_first_row() {
    let rows = vec![
        RowData::new().set("a", 1).set("b", "x"),
        RowData::new().set("b", "y").set("a", 2),
    ];
    let batch = qb().build_insert_many(&rows).unwrap();
    assert_eq!(batch.sql(), "INSERT INTO t (a, b) VALUES ($1, $2)");
    assert_eq!(batch.columns(), ["a", "b"]);
    assert_eq!(
        batch.rows(),
        [
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
        ]
    );
}

#[test]
fn test_insert_many_positional_template() {
    let rows = vec![RowData::new().set("a", 1).set("c", 3)];
    let batch = positional().build_insert_many(&rows).unwrap();
    assert_eq!(batch.sql(), "INSERT INTO t (a, c) VALUES (?, ?)");
    assert_eq!(batch.len(), 1);
}

#[test]
fn test_insert_many_schema_mismatch() {
    let rows = vec![
        RowData::new().set("a", 1).set("b", 2),
        RowData::new().set("a", 3).set("b", 4),
        RowData::new().set("a", 5).set("c", 6),
    ];
    let err = qb().build_insert_many(&rows).unwrap_err();
    match err {
        CrudError::SchemaMismatch { row, expected, found } => {
            assert_eq!(row, 2);
            assert_eq!(expected, ["a", "b"]);
            assert_eq!(found, ["a", "c"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let rows = vec![
        RowData::new().set("a", 1),
        RowData::new().set("a", 2).set("b", 3),
    ];
    assert!(matches!(
        qb().build_insert_many(&rows),
        Err(CrudError::SchemaMismatch { row: 1, .. })
    ));
}

#[test]
fn test_insert_many_empty() {
    assert!(matches!(
        qb().build_insert_many(&[]),
        Err(CrudError::EmptyInput(_))
    ));
    assert!(matches!(
        qb().build_insert_many(&[RowData::new()]),
        Err(CrudError::EmptyInput(_))
    ));
}

#[test]
fn test_update_basic() {
    let stmt = qb()
        .build_update(
            &RowData::new().set("customer_name", "nage"),
            &RowData::new().set("id", 1),
        )
        .unwrap();
    assert_eq!(stmt.sql(), "UPDATE t SET customer_name = $1 WHERE id = $2");
    assert_eq!(stmt.params(), [Value::from("nage"), Value::Int(1)]);
}

#[test]
fn test_update_params_data_then_filters() {
    let stmt = positional()
        .build_update(
            &RowData::new().set("a", 1).set("b", 2),
            &RowData::new().set("c", 3).set("id", 4),
        )
        .unwrap();
    assert_eq!(stmt.sql(), "UPDATE t SET a = ?, b = ? WHERE c = ? AND id = ?");
    assert_eq!(
        stmt.params(),
        [Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
    );
}

#[test]
fn test_update_requires_filters() {
    let err = qb()
        .build_update(&RowData::new().set("a", 1), &RowData::new())
        .unwrap_err();
    assert!(matches!(err, CrudError::EmptyFilter(_)));
}

#[test]
fn test_update_requires_data() {
    let err = qb()
        .build_update(&RowData::new(), &RowData::new().set("id", 1))
        .unwrap_err();
    assert!(matches!(err, CrudError::EmptyInput(_)));
}

#[test]
fn test_update_all_has_no_where() {
    let stmt = qb()
        .build_update_all(&RowData::new().set("a", 0))
        .unwrap();
    assert_eq!(stmt.sql(), "UPDATE t SET a = $1");
}

#[test]
fn test_update_checks_data_before_filters() {
    let err = qb()
        .build_update(&RowData::new(), &RowData::new())
        .unwrap_err();
    assert!(matches!(err, CrudError::EmptyInput(_)), "{err:?}");
}

/// Counts WARN events seen while installed as the default subscriber.
struct WarnCounter(Arc<AtomicUsize>);

impl Subscriber for WarnCounter {
    fn register_callsite(&self, _: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }
    fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }
    fn record(&self, _: &span::Id, _: &span::Record<'_>) {}
    fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}
    fn event(&self, event: &Event<'_>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
    fn enter(&self, _: &span::Id) {}
    fn exit(&self, _: &span::Id) {}
}

fn count_warnings(f: impl FnOnce()) -> usize {
    let seen = Arc::new(AtomicUsize::new(0));
    tracing::subscriber::with_default(WarnCounter(Arc::clone(&seen)), f);
    seen.load(Ordering::SeqCst)
}

#[test]
fn test_update_all_warns_only_when_built() {
    let rejected = count_warnings(|| {
        assert!(qb().build_update_all(&RowData::new()).is_err());
        assert!(qb().build_update_all(&RowData::new().set("bogus", 1)).is_err());
    });
    assert_eq!(rejected, 0);

    let built = count_warnings(|| {
        qb().build_update_all(&RowData::new().set("a", 0)).unwrap();
    });
    assert_eq!(built, 1);
}

#[test]
fn test_update_unknown_filter_column() {
    let err = qb()
        .build_update(&RowData::new().set("a", 1), &RowData::new().set("bogus", 1))
        .unwrap_err();
    assert!(err.is_invalid_column());
}

#[test]
fn test_delete_basic() {
    let stmt = positional()
        .build_delete(&RowData::new().set("id", 1))
        .unwrap();
    assert!(stmt.sql().ends_with("WHERE id = ?"));
    assert_eq!(stmt.params(), [Value::Int(1)]);
    assert_eq!(stmt.kind(), StatementKind::Delete);
}

#[test]
fn test_delete_requires_filters() {
    let err = qb().build_delete(&RowData::new()).unwrap_err();
    assert!(matches!(err, CrudError::EmptyFilter(_)));
}

#[test]
fn test_delete_unknown_column() {
    let err = qb().build_delete(&RowData::new().set("x", 1)).unwrap_err();
    assert!(err.is_invalid_column());
}

#[test]
fn test_schema_qualified_table() {
    let allow = ColumnAllowList::new(["id"]).unwrap();
    let qb = QueryBuilder::new("public.orders", allow).unwrap();
    let stmt = qb.build_delete(&RowData::new().set("id", 1)).unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM public.orders WHERE id = $1");
}

#[test]
fn test_bad_table_name() {
    let allow = ColumnAllowList::new(["id"]).unwrap();
    assert!(matches!(
        QueryBuilder::new("orders; DROP", allow),
        Err(CrudError::InvalidIdentifier(_))
    ));
}
