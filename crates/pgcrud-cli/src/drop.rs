use pgcrud::Statement;

use crate::cli::DropArgs;

pub fn run(args: DropArgs) -> anyhow::Result<()> {
    let table = crate::parse_table(&args.table)?;
    let (_, session) = crate::open(&args.conn)?;

    session.run(|s| {
        s.with_cursor(|cur| cur.execute(&drop_statement(&table)))?;
        s.commit()
    })?;
    tracing::info!(table = %table, "table dropped");
    println!("dropped {table}");
    Ok(())
}

fn drop_statement(table: &pgcrud::Ident) -> Statement {
    Statement::raw(format!("DROP TABLE IF EXISTS {table}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_uses_validated_identifier() {
        let table = crate::parse_table(r#"public."Orders""#).unwrap();
        assert_eq!(
            drop_statement(&table).sql(),
            r#"DROP TABLE IF EXISTS public."Orders""#
        );
        assert!(crate::parse_table("orders; DROP DATABASE x").is_err());
    }
}
