//! INSERT statements: single row and homogeneous batches.

use crate::error::{CrudError, CrudResult};
use crate::qb::QueryBuilder;
use crate::row::RowData;
use crate::statement::{BatchStatement, SqlWriter, Statement, StatementKind};
use crate::value::Value;

impl QueryBuilder {
    /// `INSERT INTO <table> (<cols>) VALUES (<placeholders>)`.
    ///
    /// Parameters follow the row's insertion order.
    pub fn build_insert(&self, row: &RowData) -> CrudResult<Statement> {
        if row.is_empty() {
            return Err(CrudError::empty_input("Cannot insert empty data dictionary"));
        }
        self.validate_keys(row)?;

        let mut w = self.insert_prefix(row.columns());
        for (i, value) in row.values().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_bind(value.clone());
        }
        w.push(")");
        Ok(w.finish(StatementKind::Insert))
    }

    /// One INSERT template plus one parameter row per input row.
    ///
    /// The first row's columns are canonical. Every other row must carry the
    /// same column set (in any order); its values are re-ordered to match.
    pub fn build_insert_many(&self, rows: &[RowData]) -> CrudResult<BatchStatement> {
        let Some(first) = rows.first() else {
            return Err(CrudError::empty_input("Cannot insert empty list of rows"));
        };
        if first.is_empty() {
            return Err(CrudError::empty_input("Cannot insert empty data dictionary"));
        }
        self.validate_keys(first)?;

        let columns: Vec<String> = first.columns().map(str::to_string).collect();
        let mut params = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            params.push(canonical_values(&columns, row, idx)?);
        }

        let mut w = self.insert_prefix(first.columns());
        for i in 1..=columns.len() {
            if i > 1 {
                w.push(", ");
            }
            w.push_placeholder(i);
        }
        w.push(")");
        Ok(w.finish_batch(columns, params))
    }

    fn insert_prefix<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> SqlWriter {
        let mut w = self.writer();
        w.push("INSERT INTO ")
            .push_ident(self.table())
            .push(" (")
            .push_columns(columns)
            .push(") VALUES (");
        w
    }
}

fn canonical_values(columns: &[String], row: &RowData, idx: usize) -> CrudResult<Vec<Value>> {
    let mismatch = || CrudError::SchemaMismatch {
        row: idx,
        expected: columns.to_vec(),
        found: row.columns().map(str::to_string).collect(),
    };
    if row.len() != columns.len() {
        return Err(mismatch());
    }
    columns
        .iter()
        .map(|col| row.get(col).cloned().ok_or_else(mismatch))
        .collect()
}
