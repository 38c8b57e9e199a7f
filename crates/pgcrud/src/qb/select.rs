//! SELECT statements with conjunctive equality filters and a bound LIMIT.

use crate::error::{CrudError, CrudResult};
use crate::qb::QueryBuilder;
use crate::row::{Columns, RowData};
use crate::statement::{Statement, StatementKind};
use crate::value::Value;

impl QueryBuilder {
    /// `SELECT <cols> FROM <table> [WHERE a = ? AND ...] [LIMIT ?]`.
    ///
    /// [`Columns::All`] expands to the whole allow-list; the SELECT list is
    /// always explicit column names. `limit` must be at least 1.
    pub fn build_select(
        &self,
        columns: &Columns,
        filters: &RowData,
        limit: Option<i64>,
    ) -> CrudResult<Statement> {
        if let Some(n) = limit {
            if n < 1 {
                return Err(CrudError::InvalidLimit(n));
            }
        }

        let columns: Vec<&str> = match columns {
            Columns::All => self.allow_list().columns().iter().map(String::as_str).collect(),
            Columns::Named(cols) => {
                if cols.is_empty() {
                    return Err(CrudError::empty_input("Cannot select an empty column list"));
                }
                cols.iter().map(String::as_str).collect()
            }
        };
        self.allow_list().validate(columns.iter().copied())?;
        self.validate_keys(filters)?;

        let mut w = self.writer();
        w.push("SELECT ")
            .push_columns(columns)
            .push(" FROM ")
            .push_ident(self.table());
        Self::push_where(&mut w, filters);
        if let Some(n) = limit {
            w.push(" LIMIT ").push_bind(Value::Int(n));
        }
        Ok(w.finish(StatementKind::Select))
    }
}
