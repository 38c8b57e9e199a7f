//! DELETE statements. A WHERE clause is mandatory.

use crate::error::{CrudError, CrudResult};
use crate::qb::QueryBuilder;
use crate::row::RowData;
use crate::statement::{Statement, StatementKind};

impl QueryBuilder {
    /// `DELETE FROM <table> WHERE a = ? AND ...`.
    pub fn build_delete(&self, filters: &RowData) -> CrudResult<Statement> {
        self.validate_keys(filters)?;
        if filters.is_empty() {
            return Err(CrudError::empty_filter(
                "No condition in filters dict, cannot delete",
            ));
        }

        let mut w = self.writer();
        w.push("DELETE FROM ").push_ident(self.table());
        Self::push_where(&mut w, filters);
        Ok(w.finish(StatementKind::Delete))
    }
}
