//! UPDATE statements.

use crate::error::{CrudError, CrudResult};
use crate::qb::QueryBuilder;
use crate::row::RowData;
use crate::statement::{Statement, StatementKind};

impl QueryBuilder {
    /// `UPDATE <table> SET a = ?, ... WHERE b = ? AND ...`.
    ///
    /// Both `data` and `filters` must be non-empty; parameters are the `data`
    /// values followed by the `filters` values. Whole-table updates go through
    /// [`QueryBuilder::build_update_all`].
    pub fn build_update(&self, data: &RowData, filters: &RowData) -> CrudResult<Statement> {
        if data.is_empty() {
            return Err(CrudError::empty_input("Cannot update: empty data dictionary"));
        }
        if filters.is_empty() {
            return Err(CrudError::empty_filter(
                "Cannot update: empty filters (use update_all to update every row)",
            ));
        }
        self.build_update_inner(data, filters)
    }

    /// `UPDATE <table> SET a = ?, ...` with no WHERE clause.
    ///
    /// Touches every row in the table.
    pub fn build_update_all(&self, data: &RowData) -> CrudResult<Statement> {
        let stmt = self.build_update_inner(data, &RowData::new())?;
        tracing::warn!(
            target: "pgcrud.sql",
            table = %self.table(),
            columns = data.len(),
            "UPDATE without WHERE; every row will be modified"
        );
        Ok(stmt)
    }

    fn build_update_inner(&self, data: &RowData, filters: &RowData) -> CrudResult<Statement> {
        if data.is_empty() {
            return Err(CrudError::empty_input("Cannot update: empty data dictionary"));
        }
        self.validate_keys(data)?;
        self.validate_keys(filters)?;

        let mut w = self.writer();
        w.push("UPDATE ")
            .push_ident(self.table())
            .push(" SET ")
            .push_assignments(data.iter(), ", ");
        Self::push_where(&mut w, filters);
        Ok(w.finish(StatementKind::Update))
    }
}
