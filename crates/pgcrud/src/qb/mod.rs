//! Query builder (QB): allow-listed, parameterized statements for one table.
//!
//! Every builder method validates the column names it is given against the
//! table's [`ColumnAllowList`] before any SQL text is produced. Values are
//! always bound parameters; only the table identifier and validated column
//! names are written into the SQL string.
//!
//! # Usage
//!
//! ```ignore
//! use pgcrud::{qb::QueryBuilder, ColumnAllowList, RowData};
//!
//! let allow = ColumnAllowList::new(["id", "customer_name"])?;
//! let qb = QueryBuilder::new("orders_combined", allow)?;
//!
//! let stmt = qb.build_insert(&RowData::new().set("id", 1).set("customer_name", "egan"))?;
//! assert_eq!(stmt.sql(), "INSERT INTO orders_combined (id, customer_name) VALUES ($1, $2)");
//!
//! let stmt = qb.build_select(&["id"].into(), &RowData::new().set("id", 1), Some(1))?;
//! assert_eq!(stmt.sql(), "SELECT id FROM orders_combined WHERE id = $1 LIMIT $2");
//! ```

mod delete;
mod insert;
mod select;
mod update;

use crate::allow_list::ColumnAllowList;
use crate::error::CrudResult;
use crate::ident::{Ident, IntoIdent};
use crate::row::RowData;
use crate::statement::{Placeholder, SqlWriter};
use std::sync::Arc;

/// Statement builder bound to one table and its allow-list.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: Ident,
    allow_list: Arc<ColumnAllowList>,
    placeholder: Placeholder,
}

impl QueryBuilder {
    /// Create a builder for `table`, rendering `$n` placeholders.
    pub fn new(table: impl IntoIdent, allow_list: impl Into<Arc<ColumnAllowList>>) -> CrudResult<Self> {
        Ok(Self {
            table: table.into_ident()?,
            allow_list: allow_list.into(),
            placeholder: Placeholder::Numbered,
        })
    }

    /// Switch the placeholder dialect.
    pub fn placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn allow_list(&self) -> &ColumnAllowList {
        &self.allow_list
    }

    pub(crate) fn writer(&self) -> SqlWriter {
        SqlWriter::new(self.placeholder)
    }

    /// Validate the keys of a row or filter map.
    pub(crate) fn validate_keys(&self, row: &RowData) -> CrudResult<()> {
        self.allow_list.validate(row.columns())
    }

    /// Append ` WHERE a = ? AND b = ?` when `filters` is non-empty.
    pub(crate) fn push_where(w: &mut SqlWriter, filters: &RowData) {
        if filters.is_empty() {
            return;
        }
        w.push(" WHERE ").push_assignments(filters.iter(), " AND ");
    }
}

#[cfg(test)]
mod tests;
