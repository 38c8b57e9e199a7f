//! Table accessor: CRUD against one named table through a session.

use crate::allow_list::ColumnAllowList;
use crate::connection::{Connection, PgConnection};
use crate::error::CrudResult;
use crate::ident::{Ident, IntoIdent};
use crate::qb::QueryBuilder;
use crate::row::{Columns, Record, RowData};
use crate::session::Session;
use crate::statement::Statement;
use std::sync::Arc;

/// Table name of the bundled orders dataset.
pub const ORDERS_COMBINED: &str = "orders_combined";

/// Column allow-list of [`ORDERS_COMBINED`].
pub const ORDERS_COMBINED_COLUMNS: [&str; 12] = [
    "id",
    "order_id",
    "timestamp",
    "date_time",
    "customer_id",
    "customer_name",
    "customer_email",
    "product_id",
    "product_name",
    "product_price",
    "price",
    "email",
];

/// CRUD façade for one table.
///
/// Mutations execute and then commit; `select` never commits. Errors are
/// returned unchanged and never retried.
pub struct Table<'s, C: Connection = PgConnection> {
    session: &'s mut Session<C>,
    builder: QueryBuilder,
}

impl<'s, C: Connection> Table<'s, C> {
    /// Bind `name` and its allow-list to a session.
    pub fn new(
        name: impl IntoIdent,
        allow_list: impl Into<Arc<ColumnAllowList>>,
        session: &'s mut Session<C>,
    ) -> CrudResult<Self> {
        let builder = QueryBuilder::new(name, allow_list)?.placeholder(session.placeholder());
        Ok(Self { session, builder })
    }

    /// The `orders_combined` table with its fixed allow-list.
    pub fn orders_combined(session: &'s mut Session<C>) -> CrudResult<Self> {
        let allow = ColumnAllowList::new(ORDERS_COMBINED_COLUMNS)?;
        Self::new(ORDERS_COMBINED, allow, session)
    }

    pub fn table_name(&self) -> &Ident {
        self.builder.table()
    }

    pub fn allow_list(&self) -> &ColumnAllowList {
        self.builder.allow_list()
    }

    /// Insert one row; returns the affected row count.
    pub fn insert(&mut self, row: &RowData) -> CrudResult<u64> {
        let stmt = self.builder.build_insert(row)?;
        self.execute_and_commit(&stmt)
    }

    /// Insert many rows with one statement template.
    pub fn insert_many(&mut self, rows: &[RowData]) -> CrudResult<u64> {
        let batch = self.builder.build_insert_many(rows)?;
        let executed = self.session.with_cursor(|cur| cur.execute_many(&batch));
        self.commit_or_discard(executed)
    }

    /// Select rows. See [`QueryBuilder::build_select`].
    pub fn select(
        &mut self,
        columns: &Columns,
        filters: &RowData,
        limit: Option<i64>,
    ) -> CrudResult<Vec<Record>> {
        let stmt = self.builder.build_select(columns, filters, limit)?;
        self.session.with_cursor(|cur| {
            cur.execute(&stmt)?;
            cur.fetch_all()
        })
    }

    /// Update the rows matching `filters`; `filters` must be non-empty.
    pub fn update(&mut self, data: &RowData, filters: &RowData) -> CrudResult<u64> {
        let stmt = self.builder.build_update(data, filters)?;
        self.execute_and_commit(&stmt)
    }

    /// Update every row in the table.
    pub fn update_all(&mut self, data: &RowData) -> CrudResult<u64> {
        let stmt = self.builder.build_update_all(data)?;
        self.execute_and_commit(&stmt)
    }

    /// Delete the rows matching `filters`; `filters` must be non-empty.
    pub fn delete(&mut self, filters: &RowData) -> CrudResult<u64> {
        let stmt = self.builder.build_delete(filters)?;
        self.execute_and_commit(&stmt)
    }

    fn execute_and_commit(&mut self, stmt: &Statement) -> CrudResult<u64> {
        let executed = self.session.with_cursor(|cur| cur.execute(stmt));
        self.commit_or_discard(executed)
    }

    /// Commit a successful mutation. A failed one is rolled back so the
    /// aborted server-side transaction does not poison later calls; the
    /// statement error is returned as is.
    fn commit_or_discard(&mut self, executed: CrudResult<u64>) -> CrudResult<u64> {
        match executed {
            Ok(count) => {
                self.session.commit()?;
                Ok(count)
            }
            Err(error) => {
                if let Err(rb) = self.session.rollback() {
                    tracing::warn!(error = %rb, "rollback after failed statement failed");
                }
                Err(error)
            }
        }
    }
}

impl<C: Connection> std::fmt::Debug for Table<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.builder.table().to_sql())
            .field("columns", &self.builder.allow_list().columns())
            .finish()
    }
}
