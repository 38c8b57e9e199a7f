//! # pgcrud
//!
//! Injection-safe CRUD against a PostgreSQL table, with transactional sessions.
//!
//! ## Features
//!
//! - **Allow-listed columns**: every column name is checked against the table's
//!   [`ColumnAllowList`] before it reaches SQL text
//! - **Bound values only**: values are always parameters, never spliced into SQL
//! - **Safe defaults**: DELETE requires a filter, UPDATE requires a filter unless
//!   `update_all` is called, SELECT never uses `*`
//! - **Unit-of-work sessions**: commit on `Ok`, roll back on `Err`, always close
//! - **Blocking API**: tokio-postgres driven on a private runtime
//!
//! ## Usage
//!
//! ```ignore
//! use pgcrud::{Columns, ConnectionConfig, RowData, Session, Table};
//!
//! let config = ConnectionConfig::from_env()?;
//! let rows = Session::scope(&config, |session| {
//!     let mut orders = Table::orders_combined(session)?;
//!
//!     orders.insert(&RowData::new().set("id", 1).set("customer_name", "egan"))?;
//!     orders.update(
//!         &RowData::new().set("customer_name", "nage"),
//!         &RowData::new().set("id", 1),
//!     )?;
//!     orders.select(&Columns::All, &RowData::new().set("id", 1), Some(1))
//! })?;
//! # Ok::<(), pgcrud::CrudError>(())
//! ```

pub mod allow_list;
pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod error;
pub mod ident;
pub mod qb;
pub mod row;
pub mod session;
pub mod statement;
pub mod table;
pub mod trace;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use allow_list::ColumnAllowList;
pub use bootstrap::{run_sql_file, run_sql_script};
pub use config::ConnectionConfig;
pub use connection::{Connection, PgConnection, QueryResult};
pub use error::{CrudError, CrudResult};
pub use ident::{Ident, IntoIdent};
pub use qb::QueryBuilder;
pub use row::{Columns, Filters, Record, RowData};
pub use session::{Cursor, Session, SessionState};
pub use statement::{BatchStatement, Placeholder, Statement, StatementKind};
pub use table::{ORDERS_COMBINED, ORDERS_COMBINED_COLUMNS, Table};
pub use value::Value;
