//! Transactional session: one connection, lazily-opened transactions, scoped cursors.
//!
//! A session starts a transaction (`BEGIN`) before the first statement after
//! connect, commit or rollback, so work is never autocommitted. A unit of work
//! run through [`Session::scope`] or [`Session::run`] commits when it returns
//! `Ok` and rolls back when it returns `Err`; the connection is closed on both
//! paths.
//!
//! # Example
//!
//! ```ignore
//! use pgcrud::{ConnectionConfig, RowData, Session, Table};
//!
//! let config = ConnectionConfig::from_env()?;
//! Session::scope(&config, |session| {
//!     let mut orders = Table::orders_combined(session)?;
//!     orders.insert(&RowData::new().set("id", 1).set("customer_name", "egan"))?;
//!     Ok(())
//! })?;
//! # Ok::<(), pgcrud::CrudError>(())
//! ```

use crate::config::ConnectionConfig;
use crate::connection::{Connection, PgConnection};
use crate::error::{CrudError, CrudResult};
use crate::row::Record;
use crate::statement::{BatchStatement, Placeholder, Statement};
use crate::trace;
use std::collections::VecDeque;
use std::sync::Arc;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Open; a transaction may or may not be in progress.
    Connected,
    /// The last transaction was committed.
    Committed,
    /// The last transaction was rolled back.
    RolledBack,
    /// Terminal.
    Closed,
}

/// One live connection plus its transaction state.
///
/// Not shared across threads; every operation takes `&mut self`.
pub struct Session<C: Connection = PgConnection> {
    conn: C,
    state: SessionState,
    in_transaction: bool,
    buffered: bool,
}

impl Session<PgConnection> {
    /// Open a PostgreSQL session.
    pub fn connect(config: &ConnectionConfig) -> CrudResult<Self> {
        let conn = PgConnection::connect(config)?;
        Ok(Self::new(conn, config.buffered))
    }

    /// Connect, run `f`, then commit on `Ok` or roll back on `Err`.
    ///
    /// The connection is closed before this returns, whatever the outcome.
    pub fn scope<T, F>(config: &ConnectionConfig, f: F) -> CrudResult<T>
    where
        F: FnOnce(&mut Session<PgConnection>) -> CrudResult<T>,
    {
        Self::connect(config)?.run(f)
    }
}

impl<C: Connection> Session<C> {
    /// Wrap an already-open connection.
    pub fn new(conn: C, buffered: bool) -> Self {
        tracing::debug!(buffered, "session opened");
        Self {
            conn,
            state: SessionState::Connected,
            in_transaction: false,
            buffered,
        }
    }

    /// Run `f` as one unit of work and close the session.
    pub fn run<T, F>(mut self, f: F) -> CrudResult<T>
    where
        F: FnOnce(&mut Self) -> CrudResult<T>,
    {
        let result = f(&mut self);
        self.finish(result)
    }

    /// Commit if `result` is `Ok`, roll back if it is `Err`, then close.
    ///
    /// A failed rollback is reported together with the original error.
    pub fn finish<T>(mut self, result: CrudResult<T>) -> CrudResult<T> {
        let outcome = match result {
            Ok(value) => match self.commit() {
                Ok(()) => Ok(value),
                Err(commit_err) => Err(self.rollback_after(commit_err)),
            },
            Err(error) => Err(self.rollback_after(error)),
        };
        let closed = self.close();
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(error), _) => Err(error),
        }
    }

    fn rollback_after(&mut self, error: CrudError) -> CrudError {
        tracing::debug!(error = %error, "unit of work failed; rolling back");
        match self.rollback() {
            Ok(()) => error,
            Err(rollback_err) => {
                CrudError::Other(format!("{error} (rollback failed: {rollback_err})"))
            }
        }
    }

    /// Lend a cursor to `f`. The cursor cannot outlive the call.
    pub fn with_cursor<T, F>(&mut self, f: F) -> CrudResult<T>
    where
        F: FnOnce(&mut Cursor<'_, C>) -> CrudResult<T>,
    {
        self.ensure_open()?;
        let mut cursor = Cursor {
            session: self,
            pending: Pending::None,
            columns: None,
            row_count: None,
        };
        f(&mut cursor)
    }

    /// Commit the open transaction. No-op when closed or idle.
    pub fn commit(&mut self) -> CrudResult<()> {
        if self.state == SessionState::Closed || !self.in_transaction {
            return Ok(());
        }
        self.conn.batch_execute("COMMIT")?;
        self.in_transaction = false;
        self.state = SessionState::Committed;
        tracing::debug!("committed");
        Ok(())
    }

    /// Roll back the open transaction. No-op when closed or idle.
    pub fn rollback(&mut self) -> CrudResult<()> {
        if self.state == SessionState::Closed || !self.in_transaction {
            return Ok(());
        }
        // The server-side transaction is gone either way once ROLLBACK is sent.
        self.in_transaction = false;
        self.conn.batch_execute("ROLLBACK")?;
        self.state = SessionState::RolledBack;
        tracing::debug!("rolled back");
        Ok(())
    }

    /// Release the connection. Idempotent.
    pub fn close(&mut self) -> CrudResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.in_transaction = false;
        self.conn.close()?;
        tracing::debug!("session closed");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Closed && self.conn.is_connected()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Placeholder dialect of the underlying connection.
    pub fn placeholder(&self) -> Placeholder {
        self.conn.placeholder()
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    fn ensure_open(&self) -> CrudResult<()> {
        if self.state == SessionState::Closed {
            return Err(CrudError::Closed);
        }
        Ok(())
    }

    fn begin_if_needed(&mut self) -> CrudResult<()> {
        self.ensure_open()?;
        if !self.in_transaction {
            self.conn.batch_execute("BEGIN")?;
            self.in_transaction = true;
            self.state = SessionState::Connected;
        }
        Ok(())
    }
}

impl<C: Connection> Drop for Session<C> {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.in_transaction {
            tracing::warn!("session dropped with an open transaction; rolling back");
            if let Err(e) = self.rollback() {
                tracing::warn!(error = %e, "rollback on drop failed");
            }
        }
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "close on drop failed");
        }
    }
}

impl<C: Connection> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("in_transaction", &self.in_transaction)
            .field("buffered", &self.buffered)
            .finish_non_exhaustive()
    }
}

enum Pending {
    None,
    Rows(VecDeque<Record>),
    /// Unbuffered query that has not been sent yet.
    Deferred(Statement),
}

/// Statement executor borrowed from a [`Session`].
pub struct Cursor<'s, C: Connection> {
    session: &'s mut Session<C>,
    pending: Pending,
    columns: Option<Arc<[String]>>,
    row_count: Option<u64>,
}

impl<C: Connection> Cursor<'_, C> {
    /// Execute one statement.
    ///
    /// Returns the affected row count, or for a buffered query the number of
    /// rows fetched. An unbuffered query returns 0 and runs on the first fetch.
    pub fn execute(&mut self, stmt: &Statement) -> CrudResult<u64> {
        self.guard_unread()?;
        self.session.begin_if_needed()?;
        trace::log_statement(stmt.kind(), stmt.sql(), stmt.params().len());

        if stmt.kind().returns_rows() {
            if !self.session.buffered {
                self.pending = Pending::Deferred(stmt.clone());
                self.columns = None;
                self.row_count = None;
                return Ok(0);
            }
            let count = self.run_query(stmt)?;
            return Ok(count);
        }

        self.pending = Pending::None;
        let count = self.session.conn.execute(stmt.sql(), stmt.params())?;
        self.row_count = Some(count);
        Ok(count)
    }

    /// Execute a batch template once per parameter row.
    pub fn execute_many(&mut self, batch: &BatchStatement) -> CrudResult<u64> {
        self.guard_unread()?;
        self.session.begin_if_needed()?;
        trace::log_batch(batch.sql(), batch.len(), batch.columns().len());

        self.pending = Pending::None;
        let count = self.session.conn.execute_batch(batch.sql(), batch.rows())?;
        self.row_count = Some(count);
        Ok(count)
    }

    /// Fetch every remaining row.
    pub fn fetch_all(&mut self) -> CrudResult<Vec<Record>> {
        self.resolve_deferred()?;
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::Rows(rows) => Ok(rows.into()),
            _ => Ok(Vec::new()),
        }
    }

    /// Fetch the next row, if any.
    pub fn fetch_one(&mut self) -> CrudResult<Option<Record>> {
        self.resolve_deferred()?;
        match &mut self.pending {
            Pending::Rows(rows) => Ok(rows.pop_front()),
            _ => Ok(None),
        }
    }

    /// Fetch up to `n` rows.
    pub fn fetch_many(&mut self, n: usize) -> CrudResult<Vec<Record>> {
        self.resolve_deferred()?;
        match &mut self.pending {
            Pending::Rows(rows) => {
                let n = n.min(rows.len());
                Ok(rows.drain(..n).collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Rows affected or returned by the last statement; `None` before a
    /// deferred query has run.
    pub fn row_count(&self) -> Option<u64> {
        self.row_count
    }

    /// Column names of the last query's result.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    fn guard_unread(&self) -> CrudResult<()> {
        if matches!(self.pending, Pending::Deferred(_)) {
            return Err(CrudError::UnreadResult);
        }
        Ok(())
    }

    fn resolve_deferred(&mut self) -> CrudResult<()> {
        if !matches!(self.pending, Pending::Deferred(_)) {
            return Ok(());
        }
        if let Pending::Deferred(stmt) = std::mem::replace(&mut self.pending, Pending::None) {
            self.run_query(&stmt)?;
        }
        Ok(())
    }

    fn run_query(&mut self, stmt: &Statement) -> CrudResult<u64> {
        let result = self.session.conn.query(stmt.sql(), stmt.params())?;
        let count = result.rows.len() as u64;
        self.columns = Some(result.columns);
        self.pending = Pending::Rows(result.rows.into());
        self.row_count = Some(count);
        Ok(count)
    }
}
