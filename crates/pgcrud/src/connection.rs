//! Execution layer: the [`Connection`] trait and its PostgreSQL implementation.
//!
//! [`Session`](crate::Session) talks to the database only through
//! [`Connection`], so the transaction logic can be exercised against a
//! recording fake in unit tests.

use crate::config::ConnectionConfig;
use crate::error::{CrudError, CrudResult};
use crate::row::Record;
use crate::statement::Placeholder;
use crate::value::Value;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

/// Rows returned by [`Connection::query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Arc<[String]>,
    pub rows: Vec<Record>,
}

/// One physical database connection, driven synchronously.
///
/// Implementations run statements exactly as given; transaction boundaries
/// are issued by the session through [`Connection::batch_execute`].
pub trait Connection {
    /// Placeholder dialect this connection expects in SQL text.
    fn placeholder(&self) -> Placeholder {
        Placeholder::Numbered
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> CrudResult<u64>;

    /// Execute one template once per parameter row; returns the summed count.
    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> CrudResult<u64>;

    /// Run a query and return its rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> CrudResult<QueryResult>;

    /// Run parameterless SQL through the simple query protocol
    /// (`BEGIN`, `COMMIT`, `ROLLBACK`, DDL).
    fn batch_execute(&mut self, sql: &str) -> CrudResult<()>;

    /// Release the connection. Must be idempotent.
    fn close(&mut self) -> CrudResult<()>;

    fn is_connected(&self) -> bool;
}

/// Blocking wrapper around a `tokio_postgres::Client`.
///
/// Owns a current-thread runtime that drives the connection task; every call
/// blocks on that runtime, so no async surface leaks out. Not intended to be
/// used from inside another tokio runtime.
pub struct PgConnection {
    runtime: Runtime,
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
}

impl PgConnection {
    /// Open a connection.
    pub fn connect(config: &ConnectionConfig) -> CrudResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CrudError::connection)?;

        let pg = config.to_pg_config();
        let (client, connection) = runtime
            .block_on(pg.connect(NoTls))
            .map_err(CrudError::connection)?;

        let driver = runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection error");
            }
        });

        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connected"
        );

        Ok(Self {
            runtime,
            client: Some(client),
            driver: Some(driver),
        })
    }

    fn client(&self) -> CrudResult<&Client> {
        self.client.as_ref().ok_or(CrudError::Closed)
    }
}

fn as_params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn decode_rows(columns: &Arc<[String]>, rows: Vec<Row>) -> CrudResult<Vec<Record>> {
    rows.into_iter()
        .map(|row| {
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    row.try_get::<_, Value>(i)
                        .map_err(|e| CrudError::decode(name.as_str(), e.to_string()))
                })
                .collect::<CrudResult<Vec<_>>>()?;
            Ok(Record::new(Arc::clone(columns), values))
        })
        .collect()
}

impl Connection for PgConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> CrudResult<u64> {
        let client = self.client()?;
        let params = as_params(params);
        Ok(self.runtime.block_on(client.execute(sql, &params))?)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> CrudResult<u64> {
        let client = self.client()?;
        self.runtime.block_on(async {
            let stmt = client.prepare(sql).await?;
            // Requests issued concurrently on one client are pipelined.
            let counts = try_join_all(rows.iter().map(|row| {
                let stmt = &stmt;
                let params = as_params(row);
                async move { client.execute(stmt, &params).await }
            }))
            .await?;
            Ok::<u64, CrudError>(counts.into_iter().sum())
        })
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> CrudResult<QueryResult> {
        let client = self.client()?;
        let params = as_params(params);
        let (stmt, rows) = self.runtime.block_on(async {
            let stmt = client.prepare(sql).await?;
            let rows = client.query(&stmt, &params).await?;
            Ok::<_, tokio_postgres::Error>((stmt, rows))
        })?;

        let columns: Arc<[String]> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = decode_rows(&columns, rows)?;
        Ok(QueryResult { columns, rows })
    }

    fn batch_execute(&mut self, sql: &str) -> CrudResult<()> {
        let client = self.client()?;
        Ok(self.runtime.block_on(client.batch_execute(sql))?)
    }

    fn close(&mut self) -> CrudResult<()> {
        // Dropping the client ends the connection task.
        if self.client.take().is_none() {
            return Ok(());
        }
        if let Some(driver) = self.driver.take() {
            self.runtime
                .block_on(driver)
                .map_err(|e| CrudError::Other(format!("connection task failed: {e}")))?;
        }
        tracing::debug!("connection closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
