//! Recording in-memory [`Connection`] for unit tests.

use crate::connection::{Connection, QueryResult};
use crate::error::{CrudError, CrudResult};
use crate::row::Record;
use crate::statement::Placeholder;
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Execute(String, Vec<Value>),
    Batch(String, Vec<Vec<Value>>),
    Query(String, Vec<Value>),
    Simple(String),
    Close,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<Call>,
    results: VecDeque<QueryResult>,
    fail_on: Option<String>,
    affected: u64,
    closed: bool,
}

/// Shared handle; clones observe the same call log.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingConnection {
    inner: Arc<Mutex<Inner>>,
    placeholder: Placeholder,
}

impl RecordingConnection {
    pub(crate) fn new() -> Self {
        let conn = Self::default();
        conn.inner.lock().unwrap().affected = 1;
        conn
    }

    pub(crate) fn positional() -> Self {
        Self {
            placeholder: Placeholder::Positional,
            ..Self::new()
        }
    }

    /// Queue rows for the next query.
    pub(crate) fn push_result(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|values| Record::new(Arc::clone(&columns), values))
            .collect();
        self.inner
            .lock()
            .unwrap()
            .results
            .push_back(QueryResult { columns, rows });
    }

    /// Fail every statement whose SQL contains `needle`.
    pub(crate) fn fail_on(&self, needle: &str) {
        self.inner.lock().unwrap().fail_on = Some(needle.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// SQL text of every call, in order (`Close` appears as `"<close>"`).
    pub(crate) fn sql_log(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| match call {
                Call::Execute(sql, _) | Call::Batch(sql, _) | Call::Query(sql, _) | Call::Simple(sql) => sql,
                Call::Close => "<close>".to_string(),
            })
            .collect()
    }

    fn record(&self, call: Call) -> CrudResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(CrudError::Closed);
        }
        let failing = match (&inner.fail_on, &call) {
            (
                Some(needle),
                Call::Execute(sql, _) | Call::Batch(sql, _) | Call::Query(sql, _) | Call::Simple(sql),
            ) => sql.contains(needle.as_str()),
            _ => false,
        };
        inner.calls.push(call);
        if failing {
            return Err(CrudError::Other("simulated failure".to_string()));
        }
        Ok(())
    }
}

impl Connection for RecordingConnection {
    fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> CrudResult<u64> {
        self.record(Call::Execute(sql.to_string(), params.to_vec()))?;
        Ok(self.inner.lock().unwrap().affected)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> CrudResult<u64> {
        self.record(Call::Batch(sql.to_string(), rows.to_vec()))?;
        Ok(rows.len() as u64)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> CrudResult<QueryResult> {
        self.record(Call::Query(sql.to_string(), params.to_vec()))?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .results
            .pop_front()
            .unwrap_or_default())
    }

    fn batch_execute(&mut self, sql: &str) -> CrudResult<()> {
        self.record(Call::Simple(sql.to_string()))
    }

    fn close(&mut self) -> CrudResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.closed {
            inner.closed = true;
            inner.calls.push(Call::Close);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.inner.lock().unwrap().closed
    }
}
