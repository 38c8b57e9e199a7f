//! SQL debug logging.
//!
//! Every statement a session sends is emitted as a `tracing` event on the
//! `pgcrud.sql` target before it executes. Parameter values are never logged,
//! only their count.

use crate::statement::StatementKind;

/// Log target for statement events.
pub const SQL_TARGET: &str = "pgcrud.sql";

/// Longest SQL text (in bytes) written into a log event.
pub const MAX_LOGGED_SQL: usize = 200;

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn display_sql(sql: &str) -> String {
    if sql.len() > MAX_LOGGED_SQL {
        format!("{}...", truncate_sql_bytes(sql, MAX_LOGGED_SQL))
    } else {
        sql.to_string()
    }
}

/// Emit the event for a single statement.
pub(crate) fn log_statement(kind: StatementKind, sql: &str, param_count: usize) {
    if !tracing::enabled!(target: SQL_TARGET, tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(
        target: SQL_TARGET,
        kind = kind.as_str(),
        param_count,
        sql = %display_sql(sql),
    );
}

/// Emit the event for a batch: one template, `rows` parameter rows.
pub(crate) fn log_batch(sql: &str, rows: usize, param_count: usize) {
    if !tracing::enabled!(target: SQL_TARGET, tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(
        target: SQL_TARGET,
        kind = "insert_many",
        rows,
        param_count,
        sql = %display_sql(sql),
    );
}
