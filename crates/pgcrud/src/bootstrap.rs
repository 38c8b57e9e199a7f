//! One-shot schema bootstrap from a SQL script.
//!
//! Scripts are split on `;` and run statement by statement in one
//! transaction. There is no version tracking: running a script twice runs it
//! twice, so scripts should use `IF NOT EXISTS` where that matters.

use crate::connection::Connection;
use crate::error::CrudResult;
use crate::session::Session;
use crate::statement::Statement;
use std::path::Path;

/// Split a script into trimmed, non-empty statements.
pub fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Execute every statement in `sql`, then commit.
///
/// Returns the number of statements executed. On failure nothing is
/// committed; the caller's session still holds the open transaction.
pub fn run_sql_script<C: Connection>(session: &mut Session<C>, sql: &str) -> CrudResult<usize> {
    let count = session.with_cursor(|cur| {
        let mut count = 0;
        for stmt in split_statements(sql) {
            cur.execute(&Statement::raw(stmt))?;
            count += 1;
        }
        Ok(count)
    })?;
    session.commit()?;
    tracing::info!(statements = count, "schema script applied");
    Ok(count)
}

/// Read `path` and run it with [`run_sql_script`].
pub fn run_sql_file<C: Connection>(
    session: &mut Session<C>,
    path: impl AsRef<Path>,
) -> CrudResult<usize> {
    let path = path.as_ref();
    let sql = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "running schema file");
    run_sql_script(session, &sql)
}
