//! Error types for pgcrud

use std::collections::BTreeSet;
use thiserror::Error;

/// Result type alias for pgcrud operations
pub type CrudResult<T> = Result<T, CrudError>;

/// Error types for table access.
///
/// Variants up to and including [`CrudError::InvalidIdentifier`] are raised while
/// validating input, before any SQL reaches the database.
#[derive(Debug, Error)]
pub enum CrudError {
    /// One or more column names are not in the table's allow-list
    #[error("Invalid column: {offending:?} is not in valid columns: {allowed:?}")]
    InvalidColumn {
        offending: BTreeSet<String>,
        allowed: BTreeSet<String>,
    },

    /// A required map or list was empty
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A filter set that must constrain the statement was empty
    #[error("Empty filter: {0}")]
    EmptyFilter(String),

    /// A batch row does not carry the same column set as the first row
    #[error("Schema mismatch in row {row}: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// LIMIT must be a positive integer
    #[error("Invalid limit: {0} (limit must be positive)")]
    InvalidLimit(i64),

    /// A table or allow-list identifier is not safe to splice into SQL
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected a statement
    #[error("Execution error: {0}")]
    Execution(#[from] tokio_postgres::Error),

    /// The session has been closed and cannot be used again
    #[error("Session is closed")]
    Closed,

    /// An unbuffered result set was left unread before the next statement
    #[error("Unread result pending: fetch the previous result before executing another statement")]
    UnreadResult,

    /// Result column decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (schema scripts)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CrudError {
    /// Create an invalid-column error from the offending and allowed names
    pub fn invalid_column<'a>(
        offending: impl IntoIterator<Item = &'a str>,
        allowed: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::InvalidColumn {
            offending: offending.into_iter().map(str::to_string).collect(),
            allowed: allowed.into_iter().map(str::to_string).collect(),
        }
    }

    /// Create an empty-input error
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }

    /// Create an empty-filter error
    pub fn empty_filter(message: impl Into<String>) -> Self {
        Self::EmptyFilter(message.into())
    }

    /// Create an invalid-identifier error
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap a connect-time tokio_postgres error
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection(err.to_string())
    }

    /// True for errors raised before any SQL was sent to the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidColumn { .. }
                | Self::EmptyInput(_)
                | Self::EmptyFilter(_)
                | Self::SchemaMismatch { .. }
                | Self::InvalidLimit(_)
                | Self::InvalidIdentifier(_)
        )
    }

    /// Check if this is an invalid-column error
    pub fn is_invalid_column(&self) -> bool {
        matches!(self, Self::InvalidColumn { .. })
    }

    /// SQLSTATE code of a database-side failure, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Execution(err) => err.as_db_error().map(|db| db.code().code()),
            _ => None,
        }
    }

    /// Check if this is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }

    /// Check if this is a foreign key violation
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate() == Some("23503")
    }
}
