//! Built statements: SQL text plus separately-held parameters.
//!
//! Values never enter the SQL string. The writer emits a placeholder for each
//! bound value and appends the value to the parameter list, so the text and
//! the parameters can only be produced together.

use crate::ident::Ident;
use crate::value::Value;
use std::fmt::Write as _;

/// Placeholder dialect for bound parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placeholder {
    /// `$1, $2, ...` (PostgreSQL)
    #[default]
    Numbered,
    /// `?, ?, ...` (positional drivers)
    Positional,
}

/// Kind of statement, used for logging and to decide whether rows come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Select,
    Update,
    Delete,
    /// Hand-written SQL (schema scripts, DDL).
    Raw,
}

impl StatementKind {
    pub fn returns_rows(self) -> bool {
        matches!(self, StatementKind::Select)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Insert => "insert",
            StatementKind::Select => "select",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Raw => "raw",
        }
    }
}

/// An immutable (SQL template, ordered parameters) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    /// Wrap hand-written SQL that takes no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Raw,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

/// One SQL template executed once per parameter row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    sql: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl BatchStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Canonical column order every parameter row follows.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Incremental SQL writer that numbers placeholders as values are bound.
#[derive(Debug)]
pub(crate) struct SqlWriter {
    sql: String,
    params: Vec<Value>,
    placeholder: Placeholder,
}

impl SqlWriter {
    pub(crate) fn new(placeholder: Placeholder) -> Self {
        Self {
            sql: String::with_capacity(64),
            params: Vec::new(),
            placeholder,
        }
    }

    /// Append raw SQL keywords or punctuation.
    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub(crate) fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        ident.write_sql(&mut self.sql);
        self
    }

    /// Append a column name. Callers must have checked it against the allow-list.
    pub(crate) fn push_column(&mut self, column: &str) -> &mut Self {
        self.sql.push_str(column);
        self
    }

    /// Append a comma-separated column list.
    pub(crate) fn push_columns<'a>(&mut self, columns: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for (i, col) in columns.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_column(col);
        }
        self
    }

    /// Append the next placeholder without binding a value (batch templates).
    pub(crate) fn push_placeholder(&mut self, index: usize) -> &mut Self {
        match self.placeholder {
            Placeholder::Numbered => {
                let _ = write!(self.sql, "${index}");
            }
            Placeholder::Positional => self.sql.push('?'),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub(crate) fn push_bind(&mut self, value: Value) -> &mut Self {
        self.params.push(value);
        let index = self.params.len();
        self.push_placeholder(index)
    }

    /// Append `col = <bind>` pairs joined by `sep`.
    pub(crate) fn push_assignments<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = (&'a str, &'a Value)>,
        sep: &str,
    ) -> &mut Self {
        for (i, (col, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.push_column(col).push(" = ").push_bind(value.clone());
        }
        self
    }

    pub(crate) fn finish(self, kind: StatementKind) -> Statement {
        Statement {
            kind,
            sql: self.sql,
            params: self.params,
        }
    }

    pub(crate) fn finish_batch(self, columns: Vec<String>, rows: Vec<Vec<Value>>) -> BatchStatement {
        debug_assert!(self.params.is_empty());
        BatchStatement {
            sql: self.sql,
            columns,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_placeholders_in_bind_order() {
        let mut w = SqlWriter::new(Placeholder::Numbered);
        w.push("SELECT id FROM t WHERE a = ")
            .push_bind(Value::Int(1))
            .push(" AND b = ")
            .push_bind(Value::from("x"));
        let stmt = w.finish(StatementKind::Select);
        assert_eq!(stmt.sql(), "SELECT id FROM t WHERE a = $1 AND b = $2");
        assert_eq!(stmt.params(), [Value::Int(1), Value::from("x")]);
    }

    #[test]
    fn positional_placeholders() {
        let mut w = SqlWriter::new(Placeholder::Positional);
        w.push("x = ").push_bind(Value::Int(1)).push(", y = ").push_bind(Value::Int(2));
        assert_eq!(w.finish(StatementKind::Raw).sql(), "x = ?, y = ?");
    }

    #[test]
    fn assignments_bind_every_value() {
        let a = Value::Int(1);
        let b = Value::from("egan");
        let mut w = SqlWriter::new(Placeholder::Numbered);
        w.push_assignments([("id", &a), ("customer_name", &b)], " AND ");
        let stmt = w.finish(StatementKind::Raw);
        assert_eq!(stmt.sql(), "id = $1 AND customer_name = $2");
        assert_eq!(stmt.params().len(), 2);
    }
}
