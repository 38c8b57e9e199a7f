//! Safe SQL identifier handling.
//!
//! Identifiers cannot be bound as parameters, so every table or column name
//! that is spliced into SQL text goes through [`Ident`] first.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_]*`
//! - Quoted parts allow any characters except NUL and escape `"` as `""`
//! - Parts are joined with `.` (`schema.table`)
//!
//! # Example
//! ```ignore
//! use pgcrud::Ident;
//!
//! let t = Ident::parse("public.orders_combined")?;
//! let c = Ident::parse(r#""Sales"."Orders""#)?;
//! # Ok::<(), pgcrud::CrudError>(())
//! ```

use crate::error::{CrudError, CrudResult};
use std::fmt;

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

/// A validated, possibly schema-qualified SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    parts: Vec<IdentPart>,
}

/// Check a bare (unquoted, undotted) name such as a column.
pub fn is_simple_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    pub fn parse(s: &str) -> CrudResult<Self> {
        if s.is_empty() {
            return Err(CrudError::invalid_identifier("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(CrudError::invalid_identifier(
                "identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = if let Some(quoted) = rest.strip_prefix('"') {
                split_quoted(quoted, s)?
            } else {
                let end = rest.find('.').unwrap_or(rest.len());
                let name = &rest[..end];
                if !is_simple_ident(name) {
                    return Err(CrudError::invalid_identifier(format!(
                        "'{s}' is not a valid identifier"
                    )));
                }
                (IdentPart::Unquoted(name.to_string()), &rest[end..])
            };
            parts.push(part);

            match tail.strip_prefix('.') {
                Some("") => {
                    return Err(CrudError::invalid_identifier(format!(
                        "trailing '.' in identifier '{s}'"
                    )));
                }
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    return Err(CrudError::invalid_identifier(format!(
                        "expected '.' between identifier parts in '{s}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// Name of the last part (the table itself for `schema.table`).
    pub fn name(&self) -> &str {
        match self.parts.last() {
            Some(IdentPart::Unquoted(s) | IdentPart::Quoted(s)) => s,
            None => "",
        }
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) => out.push_str(s),
                IdentPart::Quoted(s) => {
                    out.push('"');
                    out.push_str(&s.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
    }
}

/// Split a quoted part off the front of `s` (opening quote already consumed).
fn split_quoted<'a>(s: &'a str, whole: &str) -> CrudResult<(IdentPart, &'a str)> {
    let mut name = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            name.push('"');
            continue;
        }
        if name.is_empty() {
            return Err(CrudError::invalid_identifier(format!(
                "empty quoted identifier in '{whole}'"
            )));
        }
        return Ok((IdentPart::Quoted(name), &s[i + 1..]));
    }
    Err(CrudError::invalid_identifier(format!(
        "unclosed quoted identifier in '{whole}'"
    )))
}

/// Convert an input into an [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> CrudResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> CrudResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> CrudResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> CrudResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> CrudResult<Ident> {
        Ident::parse(&self)
    }
}

impl IntoIdent for &String {
    fn into_ident(self) -> CrudResult<Ident> {
        Ident::parse(self)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl std::str::FromStr for Ident {
    type Err = CrudError;

    fn from_str(s: &str) -> CrudResult<Self> {
        Ident::parse(s)
    }
}
