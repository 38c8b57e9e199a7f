//! Per-table column allow-list.
//!
//! Column names are spliced into SQL text, so they are the one place a caller
//! could smuggle SQL into a statement. Every column a builder touches is checked
//! against the table's [`ColumnAllowList`] first.

use crate::error::{CrudError, CrudResult};
use crate::ident::is_simple_ident;
use std::collections::{BTreeSet, HashSet};

/// Immutable set of column names permitted in generated SQL.
///
/// Declaration order is kept so that "all columns" selects them in a stable
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAllowList {
    ordered: Vec<String>,
    lookup: HashSet<String>,
}

impl ColumnAllowList {
    /// Build an allow-list from column names.
    ///
    /// Each name must be a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`); duplicates
    /// collapse onto their first occurrence. An empty list is rejected.
    pub fn new<I, S>(columns: I) -> CrudResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut lookup = HashSet::new();
        for col in columns {
            let col = col.into();
            if !is_simple_ident(&col) {
                return Err(CrudError::invalid_identifier(format!(
                    "allow-list column '{col}' is not a plain identifier"
                )));
            }
            if lookup.insert(col.clone()) {
                ordered.push(col);
            }
        }
        if ordered.is_empty() {
            return Err(CrudError::empty_input("allow-list must name at least one column"));
        }
        Ok(Self { ordered, lookup })
    }

    /// Fail with [`CrudError::InvalidColumn`] unless every name is allowed.
    ///
    /// The error carries exactly the set difference `columns - allowed`. An empty
    /// input is valid.
    pub fn validate<'a, I>(&self, columns: I) -> CrudResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let offending: BTreeSet<String> = columns
            .into_iter()
            .filter(|c| !self.lookup.contains(*c))
            .map(str::to_string)
            .collect();
        if offending.is_empty() {
            return Ok(());
        }
        Err(CrudError::InvalidColumn {
            offending,
            allowed: self.ordered.iter().cloned().collect(),
        })
    }

    pub fn contains(&self, column: &str) -> bool {
        self.lookup.contains(column)
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
