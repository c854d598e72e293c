//! Compiler output: projection fragments and row-suppression filters

use serde::{Deserialize, Serialize};

/// One compiled SQL expression
///
/// Fragments with a `name` are projection expressions for that column; the
/// `apply` text already carries its `AS <name>` alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub name: Option<String>,
    pub apply: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
}

impl Fragment {
    /// Projection fragment for a column
    pub fn column(name: impl Into<String>, apply: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            apply: apply.into(),
            label: label.into(),
            on: None,
        }
    }

    pub fn with_on(mut self, on: Option<String>) -> Self {
        self.on = on;
        self
    }
}

/// A row filter describing which rows to keep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionFilter {
    pub filter: String,
    pub label: String,
}

/// Row filters accumulated while compiling one table
///
/// Ordered by insertion and de-duplicated on the exact filter text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowSuppressionFilterSet {
    filters: Vec<SuppressionFilter>,
}

impl RowSuppressionFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; returns `false` if the same text is already present
    pub fn insert(&mut self, filter: impl Into<String>, label: impl Into<String>) -> bool {
        let filter = filter.into();
        if self.contains(&filter) {
            return false;
        }
        self.filters.push(SuppressionFilter {
            filter,
            label: label.into(),
        });
        true
    }

    pub fn contains(&self, filter: &str) -> bool {
        self.filters.iter().any(|f| f.filter == filter)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuppressionFilter> {
        self.filters.iter()
    }

    /// Filters ANDed together, or `None` when there are none
    pub fn where_clause(&self) -> Option<String> {
        match self.filters.as_slice() {
            [] => None,
            [only] => Some(only.filter.clone()),
            many => Some(
                many.iter()
                    .map(|f| format!("({})", f.filter))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }
}

impl<'a> IntoIterator for &'a RowSuppressionFilterSet {
    type Item = &'a SuppressionFilter;
    type IntoIter = std::slice::Iter<'a, SuppressionFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
