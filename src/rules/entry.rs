//! Rule entries: the clauses inside a rule body

use crate::domain::{DeidError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A literal supplied by the rule author
///
/// The JSON type the author wrote decides the variant: `"Other"` is text and
/// is quoted in SQL, `3` is a number and is emitted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Numeric literal
    Number(serde_json::Number),
    /// String literal
    Text(String),
}

impl Literal {
    /// SQL literal form (`'text'` with quotes doubled, numbers as-is)
    pub fn to_sql(&self) -> String {
        match self {
            Literal::Number(n) => n.to_string(),
            Literal::Text(s) => quote(s),
        }
    }

    /// Unquoted text, as used inside a regular expression
    pub fn raw(&self) -> String {
        match self {
            Literal::Number(n) => n.to_string(),
            Literal::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value.into())
    }
}

/// Quote a string as an SQL text literal
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Comma separated SQL literal list, without the surrounding parentheses
pub fn literal_list(values: &[Literal]) -> String {
    values
        .iter()
        .map(Literal::to_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extra narrowing applied to a clause, chiefly to aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnFilter {
    /// `<field> IN (...)`
    Values(Vec<Literal>),
    /// `EXISTS (<subquery>)`
    Exists {
        /// Subquery tested for existence
        exists: String,
    },
    /// Raw boolean expression
    Expression(String),
}

impl OnFilter {
    /// Render the filter against `field`
    pub fn to_sql(&self, field: &str) -> String {
        match self {
            OnFilter::Values(values) => format!("{field} IN ({})", literal_list(values)),
            OnFilter::Exists { exists } => format!("EXISTS ({exists})"),
            OnFilter::Expression(expr) => format!("({expr})"),
        }
    }
}

/// Built-in matcher and aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Matcher {
    /// Regular expression match against pipe-joined values
    Regexp,
    /// Row count per key
    Count,
    /// Average per key
    Avg,
    /// Sum per key
    Sum,
}

impl Matcher {
    /// Whether the matcher builds a correlated aggregate subquery
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, Matcher::Regexp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Matcher::Regexp => "REGEXP",
            Matcher::Count => "COUNT",
            Matcher::Avg => "AVG",
            Matcher::Sum => "SUM",
        }
    }
}

impl FromStr for Matcher {
    type Err = DeidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "REGEXP" => Ok(Matcher::Regexp),
            "COUNT" => Ok(Matcher::Count),
            "AVG" => Ok(Matcher::Avg),
            "SUM" => Ok(Matcher::Sum),
            _ => Err(DeidError::UnknownMatcher(s.to_string())),
        }
    }
}

/// One clause within a rule body
///
/// `apply` names a matcher (`REGEXP`, `COUNT`, `AVG`, `SUM`) for generalize and
/// suppress rules, and holds the SQL expression template for shift and
/// compute rules. Entries without `apply` compare `values` inline using
/// `qualifier`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Literal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub into: Option<Literal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<OnFilter>,
}

impl RuleEntry {
    /// Entry that invokes `matcher` against `values`
    pub fn matching(matcher: Matcher, values: Vec<Literal>) -> Self {
        Self {
            apply: Some(matcher.as_str().to_string()),
            values,
            ..Self::default()
        }
    }

    /// Inline comparison entry
    pub fn with_values(values: Vec<Literal>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Expression-template entry for shift and compute rules
    pub fn expression(template: impl Into<String>) -> Self {
        Self {
            apply: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn replace_with(mut self, into: impl Into<Literal>) -> Self {
        self.into = Some(into.into());
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn on(mut self, on: OnFilter) -> Self {
        self.on = Some(on);
        self
    }

    /// Parse `apply` as a matcher name
    ///
    /// Returns `Ok(None)` for inline comparison entries and an error for an
    /// unknown matcher.
    pub fn matcher(&self) -> Result<Option<Matcher>> {
        self.apply.as_deref().map(str::parse).transpose()
    }

    /// `apply` as an expression template
    pub fn template(&self) -> Option<&str> {
        self.apply.as_deref()
    }

    /// Whether `name` is listed among the entry's values
    pub fn mentions(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.raw() == name)
    }
}
