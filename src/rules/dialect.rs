//! SQL dialects and their syntax tables

use crate::domain::{DeidError, Result};
use crate::rules::entry::Matcher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SQL backend a compilation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    #[default]
    Bigquery,
    Postgresql,
}

impl Dialect {
    /// Syntax table for this backend
    pub fn syntax(&self) -> &'static DialectSyntax {
        match self {
            Dialect::Sqlite => &SQLITE,
            Dialect::Bigquery => &BIGQUERY,
            Dialect::Postgresql => &POSTGRESQL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Bigquery => "bigquery",
            Dialect::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = DeidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "bigquery" => Ok(Dialect::Bigquery),
            "postgresql" | "postgres" => Ok(Dialect::Postgresql),
            _ => Err(DeidError::UnknownDialect(s.to_string())),
        }
    }
}

/// Conditional-expression tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditional {
    pub if_: &'static str,
    pub open: &'static str,
    pub then: &'static str,
    pub else_: &'static str,
    pub close: &'static str,
    /// Token that continues a conditional without nesting, if the dialect has one
    pub when: Option<&'static str>,
}

/// Immutable per-backend syntax table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectSyntax {
    pub conditional: Conditional,
    pub regexp: &'static str,
    pub count: &'static str,
    pub avg: &'static str,
    pub sum: &'static str,
    /// Random integer in [1, 365]
    pub random: &'static str,
    /// Type used when a column is blanked instead of nulled
    pub string_type: &'static str,
}

impl DialectSyntax {
    /// Template for a matcher
    pub fn matcher(&self, matcher: Matcher) -> &'static str {
        match matcher {
            Matcher::Regexp => self.regexp,
            Matcher::Count => self.count,
            Matcher::Avg => self.avg,
            Matcher::Sum => self.sum,
        }
    }
}

const CASE_WHEN: Conditional = Conditional {
    if_: "CASE WHEN",
    open: "",
    then: "THEN",
    else_: "ELSE",
    close: "END",
    when: Some("WHEN"),
};

static SQLITE: DialectSyntax = DialectSyntax {
    conditional: CASE_WHEN,
    regexp: ":FIELD REGEXP :VAR",
    count: "SELECT COUNT(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    avg: "SELECT AVG(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    sum: "SELECT SUM(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    random: "(ABS(RANDOM()) % 365 + 1)",
    string_type: "TEXT",
};

static BIGQUERY: DialectSyntax = DialectSyntax {
    conditional: Conditional {
        if_: "IF",
        open: "(",
        then: ",",
        else_: ",",
        close: ")",
        when: None,
    },
    regexp: "REGEXP_CONTAINS(:FIELD, :VAR)",
    count: "SELECT COUNT(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    avg: "SELECT AVG(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    sum: "SELECT SUM(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    random: "CAST((RAND() * 364) + 1 AS INT64)",
    string_type: "STRING",
};

static POSTGRESQL: DialectSyntax = DialectSyntax {
    conditional: CASE_WHEN,
    regexp: ":FIELD ~ :VAR",
    count: "SELECT COUNT(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    avg: "SELECT AVG(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    sum: "SELECT SUM(:FIELD) FROM :TABLE WHERE :KEY = :VALUE",
    random: "CAST((RANDOM() * 364) + 1 AS INTEGER)",
    string_type: "TEXT",
};
