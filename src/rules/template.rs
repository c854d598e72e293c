//! Named-placeholder SQL templates
//!
//! Templates mark substitution points with `:NAME`. Substitution is a single
//! pass over the template text, so a bound value that itself contains `:X`
//! is never expanded again. A placeholder preceded by another colon (the
//! PostgreSQL `::type` cast) is not a placeholder.
//!
//! ```
//! use cdr_deid::rules::template::SqlTemplate;
//!
//! let sql = SqlTemplate::new("EXTRACT(YEAR FROM :FIELD)::int")
//!     .bind("FIELD", "birth_datetime")
//!     .render()
//!     .unwrap();
//! assert_eq!(sql, "EXTRACT(YEAR FROM birth_datetime)::int");
//! ```

use crate::domain::{DeidError, Result};
use fancy_regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?<!:):([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid")
});

/// Binding state of a placeholder name
#[derive(Debug, Clone)]
enum Binding {
    Value(String),
    Missing,
}

/// A template plus its bindings
#[derive(Debug, Clone)]
pub struct SqlTemplate<'a> {
    text: &'a str,
    bindings: Vec<(&'a str, Binding)>,
}

impl<'a> SqlTemplate<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            bindings: Vec::new(),
        }
    }

    /// Bind `name` to `value`; later bindings of the same name win
    pub fn bind(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.bindings.push((name, Binding::Value(value.into())));
        self
    }

    /// Bind `name` if a value is present, otherwise mark it as required-but-missing
    ///
    /// Rendering fails if a missing name occurs in the template.
    pub fn bind_opt(mut self, name: &'a str, value: Option<&str>) -> Self {
        let binding = match value {
            Some(v) => Binding::Value(v.to_string()),
            None => Binding::Missing,
        };
        self.bindings.push((name, binding));
        self
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| b)
    }

    /// Substitute every bound placeholder; unknown placeholders are kept verbatim
    pub fn render(&self) -> Result<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(self.text) {
            let caps = caps.map_err(|e| DeidError::Template(e.to_string()))?;
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            out.push_str(&self.text[last..whole.start()]);
            match self.lookup(name.as_str()) {
                Some(Binding::Value(value)) => out.push_str(value),
                Some(Binding::Missing) => {
                    return Err(DeidError::Template(format!(
                        "placeholder :{} in '{}' has no value",
                        name.as_str(),
                        self.text
                    )))
                }
                None => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }

        out.push_str(&self.text[last..]);
        Ok(out)
    }
}

/// Placeholder names used in a template, in order of first appearance
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text).flatten() {
        if let Some(name) = caps.get(1) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}
