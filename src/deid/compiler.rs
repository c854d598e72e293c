//! The rule compiler and its top-level driver

use crate::deid::fragment::{Fragment, RowSuppressionFilterSet};
use crate::domain::{DeidError, Result};
use crate::rules::descriptor::{self, RuleArgs, TableInfo};
use crate::rules::dialect::{Conditional, Dialect, DialectSyntax};
use crate::rules::entry::{quote, Literal};
use crate::rules::family::RuleFamily;
use crate::rules::store::RuleStore;
use crate::rules::template::SqlTemplate;
use regex::Regex;
use std::sync::LazyLock;

static ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(.*\S)\s+AS\s+([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("alias pattern is valid")
});

/// Compiles one table's rule specification into SQL fragments
///
/// An instance owns the row-suppression filters of a single compilation
/// pass. Use a fresh instance per table; the rule store is shared.
///
/// ```
/// use cdr_deid::deid::Deid;
/// use cdr_deid::rules::{Descriptor, Dialect, Pipeline, RuleFamily, RuleStore, TableInfo};
///
/// let store = RuleStore::new(Pipeline::default());
/// let info = TableInfo::new().with(
///     RuleFamily::Suppress,
///     Descriptor { fields: vec!["zip".into()], ..Descriptor::default() },
/// );
///
/// let mut deid = Deid::new(&store);
/// let fragments = deid.apply(&info, Dialect::Bigquery).unwrap();
/// assert_eq!(fragments[0].apply, "NULL AS zip");
/// ```
#[derive(Debug)]
pub struct Deid<'a> {
    pub(crate) store: &'a RuleStore,
    pub(crate) filters: RowSuppressionFilterSet,
    pub(crate) outer: Option<String>,
}

impl<'a> Deid<'a> {
    pub fn new(store: &'a RuleStore) -> Self {
        Self {
            store,
            filters: RowSuppressionFilterSet::new(),
            outer: None,
        }
    }

    /// Name the table the output query reads from
    ///
    /// Aggregate subqueries correlate their key with this table's row. A
    /// qualified source such as `cdr.person` is referred to as `person`.
    /// Without it, an aggregate's own `table` is assumed to be the outer one.
    pub fn for_table(mut self, source: &str) -> Self {
        let name = source.rsplit('.').next().unwrap_or(source);
        self.outer = Some(name.trim_matches(['`', '"']).to_string());
        self
    }

    pub fn store(&self) -> &RuleStore {
        self.store
    }

    /// Row filters established so far
    pub fn filters(&self) -> &RowSuppressionFilterSet {
        &self.filters
    }

    /// Hand the row filters to the caller
    pub fn into_filters(self) -> RowSuppressionFilterSet {
        self.filters
    }

    /// Compile a table specification
    ///
    /// Families run in pipeline order, descriptors in declaration order.
    /// Later families see the row filters established by earlier ones.
    ///
    /// # Errors
    ///
    /// Fails before compiling anything if `info` names a family outside the
    /// pipeline; fails on the first malformed descriptor of a family.
    pub fn apply(&mut self, info: &TableInfo, dialect: Dialect) -> Result<Vec<Fragment>> {
        let pipeline = self.store.pipeline().clone();

        if let Some(family) = info.families().find(|f| !pipeline.contains(*f)) {
            return Err(DeidError::InvalidFamily {
                family: family.to_string(),
                allowed: pipeline.describe(),
            });
        }

        let mut fragments = Vec::new();
        for family in pipeline.iter() {
            let Some(descriptors) = info.descriptors(family) else {
                continue;
            };

            let call = descriptor::resolve(self.store, family, descriptors)?;
            for args in &call.args {
                let compiled = self.dispatch(call.family, args, dialect)?;
                tracing::debug!(
                    family = %family,
                    label = %args.label,
                    fragments = compiled.len(),
                    "Descriptor compiled"
                );
                fragments.extend(compiled);
            }
        }

        Ok(fragments)
    }

    /// Run the compiler operation for `family`
    pub fn dispatch(
        &mut self,
        family: RuleFamily,
        args: &RuleArgs,
        dialect: Dialect,
    ) -> Result<Vec<Fragment>> {
        match family {
            RuleFamily::Generalize => self.generalize(args, dialect),
            RuleFamily::Suppress => self.suppress(args, dialect),
            RuleFamily::Shift => self.shift(args, dialect),
            RuleFamily::Compute => self.compute(args, dialect),
        }
    }
}

/// Dialect REGEXP matcher of `target` against the pipe-joined values
pub(crate) fn regexp_expression(
    syntax: &DialectSyntax,
    family: RuleFamily,
    target: &str,
    values: &[Literal],
) -> Result<String> {
    if values.is_empty() {
        return Err(DeidError::descriptor(family, "REGEXP entry without values"));
    }

    let pattern = values.iter().map(Literal::raw).collect::<Vec<_>>().join("|");
    SqlTemplate::new(syntax.regexp)
        .bind("FIELD", target)
        .bind("VAR", quote(&pattern))
        .render()
}

/// Append a qualifier to a parenthesized expression
pub(crate) fn qualify(expression: String, qualifier: Option<&str>) -> String {
    match qualifier.map(str::trim) {
        Some(q) if !q.is_empty() => format!("({expression}) {q}"),
        _ => expression,
    }
}

/// Split a trailing `AS alias`, defaulting the alias to `default`
pub(crate) fn split_alias<'e>(expression: &'e str, default: &str) -> (&'e str, String) {
    match ALIAS.captures(expression) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(body), Some(alias)) => (body.as_str(), alias.as_str().to_string()),
            _ => (expression.trim(), default.to_string()),
        },
        None => (expression.trim(), default.to_string()),
    }
}

/// Whether the branch after entry `index` nests a new conditional
///
/// Alternating nesting keeps output identical to the rule files' historical
/// SQL.
pub(crate) fn nests_after(index: usize) -> bool {
    index % 2 == 0 || index % 3 != 0
}

/// Build a conditional chain over `(condition, replacement)` branches
///
/// Branches nest (`ELSE` + new conditional) according to [`nests_after`];
/// otherwise they continue flat with the dialect's `WHEN` token. Dialects
/// without a flat form always nest. The chain ends with `fallback` and one
/// close token per opened conditional.
pub(crate) fn conditional_chain(
    syntax: &Conditional,
    branches: &[(String, String)],
    fallback: &str,
) -> String {
    if branches.is_empty() {
        return fallback.to_string();
    }

    let mut tokens: Vec<&str> = Vec::new();
    let mut opened = 0usize;
    let mut nest_next = true;

    for (index, (condition, into)) in branches.iter().enumerate() {
        if nest_next {
            tokens.push(syntax.if_);
            tokens.push(syntax.open);
            opened += 1;
        } else if let Some(when) = syntax.when {
            tokens.push(when);
        }

        tokens.extend([condition.as_str(), syntax.then, into.as_str()]);

        if index + 1 < branches.len() {
            nest_next = nests_after(index) || syntax.when.is_none();
            if nest_next {
                tokens.push(syntax.else_);
            }
        }
    }

    tokens.push(syntax.else_);
    tokens.push(fallback);
    tokens.extend(std::iter::repeat(syntax.close).take(opened));

    join_tokens(&tokens)
}

/// Join SQL tokens with single spaces, gluing punctuation tokens
fn join_tokens(tokens: &[&str]) -> String {
    let mut out = String::new();
    let mut glue_next = true;

    for token in tokens.iter().filter(|t| !t.is_empty()) {
        let glue = glue_next || matches!(*token, "," | ")" | "(");
        if !glue {
            out.push(' ');
        }
        out.push_str(token);
        glue_next = *token == "(";
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches(n: usize) -> Vec<(String, String)> {
        (0..n)
            .map(|i| (format!("c{i}"), format!("'v{i}'")))
            .collect()
    }

    #[test]
    fn test_nesting_pattern() {
        let pattern: Vec<bool> = (0..10).map(nests_after).collect();
        assert_eq!(
            pattern,
            vec![true, true, true, false, true, true, true, true, true, false]
        );
    }

    #[test]
    fn test_case_chain_single_branch() {
        let sql = conditional_chain(&Dialect::Sqlite.syntax().conditional, &branches(1), "f");
        assert_eq!(sql, "CASE WHEN c0 THEN 'v0' ELSE f END");
    }

    #[test]
    fn test_case_chain_flat_continuation() {
        let sql = conditional_chain(&Dialect::Sqlite.syntax().conditional, &branches(5), "f");
        assert_eq!(
            sql,
            "CASE WHEN c0 THEN 'v0' ELSE CASE WHEN c1 THEN 'v1' ELSE CASE WHEN c2 THEN 'v2' \
             ELSE CASE WHEN c3 THEN 'v3' WHEN c4 THEN 'v4' ELSE f END END END END"
        );
    }

    #[test]
    fn test_if_chain_always_nests() {
        let sql = conditional_chain(&Dialect::Bigquery.syntax().conditional, &branches(5), "f");
        assert_eq!(
            sql,
            "IF(c0, 'v0', IF(c1, 'v1', IF(c2, 'v2', IF(c3, 'v3', IF(c4, 'v4', f)))))"
        );
    }

    #[test]
    fn test_empty_chain_is_fallback() {
        let sql = conditional_chain(&Dialect::Postgresql.syntax().conditional, &[], "race");
        assert_eq!(sql, "race");
    }

    #[test]
    fn test_split_alias() {
        assert_eq!(
            split_alias("DATE_SUB(x, INTERVAL 1 DAY) AS shifted", "x"),
            ("DATE_SUB(x, INTERVAL 1 DAY)", "shifted".to_string())
        );
        assert_eq!(
            split_alias("CAST(x AS DATE)", "x"),
            ("CAST(x AS DATE)", "x".to_string())
        );
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("a".to_string(), Some("> 1")), "(a) > 1");
        assert_eq!(qualify("a".to_string(), Some("  ")), "a");
        assert_eq!(qualify("a".to_string(), None), "a");
    }
}
