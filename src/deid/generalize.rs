//! Generalization: map matched values to coarser replacements

use crate::deid::compiler::{conditional_chain, qualify, regexp_expression, Deid};
use crate::deid::fragment::Fragment;
use crate::domain::{DeidError, Result};
use crate::rules::descriptor::RuleArgs;
use crate::rules::dialect::{Dialect, DialectSyntax};
use crate::rules::entry::{literal_list, Matcher, OnFilter, RuleEntry};
use crate::rules::family::RuleFamily;
use crate::rules::template::SqlTemplate;

/// Alias of the table scanned by aggregate subqueries
const AGGREGATE_ALIAS: &str = "deid_agg";

impl Deid<'_> {
    /// One conditional projection per field
    ///
    /// Each entry contributes a `(condition, into)` branch, in order; the
    /// unchanged field is the fallback.
    pub fn generalize(&self, args: &RuleArgs, dialect: Dialect) -> Result<Vec<Fragment>> {
        let syntax = dialect.syntax();
        let fields: Vec<&str> = if args.fields.is_empty() {
            args.value_field.iter().map(String::as_str).collect()
        } else {
            args.fields.iter().map(String::as_str).collect()
        };

        if fields.is_empty() {
            return Err(DeidError::descriptor(
                RuleFamily::Generalize,
                format!("'{}' names neither fields nor value_field", args.label),
            ));
        }

        let mut fragments = Vec::with_capacity(fields.len());
        for name in fields {
            let mut branches = Vec::with_capacity(args.entries().len());
            for entry in args.entries() {
                let into = entry.into.as_ref().ok_or_else(|| {
                    DeidError::descriptor(
                        RuleFamily::Generalize,
                        format!("entry of '{}' has no 'into'", args.label),
                    )
                })?;
                let condition = condition(entry, name, args, syntax, self.outer.as_deref())?;
                branches.push((condition, into.to_sql()));
            }

            let expression = conditional_chain(&syntax.conditional, &branches, name);
            fragments.push(Fragment::column(
                name,
                format!("{expression} AS {name}"),
                args.label.as_str(),
            ));
        }

        Ok(fragments)
    }
}

fn condition(
    entry: &RuleEntry,
    name: &str,
    args: &RuleArgs,
    syntax: &DialectSyntax,
    outer: Option<&str>,
) -> Result<String> {
    let target = args.filter.as_deref().unwrap_or(name);

    match entry.matcher()? {
        Some(aggregate) if aggregate.is_aggregate() => {
            let subquery = aggregate_subquery(aggregate, entry, name, args, syntax, outer)?;
            Ok(qualify(subquery, entry.qualifier.as_deref()))
        }
        Some(_) => {
            let matched = regexp_expression(syntax, RuleFamily::Generalize, target, &entry.values)?;
            Ok(qualify(matched, entry.qualifier.as_deref()))
        }
        None => {
            if entry.values.is_empty() {
                return Err(DeidError::descriptor(
                    RuleFamily::Generalize,
                    format!("entry of '{}' has neither 'apply' nor 'values'", args.label),
                ));
            }
            let qualifier = entry
                .qualifier
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .unwrap_or("IN");
            Ok(format!("{target} {qualifier} ({})", literal_list(&entry.values)))
        }
    }
}

/// Aggregate over `table` correlated on `key_field` with the outer row
///
/// The outer row is `outer` when known, else `table` itself.
fn aggregate_subquery(
    aggregate: Matcher,
    entry: &RuleEntry,
    name: &str,
    args: &RuleArgs,
    syntax: &DialectSyntax,
    outer: Option<&str>,
) -> Result<String> {
    let missing = |what: &str| {
        DeidError::descriptor(
            RuleFamily::Generalize,
            format!("{} in '{}' requires '{what}'", aggregate.as_str(), args.label),
        )
    };
    let table = args.table.as_deref().ok_or_else(|| missing("table"))?;
    let key_field = args.key_field.as_deref().ok_or_else(|| missing("key_field"))?;
    let value_field = format!(
        "{AGGREGATE_ALIAS}.{}",
        args.value_field.as_deref().unwrap_or(name)
    );

    let mut subquery = SqlTemplate::new(syntax.matcher(aggregate))
        .bind("FIELD", value_field.as_str())
        .bind("TABLE", format!("{table} AS {AGGREGATE_ALIAS}"))
        .bind("KEY", format!("{AGGREGATE_ALIAS}.{key_field}"))
        .bind("VALUE", format!("{}.{key_field}", outer.unwrap_or(table)))
        .render()?;

    let narrowing = entry
        .on
        .clone()
        .or_else(|| args.on.clone().map(OnFilter::Expression));
    if let Some(on) = narrowing {
        subquery = format!("{subquery} AND {}", on.to_sql(&value_field));
    }

    Ok(format!("({subquery})"))
}
