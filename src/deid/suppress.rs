//! Suppression: blank out columns or drop rows

use crate::deid::compiler::{regexp_expression, Deid};
use crate::deid::fragment::Fragment;
use crate::deid::negate::negate;
use crate::domain::{DeidError, Result};
use crate::rules::descriptor::RuleArgs;
use crate::rules::dialect::{Dialect, DialectSyntax};
use crate::rules::entry::{literal_list, RuleEntry};
use crate::rules::family::RuleFamily;

/// Column suffixes blanked with a typed empty value instead of `NULL`
const TYPED_SUFFIXES: [&str; 2] = ["_value", "_string"];

impl Deid<'_> {
    /// Suppress columns, or record row filters
    ///
    /// With `fields` and no `on`, every field becomes a blanked projection.
    /// Otherwise the descriptor describes rows to drop: the filter keeping
    /// the remaining rows is appended to the row filter set and no fragment
    /// is returned.
    pub fn suppress(&mut self, args: &RuleArgs, dialect: Dialect) -> Result<Vec<Fragment>> {
        let syntax = dialect.syntax();

        if !args.fields.is_empty() && args.on.is_none() {
            return Ok(self.suppress_columns(args, syntax));
        }

        let filters = match &args.rules {
            None => vec![self.row_filter(args)?],
            Some(entries) => entries
                .iter()
                .map(|entry| rule_filter(entry, args, syntax))
                .collect::<Result<Vec<_>>>()?,
        };

        for filter in filters {
            if !self.filters.insert(filter.as_str(), args.label.as_str()) {
                tracing::debug!(label = %args.label, filter = %filter, "Row filter already present");
            }
        }

        Ok(Vec::new())
    }

    fn suppress_columns(&self, args: &RuleArgs, syntax: &DialectSyntax) -> Vec<Fragment> {
        args.fields
            .iter()
            .filter(|field| match &args.rules {
                Some(entries) => entries.iter().any(|entry| entry.mentions(field)),
                None => true,
            })
            .map(|field| Fragment::column(field, blanked(field, syntax), args.label.as_str()))
            .collect()
    }

    /// Filter for a raw `on` expression
    fn row_filter(&self, args: &RuleArgs) -> Result<String> {
        let on = args.on.as_deref().ok_or_else(|| {
            DeidError::descriptor(
                RuleFamily::Suppress,
                format!("'{}' names neither fields nor 'on'", args.label),
            )
        })?;

        if args.pre_negated {
            Ok(on.trim().to_string())
        } else {
            negate(on)
        }
    }
}

/// Projection that blanks `field`
fn blanked(field: &str, syntax: &DialectSyntax) -> String {
    if TYPED_SUFFIXES.iter().any(|suffix| field.ends_with(suffix)) {
        format!("CAST('' AS {}) AS {field}", syntax.string_type)
    } else {
        format!("NULL AS {field}")
    }
}

/// Qualifier that keeps the rows a qualifier would select
fn invert_qualifier(qualifier: &str) -> Option<&'static str> {
    let normalized = qualifier.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalized.to_uppercase().as_str() {
        "IN" => Some("NOT IN"),
        "NOT IN" => Some("IN"),
        "=" => Some("<>"),
        "<>" | "!=" => Some("="),
        "" | "TRUE" | "IS TRUE" => Some("IS FALSE"),
        "FALSE" | "IS FALSE" => Some("IS TRUE"),
        "LIKE" => Some("NOT LIKE"),
        "NOT LIKE" => Some("LIKE"),
        _ => None,
    }
}

/// Keep-filter for one rule entry, matched against `filter` or `on`
fn rule_filter(entry: &RuleEntry, args: &RuleArgs, syntax: &DialectSyntax) -> Result<String> {
    let target = args
        .filter
        .as_deref()
        .or(args.on.as_deref())
        .ok_or_else(|| {
            DeidError::descriptor(
                RuleFamily::Suppress,
                format!("row rules of '{}' need 'filter' or 'on'", args.label),
            )
        })?;

    let qualifier = entry
        .qualifier
        .as_deref()
        .or(args.qualifier.as_deref())
        .map(str::trim);

    let unsupported = |q: &str| {
        DeidError::descriptor(
            RuleFamily::Suppress,
            format!("qualifier '{q}' in '{}' has no inverse", args.label),
        )
    };

    match entry.matcher()? {
        Some(aggregate) if aggregate.is_aggregate() => Err(DeidError::descriptor(
            RuleFamily::Suppress,
            format!("{} cannot suppress rows in '{}'", aggregate.as_str(), args.label),
        )),
        Some(_) => {
            let qualifier = qualifier.unwrap_or_default();
            let inverse = invert_qualifier(qualifier)
                .filter(|q| q.starts_with("IS"))
                .ok_or_else(|| unsupported(qualifier))?;
            let matched = regexp_expression(syntax, RuleFamily::Suppress, target, &entry.values)?;
            Ok(format!("({matched}) {inverse}"))
        }
        None => {
            let qualifier = qualifier.filter(|q| !q.is_empty()).unwrap_or("IN");
            let inverse = invert_qualifier(qualifier)
                .filter(|q| !q.starts_with("IS"))
                .ok_or_else(|| unsupported(qualifier))?;

            match (inverse, entry.values.as_slice()) {
                (_, []) => Err(DeidError::descriptor(
                    RuleFamily::Suppress,
                    format!("entry of '{}' has no values", args.label),
                )),
                ("IN" | "NOT IN", values) => {
                    Ok(format!("{target} {inverse} ({})", literal_list(values)))
                }
                (_, [value]) => Ok(format!("{target} {inverse} {}", value.to_sql())),
                _ => Err(DeidError::descriptor(
                    RuleFamily::Suppress,
                    format!("qualifier '{qualifier}' in '{}' takes a single value", args.label),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::entry::Matcher;
    use crate::rules::family::Pipeline;
    use crate::rules::store::RuleStore;

    fn row_args(on: &str) -> RuleArgs {
        RuleArgs {
            on: Some(on.to_string()),
            label: "suppress".to_string(),
            ..RuleArgs::default()
        }
    }

    #[test]
    fn test_column_mode() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        let args = RuleArgs {
            fields: vec!["zip".into(), "value_as_string".into(), "unit_source_value".into()],
            label: "suppress".to_string(),
            ..RuleArgs::default()
        };

        let fragments = deid.suppress(&args, Dialect::Bigquery).unwrap();
        let applied: Vec<_> = fragments.iter().map(|f| f.apply.as_str()).collect();
        assert_eq!(
            applied,
            vec![
                "NULL AS zip",
                "CAST('' AS STRING) AS value_as_string",
                "CAST('' AS STRING) AS unit_source_value",
            ]
        );
        assert!(deid.filters().is_empty());
    }

    #[test]
    fn test_column_mode_with_rules_filters_fields() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        let args = RuleArgs {
            fields: vec!["zip".into(), "race".into()],
            rules: Some(vec![RuleEntry::with_values(vec!["zip".into()])]),
            label: "suppress.demographics".to_string(),
            ..RuleArgs::default()
        };

        let fragments = deid.suppress(&args, Dialect::Sqlite).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].name.as_deref(), Some("zip"));
    }

    #[test]
    fn test_row_mode_negates_and_deduplicates() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);

        let args = row_args("state IN ('PR', 'GU')");
        assert!(deid.suppress(&args, Dialect::Sqlite).unwrap().is_empty());
        deid.suppress(&args, Dialect::Sqlite).unwrap();

        assert_eq!(deid.filters().len(), 1);
        assert!(deid.filters().contains("state NOT IN ('PR', 'GU')"));
    }

    #[test]
    fn test_row_mode_ordering_requires_pre_negated() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);

        assert!(matches!(
            deid.suppress(&row_args("age > 89"), Dialect::Sqlite),
            Err(DeidError::UnsupportedOperator { .. })
        ));

        let mut args = row_args("age <= 89");
        args.pre_negated = true;
        deid.suppress(&args, Dialect::Sqlite).unwrap();
        assert!(deid.filters().contains("age <= 89"));
    }

    #[test]
    fn test_row_rules_in_list() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        let args = RuleArgs {
            on: Some("observation_source_value".to_string()),
            rules: Some(vec![RuleEntry::with_values(vec!["ssn".into(), "zip".into()])
                .qualifier("IN")]),
            label: "suppress.sensitive".to_string(),
            ..RuleArgs::default()
        };

        deid.suppress(&args, Dialect::Postgresql).unwrap();
        assert!(deid
            .filters()
            .contains("observation_source_value NOT IN ('ssn', 'zip')"));
    }

    #[test]
    fn test_row_rules_regexp() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        let args = RuleArgs {
            on: Some("note_text".to_string()),
            rules: Some(vec![RuleEntry::matching(Matcher::Regexp, vec!["SSN".into()])]),
            label: "suppress.notes".to_string(),
            ..RuleArgs::default()
        };

        deid.suppress(&args, Dialect::Postgresql).unwrap();
        assert!(deid.filters().contains("(note_text ~ 'SSN') IS FALSE"));
    }

    #[test]
    fn test_row_rules_reject_aggregates() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        let args = RuleArgs {
            on: Some("person_id".to_string()),
            rules: Some(vec![RuleEntry::matching(Matcher::Count, vec![])]),
            label: "suppress".to_string(),
            ..RuleArgs::default()
        };
        assert!(deid.suppress(&args, Dialect::Bigquery).is_err());
    }

    #[test]
    fn test_invert_qualifier_table() {
        assert_eq!(invert_qualifier("in"), Some("NOT IN"));
        assert_eq!(invert_qualifier("NOT  IN"), Some("IN"));
        assert_eq!(invert_qualifier("="), Some("<>"));
        assert_eq!(invert_qualifier(""), Some("IS FALSE"));
        assert_eq!(invert_qualifier("TRUE"), Some("IS FALSE"));
        assert_eq!(invert_qualifier("IS FALSE"), Some("IS TRUE"));
        assert_eq!(invert_qualifier("LIKE"), Some("NOT LIKE"));
        assert_eq!(invert_qualifier(">"), None);
    }
}
