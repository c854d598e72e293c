//! Date shifting

use crate::deid::compiler::{split_alias, Deid};
use crate::deid::fragment::Fragment;
use crate::domain::{DeidError, Result};
use crate::rules::descriptor::RuleArgs;
use crate::rules::dialect::Dialect;
use crate::rules::family::RuleFamily;
use crate::rules::template::SqlTemplate;

impl Deid<'_> {
    /// Shift each field through the rule's expression template
    ///
    /// Nothing is emitted until a row filter exists: shifting a table that no
    /// suppression criterion covers is refused. The first entry of the rule
    /// supplies the template.
    pub fn shift(&self, args: &RuleArgs, dialect: Dialect) -> Result<Vec<Fragment>> {
        if self.filters.is_empty() {
            tracing::warn!(
                label = %args.label,
                fields = ?args.fields,
                "Shift skipped: no row suppression filter established"
            );
            return Ok(Vec::new());
        }

        let Some(entry) = args.entries().first() else {
            return Ok(Vec::new());
        };
        let template = entry.template().ok_or_else(|| {
            DeidError::descriptor(
                RuleFamily::Shift,
                format!("'{}' has no expression to apply", args.label),
            )
        })?;

        let syntax = dialect.syntax();
        let mut fragments = Vec::with_capacity(args.fields.len());

        for field in &args.fields {
            let rendered = SqlTemplate::new(template)
                .bind("FIELD", field.as_str())
                .bind("RANDOM", syntax.random)
                .bind_opt("key_field", args.key_field.as_deref())
                .bind_opt("table", args.table.as_deref())
                .render()?;

            let (body, alias) = split_alias(&rendered, field);
            let apply = match &args.on {
                Some(_) => format!("CAST({body} AS {}) AS {alias}", syntax.string_type),
                None => format!("{body} AS {alias}"),
            };

            fragments.push(
                Fragment::column(field.as_str(), apply, args.label.as_str())
                    .with_on(args.on.clone()),
            );
        }

        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::entry::RuleEntry;
    use crate::rules::family::Pipeline;
    use crate::rules::store::RuleStore;

    fn args(template: &str) -> RuleArgs {
        RuleArgs {
            fields: vec!["observation_date".to_string()],
            rules: Some(vec![RuleEntry::expression(template)]),
            label: "shift.date".to_string(),
            ..RuleArgs::default()
        }
    }

    #[test]
    fn test_no_filters_no_shift() {
        let store = RuleStore::new(Pipeline::default());
        let deid = Deid::new(&store);
        let fragments = deid
            .shift(&args("DATE_SUB(:FIELD, INTERVAL :RANDOM DAY)"), Dialect::Bigquery)
            .unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_shift_binds_random() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        deid.filters.insert("age <= 89", "suppress");

        let fragments = deid
            .shift(&args("DATE_SUB(:FIELD, INTERVAL :RANDOM DAY)"), Dialect::Bigquery)
            .unwrap();
        assert_eq!(
            fragments[0].apply,
            "DATE_SUB(observation_date, INTERVAL CAST((RAND() * 364) + 1 AS INT64) DAY) \
             AS observation_date"
        );
        assert_eq!(fragments[0].on, None);
    }

    #[test]
    fn test_shift_with_on_casts_and_keeps_alias() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        deid.filters.insert("age <= 89", "suppress");

        let mut a = args("DATE(:FIELD, '-' || :RANDOM || ' days') AS shifted");
        a.on = Some("value_as_string".to_string());

        let fragments = deid.shift(&a, Dialect::Sqlite).unwrap();
        assert_eq!(
            fragments[0].apply,
            "CAST(DATE(observation_date, '-' || (ABS(RANDOM()) % 365 + 1) || ' days') AS TEXT) \
             AS shifted"
        );
        assert_eq!(fragments[0].on.as_deref(), Some("value_as_string"));
    }

    #[test]
    fn test_shift_lookup_requires_table() {
        let store = RuleStore::new(Pipeline::default());
        let mut deid = Deid::new(&store);
        deid.filters.insert("age <= 89", "suppress");

        let a = args("DATE_SUB(:FIELD, INTERVAL (SELECT shift FROM :table WHERE :key_field = person_id) DAY)");
        assert!(matches!(
            deid.shift(&a, Dialect::Bigquery),
            Err(DeidError::Template(_))
        ));
    }
}
