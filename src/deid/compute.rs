//! Computed columns

use crate::deid::compiler::{split_alias, Deid};
use crate::deid::fragment::Fragment;
use crate::domain::{DeidError, Result};
use crate::rules::descriptor::RuleArgs;
use crate::rules::dialect::Dialect;
use crate::rules::family::RuleFamily;
use crate::rules::template::SqlTemplate;

impl Deid<'_> {
    /// Derive one column from the rule's expression template
    ///
    /// The fragment is named after the first field, or `value_field` when no
    /// fields are given. A descriptor without rules compiles to nothing.
    pub fn compute(&self, args: &RuleArgs, dialect: Dialect) -> Result<Vec<Fragment>> {
        let Some(entry) = args.entries().first() else {
            return Ok(Vec::new());
        };

        let name = args
            .fields
            .first()
            .or(args.value_field.as_ref())
            .ok_or_else(|| {
                DeidError::descriptor(
                    RuleFamily::Compute,
                    format!("'{}' names neither fields nor value_field", args.label),
                )
            })?;
        let template = entry.template().ok_or_else(|| {
            DeidError::descriptor(
                RuleFamily::Compute,
                format!("'{}' has no expression to apply", args.label),
            )
        })?;

        let rendered = SqlTemplate::new(template)
            .bind("FIELD", name.as_str())
            .bind("RANDOM", dialect.syntax().random)
            .bind_opt("value_field", args.value_field.as_deref())
            .bind_opt("key_field", args.key_field.as_deref())
            .bind_opt("table", args.table.as_deref())
            .render()?;

        let (body, alias) = split_alias(&rendered, name);
        Ok(vec![Fragment::column(
            name.as_str(),
            format!("{body} AS {alias}"),
            args.label.as_str(),
        )])
    }
}
