//! Per-table rule descriptors, their shape check, and reference resolution
//!
//! A table's specification ([`TableInfo`]) lists, per family, the descriptors
//! that say which rules apply to which columns. Resolution turns each
//! descriptor into a [`RuleArgs`] bundle for the compiler, replacing
//! `@family.rule_id` references with the stored entries.

use crate::domain::{DeidError, Result};
use crate::rules::entry::{Literal, RuleEntry};
use crate::rules::family::RuleFamily;
use crate::rules::store::RuleStore;
use crate::rules::template::placeholders;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Where a descriptor's rule entries come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSource {
    /// `"@family.rule_id"` or `"@rule_id"`
    Reference(String),
    /// Entries written in place
    Inline(Vec<RuleEntry>),
}

/// One call-site entry of a table specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleSource>,

    /// Default replacement for entries without their own `into`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub into: Option<Literal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Literal>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,

    /// The row filter in `on` already describes the rows to keep
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pre_negated: bool,
}

/// Parsed `@` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    pub family: RuleFamily,
    pub rule_id: String,
}

impl RuleRef {
    /// Parse `@family.rule_id`, or `@rule_id` under `default_family`
    pub fn parse(reference: &str, default_family: RuleFamily) -> Option<Self> {
        let body = reference.trim().strip_prefix('@')?;
        if body.is_empty() {
            return None;
        }

        if let Some((head, tail)) = body.split_once('.') {
            if let Ok(family) = head.parse::<RuleFamily>() {
                if tail.is_empty() {
                    return None;
                }
                return Some(Self {
                    family,
                    rule_id: tail.to_string(),
                });
            }
        }

        Some(Self {
            family: default_family,
            rule_id: body.to_string(),
        })
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.family, self.rule_id)
    }
}

/// Keyword-argument bundle consumed by one compiler call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleArgs {
    pub fields: Vec<String>,
    /// `None` when the descriptor named no rules at all
    pub rules: Option<Vec<RuleEntry>>,
    pub label: String,
    pub on: Option<String>,
    pub filter: Option<String>,
    pub qualifier: Option<String>,
    pub table: Option<String>,
    pub key_field: Option<String>,
    pub value_field: Option<String>,
    pub pre_negated: bool,
}

impl RuleArgs {
    /// Resolved entries, empty when none were given
    pub fn entries(&self) -> &[RuleEntry] {
        self.rules.as_deref().unwrap_or_default()
    }
}

/// A family together with the bundles to compile under it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub family: RuleFamily,
    pub args: Vec<RuleArgs>,
}

/// Rule specification of one table: `{family: [descriptor, ...]}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableInfo {
    families: BTreeMap<RuleFamily, Vec<Descriptor>>,
}

impl TableInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor under `family`, keeping declaration order
    pub fn push(&mut self, family: RuleFamily, descriptor: Descriptor) -> &mut Self {
        self.families.entry(family).or_default().push(descriptor);
        self
    }

    pub fn with(mut self, family: RuleFamily, descriptor: Descriptor) -> Self {
        self.push(family, descriptor);
        self
    }

    /// Descriptors declared for a family
    pub fn descriptors(&self, family: RuleFamily) -> Option<&[Descriptor]> {
        self.families.get(&family).map(Vec::as_slice)
    }

    pub fn families(&self) -> impl Iterator<Item = RuleFamily> + '_ {
        self.families.keys().copied()
    }

    /// Parse a `{family: [descriptor, ...]}` JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: BTreeMap<String, Vec<Descriptor>> = serde_json::from_str(json)?;
        let mut info = Self::new();
        for (family, descriptors) in document {
            let family: RuleFamily = family.parse()?;
            for descriptor in descriptors {
                info.push(family, descriptor);
            }
        }
        Ok(info)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DeidError::Configuration(format!(
                "Failed to read table specification {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }
}

/// Check the shape of one descriptor applied under `family`
///
/// Accepted shapes:
/// - a reference `"@[family.]rule_id"` that exists in the store; references
///   used for generalization must also carry `into`
/// - self-contained: inline entries, or no rules at all
/// - a filter descriptor carrying `on`, `values` and `qualifier` together
pub fn check(store: &RuleStore, family: RuleFamily, descriptor: &Descriptor) -> Result<()> {
    if let Some(RuleSource::Reference(reference)) = &descriptor.rules {
        let rule_ref = RuleRef::parse(reference, family).ok_or_else(|| {
            DeidError::descriptor(family, format!("malformed rule reference '{reference}'"))
        })?;

        if !store.contains(rule_ref.family, &rule_ref.rule_id) {
            return Err(DeidError::RuleNotFound {
                family: rule_ref.family.to_string(),
                rule_id: rule_ref.rule_id,
            });
        }

        if family == RuleFamily::Generalize && descriptor.into.is_none() {
            return Err(DeidError::descriptor(
                family,
                format!("reference '{reference}' must be paired with 'into'"),
            ));
        }
    }

    if descriptor.values.is_some() && (descriptor.on.is_none() || descriptor.qualifier.is_none())
    {
        return Err(DeidError::descriptor(
            family,
            "'values' requires both 'on' and 'qualifier'",
        ));
    }

    Ok(())
}

/// Validate and resolve the descriptors of one family into compiler bundles
///
/// # Errors
///
/// Shape failures and missing references are fatal; nothing is compiled.
pub fn resolve(
    store: &RuleStore,
    family: RuleFamily,
    descriptors: &[Descriptor],
) -> Result<ResolvedCall> {
    let mut args = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        check(store, family, descriptor)?;

        let (entries, default_label) = match &descriptor.rules {
            Some(RuleSource::Reference(reference)) => {
                let rule_ref = RuleRef::parse(reference, family).ok_or_else(|| {
                    DeidError::descriptor(family, format!("malformed rule reference '{reference}'"))
                })?;
                let entries = store.get(rule_ref.family, &rule_ref.rule_id)?.to_vec();
                (Some(entries), rule_ref.label())
            }
            Some(RuleSource::Inline(entries)) => (Some(entries.clone()), family.to_string()),
            None => {
                let entries = descriptor.values.as_ref().map(|values| {
                    vec![RuleEntry {
                        values: values.clone(),
                        qualifier: descriptor.qualifier.clone(),
                        ..RuleEntry::default()
                    }]
                });
                (entries, family.to_string())
            }
        };

        let entries = entries.map(|entries| {
            entries
                .into_iter()
                .map(|mut entry| {
                    if entry.into.is_none() {
                        entry.into = descriptor.into.clone();
                    }
                    entry
                })
                .collect()
        });

        args.push(RuleArgs {
            fields: descriptor.fields.clone(),
            rules: entries,
            label: descriptor.label.clone().unwrap_or(default_label),
            on: descriptor.on.clone(),
            filter: descriptor.filter.clone(),
            qualifier: descriptor.qualifier.clone(),
            table: descriptor.table.clone(),
            key_field: descriptor.key_field.clone(),
            value_field: descriptor.value_field.clone(),
            pre_negated: descriptor.pre_negated,
        });
    }

    tracing::debug!(family = %family, bundles = args.len(), "Descriptors resolved");
    Ok(ResolvedCall { family, args })
}

/// Placeholders in a shift or compute template that compilation leaves unbound
///
/// Names outside the bindable set survive verbatim into the SQL, and names
/// whose descriptor field is absent fail at compile time; both are listed.
/// Other families have no templates and yield nothing.
pub fn unbound_placeholders(family: RuleFamily, args: &RuleArgs) -> Vec<String> {
    let mut bindable = vec![
        ("FIELD", true),
        ("RANDOM", true),
        ("key_field", args.key_field.is_some()),
        ("table", args.table.is_some()),
    ];
    match family {
        RuleFamily::Compute => bindable.push(("value_field", args.value_field.is_some())),
        RuleFamily::Shift => {}
        RuleFamily::Generalize | RuleFamily::Suppress => return Vec::new(),
    }

    let Some(template) = args.entries().first().and_then(RuleEntry::template) else {
        return Vec::new();
    };
    placeholders(template)
        .into_iter()
        .filter(|name| !bindable.iter().any(|(n, present)| *n == name.as_str() && *present))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::entry::Matcher;
    use crate::rules::family::Pipeline;
    use serde_json::json;

    fn store() -> RuleStore {
        let mut store = RuleStore::new(Pipeline::default());
        store
            .set(
                RuleFamily::Generalize,
                "race",
                RuleEntry::matching(Matcher::Regexp, vec!["Native".into(), "Asian".into()]),
            )
            .unwrap();
        store
    }

    fn descriptor(value: serde_json::Value) -> Descriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_rule_ref_parse() {
        let r = RuleRef::parse("@generalize.race", RuleFamily::Suppress).unwrap();
        assert_eq!(r.family, RuleFamily::Generalize);
        assert_eq!(r.rule_id, "race");

        let r = RuleRef::parse("@race", RuleFamily::Generalize).unwrap();
        assert_eq!(r.label(), "generalize.race");

        let r = RuleRef::parse("@icd.v10", RuleFamily::Suppress).unwrap();
        assert_eq!(r.rule_id, "icd.v10");

        assert!(RuleRef::parse("race", RuleFamily::Generalize).is_none());
        assert!(RuleRef::parse("@", RuleFamily::Generalize).is_none());
    }

    #[test]
    fn test_validate_accepts_known_reference() {
        let d = descriptor(json!({"rules": "@race", "fields": ["race"], "into": "Other"}));
        assert!(store().validate(RuleFamily::Generalize, &[d]));
    }

    #[test]
    fn test_validate_rejects_unknown_reference() {
        let d = descriptor(json!({"rules": "@ethnicity", "fields": ["x"], "into": "Other"}));
        assert!(!store().validate(RuleFamily::Generalize, &[d]));
    }

    #[test]
    fn test_validate_rejects_reference_without_into() {
        let d = descriptor(json!({"rules": "@race", "fields": ["race"]}));
        assert!(!store().validate(RuleFamily::Generalize, &[d]));
    }

    #[test]
    fn test_validate_filter_shape() {
        let ok = descriptor(json!({"on": "race", "values": ["x"], "qualifier": "IN"}));
        let partial = descriptor(json!({"on": "race", "values": ["x"]}));
        let s = store();
        assert!(s.validate(RuleFamily::Suppress, &[ok.clone()]));
        assert!(!s.validate(RuleFamily::Suppress, &[ok, partial]));
    }

    #[test]
    fn test_validate_self_contained() {
        let d = descriptor(json!({"fields": ["zip", "ssn"]}));
        assert!(store().validate(RuleFamily::Suppress, &[d]));
    }

    #[test]
    fn test_resolve_fills_into_and_label() {
        let d = descriptor(json!({"rules": "@race", "fields": ["race"], "into": "Other"}));
        let call = resolve(&store(), RuleFamily::Generalize, &[d]).unwrap();
        assert_eq!(call.family, RuleFamily::Generalize);
        let args = &call.args[0];
        assert_eq!(args.label, "generalize.race");
        assert_eq!(args.entries()[0].into, Some(Literal::from("Other")));
    }

    #[test]
    fn test_resolve_values_descriptor_becomes_entry() {
        let d = descriptor(json!({"on": "state", "values": ["PR"], "qualifier": "IN"}));
        let call = resolve(&store(), RuleFamily::Suppress, &[d]).unwrap();
        let entries = call.args[0].entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].qualifier.as_deref(), Some("IN"));
    }

    #[test]
    fn test_resolve_missing_reference_is_fatal() {
        let d = descriptor(json!({"rules": "@suppress.nothing", "fields": ["x"]}));
        let result = resolve(&store(), RuleFamily::Suppress, &[d]);
        assert!(matches!(result, Err(DeidError::RuleNotFound { .. })));
    }

    #[test]
    fn test_table_info_from_json() {
        let info = TableInfo::from_json(
            r#"{"suppress": [{"fields": ["zip"]}], "generalize": [{"rules": "@race", "fields": ["race"], "into": "Other"}]}"#,
        )
        .unwrap();
        assert_eq!(info.descriptors(RuleFamily::Suppress).unwrap().len(), 1);
        assert!(info.descriptors(RuleFamily::Shift).is_none());
        assert!(TableInfo::from_json(r#"{"redact": []}"#).is_err());
    }

    #[test]
    fn test_unbound_placeholders() {
        let args = RuleArgs {
            fields: vec!["year_of_birth".to_string()],
            rules: Some(vec![RuleEntry::expression(
                "EXTRACT(YEAR FROM :value_field) + :offset - :key_field",
            )]),
            value_field: Some("birth_datetime".to_string()),
            ..RuleArgs::default()
        };

        assert_eq!(
            unbound_placeholders(RuleFamily::Compute, &args),
            vec!["offset".to_string(), "key_field".to_string()]
        );
        // shift never binds value_field
        assert_eq!(
            unbound_placeholders(RuleFamily::Shift, &args),
            vec!["value_field".to_string(), "offset".to_string(), "key_field".to_string()]
        );
        assert!(unbound_placeholders(RuleFamily::Generalize, &args).is_empty());
    }

    #[test]
    fn test_fully_bound_template() {
        let args = RuleArgs {
            fields: vec!["observation_date".to_string()],
            rules: Some(vec![RuleEntry::expression(
                "DATE_SUB(:FIELD, INTERVAL :RANDOM DAY)",
            )]),
            ..RuleArgs::default()
        };
        assert!(unbound_placeholders(RuleFamily::Shift, &args).is_empty());
    }
}
