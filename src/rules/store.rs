//! Rule store: rule bodies keyed by family and rule id

use crate::domain::{DeidError, Result};
use crate::rules::descriptor::{self, Descriptor};
use crate::rules::entry::RuleEntry;
use crate::rules::family::{Pipeline, RuleFamily};
use std::collections::BTreeMap;
use std::path::Path;

/// Rule bodies for every family of the active pipeline
///
/// Built once per run and shared read-only by every compiler instance.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    pipeline: Pipeline,
    cache: BTreeMap<RuleFamily, BTreeMap<String, Vec<RuleEntry>>>,
}

impl RuleStore {
    /// Create an empty store for the given pipeline
    pub fn new(pipeline: Pipeline) -> Self {
        let cache = pipeline.iter().map(|f| (f, BTreeMap::new())).collect();
        Self { pipeline, cache }
    }

    /// Load a `{family: {rule_id: [entry, ...]}}` JSON document
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, an unknown family name, or a family that is not
    /// part of `pipeline`.
    pub fn from_json(pipeline: Pipeline, json: &str) -> Result<Self> {
        let document: BTreeMap<String, BTreeMap<String, Vec<RuleEntry>>> =
            serde_json::from_str(json)?;

        let mut store = Self::new(pipeline);
        for (family, rules) in document {
            let family: RuleFamily = family.parse()?;
            for (rule_id, entries) in rules {
                for entry in entries {
                    store.set(family, &rule_id, entry)?;
                }
            }
        }

        tracing::debug!(rules = store.len(), "Rule store loaded");
        Ok(store)
    }

    /// Load a rule document from disk
    pub fn from_file(pipeline: Pipeline, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DeidError::Configuration(format!(
                "Failed to read rules file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(pipeline, &contents)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Append an entry to `family.rule_id`
    ///
    /// # Errors
    ///
    /// [`DeidError::InvalidFamily`] if `family` is not in the pipeline.
    pub fn set(&mut self, family: RuleFamily, rule_id: &str, entry: RuleEntry) -> Result<()> {
        if !self.pipeline.contains(family) {
            return Err(DeidError::InvalidFamily {
                family: family.to_string(),
                allowed: self.pipeline.describe(),
            });
        }

        self.cache
            .entry(family)
            .or_default()
            .entry(rule_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    /// Entries of `family.rule_id`
    ///
    /// # Errors
    ///
    /// [`DeidError::RuleNotFound`] if the pair is absent.
    pub fn get(&self, family: RuleFamily, rule_id: &str) -> Result<&[RuleEntry]> {
        self.cache
            .get(&family)
            .and_then(|rules| rules.get(rule_id))
            .map(Vec::as_slice)
            .ok_or_else(|| DeidError::RuleNotFound {
                family: family.to_string(),
                rule_id: rule_id.to_string(),
            })
    }

    pub fn contains(&self, family: RuleFamily, rule_id: &str) -> bool {
        self.get(family, rule_id).is_ok()
    }

    /// Rule ids registered under a family
    pub fn rule_ids(&self, family: RuleFamily) -> Vec<&str> {
        self.cache
            .get(&family)
            .map(|rules| rules.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of rule bodies across all families
    pub fn len(&self) -> usize {
        self.cache.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every descriptor applied under `family` is well-formed
    ///
    /// See [`descriptor::check`] for the accepted shapes.
    pub fn validate(&self, family: RuleFamily, descriptors: &[Descriptor]) -> bool {
        descriptors
            .iter()
            .all(|d| descriptor::check(self, family, d).is_ok())
    }
}
