//! Rule families and the pipeline that orders them

use crate::domain::{DeidError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four transformation families a rule can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFamily {
    /// Replace specific values with a coarser category
    Generalize,
    /// Null out a column or drop rows
    Suppress,
    /// Offset dates
    Shift,
    /// Derive a value from an expression
    Compute,
}

impl RuleFamily {
    /// All families, in declaration order
    pub const ALL: [RuleFamily; 4] = [
        RuleFamily::Generalize,
        RuleFamily::Suppress,
        RuleFamily::Shift,
        RuleFamily::Compute,
    ];

    /// Lowercase identifier used in rule files
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleFamily::Generalize => "generalize",
            RuleFamily::Suppress => "suppress",
            RuleFamily::Shift => "shift",
            RuleFamily::Compute => "compute",
        }
    }
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleFamily {
    type Err = DeidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "generalize" => Ok(RuleFamily::Generalize),
            "suppress" => Ok(RuleFamily::Suppress),
            "shift" => Ok(RuleFamily::Shift),
            "compute" => Ok(RuleFamily::Compute),
            _ => Err(DeidError::InvalidFamily {
                family: s.to_string(),
                allowed: "generalize, suppress, shift, compute".to_string(),
            }),
        }
    }
}

/// Ordered list of families compiled for a table
///
/// `suppress` must run before `shift` because shifting is gated on the row
/// filters that suppression establishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RuleFamily>", into = "Vec<RuleFamily>")]
pub struct Pipeline(Vec<RuleFamily>);

impl Pipeline {
    /// Build a pipeline, rejecting duplicates and `shift` before `suppress`
    pub fn new(families: Vec<RuleFamily>) -> Result<Self> {
        for (i, family) in families.iter().enumerate() {
            if families[..i].contains(family) {
                return Err(DeidError::Configuration(format!(
                    "pipeline lists '{family}' more than once"
                )));
            }
        }

        let position = |f: RuleFamily| families.iter().position(|x| *x == f);
        if let (Some(shift), Some(suppress)) =
            (position(RuleFamily::Shift), position(RuleFamily::Suppress))
        {
            if shift < suppress {
                return Err(DeidError::Configuration(
                    "pipeline must run 'suppress' before 'shift'".to_string(),
                ));
            }
        }

        Ok(Self(families))
    }

    /// Whether the family is part of this pipeline
    pub fn contains(&self, family: RuleFamily) -> bool {
        self.0.contains(&family)
    }

    /// Families in compile order
    pub fn iter(&self) -> impl Iterator<Item = RuleFamily> + '_ {
        self.0.iter().copied()
    }

    /// Comma separated family names, for error messages
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(RuleFamily::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self(vec![
            RuleFamily::Generalize,
            RuleFamily::Compute,
            RuleFamily::Suppress,
            RuleFamily::Shift,
        ])
    }
}

impl TryFrom<Vec<RuleFamily>> for Pipeline {
    type Error = DeidError;

    fn try_from(families: Vec<RuleFamily>) -> Result<Self> {
        Pipeline::new(families)
    }
}

impl From<Pipeline> for Vec<RuleFamily> {
    fn from(pipeline: Pipeline) -> Self {
        pipeline.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parse() {
        assert_eq!(
            "Generalize".parse::<RuleFamily>().unwrap(),
            RuleFamily::Generalize
        );
        assert!("mask".parse::<RuleFamily>().is_err());
    }

    #[test]
    fn test_default_pipeline_order() {
        let order: Vec<_> = Pipeline::default().iter().collect();
        assert_eq!(
            order,
            vec![
                RuleFamily::Generalize,
                RuleFamily::Compute,
                RuleFamily::Suppress,
                RuleFamily::Shift
            ]
        );
    }

    #[test]
    fn test_shift_before_suppress_rejected() {
        let result = Pipeline::new(vec![RuleFamily::Shift, RuleFamily::Suppress]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_family_rejected() {
        let result = Pipeline::new(vec![RuleFamily::Generalize, RuleFamily::Generalize]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_deserializes_from_list() {
        let pipeline: Pipeline = serde_json::from_str(r#"["suppress", "shift"]"#).unwrap();
        assert!(pipeline.contains(RuleFamily::Shift));
        assert!(!pipeline.contains(RuleFamily::Generalize));
        assert_eq!(pipeline.describe(), "suppress, shift");
    }
}
