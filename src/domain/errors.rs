//! Domain error types
//!
//! This module defines the error hierarchy for the de-identification compiler.
//! Every error here is a configuration problem: a broken rule file, an unknown
//! family or matcher, or an expression the compiler refuses to rewrite. None of
//! them are retried.

use thiserror::Error;

/// Main de-identification error type
#[derive(Debug, Error)]
pub enum DeidError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A family that is not part of the active pipeline
    #[error("Invalid family '{family}', allowed: {allowed}")]
    InvalidFamily { family: String, allowed: String },

    /// A `(family, rule_id)` pair that is not in the rule store
    #[error("Rule not found: {family}.{rule_id}")]
    RuleNotFound { family: String, rule_id: String },

    /// A descriptor whose shape failed validation
    #[error("Invalid descriptor in {family}: {reason}")]
    InvalidDescriptor { family: String, reason: String },

    /// A matcher name with no template in the selected dialect
    #[error("Unknown matcher '{0}'")]
    UnknownMatcher(String),

    /// A dialect identifier other than sqlite, bigquery or postgresql
    #[error("Unknown dialect '{0}'")]
    UnknownDialect(String),

    /// A row filter the compiler cannot negate
    #[error("Unsupported operator in '{expression}': {reason}")]
    UnsupportedOperator { expression: String, reason: String },

    /// Template substitution errors
    #[error("Template error: {0}")]
    Template(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl DeidError {
    /// Shorthand for [`DeidError::InvalidDescriptor`]
    pub fn descriptor(family: impl ToString, reason: impl Into<String>) -> Self {
        DeidError::InvalidDescriptor {
            family: family.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`DeidError::UnsupportedOperator`]
    pub fn unsupported(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        DeidError::UnsupportedOperator {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for DeidError {
    fn from(err: std::io::Error) -> Self {
        DeidError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DeidError {
    fn from(err: serde_json::Error) -> Self {
        DeidError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DeidError {
    fn from(err: toml::de::Error) -> Self {
        DeidError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deid_error_display() {
        let err = DeidError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_rule_not_found_display() {
        let err = DeidError::RuleNotFound {
            family: "generalize".to_string(),
            rule_id: "race".to_string(),
        };
        assert_eq!(err.to_string(), "Rule not found: generalize.race");
    }

    #[test]
    fn test_descriptor_shorthand() {
        let err = DeidError::descriptor("suppress", "values without qualifier");
        assert!(matches!(err, DeidError::InvalidDescriptor { .. }));
        assert!(err.to_string().contains("suppress"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: DeidError = io_err.into();
        assert!(matches!(err, DeidError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: DeidError = json_err.into();
        assert!(matches!(err, DeidError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: DeidError = toml_err.into();
        assert!(matches!(err, DeidError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_deid_error_implements_std_error() {
        let err = DeidError::UnknownDialect("oracle".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
