//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DeidConfig;
use crate::domain::errors::DeidError;
use crate::domain::result::Result;
use crate::rules::{Dialect, Pipeline, RuleFamily};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
});

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DeidConfig
/// 4. Applies environment variable overrides (DEID_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use cdr_deid::config::loader::load_config;
///
/// let config = load_config("deid.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DeidConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DeidError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<DeidConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: DeidConfig = toml::from_str(&contents)
        .map_err(|e| DeidError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        DeidError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied unchanged.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in ENV_VAR.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(DeidError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using the DEID_* prefix
///
/// Compiler settings use `DEID_<KEY>` (for example `DEID_DIALECT`); the other
/// sections use `DEID_<SECTION>_<KEY>`. `DEID_PIPELINE` is a comma separated
/// family list.
fn apply_env_overrides(config: &mut DeidConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("DEID_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("DEID_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Compiler overrides
    if let Ok(val) = std::env::var("DEID_DIALECT") {
        config.deid.dialect = val.parse::<Dialect>()?;
    }
    if let Ok(val) = std::env::var("DEID_PIPELINE") {
        let families = val
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<RuleFamily>)
            .collect::<Result<Vec<_>>>()?;
        config.deid.pipeline = Pipeline::new(families)?;
    }
    if let Ok(val) = std::env::var("DEID_RULES_PATH") {
        config.deid.rules_path = val;
    }

    // Output overrides
    if let Ok(val) = std::env::var("DEID_OUTPUT_DIRECTORY") {
        config.output.directory = val;
    }
    if let Ok(val) = std::env::var("DEID_OUTPUT_MANIFEST") {
        config.output.manifest = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("DEID_OUTPUT_MANIFEST_PATH") {
        config.output.manifest_path = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[deid]
rules_path = "rules.json"
dialect = "sqlite"

[[tables]]
name = "person"
info_path = "person.json"
columns = ["person_id", "race"]
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("DEID_TEST_RULES_DIR", "/srv/rules");
        let input = "rules_path = \"${DEID_TEST_RULES_DIR}/cdr.json\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "rules_path = \"/srv/rules/cdr.json\"");
        std::env::remove_var("DEID_TEST_RULES_DIR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("DEID_TEST_MISSING_VAR");
        let input = "rules_path = \"${DEID_TEST_MISSING_VAR}\"";
        assert!(substitute_env_vars(input).is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("DEID_TEST_COMMENTED");
        let input = "# rules_path = \"${DEID_TEST_COMMENTED}\"";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("nonexistent.toml").is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.tables.len(), 1);
        assert_eq!(config.table("person").unwrap().columns.len(), 2);
        assert!(config.output.manifest);
    }

    #[test]
    fn test_parse_config_rejects_invalid_pipeline() {
        let text = MINIMAL.replace(
            "dialect = \"sqlite\"",
            "dialect = \"sqlite\"\npipeline = [\"shift\", \"suppress\"]",
        );
        assert!(parse_config(&text).is_err());
    }
}
