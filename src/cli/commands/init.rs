//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "deid.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing cdr-deid configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Write the rules file named by deid.rules_path");
                println!("  3. Write one table specification per [[tables]] entry");
                println!("  4. Validate configuration: cdr-deid validate-config");
                println!("  5. Compile: cdr-deid compile --dry-run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# cdr-deid Configuration File
# De-identification rule compiler for OMOP CDR tables

[application]
log_level = "info"
dry_run = false

[deid]
dialect = "bigquery"
pipeline = ["generalize", "compute", "suppress", "shift"]
rules_path = "rules.json"

[output]
directory = "output"
manifest = true
manifest_path = "output/manifest.jsonl"

[[tables]]
name = "person"
source = "cdr.person"
info_path = "tables/person.json"
columns = ["person_id", "gender_source_value", "race_source_value", "birth_datetime"]

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
local_max_files = 14
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# cdr-deid Configuration File
# De-identification rule compiler for OMOP CDR tables
#
# This file contains all configuration options with examples and explanations.
# Relative paths are resolved against the directory holding this file.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (print SQL, write nothing)
dry_run = false

# ============================================================================
# Compiler Settings
# ============================================================================
[deid]
# Target SQL dialect: sqlite | bigquery | postgresql
dialect = "bigquery"

# Family order. suppress must run before shift: shifting is only emitted
# once a row suppression filter exists for the table.
pipeline = ["generalize", "compute", "suppress", "shift"]

# Rules file: {"<family>": {"<rule_id>": [entry, ...]}}
# Example:
#   {"generalize": {"race": [{"apply": "REGEXP", "values": ["Native", "Asian"], "into": "Other"}]}}
rules_path = "${DEID_RULES_DIR}/rules.json"

# ============================================================================
# Output
# ============================================================================
[output]
# One <table>.sql file per compiled table
directory = "output"

# JSON-lines manifest with the SHA-256 of every generated statement
manifest = true
manifest_path = "output/manifest.jsonl"

# ============================================================================
# Tables
# ============================================================================
# Each table names its source, its columns in output order, and a table
# specification: {"<family>": [descriptor, ...]}
# Example:
#   {
#     "generalize": [{"rules": "@race", "fields": ["race_source_value"], "into": "Other"}],
#     "suppress": [{"fields": ["zip"]}, {"on": "age > 89", "pre_negated": false}]
#   }
[[tables]]
name = "person"
source = "cdr.person"
info_path = "tables/person.json"
columns = ["person_id", "gender_source_value", "race_source_value", "birth_datetime"]

[[tables]]
name = "observation"
source = "cdr.observation"
info_path = "tables/observation.json"
columns = ["observation_id", "person_id", "observation_date", "value_as_string"]

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local JSON file logging
local_enabled = false

# Local log file path
local_path = "logs"

# Rolling period (daily or hourly)
local_rotation = "daily"

# Rolled log files to keep
local_max_files = 14
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "deid.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "deid.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config_parses() {
        let config = parse_config(&InitArgs::generate_minimal_config()).unwrap();
        assert_eq!(config.tables.len(), 1);
        assert_eq!(config.tables[0].source_table(), "cdr.person");
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("# cdr-deid Configuration File"));
        assert!(config.contains("[[tables]]"));
        assert!(config.contains("pipeline"));
    }

    #[test]
    fn test_existing_file_needs_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deid.toml");
        std::fs::write(&path, "").unwrap();

        let mut args = InitArgs {
            output: path.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().unwrap(), 2);

        args.force = true;
        assert_eq!(args.execute().unwrap(), 0);
        assert!(std::fs::read_to_string(&path).unwrap().contains("[deid]"));
    }
}
