//! Configuration schema types
//!
//! This module defines the `deid.toml` structure. Every section validates
//! itself and reports the first problem as a plain message.

use crate::rules::{Dialect, Pipeline};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Compiler settings
    pub deid: CompilerConfig,

    /// Where compiled SQL and the audit manifest go
    #[serde(default)]
    pub output: OutputConfig,

    /// Tables to compile
    #[serde(default)]
    pub tables: Vec<TableConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeidConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.deid.validate()?;
        self.output.validate()?;

        let mut names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !names.insert(table.name.as_str()) {
                return Err(format!("Table '{}' is configured more than once", table.name));
            }
        }

        self.logging.validate()?;
        Ok(())
    }

    /// Table configuration by name
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (compile and print, write nothing)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// The `[deid]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Target SQL dialect
    #[serde(default)]
    pub dialect: Dialect,

    /// Family order; `suppress` must precede `shift`
    #[serde(default)]
    pub pipeline: Pipeline,

    /// Rules JSON document (`{family: {rule_id: [entry, ...]}}`)
    pub rules_path: String,
}

impl CompilerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.rules_path.trim().is_empty() {
            return Err("deid.rules_path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// The `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `<table>.sql` per compiled table
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Write the audit manifest
    #[serde(default = "default_true")]
    pub manifest: bool,

    /// Manifest path (JSON lines)
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
}

impl OutputConfig {
    fn validate(&self) -> Result<(), String> {
        if self.directory.trim().is_empty() {
            return Err("output.directory cannot be empty".to_string());
        }
        if self.manifest && self.manifest_path.trim().is_empty() {
            return Err("output.manifest_path cannot be empty when manifest = true".to_string());
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            manifest: true,
            manifest_path: default_manifest_path(),
        }
    }
}

/// One `[[tables]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Output table name
    pub name: String,

    /// Fully qualified source table; defaults to `name`
    #[serde(default)]
    pub source: Option<String>,

    /// Table specification JSON (`{family: [descriptor, ...]}`)
    pub info_path: String,

    /// Source columns, in output order
    pub columns: Vec<String>,
}

impl TableConfig {
    /// Table selected from
    pub fn source_table(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("tables.name cannot be empty".to_string());
        }
        if self.info_path.trim().is_empty() {
            return Err(format!("tables.info_path of '{}' cannot be empty", self.name));
        }
        if self.columns.is_empty() {
            return Err(format!("Table '{}' must list at least one column", self.name));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(format!(
                    "Column '{}' is listed twice in table '{}'",
                    column, self.name
                ));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rolling period: `daily` or `hourly`
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Rolled files kept in `local_path`; older ones are deleted
    #[serde(default = "default_local_max_files")]
    pub local_max_files: usize,
}

impl LoggingConfig {
    /// Console output only
    pub fn console_only() -> Self {
        Self {
            local_enabled: false,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_files == 0 {
            return Err("logging.local_max_files must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_files: default_local_max_files(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_manifest_path() -> String {
    "output/manifest.jsonl".to_string()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_files() -> usize {
    14
}
