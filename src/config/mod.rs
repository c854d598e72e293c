//! Configuration management.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! `deid.toml` supports:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for optional settings
//! - `DEID_*` environment overrides
//! - Per-section validation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cdr_deid::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deid.toml")?;
//!
//! println!("Dialect: {}", config.deid.dialect);
//! println!("Pipeline: {}", config.deid.pipeline.describe());
//! for table in &config.tables {
//!     println!("{} <- {}", table.name, table.source_table());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level, dry run)
//! - [`CompilerConfig`] - The `[deid]` section: dialect, pipeline, rules file
//! - [`OutputConfig`] - SQL output directory and audit manifest
//! - [`TableConfig`] - One `[[tables]]` entry per compiled table
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [deid]
//! dialect = "bigquery"
//! pipeline = ["generalize", "compute", "suppress", "shift"]
//! rules_path = "${DEID_RULES_DIR}/rules.json"
//!
//! [output]
//! directory = "output"
//! manifest = true
//!
//! [[tables]]
//! name = "person"
//! source = "cdr.person"
//! info_path = "tables/person.json"
//! columns = ["person_id", "race_source_value", "birth_datetime"]
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CompilerConfig, DeidConfig, LoggingConfig, OutputConfig, TableConfig,
};
