//! CLI interface and argument parsing
//!
//! This module provides the command-line interface using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// cdr-deid - De-identification rule compiler for OMOP CDR tables
#[derive(Parser, Debug)]
#[command(name = "cdr-deid")]
#[command(version, about, long_about = None)]
#[command(author = "Curation Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "deid.toml", env = "DEID_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DEID_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile de-identification rules into SQL for the configured tables
    Compile(commands::compile::CompileArgs),

    /// Validate configuration, rules and table specifications
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
