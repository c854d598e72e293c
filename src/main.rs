// cdr-deid - De-identification rule compiler for OMOP CDR tables
// Copyright (c) 2025 Curation Contributors
// Licensed under the MIT License

use cdr_deid::cli::{Cli, Commands};
use cdr_deid::config::{load_config, LoggingConfig};
use cdr_deid::logging::init_logging;
use clap::Parser;
use std::process;

fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Compile runs log to file when the configuration asks for it; other
    // commands and unreadable configurations log to the console only
    let logging_config = match &cli.command {
        Commands::Compile(_) => load_config(&cli.config)
            .map(|c| c.logging)
            .unwrap_or_else(|_| LoggingConfig::console_only()),
        _ => LoggingConfig::console_only(),
    };
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let _guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "cdr-deid - De-identification rule compiler"
    );

    let exit_code = match execute_command(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    drop(_guard);
    process::exit(exit_code);
}

/// Execute the CLI command
fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Compile(args) => args.execute(&cli.config),
        Commands::ValidateConfig(args) => args.execute(&cli.config),
        Commands::Init(args) => args.execute(),
    }
}
