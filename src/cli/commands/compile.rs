//! Compile command implementation
//!
//! This module implements the `compile` command: load the rules once, compile
//! every configured table, then write `<table>.sql` files and the manifest.

use crate::config::{load_config, DeidConfig, TableConfig};
use crate::core::audit::ManifestLogger;
use crate::core::compile::{resolve_path, TableCompiler, TableOutcome};
use crate::log_error_with_context;
use crate::rules::Dialect;
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Compile only these tables (comma-separated)
    #[arg(long)]
    pub table: Option<String>,

    /// Dry run mode - print the SQL instead of writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Override the configured dialect (sqlite, bigquery, postgresql)
    #[arg(long)]
    pub dialect: Option<String>,
}

impl CompileArgs {
    /// Execute the compile command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting compile command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(e, "Failed to load configuration");
                eprintln!("❌ {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if let Some(dialect) = &self.dialect {
            match dialect.parse::<Dialect>() {
                Ok(d) => {
                    tracing::info!(dialect = %d, "Overriding dialect from CLI");
                    config.deid.dialect = d;
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    return Ok(2);
                }
            }
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        let tables = match self.selected_tables(&config) {
            Ok(t) => t,
            Err(unknown) => {
                eprintln!("❌ Unknown table(s): {}", unknown.join(", "));
                return Ok(2);
            }
        };

        let base_dir = config_dir(config_path);
        let compiler = match TableCompiler::new(&config, &base_dir) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(e, "Failed to load rules");
                eprintln!("❌ Failed to load rules: {e}");
                return Ok(2);
            }
        };

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no files will be written");
            println!("🔍 DRY RUN MODE - SQL is printed, nothing is written");
            println!();
        }

        println!(
            "🚀 Compiling {} table(s) for {}...",
            tables.len(),
            config.deid.dialect
        );
        println!();

        let mut summary = compiler.compile_all(tables.iter().copied());

        if config.application.dry_run {
            for outcome in &summary.outcomes {
                println!("-- {} ({})", outcome.table, outcome.dialect);
                println!("{};", outcome.sql);
                println!();
            }
        } else {
            let directory = resolve_path(&base_dir, &config.output.directory);
            let manifest = ManifestLogger::new(
                resolve_path(&base_dir, &config.output.manifest_path),
                config.output.manifest,
            )?;

            // A table whose output cannot be written counts as failed
            let mut written = Vec::with_capacity(summary.outcomes.len());
            for outcome in std::mem::take(&mut summary.outcomes) {
                match write_outcome(&outcome, &directory, &manifest) {
                    Ok(path) => {
                        println!("  ✅ {} -> {}", outcome.table, path.display());
                        written.push(outcome);
                    }
                    Err(e) => {
                        log_error_with_context!(e, "Failed to write compiled table");
                        println!("  ❌ {}: {e:#}", outcome.table);
                        summary.add_error(outcome.table.as_str(), format!("{e:#}"));
                    }
                }
            }
            summary.outcomes = written;
            println!();
        }
        summary.log_summary();

        println!("📊 Compile Summary:");
        println!("  Tables: {}", summary.total_tables());
        println!("  Compiled: {}", summary.outcomes.len());
        println!("  Failed: {}", summary.errors.len());
        println!("  Fragments: {}", summary.total_fragments());
        println!("  Row filters: {}", summary.total_row_filters());
        println!("  Duration: {:.3}s", summary.duration.as_secs_f64());
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in &summary.errors {
                println!("  - {}: {}", error.table, error.message);
            }
            println!();
        }

        let exit_code = if summary.is_successful() {
            println!("✅ Compilation completed successfully!");
            0
        } else if summary.outcomes.is_empty() {
            println!("❌ No table compiled");
            5
        } else {
            println!("⚠️  Compilation completed with failures");
            1 // Partial success
        };

        Ok(exit_code)
    }

    /// Tables named by `--table`, or every configured table
    ///
    /// Returns the unknown names on failure.
    fn selected_tables<'c>(
        &self,
        config: &'c DeidConfig,
    ) -> Result<Vec<&'c TableConfig>, Vec<String>> {
        let Some(names) = &self.table else {
            return Ok(config.tables.iter().collect());
        };

        let mut selected = Vec::new();
        let mut unknown = Vec::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match config.table(name) {
                Some(table) => selected.push(table),
                None => unknown.push(name.to_string()),
            }
        }

        if unknown.is_empty() {
            Ok(selected)
        } else {
            Err(unknown)
        }
    }
}

/// Write the SQL file, then its manifest entry
fn write_outcome(
    outcome: &TableOutcome,
    directory: &Path,
    manifest: &ManifestLogger,
) -> anyhow::Result<PathBuf> {
    let path = outcome
        .write_to(directory)
        .with_context(|| format!("Failed to write {}.sql", outcome.table))?;
    manifest.record(outcome)?;
    Ok(path)
}

/// Directory holding the configuration file
pub(crate) fn config_dir(config_path: &str) -> PathBuf {
    match Path::new(config_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
