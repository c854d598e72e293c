//! Audit manifest for compiled tables
//!
//! One JSON line per compiled table. The generated SQL itself is not logged,
//! only its SHA-256 digest, so the manifest can be kept next to shared output.

use crate::core::compile::TableOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Manifest entry
#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    timestamp: String,
    table: &'a str,
    dialect: &'a str,
    fragments: usize,
    row_filters: usize,
    labels: Vec<String>,
    sql_sha256: String,
    duration_ms: u64,
}

/// Appends compile records to the manifest file
pub struct ManifestLogger {
    path: PathBuf,
    enabled: bool,
}

impl ManifestLogger {
    /// Create a new manifest logger
    pub fn new(path: PathBuf, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create manifest directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self { path, enabled })
    }

    /// Record one compiled table
    pub fn record(&self, outcome: &TableOutcome) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = ManifestEntry {
            timestamp: Utc::now().to_rfc3339(),
            table: &outcome.table,
            dialect: outcome.dialect.as_str(),
            fragments: outcome.fragments.len(),
            row_filters: outcome.filters.len(),
            labels: outcome.labels(),
            sql_sha256: sql_digest(&outcome.sql),
            duration_ms: u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open manifest: {}", self.path.display()))?;

        let json_line = serde_json::to_string(&entry).context("Failed to serialize manifest entry")?;
        writeln!(file, "{json_line}").context("Failed to write manifest entry")?;

        tracing::debug!(table = %outcome.table, manifest = %self.path.display(), "Manifest entry written");
        Ok(())
    }
}

/// Hex SHA-256 of generated SQL
pub fn sql_digest(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    format!("{:x}", hasher.finalize())
}
