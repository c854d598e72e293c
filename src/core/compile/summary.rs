//! Compile summary and reporting
//!
//! This module defines structures for tracking and reporting compile results.

use crate::core::compile::session::TableOutcome;
use std::time::Duration;

/// A table that failed to compile
#[derive(Debug, Clone)]
pub struct CompileError {
    /// Table name
    pub table: String,

    /// Error message
    pub message: String,
}

/// Summary of a compile run over several tables
#[derive(Debug, Clone, Default)]
pub struct CompileSummary {
    /// Successfully compiled tables, in configuration order
    pub outcomes: Vec<TableOutcome>,

    /// Tables that failed
    pub errors: Vec<CompileError>,

    /// Duration of the whole run
    pub duration: Duration,
}

impl CompileSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_outcome(&mut self, outcome: TableOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn add_error(&mut self, table: impl Into<String>, message: impl Into<String>) {
        self.errors.push(CompileError {
            table: table.into(),
            message: message.into(),
        });
    }

    pub fn total_tables(&self) -> usize {
        self.outcomes.len() + self.errors.len()
    }

    pub fn total_fragments(&self) -> usize {
        self.outcomes.iter().map(|o| o.fragments.len()).sum()
    }

    pub fn total_row_filters(&self) -> usize {
        self.outcomes.iter().map(|o| o.filters.len()).sum()
    }

    /// Check if every table compiled
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total_tables = self.total_tables(),
            compiled = self.outcomes.len(),
            failed = self.errors.len(),
            fragments = self.total_fragments(),
            row_filters = self.total_row_filters(),
            duration_ms = self.duration.as_millis(),
            "Compilation completed"
        );

        for error in &self.errors {
            tracing::warn!(table = %error.table, message = %error.message, "Table failed");
        }
    }
}
