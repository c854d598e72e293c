//! Table compilation driver
//!
//! Loads the rule store once, then compiles every configured table with a
//! fresh [`Deid`] so row filters never leak between tables.

use crate::config::{DeidConfig, TableConfig};
use crate::core::compile::query::assemble_query;
use crate::core::compile::summary::CompileSummary;
use crate::deid::{Deid, Fragment, RowSuppressionFilterSet};
use crate::domain::{DeidError, Result};
use crate::rules::{Dialect, RuleStore, TableInfo};
use crate::{log_compile_complete, log_compile_start};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Result of compiling one table
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: String,
    pub dialect: Dialect,
    /// Assembled `SELECT` statement
    pub sql: String,
    pub fragments: Vec<Fragment>,
    pub filters: RowSuppressionFilterSet,
    pub duration: Duration,
}

impl TableOutcome {
    /// Distinct provenance labels of fragments and row filters
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .fragments
            .iter()
            .map(|f| f.label.clone())
            .chain(self.filters.iter().map(|f| f.label.clone()))
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Write `<directory>/<table>.sql`, creating the directory if needed
    pub fn write_to(&self, directory: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(format!("{}.sql", self.table));
        std::fs::write(&path, format!("{}\n", self.sql))?;
        Ok(path)
    }
}

/// Compiles configured tables against one rule store
#[derive(Debug)]
pub struct TableCompiler {
    store: RuleStore,
    dialect: Dialect,
    base_dir: PathBuf,
}

impl TableCompiler {
    /// Load the rules file named by the configuration
    ///
    /// Relative paths in the configuration are resolved against `base_dir`,
    /// normally the directory holding the configuration file.
    pub fn new(config: &DeidConfig, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let rules_path = resolve_path(&base_dir, &config.deid.rules_path);
        let store = RuleStore::from_file(config.deid.pipeline.clone(), &rules_path)?;

        tracing::info!(
            rules_path = %rules_path.display(),
            rules = store.len(),
            pipeline = %config.deid.pipeline.describe(),
            "Rule store loaded"
        );

        Ok(Self {
            store,
            dialect: config.deid.dialect,
            base_dir,
        })
    }

    pub fn from_store(store: RuleStore, dialect: Dialect) -> Self {
        Self {
            store,
            dialect,
            base_dir: PathBuf::from("."),
        }
    }

    /// Use another dialect for subsequent compilations
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Load a table's specification file and compile it
    pub fn compile_table(&self, table: &TableConfig) -> Result<TableOutcome> {
        let info_path = resolve_path(&self.base_dir, &table.info_path);
        let info = TableInfo::from_file(&info_path).map_err(|e| match e {
            DeidError::Serialization(msg) => DeidError::Configuration(format!(
                "Invalid table specification {}: {}",
                info_path.display(),
                msg
            )),
            other => other,
        })?;
        self.compile_info(table, &info)
    }

    /// Compile an already loaded specification
    pub fn compile_info(&self, table: &TableConfig, info: &TableInfo) -> Result<TableOutcome> {
        let start = Instant::now();
        log_compile_start!(table.name, self.dialect);

        let mut deid = Deid::new(&self.store).for_table(table.source_table());
        let fragments = deid.apply(info, self.dialect)?;
        let filters = deid.into_filters();

        let sql = assemble_query(table.source_table(), &table.columns, &fragments, &filters);
        let duration = start.elapsed();
        log_compile_complete!(table.name, fragments.len(), filters.len(), duration);

        Ok(TableOutcome {
            table: table.name.clone(),
            dialect: self.dialect,
            sql,
            fragments,
            filters,
            duration,
        })
    }

    /// Compile every table, continuing past failures
    pub fn compile_all<'t>(
        &self,
        tables: impl IntoIterator<Item = &'t TableConfig>,
    ) -> CompileSummary {
        let start = Instant::now();
        let mut summary = CompileSummary::new();

        for table in tables {
            match self.compile_table(table) {
                Ok(outcome) => summary.add_outcome(outcome),
                Err(e) => {
                    tracing::error!(table = %table.name, error = %e, "Table compilation failed");
                    summary.add_error(table.name.as_str(), e.to_string());
                }
            }
        }

        summary.with_duration(start.elapsed())
    }
}

/// Resolve `path` against `base` unless it is absolute
pub fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
