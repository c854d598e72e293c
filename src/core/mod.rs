//! Orchestration around the rule compiler.
//!
//! # Modules
//!
//! - [`compile`] - Per-table compilation and query assembly
//! - [`audit`] - JSON-lines manifest of compiled tables
//!
//! # Compile Workflow
//!
//! 1. **Load Rules**: Read the rules file into a [`RuleStore`](crate::rules::RuleStore)
//! 2. **Compile**: Run a fresh [`Deid`](crate::deid::Deid) over each table specification
//! 3. **Assemble**: Splice fragments and row filters into a `SELECT`
//! 4. **Record**: Write `<table>.sql` and a manifest entry
//!
//! # Example
//!
//! ```rust,no_run
//! use cdr_deid::config::load_config;
//! use cdr_deid::core::compile::TableCompiler;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deid.toml")?;
//! let compiler = TableCompiler::new(&config, ".")?;
//!
//! let summary = compiler.compile_all(&config.tables);
//! for outcome in &summary.outcomes {
//!     println!("{}:\n{}", outcome.table, outcome.sql);
//! }
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod compile;
