// cdr-deid - De-identification rule compiler for OMOP CDR tables
// Copyright (c) 2025 Curation Contributors
// Licensed under the MIT License

//! # cdr-deid - De-identification rule compiler
//!
//! cdr-deid compiles declarative de-identification rules into dialect SQL
//! (SQLite, BigQuery, PostgreSQL) for copying OMOP CDR tables.
//!
//! ## Overview
//!
//! A rules file holds rule bodies per family:
//! - **Generalize** values into coarser categories
//! - **Suppress** columns, or rows matching a condition
//! - **Shift** dates by a random or looked-up offset
//! - **Compute** derived columns
//!
//! A table specification says which rules apply to which columns. The
//! compiler emits one SQL fragment per column plus row filters, which are
//! assembled into a `SELECT` over the source table.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Table compilation, query assembly, audit manifest
//! - [`deid`] - The rule compiler
//! - [`rules`] - Rule data model, dialect syntax tables, templates
//! - [`domain`] - Error and result types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use cdr_deid::deid::Deid;
//! use cdr_deid::rules::{Dialect, Pipeline, RuleStore, TableInfo};
//!
//! # fn main() -> Result<(), cdr_deid::domain::DeidError> {
//! let store = RuleStore::from_json(
//!     Pipeline::default(),
//!     r#"{"generalize": {"race": [{"apply": "REGEXP", "values": ["Native", "Asian"], "into": "Other"}]}}"#,
//! )?;
//! let info = TableInfo::from_json(
//!     r#"{"generalize": [{"rules": "@race", "fields": ["race"], "into": "Other"}]}"#,
//! )?;
//!
//! let mut deid = Deid::new(&store);
//! let fragments = deid.apply(&info, Dialect::Sqlite)?;
//! assert_eq!(
//!     fragments[0].apply,
//!     "CASE WHEN race REGEXP 'Native|Asian' THEN 'Other' ELSE race END AS race"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Row Suppression
//!
//! Row descriptors describe the rows to drop. The compiler stores the
//! negation, which describes the rows to keep:
//!
//! ```rust
//! use cdr_deid::deid::negate;
//!
//! assert_eq!(negate("state IN ('PR', 'GU')").unwrap(), "state NOT IN ('PR', 'GU')");
//! assert!(negate("age > 89").is_err());
//! ```
//!
//! Ordering comparisons are not negated; write the keep-condition yourself
//! and mark the descriptor `pre_negated`.
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`], carrying a [`domain::DeidError`].
//! Every error is fatal for the table being compiled; nothing is partially
//! compiled.

pub mod cli;
pub mod config;
pub mod core;
pub mod deid;
pub mod domain;
pub mod logging;
pub mod rules;
