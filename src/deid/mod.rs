//! De-identification rule compiler
//!
//! [`Deid`] turns a table's rule specification into SQL [`Fragment`]s, one
//! operation per rule family:
//!
//! - `generalize`: conditional projection mapping matched values to coarser ones
//! - `suppress`: blanked projections, or row filters in the [`RowSuppressionFilterSet`]
//! - `shift`: date arithmetic through a rule template, gated on row filters
//! - `compute`: a derived column from a rule template
//!
//! Fragments carry their `AS <column>` alias; row filters are returned through
//! [`Deid::into_filters`] for the query's `WHERE` clause.

pub mod compiler;
pub mod compute;
pub mod fragment;
pub mod generalize;
pub mod negate;
pub mod shift;
pub mod suppress;

pub use compiler::Deid;
pub use fragment::{Fragment, RowSuppressionFilterSet, SuppressionFilter};
pub use negate::negate;
