//! Rule data model
//!
//! Everything the compiler reads but never mutates:
//!
//! - [`RuleFamily`] and [`Pipeline`]: which transformation families run, in which order
//! - [`RuleEntry`] and [`Literal`]: the clauses inside a rule body
//! - [`Dialect`] and [`DialectSyntax`]: per-backend SQL tokens and templates
//! - [`RuleStore`]: rule bodies keyed by `(family, rule_id)`
//! - [`descriptor`]: per-table descriptors, their shape check and resolution
//! - [`template`]: named-placeholder substitution
//!
//! # Rule documents
//!
//! ```json
//! {
//!   "generalize": {
//!     "race": [{"apply": "REGEXP", "values": ["Native", "Asian"], "into": "Other"}]
//!   },
//!   "shift": {
//!     "date": [{"apply": "DATE_SUB(:FIELD, INTERVAL :RANDOM DAY)"}]
//!   }
//! }
//! ```

pub mod descriptor;
pub mod dialect;
pub mod entry;
pub mod family;
pub mod store;
pub mod template;

pub use descriptor::{Descriptor, ResolvedCall, RuleArgs, RuleRef, RuleSource, TableInfo};
pub use dialect::{Conditional, Dialect, DialectSyntax};
pub use entry::{Literal, Matcher, OnFilter, RuleEntry};
pub use family::{Pipeline, RuleFamily};
pub use store::RuleStore;
pub use template::SqlTemplate;
