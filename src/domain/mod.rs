//! Domain types shared by every layer of the compiler.
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, DeidError>`]:
//!
//! ```rust
//! use cdr_deid::domain::Result;
//! use cdr_deid::rules::Dialect;
//!
//! fn example() -> Result<Dialect> {
//!     // Errors are converted with the ? operator
//!     let dialect: Dialect = "bigquery".parse()?;
//!     Ok(dialect)
//! }
//! ```

pub mod errors;
pub mod result;

pub use errors::DeidError;
pub use result::Result;
