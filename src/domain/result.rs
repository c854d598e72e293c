//! Result type alias
//!
//! A convenience alias that uses [`DeidError`] as the error type.

use super::errors::DeidError;

/// Result type alias for de-identification operations
///
/// # Examples
///
/// ```
/// use cdr_deid::domain::result::Result;
/// use cdr_deid::domain::errors::DeidError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(DeidError::UnknownDialect("oracle".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, DeidError>;
