//! Result type alias for Callscrub
//!
//! This module provides a convenient Result type alias that uses ScrubError
//! as the error type.

use super::errors::ScrubError;

/// Result type alias for Callscrub operations
///
/// # Examples
///
/// ```
/// use callscrub::domain::result::Result;
/// use callscrub::domain::errors::ScrubError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ScrubError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ScrubError>;
