//! Domain error types
//!
//! This module defines the error hierarchy for Callscrub.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Callscrub error type
///
/// This is the primary error type used throughout the application.
/// It wraps the de-identification errors and adds the ambient failure modes
/// (configuration, I/O, serialization).
#[derive(Debug, Error)]
pub enum ScrubError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// De-identification pipeline errors
    #[error("De-identification error: {0}")]
    Deid(#[from] DeidError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// De-identification pipeline errors
///
/// `DetectionUnavailable` is recoverable: the pipeline may continue in
/// regex-only mode. `InvalidRuleConfig` is raised while loading configuration
/// and is never produced per transcript.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeidError {
    /// Entity detection service unreachable, failing, or timed out
    #[error("Entity detection unavailable: {0}")]
    DetectionUnavailable(String),

    /// Malformed rule, replacement template, or placeholder mapping
    #[error("Invalid rule configuration '{rule}': {reason}")]
    InvalidRuleConfig { rule: String, reason: String },

    /// Input is not valid text in the declared encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A span does not address a valid region of the text
    #[error("Invalid span {start}..{end} for text of {len} bytes")]
    InvalidSpan { start: usize, end: usize, len: usize },

    /// A rule failed while matching (e.g. backtracking limit exceeded)
    #[error("Rule '{rule}' failed during execution: {reason}")]
    RuleExecution { rule: String, reason: String },
}

impl DeidError {
    /// Shorthand for building an `InvalidRuleConfig` error
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRuleConfig {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Whether the pipeline may proceed without the failed stage
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DetectionUnavailable(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for ScrubError {
    fn from(err: std::io::Error) -> Self {
        ScrubError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ScrubError {
    fn from(err: serde_json::Error) -> Self {
        ScrubError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ScrubError {
    fn from(err: toml::de::Error) -> Self {
        ScrubError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_error_display() {
        let err = ScrubError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_deid_error_conversion() {
        let deid_err = DeidError::DetectionUnavailable("connection refused".to_string());
        let scrub_err: ScrubError = deid_err.into();
        assert!(matches!(scrub_err, ScrubError::Deid(_)));
    }

    #[test]
    fn test_invalid_rule_display() {
        let err = DeidError::invalid_rule("zip", "unclosed group");
        assert_eq!(
            err.to_string(),
            "Invalid rule configuration 'zip': unclosed group"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(DeidError::DetectionUnavailable("timeout".to_string()).is_recoverable());
        assert!(!DeidError::invalid_rule("x", "y").is_recoverable());
        assert!(!DeidError::Encoding("bad byte".to_string()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let scrub_err: ScrubError = io_err.into();
        assert!(matches!(scrub_err, ScrubError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let scrub_err: ScrubError = json_err.into();
        assert!(matches!(scrub_err, ScrubError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let scrub_err: ScrubError = toml_err.into();
        assert!(matches!(scrub_err, ScrubError::Configuration(_)));
        assert!(scrub_err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = ScrubError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
        let err = DeidError::Encoding("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
