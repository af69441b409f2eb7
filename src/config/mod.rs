//! Configuration management for Callscrub.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Callscrub reads `callscrub.toml` with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CALLSCRUB_<SECTION>_<KEY>` environment overrides
//! - Default values for every section
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use callscrub::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("callscrub.toml")?;
//!
//! println!("Analyzer: {}", config.detector.endpoint);
//! println!("Concurrency: {}", config.batch.max_concurrency);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`DetectorConfig`] - Entity detection backend and analyzer connection
//! - [`ResolverConfig`] - Entity priority for overlapping spans
//! - [`RulesConfig`] - Rule library location
//! - [`NormalizerConfig`] - Placeholder fillers
//! - [`PipelineConfig`] - Detection failure policy
//! - [`BatchConfig`] - Batch concurrency
//! - [`AuditConfig`] - Audit log
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [detector]
//! backend = "presidio"
//! endpoint = "http://localhost:5002"
//! api_key = "${CALLSCRUB_ANALYZER_KEY}"
//! timeout_ms = 5000
//!
//! [pipeline]
//! on_detection_failure = "regex_only"
//!
//! [batch]
//! max_concurrency = 4
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, AuditConfig, BatchConfig, CallscrubConfig, DetectorBackend,
    DetectorConfig, LoggingConfig, NormalizerConfig, PipelineConfig, ResolverConfig, RulesConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
