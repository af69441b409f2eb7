//! CLI command implementations
//!
//! Exit codes shared by every command:
//!
//! - `0` success
//! - `1` partial result (regex-only masking, failed transcripts, cancellation)
//! - `2` configuration error
//! - `5` fatal error

pub mod batch;
pub mod init;
pub mod scrub;
pub mod validate;

use crate::config::{load_config, load_config_str, CallscrubConfig, DetectorBackend};
use std::path::Path;

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_PARTIAL: i32 = 1;
pub(crate) const EXIT_CONFIG: i32 = 2;
pub(crate) const EXIT_FATAL: i32 = 5;

/// Load the configuration file, or defaults plus environment overrides when
/// the file does not exist
pub(crate) fn load_or_default(config_path: &str) -> crate::domain::Result<CallscrubConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::warn!(
            config_path = %config_path,
            "Configuration file not found, using defaults"
        );
        load_config_str("")
    }
}

/// Command-line switches shared by `scrub` and `batch`
pub(crate) fn apply_pipeline_flags(
    config: &mut CallscrubConfig,
    normalize: bool,
    regex_only: bool,
) {
    if normalize {
        tracing::info!("Enabling placeholder normalization from CLI");
        config.normalizer.enabled = true;
    }
    if regex_only {
        tracing::info!("Disabling entity detection from CLI");
        config.detector.backend = DetectorBackend::None;
    }
}
