//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CallscrubConfig, DetectorBackend};
use super::secret_string_opt;
use crate::deid::pipeline::FallbackPolicy;
use crate::domain::errors::ScrubError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CallscrubConfig
/// 4. Applies environment variable overrides (CALLSCRUB_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ScrubError::Configuration`] if any step fails.
///
/// # Examples
///
/// ```no_run
/// use callscrub::config::loader::load_config;
///
/// let config = load_config("callscrub.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CallscrubConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ScrubError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ScrubError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Loads configuration from TOML text, with the same substitution, override
/// and validation steps as [`load_config`]
pub fn load_config_str(contents: &str) -> Result<CallscrubConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: CallscrubConfig = toml::from_str(&contents)
        .map_err(|e| ScrubError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ScrubError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ScrubError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(ScrubError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Read and parse an override variable, naming it in the error
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ScrubError::Configuration(format!("Invalid {name} value: {val}"))),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using CALLSCRUB_* prefix
///
/// Environment variables follow the pattern: CALLSCRUB_<SECTION>_<KEY>
/// For example: CALLSCRUB_DETECTOR_ENDPOINT, CALLSCRUB_BATCH_MAX_CONCURRENCY
fn apply_env_overrides(config: &mut CallscrubConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("CALLSCRUB_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Detector overrides
    if let Ok(val) = std::env::var("CALLSCRUB_DETECTOR_BACKEND") {
        config.detector.backend = match val.to_lowercase().as_str() {
            "presidio" => DetectorBackend::Presidio,
            "none" => DetectorBackend::None,
            _ => {
                return Err(ScrubError::Configuration(format!(
                    "Invalid CALLSCRUB_DETECTOR_BACKEND: {val}"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("CALLSCRUB_DETECTOR_ENDPOINT") {
        config.detector.endpoint = val;
    }
    if let Ok(val) = std::env::var("CALLSCRUB_DETECTOR_API_KEY") {
        config.detector.api_key = secret_string_opt(Some(val));
    }
    if let Some(timeout) = env_parse("CALLSCRUB_DETECTOR_TIMEOUT_MS")? {
        config.detector.timeout_ms = timeout;
    }
    if let Ok(val) = std::env::var("CALLSCRUB_DETECTOR_LANGUAGE") {
        config.detector.language = val;
    }
    if let Some(threshold) = env_parse("CALLSCRUB_DETECTOR_SCORE_THRESHOLD")? {
        config.detector.score_threshold = threshold;
    }
    if let Ok(val) = std::env::var("CALLSCRUB_DETECTOR_ENTITIES") {
        config.detector.entities = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    // Rules overrides
    if let Ok(val) = std::env::var("CALLSCRUB_RULES_LIBRARY_PATH") {
        config.rules.library_path = Some(PathBuf::from(val));
    }

    // Normalizer overrides
    if let Some(enabled) = env_parse("CALLSCRUB_NORMALIZER_ENABLED")? {
        config.normalizer.enabled = enabled;
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("CALLSCRUB_PIPELINE_ON_DETECTION_FAILURE") {
        config.pipeline.on_detection_failure = match val.to_lowercase().as_str() {
            "regex_only" => FallbackPolicy::RegexOnly,
            "abort" => FallbackPolicy::Abort,
            _ => {
                return Err(ScrubError::Configuration(format!(
                    "Invalid CALLSCRUB_PIPELINE_ON_DETECTION_FAILURE: {val}"
                )))
            }
        };
    }

    // Batch overrides
    if let Some(concurrency) = env_parse("CALLSCRUB_BATCH_MAX_CONCURRENCY")? {
        config.batch.max_concurrency = concurrency;
    }

    // Audit overrides
    if let Some(enabled) = env_parse("CALLSCRUB_AUDIT_ENABLED")? {
        config.audit.enabled = enabled;
    }
    if let Ok(val) = std::env::var("CALLSCRUB_AUDIT_LOG_PATH") {
        config.audit.log_path = PathBuf::from(val);
    }

    // Logging overrides
    if let Some(enabled) = env_parse("CALLSCRUB_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("CALLSCRUB_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
