//! Configuration schema types
//!
//! This module defines the structure of `callscrub.toml`. Every section is
//! optional; an empty file yields a working regex-plus-Presidio setup
//! pointed at a local analyzer.

use crate::config::SecretString;
use crate::deid::models::EntityKind;
use crate::deid::normalizer::DEFAULT_MAPPING;
use crate::deid::pipeline::FallbackPolicy;
use crate::deid::resolver::PriorityTable;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Entity detection backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    /// Presidio Analyzer REST service
    #[default]
    Presidio,
    /// No model; the rule layer alone masks the text
    None,
}

impl std::fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Presidio => write!(f, "presidio"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Main Callscrub configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallscrubConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Entity detector settings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Overlap resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Placeholder overrides keyed by entity kind
    #[serde(default)]
    pub placeholders: HashMap<String, String>,

    /// Rule library selection
    #[serde(default)]
    pub rules: RulesConfig,

    /// Placeholder normalization
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Batch processing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Audit trail
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CallscrubConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.detector.validate()?;
        self.resolver.validate()?;

        for (kind, token) in &self.placeholders {
            kind.parse::<EntityKind>()
                .map_err(|e| format!("placeholders: {e}"))?;
            if token.trim().is_empty() {
                return Err(format!("placeholders.{kind} cannot be empty"));
            }
        }

        self.rules.validate()?;
        self.batch.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Entity detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Backend (presidio or none)
    #[serde(default)]
    pub backend: DetectorBackend,

    /// Base URL of the Presidio Analyzer
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Optional API key sent as a bearer token
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Per-transcript detection timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Default language tag
    #[serde(default = "default_language")]
    pub language: String,

    /// Minimum score the analyzer should report
    #[serde(default)]
    pub score_threshold: f32,

    /// Entity kinds to request
    #[serde(default = "default_entities")]
    pub entities: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: DetectorBackend::default(),
            endpoint: default_endpoint(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            language: default_language(),
            score_threshold: 0.0,
            entities: default_entities(),
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.backend == DetectorBackend::Presidio {
            if self.endpoint.is_empty() {
                return Err("detector.endpoint cannot be empty".to_string());
            }
            if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
                return Err("detector.endpoint must start with http:// or https://".to_string());
            }
        }

        if let Some(ref key) = self.api_key {
            if key.expose_secret().is_blank() {
                return Err("detector.api_key cannot be blank".to_string());
            }
        }

        if self.timeout_ms == 0 {
            return Err("detector.timeout_ms must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err("detector.score_threshold must be between 0.0 and 1.0".to_string());
        }

        self.language
            .parse::<crate::domain::LanguageTag>()
            .map_err(|e| format!("detector.language: {e}"))?;

        if self.entities.is_empty() {
            return Err("detector.entities cannot be empty".to_string());
        }
        self.entity_kinds()?;
        Ok(())
    }

    /// Parsed entity kinds, duplicates removed, in configured order
    pub fn entity_kinds(&self) -> Result<Vec<EntityKind>, String> {
        let mut kinds = Vec::with_capacity(self.entities.len());
        for name in &self.entities {
            let kind = name
                .parse::<EntityKind>()
                .map_err(|e| format!("detector.entities: {e}"))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

/// Overlap resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Entity kinds in descending priority
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
        }
    }
}

impl ResolverConfig {
    fn validate(&self) -> Result<(), String> {
        PriorityTable::from_names(&self.priority)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Rule library configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Path to a TOML rule library; the built-in library when unset
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

impl RulesConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref path) = self.library_path {
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                return Err(format!(
                    "Rule library must be a TOML file: {}",
                    path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Placeholder normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Normalize placeholders in pipeline output
    #[serde(default)]
    pub enabled: bool,

    /// Collapse whitespace runs before normalizing
    #[serde(default = "default_true")]
    pub collapse_whitespace: bool,

    /// Token to filler mapping
    #[serde(default = "default_mapping")]
    pub mapping: BTreeMap<String, String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            collapse_whitespace: true,
            mapping: default_mapping(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// What to do when entity detection fails
    #[serde(default)]
    pub on_detection_failure: FallbackPolicy,
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum transcripts processed concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("batch.max_concurrency must be > 0".to_string());
        }
        if self.max_concurrency > 256 {
            return Err("batch.max_concurrency cannot exceed 256".to_string());
        }
        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON format for audit logs
    #[serde(default = "default_true")]
    pub json_format: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
            json_format: true,
        }
    }
}

impl AuditConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            return Err("audit.log_path cannot be empty when audit is enabled".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty".to_string());
        }
        Ok(())
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:5002".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_language() -> String {
    "en".to_string()
}

fn default_entities() -> Vec<String> {
    [
        EntityKind::Person,
        EntityKind::PhoneNumber,
        EntityKind::EmailAddress,
        EntityKind::DateTime,
        EntityKind::Location,
        EntityKind::MedicalLicense,
        EntityKind::CreditCard,
        EntityKind::IbanCode,
        EntityKind::UsSsn,
        EntityKind::Nrp,
        EntityKind::Organization,
    ]
    .iter()
    .map(|k| k.as_str().to_string())
    .collect()
}

fn default_priority() -> Vec<String> {
    PriorityTable::default()
        .kinds()
        .iter()
        .map(|k| k.as_str().to_string())
        .collect()
}

fn default_mapping() -> BTreeMap<String, String> {
    DEFAULT_MAPPING
        .iter()
        .map(|(t, f)| (t.to_string(), f.to_string()))
        .collect()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/callscrub_audit.jsonl")
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
