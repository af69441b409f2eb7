//! Audit logger for de-identification runs

use crate::config::schema::AuditConfig;
use crate::deid::models::{DeidOutcome, MaskingStatus, RuleHit, Span};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Audit log entry
#[derive(Debug, Serialize)]
struct AuditLogEntry<'a> {
    timestamp: String,
    transcript_id: &'a str,
    status: &'a MaskingStatus,
    span_count: usize,
    rule_substitutions: usize,
    processing_time_ms: u64,
    spans: Vec<AuditSpan>,
    rule_hits: &'a [RuleHit],
}

/// Audit span entry (with hashed value)
#[derive(Debug, Serialize)]
struct AuditSpan {
    kind: String,
    source: String,
    start: usize,
    end: usize,
    confidence: f32,
    /// SHA-256 hash of the original value (never log plaintext PII)
    value_hash: String,
}

/// Append-only audit logger
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
}

impl AuditLogger {
    /// Create a new audit logger, creating the parent directory if needed
    pub fn new(log_path: PathBuf, json_format: bool) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
        })
    }

    /// Create a logger from configuration, or `None` when auditing is off
    pub fn from_config(config: &AuditConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(config.log_path.clone(), config.json_format).map(Some)
    }

    /// Audit log path
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log one de-identified transcript
    ///
    /// `original` must be the text the outcome's spans refer to.
    pub fn log_outcome(&self, original: &str, outcome: &DeidOutcome) -> Result<()> {
        let entry = AuditLogEntry {
            timestamp: outcome.timestamp.to_rfc3339(),
            transcript_id: outcome.transcript_id.as_str(),
            status: &outcome.status,
            span_count: outcome.spans.len(),
            rule_substitutions: outcome.total_rule_substitutions(),
            processing_time_ms: outcome.processing_time_ms,
            spans: outcome
                .spans
                .iter()
                .map(|s| audit_span(original, s))
                .collect(),
            rule_hits: &outcome.rule_hits,
        };

        self.write_entry(&entry)
    }

    /// Write an audit entry to the log file
    fn write_entry(&self, entry: &AuditLogEntry<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        if self.json_format {
            let json_line =
                serde_json::to_string(entry).context("Failed to serialize audit entry")?;
            writeln!(file, "{json_line}").context("Failed to write audit entry")?;
        } else {
            writeln!(
                file,
                "[{}] Transcript: {} | Status: {} | Spans: {} | Rule substitutions: {} | Time: {}ms",
                entry.timestamp,
                entry.transcript_id,
                entry.status.label(),
                entry.span_count,
                entry.rule_substitutions,
                entry.processing_time_ms
            )
            .context("Failed to write audit entry")?;
        }

        Ok(())
    }
}

fn audit_span(original: &str, span: &Span) -> AuditSpan {
    AuditSpan {
        kind: span.kind.to_string(),
        source: format!("{:?}", span.source).to_uppercase(),
        start: span.start,
        end: span.end,
        confidence: span.confidence,
        value_hash: hash_value(span.slice(original).unwrap_or_default()),
    }
}

/// Hash a masked value using SHA-256
fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    format!("{result:x}")
}
