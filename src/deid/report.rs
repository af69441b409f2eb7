//! Batch reporting
//!
//! Aggregate statistics for a batch run: how many transcripts were fully
//! masked, masked by rules only, failed, or skipped, plus span counts per
//! entity kind and substitution counts per rule. Reports never contain
//! transcript text.

use crate::deid::batch::BatchOutcome;
use crate::deid::models::{DeidOutcome, EntityKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Batch statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Transcripts submitted
    pub total_transcripts: usize,

    /// Transcripts masked by both layers
    pub full: usize,

    /// Transcripts masked by the rule layer only
    pub regex_only: usize,

    /// Transcripts that failed
    pub failed: usize,

    /// Transcripts not processed because the run was cancelled
    pub skipped: usize,

    /// Whether the run was cancelled
    pub cancelled: bool,

    /// Resolved spans by entity kind
    pub spans_by_kind: BTreeMap<EntityKind, usize>,

    /// Substitutions by rule name
    pub rule_hits: BTreeMap<String, usize>,

    /// Failure and fallback messages
    pub warnings: Vec<String>,

    /// Processing statistics
    pub stats: ProcessingStats,
}

/// Processing statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    /// Average processing time per completed transcript (ms)
    pub avg_processing_time_ms: u64,

    /// Total processing time (ms)
    pub total_processing_time_ms: u64,
}

impl BatchReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a report from a finished batch
    pub fn from_batch(batch: &BatchOutcome) -> Self {
        let mut report = Self::new();
        report.total_transcripts = batch.total;
        report.skipped = batch.skipped_count();
        report.cancelled = batch.cancelled;

        for item in &batch.items {
            match item.result {
                Ok(ref outcome) => report.add_outcome(outcome),
                Err(ref e) => {
                    report.failed += 1;
                    report.add_warning(format!("{}: {}", item.transcript_id, e));
                }
            }
        }
        report
    }

    /// Add one successful transcript
    pub fn add_outcome(&mut self, outcome: &DeidOutcome) {
        if outcome.status.is_full() {
            self.full += 1;
        } else {
            self.regex_only += 1;
            if let crate::deid::models::MaskingStatus::RegexOnly { ref reason } = outcome.status {
                self.add_warning(format!("{}: regex-only ({})", outcome.transcript_id, reason));
            }
        }

        for (kind, count) in &outcome.stats_by_kind {
            *self.spans_by_kind.entry(*kind).or_insert(0) += count;
        }
        for hit in &outcome.rule_hits {
            *self.rule_hits.entry(hit.rule.clone()).or_insert(0) += hit.count;
        }

        self.stats.total_processing_time_ms += outcome.processing_time_ms;
        let completed = (self.full + self.regex_only) as u64;
        self.stats.avg_processing_time_ms = self.stats.total_processing_time_ms / completed;
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Total spans resolved across the batch
    pub fn total_spans(&self) -> usize {
        self.spans_by_kind.values().sum()
    }

    /// Total rule substitutions across the batch
    pub fn total_rule_substitutions(&self) -> usize {
        self.rule_hits.values().sum()
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                 DE-IDENTIFICATION BATCH REPORT                \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Transcripts Submitted:       {}\n",
            self.total_transcripts
        ));
        output.push_str(&format!("  Fully Masked:                {}\n", self.full));
        output.push_str(&format!("  Regex-Only:                  {}\n", self.regex_only));
        output.push_str(&format!("  Failed:                      {}\n", self.failed));
        if self.cancelled {
            output.push_str(&format!(
                "  Skipped (cancelled):         {}\n",
                self.skipped
            ));
        }
        output.push_str(&format!(
            "  Entity Spans Replaced:       {}\n",
            self.total_spans()
        ));
        output.push_str(&format!(
            "  Rule Substitutions:          {}\n",
            self.total_rule_substitutions()
        ));
        output.push_str(&format!(
            "  Avg Processing Time:         {} ms\n",
            self.stats.avg_processing_time_ms
        ));
        output.push('\n');

        if !self.spans_by_kind.is_empty() {
            output.push_str("🔍 ENTITY SPANS BY KIND\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            let mut kinds: Vec<_> = self.spans_by_kind.iter().collect();
            kinds.sort_by(|a, b| b.1.cmp(a.1));
            for (kind, count) in kinds {
                output.push_str(&format!("  {:30} {:>5}\n", kind.as_str(), count));
            }
            output.push('\n');
        }

        if !self.rule_hits.is_empty() {
            output.push_str("📐 RULE SUBSTITUTIONS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            let mut rules: Vec<_> = self.rule_hits.iter().collect();
            rules.sort_by(|a, b| b.1.cmp(a.1));
            for (rule, count) in rules {
                output.push_str(&format!("  {rule:30} {count:>5}\n"));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON report to a file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
