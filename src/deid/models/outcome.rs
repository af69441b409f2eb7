//! Pipeline result models

use super::{EntityKind, ResolvedSpanSet};
use crate::domain::TranscriptId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// How thoroughly a transcript was masked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MaskingStatus {
    /// Entity detection and the rule pass both ran
    Full,
    /// Only the rule pass ran; names, organizations and locations may remain
    RegexOnly {
        /// Why entity detection was skipped
        reason: String,
    },
}

impl MaskingStatus {
    /// Whether both layers ran
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Short label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::RegexOnly { .. } => "regex_only",
        }
    }
}

/// Number of substitutions one rule made
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    /// Rule name
    pub rule: String,
    /// Substitutions made
    pub count: usize,
}

/// De-identified transcript
#[derive(Debug, Clone, Serialize)]
pub struct DeidOutcome {
    /// Transcript identifier
    pub transcript_id: TranscriptId,
    /// De-identified text
    pub text: String,
    /// Masking status flag
    pub status: MaskingStatus,
    /// Spans replaced by the anonymizer (offsets into the original text)
    pub spans: ResolvedSpanSet,
    /// Rules that fired, in application order
    pub rule_hits: Vec<RuleHit>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Timestamp of processing
    pub timestamp: DateTime<Utc>,
    /// Span counts by entity kind
    pub stats_by_kind: HashMap<EntityKind, usize>,
}

impl DeidOutcome {
    /// Create a new outcome, tallying span statistics
    pub fn new(
        transcript_id: TranscriptId,
        text: String,
        status: MaskingStatus,
        spans: ResolvedSpanSet,
        rule_hits: Vec<RuleHit>,
        processing_time_ms: u64,
    ) -> Self {
        let mut stats_by_kind = HashMap::new();
        for span in &spans {
            *stats_by_kind.entry(span.kind).or_insert(0) += 1;
        }

        Self {
            transcript_id,
            text,
            status,
            spans,
            rule_hits,
            processing_time_ms,
            timestamp: Utc::now(),
            stats_by_kind,
        }
    }

    /// Total substitutions made by the rule pass
    pub fn total_rule_substitutions(&self) -> usize {
        self.rule_hits.iter().map(|h| h.count).sum()
    }

    /// Whether anything was masked at all
    pub fn has_detections(&self) -> bool {
        !self.spans.is_empty() || self.total_rule_substitutions() > 0
    }
}
