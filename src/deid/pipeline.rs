//! De-identification pipeline
//!
//! This module provides the [`DeidPipeline`] that runs the masking layers for
//! one transcript:
//!
//! 1. **Detect**: the injected [`EntityDetector`] reports candidate spans,
//!    bounded by the configured timeout
//! 2. **Resolve**: overlapping spans are reduced to one winner per region
//! 3. **Anonymize**: winners are replaced by placeholder tokens
//! 4. **Rules**: the ordered rule set rewrites what the detector missed
//! 5. **Normalize** (optional): tokens become natural-language fillers
//!
//! When detection fails the [`FallbackPolicy`] decides between aborting the
//! transcript and continuing with the rule layer alone. Either way the caller
//! sees the outcome: a regex-only transcript always carries
//! [`MaskingStatus::RegexOnly`].
//!
//! The pipeline holds only read-only state and is shared across tasks via
//! `Arc`.

use crate::config::schema::CallscrubConfig;
use crate::deid::anonymizer::{Anonymizer, PlaceholderMap};
use crate::deid::detector::{create_detector, EntityDetector};
use crate::deid::models::{DeidOutcome, EntityKind, MaskingStatus, Span};
use crate::deid::normalizer::Normalizer;
use crate::deid::resolver::{PriorityTable, SpanResolver};
use crate::deid::rules::{load_rule_set, RuleSet};
use crate::domain::{DeidError, LanguageTag, Result, ScrubError, Transcript, TranscriptId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// What to do when entity detection is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Continue with the rule layer only and flag the outcome
    #[default]
    RegexOnly,
    /// Fail the transcript
    Abort,
}

/// Per-pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Entity kinds requested from the detector
    pub kinds: Vec<EntityKind>,
    /// Upper bound on one detector call
    pub detection_timeout: Duration,
    /// Behaviour when detection fails
    pub fallback: FallbackPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            kinds: EntityKind::ALL.to_vec(),
            detection_timeout: Duration::from_millis(5000),
            fallback: FallbackPolicy::RegexOnly,
        }
    }
}

/// Layered de-identification pipeline
///
/// # Examples
///
/// ```
/// use callscrub::deid::detector::NoopDetector;
/// use callscrub::deid::pipeline::DeidPipeline;
/// use callscrub::deid::rules::RuleSet;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), callscrub::domain::DeidError> {
/// let pipeline = DeidPipeline::new(Arc::new(NoopDetector), Arc::new(RuleSet::builtin()?));
/// let outcome = pipeline.process_text("Born 19-02-1981").await?;
/// assert_eq!(outcome.text, "Born [DATE-1981]");
/// assert!(!outcome.status.is_full());
/// # Ok(())
/// # }
/// ```
pub struct DeidPipeline {
    detector: Arc<dyn EntityDetector>,
    resolver: SpanResolver,
    anonymizer: Anonymizer,
    rules: Arc<RuleSet>,
    normalizer: Option<Normalizer>,
    options: PipelineOptions,
}

impl DeidPipeline {
    /// Create a pipeline with default resolver, placeholders and options
    pub fn new(detector: Arc<dyn EntityDetector>, rules: Arc<RuleSet>) -> Self {
        Self {
            detector,
            resolver: SpanResolver::default(),
            anonymizer: Anonymizer::default(),
            rules,
            normalizer: None,
            options: PipelineOptions::default(),
        }
    }

    /// Build every component from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the rule library, priority table, placeholder map
    /// or normalizer mapping is invalid, or the detector cannot be created.
    pub fn from_config(config: &CallscrubConfig) -> Result<Self> {
        let detector = create_detector(&config.detector)?;
        Self::from_config_with_detector(config, detector)
    }

    /// Build from configuration with an externally supplied detector
    pub fn from_config_with_detector(
        config: &CallscrubConfig,
        detector: Arc<dyn EntityDetector>,
    ) -> Result<Self> {
        let rules = load_rule_set(config.rules.library_path.as_deref())?;
        let priority = PriorityTable::from_names(&config.resolver.priority)?;
        let placeholders = PlaceholderMap::with_overrides(&config.placeholders)?;

        let normalizer = if config.normalizer.enabled {
            let mapping = config
                .normalizer
                .mapping
                .iter()
                .map(|(t, f)| (t.clone(), f.clone()))
                .collect();
            Some(
                Normalizer::new(mapping)?
                    .with_collapse_whitespace(config.normalizer.collapse_whitespace),
            )
        } else {
            None
        };

        let kinds = config
            .detector
            .entity_kinds()
            .map_err(ScrubError::Configuration)?;

        Ok(Self::new(detector, Arc::new(rules))
            .with_resolver(SpanResolver::new(priority))
            .with_anonymizer(Anonymizer::new(placeholders))
            .with_normalizer(normalizer)
            .with_options(PipelineOptions {
                kinds,
                detection_timeout: Duration::from_millis(config.detector.timeout_ms),
                fallback: config.pipeline.on_detection_failure,
            }))
    }

    /// Replace the resolver
    pub fn with_resolver(mut self, resolver: SpanResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the anonymizer
    pub fn with_anonymizer(mut self, anonymizer: Anonymizer) -> Self {
        self.anonymizer = anonymizer;
        self
    }

    /// Enable or disable placeholder normalization
    pub fn with_normalizer(mut self, normalizer: Option<Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replace the options
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Options in use
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Rule set in use
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Detector in use
    pub fn detector(&self) -> &Arc<dyn EntityDetector> {
        &self.detector
    }

    /// De-identify one transcript
    ///
    /// # Errors
    ///
    /// - [`DeidError::DetectionUnavailable`] if detection fails and the
    ///   fallback policy is `Abort`
    /// - [`DeidError::RuleExecution`] if a rule fails while matching
    pub async fn process(
        &self,
        transcript: &Transcript,
    ) -> std::result::Result<DeidOutcome, DeidError> {
        let start = Instant::now();
        let text = transcript.text();

        let (detected, status) = self.detect(transcript).await?;
        let spans = self.admissible_spans(text, detected);
        let resolved = self.resolver.resolve(spans);
        let anonymized = self.anonymizer.anonymize(text, &resolved)?;
        let rule_pass = self.rules.apply(&anonymized)?;

        let output = match self.normalizer {
            Some(ref normalizer) => normalizer.normalize(&rule_pass.text),
            None => rule_pass.text,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        crate::log_transcript_complete!(transcript.id(), status.label(), resolved.len(), elapsed_ms);

        Ok(DeidOutcome::new(
            transcript.id().clone(),
            output,
            status,
            resolved,
            rule_pass.hits,
            elapsed_ms,
        ))
    }

    /// De-identify a bare string under a generated id and the default
    /// language
    pub async fn process_text(&self, text: &str) -> std::result::Result<DeidOutcome, DeidError> {
        let transcript = Transcript::new(TranscriptId::generate(), text, LanguageTag::default());
        self.process(&transcript).await
    }

    /// De-identify raw bytes, rejecting invalid UTF-8 before any stage runs
    pub async fn process_bytes(
        &self,
        id: TranscriptId,
        bytes: &[u8],
        language: LanguageTag,
    ) -> std::result::Result<DeidOutcome, DeidError> {
        let transcript = Transcript::from_bytes(id, bytes, language)?;
        self.process(&transcript).await
    }

    /// Run the detector under the timeout and apply the fallback policy
    async fn detect(
        &self,
        transcript: &Transcript,
    ) -> std::result::Result<(Vec<Span>, MaskingStatus), DeidError> {
        if self.detector.is_noop() {
            return Ok((
                Vec::new(),
                MaskingStatus::RegexOnly {
                    reason: "entity detection disabled".to_string(),
                },
            ));
        }

        let call = self.detector.detect(
            transcript.text(),
            transcript.language(),
            &self.options.kinds,
        );
        let error = match tokio::time::timeout(self.options.detection_timeout, call).await {
            Ok(Ok(spans)) => return Ok((spans, MaskingStatus::Full)),
            Ok(Err(e)) => e,
            Err(_) => DeidError::DetectionUnavailable(format!(
                "{} detector timed out after {} ms",
                self.detector.name(),
                self.options.detection_timeout.as_millis()
            )),
        };

        match self.options.fallback {
            FallbackPolicy::Abort => Err(error),
            FallbackPolicy::RegexOnly => {
                let reason = error.to_string();
                crate::log_detection_fallback!(transcript.id(), &reason);
                Ok((Vec::new(), MaskingStatus::RegexOnly { reason }))
            }
        }
    }

    /// Drop spans that do not address the text or that touch an existing
    /// placeholder
    fn admissible_spans(&self, text: &str, spans: Vec<Span>) -> Vec<Span> {
        let regions = placeholder_regions(text, &self.anonymizer);
        let total = spans.len();
        let kept: Vec<Span> = spans
            .into_iter()
            .filter(|s| s.fits(text))
            .filter(|s| !regions.iter().any(|&(a, b)| s.start < b && a < s.end))
            .collect();

        if kept.len() < total {
            tracing::debug!(dropped = total - kept.len(), "Dropped inadmissible spans");
        }
        kept
    }
}

/// Byte ranges of placeholder tokens already present in `text`
fn placeholder_regions(text: &str, anonymizer: &Anonymizer) -> Vec<(usize, usize)> {
    static BRACKET_TOKEN: OnceLock<Regex> = OnceLock::new();
    let pattern = BRACKET_TOKEN.get_or_init(|| {
        Regex::new(r"\[[A-Z][A-Z_]*(?:-\d{4})?\]").expect("placeholder pattern is valid")
    });

    let mut regions: Vec<(usize, usize)> = pattern
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    for token in anonymizer.placeholders().tokens() {
        regions.extend(
            text.match_indices(token)
                .map(|(i, t)| (i, i + t.len())),
        );
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deid::detector::NoopDetector;
    use crate::deid::models::SpanSource;
    use async_trait::async_trait;

    /// Detector that tags every occurrence of fixed words
    struct WordDetector {
        words: Vec<(&'static str, EntityKind)>,
    }

    #[async_trait]
    impl EntityDetector for WordDetector {
        fn name(&self) -> &str {
            "words"
        }

        async fn detect(
            &self,
            text: &str,
            _language: &LanguageTag,
            kinds: &[EntityKind],
        ) -> std::result::Result<Vec<Span>, DeidError> {
            Ok(self
                .words
                .iter()
                .filter(|(_, k)| kinds.contains(k))
                .flat_map(|(w, k)| {
                    text.match_indices(w)
                        .map(move |(i, _)| Span::new(*k, i, i + w.len(), 0.85, SpanSource::Ner))
                })
                .collect())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl EntityDetector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        async fn detect(
            &self,
            _text: &str,
            _language: &LanguageTag,
            _kinds: &[EntityKind],
        ) -> std::result::Result<Vec<Span>, DeidError> {
            Err(DeidError::DetectionUnavailable("connection refused".to_string()))
        }
    }

    fn rules() -> Arc<RuleSet> {
        Arc::new(RuleSet::builtin().unwrap())
    }

    fn word_pipeline() -> DeidPipeline {
        DeidPipeline::new(
            Arc::new(WordDetector {
                words: vec![
                    ("Anita Verma", EntityKind::Person),
                    ("HealthSure", EntityKind::Organization),
                    ("Mumbai", EntityKind::Location),
                ],
            }),
            rules(),
        )
    }

    #[tokio::test]
    async fn test_full_masking() {
        let outcome = word_pipeline()
            .process_text("This is Anita Verma from Mumbai, policy POL-12345678, born 19-02-1981.")
            .await
            .unwrap();

        assert_eq!(
            outcome.text,
            "This is [PERSON] from [LOCATION], policy [POLICY_ID], born [DATE-1981]."
        );
        assert_eq!(outcome.status, MaskingStatus::Full);
        assert_eq!(outcome.spans.len(), 2);
        assert_eq!(outcome.stats_by_kind.get(&EntityKind::Person), Some(&1));
    }

    #[tokio::test]
    async fn test_regex_only_on_detector_failure() {
        let pipeline = DeidPipeline::new(Arc::new(FailingDetector), rules());
        let outcome = pipeline.process_text("SSN 123-45-6789").await.unwrap();
        assert_eq!(outcome.text, "SSN [SSN]");
        assert!(matches!(
            outcome.status,
            MaskingStatus::RegexOnly { ref reason } if reason.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn test_abort_policy_propagates_failure() {
        let pipeline = DeidPipeline::new(Arc::new(FailingDetector), rules()).with_options(
            PipelineOptions {
                fallback: FallbackPolicy::Abort,
                ..Default::default()
            },
        );
        let err = pipeline.process_text("SSN 123-45-6789").await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_noop_detector_is_regex_only() {
        let pipeline = DeidPipeline::new(Arc::new(NoopDetector), rules());
        let outcome = pipeline.process_text("mail to 90210").await.unwrap();
        assert_eq!(outcome.text, "mail to 902[ZIP]");
        assert_eq!(outcome.status.label(), "regex_only");
    }

    #[tokio::test]
    async fn test_pipeline_idempotent() {
        let pipeline = word_pipeline();
        let first = pipeline
            .process_text("Anita Verma at HealthSure, 9876543210, anita@example.com, 12/03/2024")
            .await
            .unwrap();
        let second = pipeline.process_text(&first.text).await.unwrap();
        assert_eq!(second.text, first.text);
        assert!(second.spans.is_empty());
    }

    #[tokio::test]
    async fn test_spans_inside_placeholders_ignored() {
        let pipeline = DeidPipeline::new(
            Arc::new(WordDetector {
                words: vec![("PERSON", EntityKind::Organization), ("1981", EntityKind::DateTime)],
            }),
            rules(),
        );
        let outcome = pipeline
            .process_text("[PERSON] born [DATE-1981]")
            .await
            .unwrap();
        assert_eq!(outcome.text, "[PERSON] born [DATE-1981]");
        assert!(outcome.spans.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_detector_offsets_dropped() {
        struct BadOffsets;

        #[async_trait]
        impl EntityDetector for BadOffsets {
            fn name(&self) -> &str {
                "bad"
            }

            async fn detect(
                &self,
                _text: &str,
                _language: &LanguageTag,
                _kinds: &[EntityKind],
            ) -> std::result::Result<Vec<Span>, DeidError> {
                Ok(vec![
                    Span::new(EntityKind::Person, 0, 500, 0.9, SpanSource::Ner),
                    Span::new(EntityKind::Person, 2, 3, 0.9, SpanSource::Ner),
                    Span::new(EntityKind::Person, 0, 1, 0.9, SpanSource::Ner),
                ])
            }
        }

        let pipeline = DeidPipeline::new(Arc::new(BadOffsets), rules());
        // 'ë' occupies bytes 2..4
        let outcome = pipeline.process_text("Zoë").await.unwrap();
        assert_eq!(outcome.text, "[PERSON]oë");
        assert_eq!(outcome.spans.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let pipeline = DeidPipeline::new(Arc::new(NoopDetector), rules());
        let err = pipeline
            .process_bytes(
                TranscriptId::new("bad").unwrap(),
                &[0x48, 0xff, 0x49],
                LanguageTag::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeidError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_normalizer_applied_last() {
        let pipeline = word_pipeline().with_normalizer(Some(Normalizer::default()));
        let outcome = pipeline
            .process_text("Anita Verma called HealthSure")
            .await
            .unwrap();
        assert_eq!(outcome.text, "the customer called the hospital");
    }

    #[tokio::test]
    async fn test_unrequested_kinds_not_masked() {
        let pipeline = word_pipeline().with_options(PipelineOptions {
            kinds: vec![EntityKind::Person],
            ..Default::default()
        });
        let outcome = pipeline
            .process_text("Anita Verma in Mumbai")
            .await
            .unwrap();
        assert_eq!(outcome.text, "[PERSON] in Mumbai");
    }

    #[tokio::test]
    async fn test_from_config_regex_only() {
        let mut config = CallscrubConfig::default();
        config.detector.backend = crate::config::schema::DetectorBackend::None;
        config.detector.timeout_ms = 250;
        let pipeline = DeidPipeline::from_config(&config).unwrap();
        assert!(pipeline.detector().is_noop());
        assert_eq!(pipeline.options().detection_timeout, Duration::from_millis(250));
        assert_eq!(pipeline.options().kinds.len(), 11);
    }
}
