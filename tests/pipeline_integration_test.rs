//! Integration tests for the de-identification pipeline and batch runner

use async_trait::async_trait;
use callscrub::deid::models::SpanSource;
use callscrub::deid::{
    BatchRunner, DeidPipeline, EntityDetector, EntityKind, FallbackPolicy, MaskingStatus,
    NoopDetector, PipelineOptions, RuleSet, Span,
};
use callscrub::domain::{DeidError, LanguageTag, Transcript, TranscriptId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Flags fixed names as PERSON; fails for texts mentioning an outage
struct ScriptedDetector {
    names: Vec<&'static str>,
    delay: Duration,
}

impl ScriptedDetector {
    fn new(names: Vec<&'static str>) -> Self {
        Self {
            names,
            delay: Duration::ZERO,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            names: vec!["Anita Verma"],
            delay,
        }
    }
}

#[async_trait]
impl EntityDetector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn detect(
        &self,
        text: &str,
        _language: &LanguageTag,
        kinds: &[EntityKind],
    ) -> Result<Vec<Span>, DeidError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if text.contains("outage") {
            return Err(DeidError::DetectionUnavailable(
                "analyzer returned status 503".to_string(),
            ));
        }
        if !kinds.contains(&EntityKind::Person) {
            return Ok(Vec::new());
        }
        Ok(self
            .names
            .iter()
            .flat_map(|name| {
                text.match_indices(name).map(|(i, m)| {
                    Span::new(EntityKind::Person, i, i + m.len(), 0.85, SpanSource::Ner)
                })
            })
            .collect())
    }
}

fn pipeline(detector: impl EntityDetector + 'static) -> DeidPipeline {
    DeidPipeline::new(
        Arc::new(detector),
        Arc::new(RuleSet::builtin().expect("built-in rules compile")),
    )
}

fn transcript(id: &str, text: &str) -> Transcript {
    Transcript::new(
        TranscriptId::new(id).unwrap(),
        text,
        LanguageTag::default(),
    )
}

#[tokio::test]
async fn test_both_layers_mask() {
    let pipeline = pipeline(ScriptedDetector::new(vec!["Anita Verma"]));
    let outcome = pipeline
        .process(&transcript(
            "call-1",
            "Hi, this is Anita Verma, my SSN is 123-45-6789",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.text, "Hi, this is [PERSON], my SSN is [SSN]");
    assert_eq!(outcome.status, MaskingStatus::Full);
    assert_eq!(outcome.spans.len(), 1);
    assert_eq!(outcome.total_rule_substitutions(), 1);
    assert_eq!(outcome.stats_by_kind.get(&EntityKind::Person), Some(&1));
}

#[tokio::test]
async fn test_detector_failure_falls_back_to_rules() {
    let pipeline = pipeline(ScriptedDetector::new(vec!["Anita Verma"]));
    let outcome = pipeline
        .process(&transcript(
            "call-2",
            "Anita Verma reporting an outage, policy POL-12345678",
        ))
        .await
        .unwrap();

    // The name survives because only the rule layer ran
    assert_eq!(
        outcome.text,
        "Anita Verma reporting an outage, policy [POLICY_ID]"
    );
    match outcome.status {
        MaskingStatus::RegexOnly { ref reason } => assert!(reason.contains("503")),
        MaskingStatus::Full => panic!("expected regex-only status"),
    }
}

#[tokio::test]
async fn test_detector_failure_aborts_when_configured() {
    let pipeline = pipeline(ScriptedDetector::new(vec![])).with_options(PipelineOptions {
        fallback: FallbackPolicy::Abort,
        ..PipelineOptions::default()
    });
    let err = pipeline
        .process(&transcript("call-3", "network outage"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeidError::DetectionUnavailable(_)));
}

#[tokio::test]
async fn test_detection_timeout_is_a_failure() {
    let pipeline = pipeline(ScriptedDetector::slow(Duration::from_millis(500))).with_options(
        PipelineOptions {
            detection_timeout: Duration::from_millis(20),
            ..PipelineOptions::default()
        },
    );
    let outcome = pipeline
        .process(&transcript("call-4", "Anita Verma, SSN 123-45-6789"))
        .await
        .unwrap();

    assert_eq!(outcome.text, "Anita Verma, SSN [SSN]");
    match outcome.status {
        MaskingStatus::RegexOnly { ref reason } => assert!(reason.contains("timed out")),
        MaskingStatus::Full => panic!("expected regex-only status"),
    }
}

#[tokio::test]
async fn test_rerun_on_output_is_stable() {
    let pipeline = pipeline(ScriptedDetector::new(vec!["Anita Verma", "Rahul"]));
    let text = "Anita Verma called about claim CLM-2024001 on 19-02-1981; \
                Rahul will call back on 9876543210 or rahul@example.com";

    let first = pipeline.process_text(text).await.unwrap();
    let second = pipeline.process_text(&first.text).await.unwrap();

    assert_eq!(first.text, second.text);
    assert!(second.spans.is_empty());
    assert!(!first.text.contains("Anita"));
    assert!(!first.text.contains("9876543210"));
}

#[tokio::test]
async fn test_unicode_text_keeps_byte_offsets() {
    let pipeline = pipeline(ScriptedDetector::new(vec!["Zoë Müller"]));
    let outcome = pipeline
        .process_text("Grüße, hier spricht Zoë Müller aus München")
        .await
        .unwrap();
    assert_eq!(outcome.text, "Grüße, hier spricht [PERSON] aus München");
}

#[tokio::test]
async fn test_invalid_utf8_rejected() {
    let pipeline = pipeline(NoopDetector);
    let err = pipeline
        .process_bytes(
            TranscriptId::new("bad").unwrap(),
            &[0x48, 0x69, 0xc3, 0x28],
            LanguageTag::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DeidError::Encoding(_)));
}

#[tokio::test]
async fn test_batch_isolates_detector_failures() {
    let runner = BatchRunner::new(
        Arc::new(pipeline(ScriptedDetector::new(vec!["Anita Verma"]))),
        3,
    );
    let texts = [
        "Anita Verma, SSN 123-45-6789",
        "outage on call two",
        "Anita Verma again",
        "another outage",
        "no identifiers here",
    ];
    let transcripts = texts
        .iter()
        .enumerate()
        .map(|(i, t)| transcript(&format!("call-{i}"), t))
        .collect();

    let (_tx, rx) = watch::channel(false);
    let outcome = runner.run(transcripts, rx).await;

    assert_eq!(outcome.total, 5);
    assert_eq!(outcome.full_count(), 3);
    assert_eq!(outcome.regex_only_count(), 2);
    assert_eq!(outcome.failed_count(), 0);
    assert!(!outcome.cancelled);

    let labels: Vec<_> = outcome.items.iter().map(|i| i.status_label()).collect();
    assert_eq!(
        labels,
        ["full", "regex_only", "full", "regex_only", "full"]
    );
    assert_eq!(
        outcome.items[0].result.as_ref().unwrap().text,
        "[PERSON], SSN [SSN]"
    );
}

#[tokio::test]
async fn test_batch_cancellation_keeps_completed() {
    let runner = BatchRunner::new(
        Arc::new(pipeline(ScriptedDetector::slow(Duration::from_millis(100)))),
        1,
    );
    let transcripts = (0..20)
        .map(|i| transcript(&format!("call-{i}"), "Anita Verma on the line"))
        .collect();

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let _ = tx.send(true);
    });

    let outcome = runner.run(transcripts, rx).await;

    assert!(outcome.cancelled);
    assert!(outcome.items.len() < 20);
    assert!(outcome.skipped_count() > 0);
    for item in &outcome.items {
        assert_eq!(
            item.result.as_ref().unwrap().text,
            "[PERSON] on the line"
        );
    }
}
