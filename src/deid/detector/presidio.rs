//! Presidio Analyzer client
//!
//! Calls the analyzer's REST API (`POST /analyze`) and converts its results
//! into spans. The analyzer reports offsets in Unicode code points; spans
//! carry UTF-8 byte offsets, so every result is translated before it leaves
//! this module. Results that cannot be translated are dropped.

use super::EntityDetector;
use crate::config::schema::DetectorConfig;
use crate::config::SecretString;
use crate::deid::models::{EntityKind, Span, SpanSource};
use crate::domain::{DeidError, LanguageTag, Result, ScrubError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recognizers backed by a statistical model; everything else is a pattern
/// recognizer
const MODEL_RECOGNIZERS: &[&str] = &[
    "SpacyRecognizer",
    "StanzaRecognizer",
    "TransformersRecognizer",
    "GLiNERRecognizer",
];

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
    entities: Vec<&'static str>,
    score_threshold: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzerResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f32,
    #[serde(default)]
    recognition_metadata: Option<RecognitionMetadata>,
}

#[derive(Debug, Deserialize)]
struct RecognitionMetadata {
    #[serde(default)]
    recognizer_name: Option<String>,
}

/// Presidio Analyzer REST client
pub struct PresidioDetector {
    /// Base URL without trailing slash
    endpoint: String,

    /// HTTP client for making requests
    client: Client,

    /// Bearer token for hosted analyzers
    api_key: Option<SecretString>,

    /// Minimum score the analyzer should report
    score_threshold: f32,
}

impl PresidioDetector {
    /// Create a new client from detector configuration
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.timeout_ms.min(10_000)))
            .build()
            .map_err(|e| ScrubError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
            api_key: config.api_key.clone(),
            score_threshold: config.score_threshold,
        })
    }

    /// Analyzer base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EntityDetector for PresidioDetector {
    fn name(&self) -> &str {
        "presidio"
    }

    async fn detect(
        &self,
        text: &str,
        language: &LanguageTag,
        kinds: &[EntityKind],
    ) -> std::result::Result<Vec<Span>, DeidError> {
        if text.is_empty() || kinds.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/analyze", self.endpoint);
        let body = AnalyzeRequest {
            text,
            language: language.as_str(),
            entities: kinds.iter().map(EntityKind::as_str).collect(),
            score_threshold: self.score_threshold,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose_secret().as_ref());
        }

        let resp = request.send().await.map_err(|e| {
            DeidError::DetectionUnavailable(format!("analyzer request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeidError::DetectionUnavailable(format!(
                "analyzer returned status {status}: {}",
                body.trim()
            )));
        }

        let results: Vec<AnalyzerResult> = resp.json().await.map_err(|e| {
            DeidError::DetectionUnavailable(format!("malformed analyzer response: {e}"))
        })?;

        let spans = convert_results(text, kinds, results);
        tracing::debug!(spans = spans.len(), "Analyzer returned spans");
        Ok(spans)
    }

    async fn health_check(&self) -> std::result::Result<(), DeidError> {
        let url = format!("{}/health", self.endpoint);
        let resp = self.client.get(&url).send().await.map_err(|e| {
            DeidError::DetectionUnavailable(format!("analyzer health check failed: {e}"))
        })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DeidError::DetectionUnavailable(format!(
                "analyzer health check returned status {}",
                resp.status()
            )))
        }
    }
}

/// Translate analyzer results into byte-offset spans
///
/// Drops results with unknown or unrequested entity types and results whose
/// offsets fall outside the text.
pub(crate) fn convert_results(
    text: &str,
    kinds: &[EntityKind],
    results: Vec<AnalyzerResult>,
) -> Vec<Span> {
    // Byte offset of every code point, plus the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut spans = Vec::with_capacity(results.len());
    for result in results {
        let kind = match result.entity_type.parse::<EntityKind>() {
            Ok(kind) if kinds.contains(&kind) => kind,
            _ => {
                tracing::debug!(entity_type = %result.entity_type, "Ignoring unrequested entity type");
                continue;
            }
        };

        let (Some(&start), Some(&end)) = (boundaries.get(result.start), boundaries.get(result.end))
        else {
            tracing::debug!(
                start = result.start,
                end = result.end,
                "Dropping analyzer result outside the text"
            );
            continue;
        };

        let source = match result
            .recognition_metadata
            .as_ref()
            .and_then(|m| m.recognizer_name.as_deref())
        {
            Some(name) if MODEL_RECOGNIZERS.contains(&name) => SpanSource::Ner,
            _ => SpanSource::Regex,
        };

        spans.push(Span::new(kind, start, end, result.score, source));
    }
    spans
}
