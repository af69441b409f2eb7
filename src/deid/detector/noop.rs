//! Detector that never finds anything

use super::EntityDetector;
use crate::deid::models::{EntityKind, Span};
use crate::domain::{DeidError, LanguageTag};
use async_trait::async_trait;

/// Regex-only mode detector
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDetector;

#[async_trait]
impl EntityDetector for NoopDetector {
    fn name(&self) -> &str {
        "none"
    }

    async fn detect(
        &self,
        _text: &str,
        _language: &LanguageTag,
        _kinds: &[EntityKind],
    ) -> Result<Vec<Span>, DeidError> {
        Ok(Vec::new())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_returns_no_spans() {
        let spans = NoopDetector
            .detect("Anita Verma, 9876543210", &LanguageTag::default(), &EntityKind::ALL)
            .await
            .unwrap();
        assert!(spans.is_empty());
        assert!(NoopDetector.health_check().await.is_ok());
    }
}
