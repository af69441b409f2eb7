//! Entity detection
//!
//! Provides the trait-based detection interface and its implementations:
//! a model-backed Presidio Analyzer client and a no-op detector for
//! regex-only deployments. The implementation is chosen by configuration
//! and injected into the pipeline as `Arc<dyn EntityDetector>`.

pub mod noop;
pub mod presidio;

use crate::config::schema::{DetectorBackend, DetectorConfig};
use crate::deid::models::{EntityKind, Span};
use crate::domain::{DeidError, LanguageTag, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use noop::NoopDetector;
pub use presidio::PresidioDetector;

/// Trait for entity detection implementations
///
/// Detectors report every candidate they find. Spans may overlap and are
/// byte offsets into `text`. Kinds the detector does not support are
/// ignored rather than reported as errors.
#[async_trait]
pub trait EntityDetector: Send + Sync {
    /// Short backend name for logs and audit records
    fn name(&self) -> &str;

    /// Detect entities of the requested kinds in `text`
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::DetectionUnavailable`] if the backend cannot
    /// answer.
    async fn detect(
        &self,
        text: &str,
        language: &LanguageTag,
        kinds: &[EntityKind],
    ) -> std::result::Result<Vec<Span>, DeidError>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> std::result::Result<(), DeidError> {
        Ok(())
    }

    /// Whether this detector never finds anything
    ///
    /// The pipeline reports a regex-only status for such detectors.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Create a detector based on the configuration
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built
pub fn create_detector(config: &DetectorConfig) -> Result<Arc<dyn EntityDetector>> {
    match config.backend {
        DetectorBackend::Presidio => {
            tracing::info!(endpoint = %config.endpoint, "Creating Presidio detector");
            let detector = PresidioDetector::new(config)?;
            Ok(Arc::new(detector) as Arc<dyn EntityDetector>)
        }
        DetectorBackend::None => {
            tracing::info!("Entity detection disabled, running in regex-only mode");
            Ok(Arc::new(NoopDetector) as Arc<dyn EntityDetector>)
        }
    }
}
