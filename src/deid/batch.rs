//! Batch processing
//!
//! Maps the pipeline over many transcripts with bounded concurrency. A
//! `watch` channel carries the shutdown signal; once it flips to `true` no
//! new transcript is started, in-flight work is dropped, and the transcripts
//! already finished are returned with `cancelled = true`.
//!
//! One transcript failing never fails the batch. Each item carries its own
//! result.

use crate::deid::models::{DeidOutcome, MaskingStatus};
use crate::deid::pipeline::DeidPipeline;
use crate::domain::{DeidError, Transcript, TranscriptId};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;

/// Result for one transcript of a batch
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Position in the input
    pub index: usize,
    /// Transcript identifier
    pub transcript_id: TranscriptId,
    /// Pipeline result
    pub result: Result<DeidOutcome, DeidError>,
}

impl BatchItem {
    /// `full`, `regex_only` or `failed`
    pub fn status_label(&self) -> &'static str {
        match self.result {
            Ok(ref outcome) => outcome.status.label(),
            Err(_) => "failed",
        }
    }
}

/// Results of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Finished items in input order
    pub items: Vec<BatchItem>,
    /// Number of transcripts submitted
    pub total: usize,
    /// Whether the run stopped early on a shutdown signal
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Transcripts masked by both layers
    pub fn full_count(&self) -> usize {
        self.count(|r| matches!(r, Ok(o) if o.status == MaskingStatus::Full))
    }

    /// Transcripts masked by the rule layer only
    pub fn regex_only_count(&self) -> usize {
        self.count(|r| matches!(r, Ok(o) if !o.status.is_full()))
    }

    /// Transcripts that produced no output
    pub fn failed_count(&self) -> usize {
        self.count(Result::is_err)
    }

    /// Transcripts never processed because of cancellation
    pub fn skipped_count(&self) -> usize {
        self.total - self.items.len()
    }

    /// Whether anything less than full masking of every transcript happened
    pub fn is_degraded(&self) -> bool {
        self.cancelled || self.full_count() < self.total
    }

    fn count(&self, pred: impl Fn(&Result<DeidOutcome, DeidError>) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.result)).count()
    }
}

/// Bounded-concurrency batch runner
#[derive(Clone)]
pub struct BatchRunner {
    pipeline: Arc<DeidPipeline>,
    max_concurrency: usize,
}

impl BatchRunner {
    /// Create a runner; a concurrency of zero is treated as one
    pub fn new(pipeline: Arc<DeidPipeline>, max_concurrency: usize) -> Self {
        Self {
            pipeline,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Maximum transcripts in flight
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Process every transcript, stopping early if `shutdown` becomes `true`
    pub async fn run(
        &self,
        transcripts: Vec<Transcript>,
        mut shutdown: watch::Receiver<bool>,
    ) -> BatchOutcome {
        let total = transcripts.len();
        tracing::info!(
            total,
            max_concurrency = self.max_concurrency,
            "Starting batch"
        );

        let mut pending = stream::iter(transcripts.into_iter().enumerate().map(
            |(index, transcript)| {
                let pipeline = Arc::clone(&self.pipeline);
                async move {
                    let result = pipeline.process(&transcript).await;
                    BatchItem {
                        index,
                        transcript_id: transcript.id().clone(),
                        result,
                    }
                }
            },
        ))
        .buffer_unordered(self.max_concurrency);

        let mut items = Vec::with_capacity(total);
        let mut cancelled = *shutdown.borrow();
        let mut signal_open = true;

        while !cancelled {
            tokio::select! {
                biased;
                changed = shutdown.changed(), if signal_open => {
                    if changed.is_err() {
                        signal_open = false;
                    } else if *shutdown.borrow() {
                        cancelled = true;
                    }
                }
                next = pending.next() => match next {
                    Some(item) => {
                        if let Err(ref e) = item.result {
                            tracing::error!(
                                transcript_id = %item.transcript_id,
                                error = %e,
                                "Failed to de-identify transcript"
                            );
                        }
                        items.push(item);
                        crate::log_batch_progress!(items.len(), total);
                    }
                    None => break,
                },
            }
        }

        if cancelled {
            tracing::warn!(
                completed = items.len(),
                total,
                "Batch cancelled, returning partial results"
            );
        }

        items.sort_by_key(|i: &BatchItem| i.index);
        let outcome = BatchOutcome {
            items,
            total,
            cancelled,
        };

        tracing::info!(
            full = outcome.full_count(),
            regex_only = outcome.regex_only_count(),
            failed = outcome.failed_count(),
            skipped = outcome.skipped_count(),
            "Batch finished"
        );
        outcome
    }
}
