//! Logging and observability
//!
//! Structured logging through `tracing`, with:
//! - Human-readable console output on stderr
//! - Optional JSON file logs with rotation
//! - Helper macros for recurring pipeline events
//!
//! Log records never contain transcript text or masked values. Fields carry
//! identifiers, counts, entity kinds, and rule names only.
//!
//! # Example
//!
//! ```no_run
//! use callscrub::logging::init_logging;
//! use callscrub::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log that a transcript fell back to regex-only masking
///
/// # Example
///
/// ```no_run
/// use callscrub::log_detection_fallback;
///
/// log_detection_fallback!("call-7", "analyzer returned status 503");
/// ```
#[macro_export]
macro_rules! log_detection_fallback {
    ($transcript_id:expr, $reason:expr) => {
        tracing::warn!(
            transcript_id = %$transcript_id,
            reason = %$reason,
            "Entity detection unavailable, transcript masked by rules only"
        );
    };
}

/// Log the completion of one transcript
///
/// # Example
///
/// ```no_run
/// use callscrub::log_transcript_complete;
///
/// log_transcript_complete!("call-7", "full", 4, 12u64);
/// ```
#[macro_export]
macro_rules! log_transcript_complete {
    ($transcript_id:expr, $status:expr, $spans:expr, $elapsed_ms:expr) => {
        tracing::debug!(
            transcript_id = %$transcript_id,
            status = $status,
            spans = $spans,
            elapsed_ms = $elapsed_ms,
            "Transcript de-identified"
        );
    };
}

/// Log batch progress
///
/// # Example
///
/// ```no_run
/// use callscrub::log_batch_progress;
///
/// log_batch_progress!(100, 1000);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            "Processing batch"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use callscrub::log_error_with_context;
/// use callscrub::domain::ScrubError;
///
/// let error = ScrubError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
