//! Batch command implementation
//!
//! Reads transcripts from a JSON Lines file, de-identifies them with bounded
//! concurrency, and writes one JSON line per transcript in input order.
//!
//! Input lines look like `{"id": "call-1", "transcript": "...", "language": "en"}`;
//! `id` and `language` are optional.

use super::{apply_pipeline_flags, load_or_default, EXIT_CONFIG, EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::deid::audit::AuditLogger;
use crate::deid::batch::{BatchItem, BatchOutcome};
use crate::deid::report::BatchReport;
use crate::deid::{BatchRunner, DeidPipeline};
use crate::domain::{LanguageTag, Transcript, TranscriptId};
use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON Lines input file ("-" for stdin)
    pub input: PathBuf,

    /// JSON Lines output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the number of transcripts processed concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write a JSON batch report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Replace placeholders with natural-language fillers
    #[arg(long)]
    pub normalize: bool,

    /// Skip entity detection and apply the rule layer only
    #[arg(long)]
    pub regex_only: bool,
}

/// One input line
#[derive(Debug, Deserialize)]
struct BatchRecord {
    #[serde(default)]
    id: Option<String>,
    transcript: String,
    #[serde(default)]
    language: Option<String>,
}

/// One output line
#[derive(Debug, Serialize)]
struct BatchOutputRecord<'a> {
    id: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    spans: usize,
    rule_substitutions: usize,
}

impl<'a> From<&'a BatchItem> for BatchOutputRecord<'a> {
    fn from(item: &'a BatchItem) -> Self {
        let id = item.transcript_id.as_str();
        match item.result {
            Ok(ref outcome) => Self {
                id,
                status: item.status_label(),
                transcript: Some(outcome.text.as_str()),
                reason: match outcome.status {
                    crate::deid::MaskingStatus::RegexOnly { ref reason } => Some(reason.as_str()),
                    crate::deid::MaskingStatus::Full => None,
                },
                error: None,
                spans: outcome.spans.len(),
                rule_substitutions: outcome.total_rule_substitutions(),
            },
            Err(ref e) => Self {
                id,
                status: item.status_label(),
                transcript: None,
                reason: None,
                error: Some(e.to_string()),
                spans: 0,
                rule_substitutions: 0,
            },
        }
    }
}

impl BatchArgs {
    /// Execute the batch command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting batch command");

        let mut config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        apply_pipeline_flags(&mut config, self.normalize, self.regex_only);
        if let Some(concurrency) = self.concurrency {
            tracing::info!(concurrency, "Overriding batch concurrency from CLI");
            config.batch.max_concurrency = concurrency;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        let pipeline = match DeidPipeline::from_config(&config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build pipeline");
                eprintln!("Failed to build pipeline: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let detection_enabled = !pipeline.detector().is_noop();
        let audit = AuditLogger::from_config(&config.audit)?;

        let input = read_input(&self.input).await?;
        let default_language: LanguageTag = config
            .detector
            .language
            .parse()
            .map_err(anyhow::Error::msg)?;
        let transcripts = match parse_records(&input, &default_language) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Rejected batch input");
                eprintln!("Invalid batch input: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        // Originals are only kept when the audit log needs span hashes
        let originals: Option<Vec<String>> = audit
            .as_ref()
            .map(|_| transcripts.iter().map(|t| t.text().to_string()).collect());

        eprintln!(
            "🚀 De-identifying {} transcript(s) with concurrency {}",
            transcripts.len(),
            config.batch.max_concurrency
        );

        let runner = BatchRunner::new(pipeline, config.batch.max_concurrency);
        let outcome = runner.run(transcripts, shutdown_signal).await;

        if let (Some(logger), Some(originals)) = (audit.as_ref(), originals.as_ref()) {
            for item in &outcome.items {
                if let Ok(ref result) = item.result {
                    logger.log_outcome(&originals[item.index], result)?;
                }
            }
        }

        let lines = render_output(&outcome)?;
        match self.output {
            Some(ref path) => {
                tokio::fs::write(path, lines)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(lines.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        let report = BatchReport::from_batch(&outcome);
        eprint!("{}", report.format_console());
        if let Some(ref path) = self.report {
            report
                .write_to_file(path)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            eprintln!("📄 Report written to {}", path.display());
        }

        Ok(exit_code(&outcome, detection_enabled))
    }
}

/// Exit code for a finished batch
fn exit_code(outcome: &BatchOutcome, detection_enabled: bool) -> i32 {
    let degraded = outcome.cancelled
        || outcome.failed_count() > 0
        || (detection_enabled && outcome.regex_only_count() > 0);
    if degraded {
        EXIT_PARTIAL
    } else {
        EXIT_OK
    }
}

async fn read_input(input: &Path) -> anyhow::Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// Parse JSON Lines input, skipping blank lines
fn parse_records(input: &str, default_language: &LanguageTag) -> Result<Vec<Transcript>, String> {
    let mut transcripts = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: BatchRecord =
            serde_json::from_str(line).map_err(|e| format!("line {}: {e}", line_no + 1))?;

        let id = match record.id {
            Some(id) => TranscriptId::new(id).map_err(|e| format!("line {}: {e}", line_no + 1))?,
            None => TranscriptId::generate(),
        };
        let language = match record.language {
            Some(tag) => tag
                .parse::<LanguageTag>()
                .map_err(|e| format!("line {}: {e}", line_no + 1))?,
            None => default_language.clone(),
        };
        transcripts.push(Transcript::new(id, record.transcript, language));
    }
    Ok(transcripts)
}

fn render_output(outcome: &BatchOutcome) -> anyhow::Result<String> {
    let mut lines = String::new();
    for item in &outcome.items {
        let record = BatchOutputRecord::from(item);
        lines.push_str(&serde_json::to_string(&record).context("Failed to serialize result")?);
        lines.push('\n');
    }
    Ok(lines)
}
