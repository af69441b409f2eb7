//! Scrub command implementation
//!
//! De-identifies a single transcript read from a file or stdin and writes
//! the masked text to stdout or a file.

use super::{apply_pipeline_flags, load_or_default, EXIT_CONFIG, EXIT_FATAL, EXIT_OK, EXIT_PARTIAL};
use crate::deid::audit::AuditLogger;
use crate::deid::models::{DeidOutcome, MaskingStatus};
use crate::deid::DeidPipeline;
use crate::domain::{LanguageTag, Transcript, TranscriptId};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Arguments for the scrub command
#[derive(Args, Debug)]
pub struct ScrubArgs {
    /// Transcript file to de-identify (stdin when omitted or "-")
    pub input: Option<PathBuf>,

    /// Write the masked transcript to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Transcript identifier (defaults to the input file stem)
    #[arg(long)]
    pub id: Option<String>,

    /// Language tag passed to the entity detector
    #[arg(long)]
    pub language: Option<String>,

    /// Replace placeholders with natural-language fillers
    #[arg(long)]
    pub normalize: bool,

    /// Skip entity detection and apply the rule layer only
    #[arg(long)]
    pub regex_only: bool,

    /// Print the resolved entity spans to stderr
    #[arg(long)]
    pub show_spans: bool,
}

impl ScrubArgs {
    /// Execute the scrub command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting scrub command");

        let mut config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        apply_pipeline_flags(&mut config, self.normalize, self.regex_only);
        if let Some(ref language) = self.language {
            config.detector.language = language.clone();
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        let pipeline = match DeidPipeline::from_config(&config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build pipeline");
                eprintln!("Failed to build pipeline: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let audit = AuditLogger::from_config(&config.audit)?;

        let bytes = read_input(self.input.as_deref()).await?;
        let id = match self.transcript_id() {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid transcript id: {e}");
                return Ok(EXIT_FATAL);
            }
        };
        let language: LanguageTag = config
            .detector
            .language
            .parse()
            .map_err(anyhow::Error::msg)?;

        let transcript = match Transcript::from_bytes(id, &bytes, language) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Rejected transcript input");
                eprintln!("Cannot read transcript: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let outcome = match pipeline.process(&transcript).await {
            Ok(o) => o,
            Err(e) => {
                crate::log_error_with_context!(e, "De-identification failed");
                eprintln!("De-identification failed: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if let Some(ref logger) = audit {
            logger.log_outcome(transcript.text(), &outcome)?;
        }

        if self.show_spans {
            print_spans(&outcome);
        }

        match self.output {
            Some(ref path) => {
                tokio::fs::write(path, &outcome.text)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("✅ Masked transcript written to {}", path.display());
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(outcome.text.as_bytes()).await?;
                if !outcome.text.ends_with('\n') {
                    stdout.write_all(b"\n").await?;
                }
                stdout.flush().await?;
            }
        }

        match outcome.status {
            MaskingStatus::RegexOnly { ref reason } if !pipeline.detector().is_noop() => {
                eprintln!("⚠️  Entity detection unavailable, rule layer only: {reason}");
                Ok(EXIT_PARTIAL)
            }
            _ => Ok(EXIT_OK),
        }
    }

    fn transcript_id(&self) -> Result<TranscriptId, String> {
        if let Some(ref id) = self.id {
            return TranscriptId::new(id.clone());
        }
        match self.input.as_deref().and_then(|p| p.file_stem()) {
            Some(stem) if stem != "-" => TranscriptId::new(stem.to_string_lossy()),
            _ => Ok(TranscriptId::generate()),
        }
    }
}

/// Read the whole input as bytes; UTF-8 is checked by the pipeline
async fn read_input(input: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match input {
        Some(path) if path != Path::new("-") => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("Failed to read stdin")?;
            Ok(bytes)
        }
    }
}

fn print_spans(outcome: &DeidOutcome) {
    eprintln!("🔍 {} entity span(s)", outcome.spans.len());
    for span in outcome.spans.iter() {
        eprintln!(
            "  {:<14} {:>6}..{:<6} {:?} {:.2}",
            span.kind.as_str(),
            span.start,
            span.end,
            span.source,
            span.confidence
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(input: Option<PathBuf>) -> ScrubArgs {
        ScrubArgs {
            input,
            output: None,
            id: None,
            language: None,
            normalize: false,
            regex_only: true,
            show_spans: false,
        }
    }

    #[test]
    fn test_transcript_id_from_file_stem() {
        let id = args(Some(PathBuf::from("/calls/call-0042.txt")))
            .transcript_id()
            .unwrap();
        assert_eq!(id.as_str(), "call-0042");
    }

    #[test]
    fn test_transcript_id_explicit() {
        let mut a = args(None);
        a.id = Some("claim-7".to_string());
        assert_eq!(a.transcript_id().unwrap().as_str(), "claim-7");
    }

    #[tokio::test]
    async fn test_scrub_file_regex_only() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("call.txt");
        let output = dir.path().join("call.masked.txt");
        std::fs::write(&input, "My SSN is 123-45-6789, born 19-02-1981").unwrap();

        let mut a = args(Some(input));
        a.output = Some(output.clone());
        let missing_config = dir.path().join("callscrub.toml");
        let code = a.execute(missing_config.to_str().unwrap()).await.unwrap();

        assert_eq!(code, EXIT_OK);
        let masked = std::fs::read_to_string(&output).unwrap();
        assert_eq!(masked, "My SSN is [SSN], born [DATE-1981]");
    }

    #[tokio::test]
    async fn test_scrub_rejects_invalid_utf8() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.txt");
        std::fs::write(&input, [0x66, 0x6f, 0xff, 0x6f]).unwrap();

        let code = args(Some(input))
            .execute(dir.path().join("none.toml").to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_FATAL);
    }

    #[tokio::test]
    async fn test_scrub_invalid_config() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("callscrub.toml");
        std::fs::write(&config, "[batch]\nmax_concurrency = 0\n").unwrap();

        let code = args(Some(dir.path().join("call.txt")))
            .execute(config.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
