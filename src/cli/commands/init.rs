//! Init command implementation
//!
//! This module implements the `init` command for generating a starter
//! configuration file and, optionally, an editable copy of the built-in
//! rule library.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use crate::deid::rules::builtin_library_text;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "callscrub.toml")]
    pub output: String,

    /// Also write the built-in rule library to this path and point the
    /// configuration at it
    #[arg(long, value_name = "PATH")]
    pub with_rules: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Callscrub configuration");
        println!();

        let mut targets = vec![PathBuf::from(&self.output)];
        targets.extend(self.with_rules.clone());
        if !self.force {
            if let Some(existing) = targets.iter().find(|p| p.exists()) {
                println!("❌ File already exists: {}", existing.display());
                println!("   Use --force to overwrite");
                return Ok(EXIT_CONFIG);
            }
        }

        if let Some(ref rules_path) = self.with_rules {
            if let Err(e) = write_file(rules_path, builtin_library_text()) {
                println!("❌ Failed to write rule library");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
            println!("✅ Rule library created: {}", rules_path.display());
        }

        let config_content = generate_config(self.with_rules.as_deref());
        match write_file(Path::new(&self.output), &config_content) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Point [detector].endpoint at your Presidio Analyzer");
                println!("  2. Export CALLSCRUB_ANALYZER_KEY if the analyzer needs a token");
                println!("  3. Validate configuration: callscrub validate-config --check-detector");
                println!("  4. De-identify a transcript: callscrub scrub call.txt");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)
}

/// Generate the starter configuration
fn generate_config(rules_path: Option<&Path>) -> String {
    let rules_section = match rules_path {
        Some(path) => format!(
            "library_path = {}",
            toml::Value::String(path.display().to_string())
        ),
        None => "# library_path = \"./patterns/transcript_rules.toml\"".to_string(),
    };

    format!(
        r#"# Callscrub Configuration File
# De-identification of insurance call transcripts
#
# Every section is optional. Values can reference environment variables with
# ${{VAR}} and be overridden with CALLSCRUB_<SECTION>_<KEY>.

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

[detector]
# Entity detection backend: "presidio" or "none" (rule layer only)
backend = "presidio"

# Presidio Analyzer base URL
endpoint = "http://localhost:5002"

# Optional bearer token for the analyzer
# api_key = "${{CALLSCRUB_ANALYZER_KEY}}"

# Per-transcript detection timeout
timeout_ms = 5000

# Default language tag
language = "en"

# Minimum analyzer score (0.0 - 1.0)
score_threshold = 0.0

# Entity kinds requested from the analyzer
entities = [
    "PERSON",
    "PHONE_NUMBER",
    "EMAIL_ADDRESS",
    "DATE_TIME",
    "LOCATION",
    "MEDICAL_LICENSE",
    "CREDIT_CARD",
    "IBAN_CODE",
    "US_SSN",
    "NRP",
    "ORGANIZATION",
]

[resolver]
# Entity kinds in descending priority for overlapping spans of equal length
# priority = ["PERSON", "ORGANIZATION", "LOCATION", "DATE_TIME", "EMAIL_ADDRESS", "PHONE_NUMBER"]

[placeholders]
# Override the placeholder written for an entity kind
# PERSON = "[PERSON]"

[rules]
# Ordered regex rule library; the built-in library is used when unset
{rules_section}

[normalizer]
# Replace placeholders with natural-language fillers
enabled = false
collapse_whitespace = true

[normalizer.mapping]
"[PERSON]" = "the customer"
"[ORG]" = "the hospital"
"[PHONE]" = "the phone number"
"[EMAIL]" = "the email address"
"[DATE_TIME]" = "the date"
"[POLICY_ID]" = "the policy"

[pipeline]
# When entity detection fails: "regex_only" (flag and continue) or "abort"
on_detection_failure = "regex_only"

[batch]
# Transcripts processed concurrently (1-256)
max_concurrency = 4

[audit]
# Append one JSON line per transcript; span values are stored as SHA-256 hashes
enabled = false
log_path = "./audit/callscrub_audit.jsonl"
json_format = true

[logging]
# JSON file logs in addition to the console
local_enabled = false
local_path = "./logs"
local_rotation = "daily"  # daily | hourly | never
"#
    )
}
