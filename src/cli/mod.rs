//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Callscrub using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Callscrub - De-identification for call transcripts
#[derive(Parser, Debug)]
#[command(name = "callscrub")]
#[command(version, about, long_about = None)]
#[command(author = "Callscrub Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "callscrub.toml", env = "CALLSCRUB_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CALLSCRUB_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// De-identify a single transcript from a file or stdin
    Scrub(commands::scrub::ScrubArgs),

    /// De-identify a JSON Lines batch of transcripts
    Batch(commands::batch::BatchArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
