// Callscrub - De-identification for insurance call transcripts
// Copyright (c) 2025 Callscrub Contributors
// Licensed under the MIT License

//! # Callscrub - Layered de-identification for call transcripts
//!
//! Callscrub removes personally and medically identifiable information from
//! insurance call-center transcripts so they can be analysed, labelled, or
//! used for model training.
//!
//! ## Overview
//!
//! Each transcript passes through two masking layers:
//!
//! - **Entity detection**: a model-backed detector (Presidio Analyzer) finds
//!   names, organisations, locations, dates, phones, and similar entities.
//!   Overlapping detections are resolved deterministically and replaced with
//!   placeholders such as `[PERSON]`.
//! - **Rule substitution**: an ordered library of regular expressions masks
//!   domain identifiers the detector misses (policy and member numbers, SSNs,
//!   bank accounts, claim codes, dates of birth).
//!
//! When the detector is unreachable the rule layer still runs and the outcome
//! is flagged as regex-only, so degraded masking is always visible.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`deid`] - Detection, resolution, anonymization, rules, batch processing
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callscrub::config::load_config;
//! use callscrub::deid::DeidPipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("callscrub.toml")?;
//!     let pipeline = DeidPipeline::from_config(&config)?;
//!
//!     let outcome = pipeline
//!         .process_text("Hi, this is Anita Verma, my policy is POL-12345678")
//!         .await?;
//!
//!     println!("{}", outcome.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Rule Layer Only
//!
//! The rule layer can be used on its own:
//!
//! ```rust
//! use callscrub::deid::{apply_rules, RuleSet};
//!
//! # fn example() -> Result<(), callscrub::domain::DeidError> {
//! let rules = RuleSet::builtin()?;
//! let masked = apply_rules("SSN 123-45-6789", &rules)?;
//! assert_eq!(masked, "SSN [SSN]");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Batch Processing
//!
//! ```rust,no_run
//! use callscrub::deid::{BatchRunner, DeidPipeline};
//! use callscrub::domain::Transcript;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn example(pipeline: DeidPipeline, transcripts: Vec<Transcript>) {
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//! let runner = BatchRunner::new(Arc::new(pipeline), 4);
//!
//! let outcome = runner.run(transcripts, shutdown_rx).await;
//! println!("full: {}, regex-only: {}", outcome.full_count(), outcome.regex_only_count());
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Pipeline stages return [`domain::DeidError`]; everything else returns
//! [`domain::ScrubError`]. Both are `thiserror` enums and convert with `?`.

pub mod cli;
pub mod config;
pub mod deid;
pub mod domain;
pub mod logging;
