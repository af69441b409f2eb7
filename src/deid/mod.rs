//! Layered de-identification
//!
//! Removes personally and medically identifiable information from call
//! transcripts before downstream analysis.
//!
//! # Layers
//!
//! - [`detector`]: model-backed entity detection (Presidio) behind the
//!   [`EntityDetector`](detector::EntityDetector) trait
//! - [`resolver`]: deterministic reduction of overlapping spans
//! - [`anonymizer`]: span-to-placeholder rewriting
//! - [`rules`]: ordered regex substitutions for domain identifiers
//! - [`normalizer`]: placeholder tokens to natural-language fillers
//!
//! [`pipeline`] chains the layers for one transcript and [`batch`] maps the
//! pipeline over many. [`audit`] and [`report`] record what happened.
//!
//! # Examples
//!
//! ```no_run
//! use callscrub::config::load_config;
//! use callscrub::deid::DeidPipeline;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("callscrub.toml")?;
//! let pipeline = DeidPipeline::from_config(&config)?;
//!
//! let outcome = pipeline
//!     .process_text("This is Anita Verma, policy POL-12345678, born 19-02-1981")
//!     .await?;
//! println!("{} ({})", outcome.text, outcome.status.label());
//! # Ok(())
//! # }
//! ```

pub mod anonymizer;
pub mod audit;
pub mod batch;
pub mod detector;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod rules;

pub use anonymizer::{Anonymizer, PlaceholderMap};
pub use batch::{BatchItem, BatchOutcome, BatchRunner};
pub use detector::{create_detector, EntityDetector, NoopDetector, PresidioDetector};
pub use models::{DeidOutcome, EntityKind, MaskingStatus, ResolvedSpanSet, Span, SpanSource};
pub use normalizer::Normalizer;
pub use pipeline::{DeidPipeline, FallbackPolicy, PipelineOptions};
pub use report::BatchReport;
pub use resolver::{PriorityTable, SpanResolver};
pub use rules::{apply_rules, RuleSet};
