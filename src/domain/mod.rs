//! Domain models and types for Callscrub.
//!
//! This module contains the core domain types shared by the pipeline, the
//! configuration layer and the CLI.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`TranscriptId`], [`LanguageTag`])
//! - **Domain models** ([`Transcript`])
//! - **Error types** ([`ScrubError`], [`DeidError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! Fallible operations outside the pipeline return [`Result<T, ScrubError>`];
//! pipeline stages return [`DeidError`], which converts with `?`:
//!
//! ```rust
//! use callscrub::domain::{DeidError, Result};
//!
//! fn stage() -> std::result::Result<(), DeidError> {
//!     Err(DeidError::Encoding("bad byte".to_string()))
//! }
//!
//! fn example() -> Result<()> {
//!     stage()?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod result;
pub mod transcript;

// Re-export commonly used types for convenience
pub use errors::{DeidError, ScrubError};
pub use ids::{LanguageTag, TranscriptId};
pub use result::Result;
pub use transcript::Transcript;
