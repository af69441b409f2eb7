//! De-identification data models

pub mod entity;
pub mod outcome;
pub mod span;

pub use entity::EntityKind;
pub use outcome::{DeidOutcome, MaskingStatus, RuleHit};
pub use span::{ResolvedSpanSet, Span, SpanSource};
