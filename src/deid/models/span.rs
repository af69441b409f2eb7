//! Span data models

use super::entity::EntityKind;
use serde::{Deserialize, Serialize};

/// Which layer produced a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanSource {
    /// Regex/pattern recognizer
    Regex,
    /// Statistical named-entity recognizer
    Ner,
}

/// Half-open byte range `[start, end)` of the original text tagged with an
/// entity kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Kind of entity
    pub kind: EntityKind,
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// Producing layer
    pub source: SpanSource,
}

impl Span {
    /// Create a new span; confidence is clamped to [0, 1]
    pub fn new(
        kind: EntityKind,
        start: usize,
        end: usize,
        confidence: f32,
        source: SpanSource,
    ) -> Self {
        Self {
            kind,
            start,
            end,
            confidence: if confidence.is_nan() {
                confidence
            } else {
                confidence.clamp(0.0, 1.0)
            },
            source,
        }
    }

    /// Length in bytes (0 for malformed spans)
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `start < end` and the confidence is a real number
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end && self.confidence.is_finite()
    }

    /// Whether the span addresses a valid region of `text`: in bounds and on
    /// UTF-8 character boundaries
    pub fn fits(&self, text: &str) -> bool {
        self.is_well_formed()
            && self.end <= text.len()
            && text.is_char_boundary(self.start)
            && text.is_char_boundary(self.end)
    }

    /// Whether two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The covered slice of `text`, if the span fits it
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        if self.fits(text) {
            Some(&text[self.start..self.end])
        } else {
            None
        }
    }
}

/// Ordered, non-overlapping spans sorted by start offset
///
/// Only [`SpanResolver`](crate::deid::resolver::SpanResolver) builds this type,
/// so holding one is proof that the spans are disjoint and sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedSpanSet {
    spans: Vec<Span>,
}

impl ResolvedSpanSet {
    /// Wrap spans that are already sorted and disjoint
    pub(crate) fn from_sorted_disjoint(spans: Vec<Span>) -> Self {
        debug_assert!(spans.windows(2).all(|w| w[0].end <= w[1].start));
        Self { spans }
    }

    /// Empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolved spans in ascending start order
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Iterate the spans in ascending start order
    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    /// Number of spans
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether no span survived resolution
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Total number of bytes covered
    pub fn covered_len(&self) -> usize {
        self.spans.iter().map(Span::len).sum()
    }
}

impl<'a> IntoIterator for &'a ResolvedSpanSet {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
