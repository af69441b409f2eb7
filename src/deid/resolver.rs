//! Span resolution
//!
//! Detectors report overlapping spans (a phone recognizer and a date
//! recognizer both claiming `19-02-1981`, a person and an organization both
//! claiming `Lotus Care`). The resolver reduces them to one winner per
//! overlapping region so the anonymizer can rewrite the text in a single pass.
//!
//! # Algorithm
//!
//! 1. Drop malformed spans (`start >= end`, non-finite confidence).
//! 2. Sort by start ascending, then by descending priority key.
//! 3. Sweep left to right holding one open span. A candidate starting at or
//!    after the open span's end closes it. An overlapping candidate replaces
//!    the open span only if its priority key is strictly greater; otherwise it
//!    is discarded.
//!
//! The priority key is, in order: confidence, entity-kind priority (from the
//! [`PriorityTable`]), span length, source (NER over regex), and finally the
//! entity kind itself so that the ordering is total and the result does not
//! depend on input order.

use crate::deid::models::{EntityKind, ResolvedSpanSet, Span, SpanSource};
use crate::domain::DeidError;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Entity-kind priority table used to break confidence ties
///
/// The first kind listed has the highest priority. Kinds missing from the
/// table rank below every listed kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    order: Vec<EntityKind>,
}

impl PriorityTable {
    /// Build a table from kinds in descending priority
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::InvalidRuleConfig`] if a kind is listed twice.
    pub fn new(order: Vec<EntityKind>) -> Result<Self, DeidError> {
        let mut seen = HashSet::new();
        for kind in &order {
            if !seen.insert(*kind) {
                return Err(DeidError::invalid_rule(
                    "resolver.priority",
                    format!("entity kind {kind} listed more than once"),
                ));
            }
        }
        Ok(Self { order })
    }

    /// Build a table from configuration strings
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, DeidError> {
        let kinds = names
            .iter()
            .map(|n| {
                n.as_ref()
                    .parse::<EntityKind>()
                    .map_err(|e| DeidError::invalid_rule("resolver.priority", e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(kinds)
    }

    /// Rank of a kind; lower is more important
    pub fn rank(&self, kind: EntityKind) -> usize {
        self.order
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(self.order.len())
    }

    /// Kinds in descending priority
    pub fn kinds(&self) -> &[EntityKind] {
        &self.order
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            order: vec![
                EntityKind::Person,
                EntityKind::Organization,
                EntityKind::Location,
                EntityKind::DateTime,
                EntityKind::EmailAddress,
                EntityKind::PhoneNumber,
                EntityKind::UsSsn,
                EntityKind::CreditCard,
                EntityKind::IbanCode,
                EntityKind::MedicalLicense,
                EntityKind::Url,
                EntityKind::IpAddress,
                EntityKind::Nrp,
            ],
        }
    }
}

/// Deterministic overlap resolver
#[derive(Debug, Clone, Default)]
pub struct SpanResolver {
    priority: PriorityTable,
}

impl SpanResolver {
    /// Create a resolver with a custom priority table
    pub fn new(priority: PriorityTable) -> Self {
        Self { priority }
    }

    /// Priority table in use
    pub fn priority(&self) -> &PriorityTable {
        &self.priority
    }

    /// Reduce possibly-overlapping spans to a disjoint, sorted set
    pub fn resolve(&self, spans: Vec<Span>) -> ResolvedSpanSet {
        let total = spans.len();
        let mut candidates: Vec<Span> = spans.into_iter().filter(Span::is_well_formed).collect();
        let dropped = total - candidates.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped malformed spans before resolution");
        }

        candidates.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| self.compare(b, a)));

        let mut kept: Vec<Span> = Vec::with_capacity(candidates.len());
        let mut open: Option<Span> = None;

        for candidate in candidates {
            open = match open {
                None => Some(candidate),
                Some(current) if candidate.start >= current.end => {
                    kept.push(current);
                    Some(candidate)
                }
                Some(current) => {
                    if self.compare(&candidate, &current) == Ordering::Greater {
                        tracing::trace!(
                            winner = %candidate.kind,
                            loser = %current.kind,
                            "Overlapping span replaced open span"
                        );
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        kept.extend(open);

        ResolvedSpanSet::from_sorted_disjoint(kept)
    }

    /// Total order on priority keys: `Greater` means `a` wins over `b`
    fn compare(&self, a: &Span, b: &Span) -> Ordering {
        a.confidence
            .total_cmp(&b.confidence)
            .then_with(|| self.priority.rank(b.kind).cmp(&self.priority.rank(a.kind)))
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
            .then_with(|| b.kind.cmp(&a.kind))
            .then_with(|| b.end.cmp(&a.end))
    }
}

fn source_rank(source: SpanSource) -> u8 {
    match source {
        SpanSource::Ner => 1,
        SpanSource::Regex => 0,
    }
}
