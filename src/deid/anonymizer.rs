//! Placeholder anonymizer
//!
//! Rewrites the original text by replacing every resolved span with the fixed
//! placeholder token of its entity kind (`[PERSON]`, `[PHONE]`, ...).
//!
//! The output is built front to back with a cursor into the source text.
//! Span offsets always refer to the untouched original, so replacements that
//! are longer or shorter than the text they replace never shift the position
//! of later spans.

use crate::deid::models::{EntityKind, ResolvedSpanSet};
use crate::domain::DeidError;
use std::collections::HashMap;

/// Entity kind to placeholder token mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMap {
    tokens: HashMap<EntityKind, String>,
}

impl PlaceholderMap {
    /// Default tokens for every kind (`[KIND_LABEL]`)
    pub fn new() -> Self {
        Self {
            tokens: EntityKind::ALL
                .iter()
                .map(|k| (*k, k.default_placeholder()))
                .collect(),
        }
    }

    /// Defaults with configured overrides keyed by entity kind name
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::InvalidRuleConfig`] for unknown kinds or blank
    /// tokens.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self, DeidError> {
        let mut map = Self::new();
        for (name, token) in overrides {
            let kind = name
                .parse::<EntityKind>()
                .map_err(|e| DeidError::invalid_rule("placeholders", e))?;
            if token.trim().is_empty() {
                return Err(DeidError::invalid_rule(
                    "placeholders",
                    format!("placeholder for {kind} cannot be empty"),
                ));
            }
            map.tokens.insert(kind, token.clone());
        }
        Ok(map)
    }

    /// Token for a kind
    pub fn token(&self, kind: EntityKind) -> &str {
        self.tokens.get(&kind).map(String::as_str).unwrap_or("[REDACTED]")
    }

    /// All configured tokens
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.values().map(String::as_str)
    }
}

impl Default for PlaceholderMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Span-to-placeholder rewriter
#[derive(Debug, Clone, Default)]
pub struct Anonymizer {
    placeholders: PlaceholderMap,
}

impl Anonymizer {
    /// Create an anonymizer with a placeholder mapping
    pub fn new(placeholders: PlaceholderMap) -> Self {
        Self { placeholders }
    }

    /// Placeholder mapping in use
    pub fn placeholders(&self) -> &PlaceholderMap {
        &self.placeholders
    }

    /// Replace every resolved span of `text` with its placeholder
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::InvalidSpan`] if a span lies outside `text` or
    /// splits a multi-byte character. Spans produced by the pipeline are
    /// validated against the text before resolution, so this only fires when
    /// a span set is paired with the wrong text.
    ///
    /// # Examples
    ///
    /// ```
    /// use callscrub::deid::anonymizer::Anonymizer;
    /// use callscrub::deid::models::{EntityKind, Span, SpanSource};
    /// use callscrub::deid::resolver::SpanResolver;
    ///
    /// let text = "This is Daniel at HealthSure";
    /// let spans = SpanResolver::default().resolve(vec![
    ///     Span::new(EntityKind::Person, 8, 14, 0.85, SpanSource::Ner),
    ///     Span::new(EntityKind::Organization, 18, 28, 0.7, SpanSource::Ner),
    /// ]);
    /// let out = Anonymizer::default().anonymize(text, &spans).unwrap();
    /// assert_eq!(out, "This is [PERSON] at [ORG]");
    /// ```
    pub fn anonymize(&self, text: &str, spans: &ResolvedSpanSet) -> Result<String, DeidError> {
        if spans.is_empty() {
            return Ok(text.to_string());
        }

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;

        for span in spans {
            if !span.fits(text) || span.start < cursor {
                return Err(DeidError::InvalidSpan {
                    start: span.start,
                    end: span.end,
                    len: text.len(),
                });
            }
            output.push_str(&text[cursor..span.start]);
            output.push_str(self.placeholders.token(span.kind));
            cursor = span.end;
        }
        output.push_str(&text[cursor..]);

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deid::models::{Span, SpanSource};
    use crate::deid::resolver::SpanResolver;

    fn resolve(spans: Vec<Span>) -> ResolvedSpanSet {
        SpanResolver::default().resolve(spans)
    }

    fn find(text: &str, needle: &str) -> (usize, usize) {
        let start = text.find(needle).unwrap();
        (start, start + needle.len())
    }

    #[test]
    fn test_zero_spans_returns_original() {
        let out = Anonymizer::default()
            .anonymize("nothing to hide", &ResolvedSpanSet::empty())
            .unwrap();
        assert_eq!(out, "nothing to hide");
    }

    #[test]
    fn test_placeholders_longer_and_shorter_than_matches() {
        let text = "Al called from anita.verma84@gmail.com about Lotus Care Hospital in Mumbai";
        let (p0, p1) = find(text, "Al");
        let (e0, e1) = find(text, "anita.verma84@gmail.com");
        let (o0, o1) = find(text, "Lotus Care Hospital");
        let (l0, l1) = find(text, "Mumbai");

        let spans = resolve(vec![
            Span::new(EntityKind::Location, l0, l1, 0.85, SpanSource::Ner),
            Span::new(EntityKind::Person, p0, p1, 0.85, SpanSource::Ner),
            Span::new(EntityKind::Organization, o0, o1, 0.85, SpanSource::Ner),
            Span::new(EntityKind::EmailAddress, e0, e1, 1.0, SpanSource::Regex),
        ]);

        let out = Anonymizer::default().anonymize(text, &spans).unwrap();
        assert_eq!(
            out,
            "[PERSON] called from [EMAIL] about [ORG] in [LOCATION]"
        );
    }

    #[test]
    fn test_multibyte_text_offsets() {
        let text = "Müller paid ₹1,25,000 to Zoë";
        let (p0, p1) = find(text, "Müller");
        let (q0, q1) = find(text, "Zoë");
        let spans = resolve(vec![
            Span::new(EntityKind::Person, p0, p1, 0.9, SpanSource::Ner),
            Span::new(EntityKind::Person, q0, q1, 0.9, SpanSource::Ner),
        ]);
        let out = Anonymizer::default().anonymize(text, &spans).unwrap();
        assert_eq!(out, "[PERSON] paid ₹1,25,000 to [PERSON]");
    }

    #[test]
    fn test_span_at_text_edges() {
        let text = "Verma";
        let spans = resolve(vec![Span::new(EntityKind::Person, 0, 5, 0.9, SpanSource::Ner)]);
        assert_eq!(Anonymizer::default().anonymize(text, &spans).unwrap(), "[PERSON]");
    }

    #[test]
    fn test_span_outside_text_is_error() {
        let spans = resolve(vec![Span::new(EntityKind::Person, 2, 50, 0.9, SpanSource::Ner)]);
        let err = Anonymizer::default().anonymize("short", &spans).unwrap_err();
        assert_eq!(
            err,
            DeidError::InvalidSpan {
                start: 2,
                end: 50,
                len: 5
            }
        );
    }

    #[test]
    fn test_custom_placeholder_override() {
        let mut overrides = HashMap::new();
        overrides.insert("PERSON".to_string(), "<NAME>".to_string());
        let map = PlaceholderMap::with_overrides(&overrides).unwrap();
        assert_eq!(map.token(EntityKind::Person), "<NAME>");
        assert_eq!(map.token(EntityKind::Location), "[LOCATION]");
    }

    #[test]
    fn test_invalid_placeholder_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("PERSON".to_string(), "  ".to_string());
        assert!(PlaceholderMap::with_overrides(&overrides).is_err());

        let mut overrides = HashMap::new();
        overrides.insert("SPECIES".to_string(), "[X]".to_string());
        assert!(PlaceholderMap::with_overrides(&overrides).is_err());
    }
}
