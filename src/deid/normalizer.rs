//! Placeholder normalization
//!
//! Downstream summarizers read `[PERSON]` and `[ORG]` poorly. The normalizer
//! swaps placeholder tokens for short natural-language fillers ("the
//! customer", "the hospital") and can collapse runs of whitespace first.

use crate::domain::DeidError;

/// Default token to filler mapping
pub const DEFAULT_MAPPING: &[(&str, &str)] = &[
    ("[PERSON]", "the customer"),
    ("[ORG]", "the hospital"),
    ("[PHONE]", "the phone number"),
    ("[EMAIL]", "the email address"),
    ("[DATE_TIME]", "the date"),
    ("[POLICY_ID]", "the policy"),
];

/// Placeholder token rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    mapping: Vec<(String, String)>,
    collapse_whitespace: bool,
}

impl Normalizer {
    /// Build a normalizer from `(token, filler)` pairs
    ///
    /// Tokens must be non-empty and must not contain or partially overlap one
    /// another, and no filler may contain a token. Under those conditions the
    /// result does not depend on the order of the pairs.
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::InvalidRuleConfig`] naming the offending token.
    pub fn new(mapping: Vec<(String, String)>) -> Result<Self, DeidError> {
        for (i, (token, _)) in mapping.iter().enumerate() {
            if token.is_empty() {
                return Err(DeidError::invalid_rule(
                    "normalizer",
                    "placeholder token cannot be empty",
                ));
            }
            for (j, (other, filler)) in mapping.iter().enumerate() {
                if filler.contains(token.as_str()) {
                    return Err(DeidError::invalid_rule(
                        token,
                        format!("filler for {other} contains the token"),
                    ));
                }
                if i != j && (other.contains(token.as_str()) || overlaps(token, other)) {
                    return Err(DeidError::invalid_rule(
                        token,
                        format!("token overlaps {other}"),
                    ));
                }
            }
        }

        Ok(Self {
            mapping,
            collapse_whitespace: false,
        })
    }

    /// Also collapse whitespace runs to a single space and trim
    pub fn with_collapse_whitespace(mut self, enabled: bool) -> Self {
        self.collapse_whitespace = enabled;
        self
    }

    /// Token to filler pairs
    pub fn mapping(&self) -> &[(String, String)] {
        &self.mapping
    }

    /// Rewrite every token occurrence in `text`
    pub fn normalize(&self, text: &str) -> String {
        let mut out = if self.collapse_whitespace {
            collapse_whitespace(text)
        } else {
            text.to_string()
        };
        for (token, filler) in &self.mapping {
            if out.contains(token.as_str()) {
                out = out.replace(token.as_str(), filler);
            }
        }
        out
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            mapping: DEFAULT_MAPPING
                .iter()
                .map(|(t, f)| (t.to_string(), f.to_string()))
                .collect(),
            collapse_whitespace: false,
        }
    }
}

/// Replace every run of whitespace with a single space and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a proper suffix of `a` is a prefix of `b`
fn overlaps(a: &str, b: &str) -> bool {
    a.char_indices()
        .skip(1)
        .any(|(i, _)| b.starts_with(&a[i..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_default_mapping() {
        let out = Normalizer::default()
            .normalize("[PERSON] called [ORG] about [POLICY_ID] on [DATE_TIME]");
        assert_eq!(
            out,
            "the customer called the hospital about the policy on the date"
        );
    }

    #[test]
    fn test_unmapped_tokens_untouched() {
        let out = Normalizer::default().normalize("born [DATE-1981] near 902[ZIP]");
        assert_eq!(out, "born [DATE-1981] near 902[ZIP]");
    }

    #[test]
    fn test_order_independent() {
        let forward = Normalizer::new(pairs(&[("[A]", "alpha"), ("[B]", "beta")])).unwrap();
        let reverse = Normalizer::new(pairs(&[("[B]", "beta"), ("[A]", "alpha")])).unwrap();
        let text = "[A] [B] [A][B]";
        assert_eq!(forward.normalize(text), reverse.normalize(text));
        assert_eq!(forward.normalize(text), "alpha beta alphabeta");
    }

    #[test]
    fn test_contained_token_rejected() {
        let err = Normalizer::new(pairs(&[("[PERSON]", "x"), ("PERSON", "y")])).unwrap_err();
        assert!(matches!(err, DeidError::InvalidRuleConfig { ref rule, .. } if rule == "PERSON"));
    }

    #[test]
    fn test_partially_overlapping_tokens_rejected() {
        assert!(Normalizer::new(pairs(&[("<A|", "x"), ("|B>", "y")])).is_err());
    }

    #[test]
    fn test_filler_containing_token_rejected() {
        assert!(Normalizer::new(pairs(&[("[X]", "see [Y]"), ("[Y]", "why")])).is_err());
        assert!(Normalizer::new(pairs(&[("[X]", "[X] again")])).is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(Normalizer::new(pairs(&[("", "nothing")])).is_err());
    }

    #[test]
    fn test_collapse_whitespace() {
        let n = Normalizer::default().with_collapse_whitespace(true);
        assert_eq!(
            n.normalize("  hello \n\t [PERSON]   there  "),
            "hello the customer there"
        );
        assert_eq!(collapse_whitespace("\n\n"), "");
    }
}
