//! Pattern rule engine
//!
//! The second masking layer: an ordered list of regular-expression
//! substitutions for domain-specific identifiers (policy and claim numbers,
//! SSNs, MRNs, cards, ZIP codes, dates that keep their year, vehicle ids and
//! a numeric catch-all).
//!
//! Rules run strictly in order and each rule rewrites the output of the
//! previous one. Within a rule the substitution is global, leftmost-first,
//! non-overlapping and non-recursive. Given the same input and rule list the
//! output is reproducible byte for byte.
//!
//! Every configuration problem (bad pattern, bad template, duplicate name,
//! fallback rule out of place) is reported by [`RuleSet::new`] at load time.

pub mod library;

use crate::deid::models::RuleHit;
use crate::domain::DeidError;
use fancy_regex::{Expander, Regex};
use serde::Deserialize;
use std::collections::HashSet;

pub use library::{builtin_library_text, load_rule_set, RuleLibrary};

/// Rule definition as written in a rule library
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    /// Unique rule name
    pub name: String,
    /// Regular expression
    pub pattern: String,
    /// Replacement template (`${1}`, `${name}`, `$$` for a literal dollar)
    pub replacement: String,
    /// Explicit position; either every rule sets it or none does
    #[serde(default)]
    pub order: Option<i32>,
    /// Case-insensitive matching
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
    /// Catch-all rule that must run after every specific rule
    #[serde(default)]
    pub fallback: bool,
    /// Free-form note
    #[serde(default)]
    pub description: Option<String>,
}

fn default_case_insensitive() -> bool {
    true
}

/// Compiled substitution rule
#[derive(Debug, Clone)]
pub struct RulePattern {
    name: String,
    regex: Regex,
    replacement: String,
    order: i32,
    fallback: bool,
}

impl RulePattern {
    /// Compile a single rule definition
    ///
    /// `position` is used as the order when the definition has none.
    pub fn compile(def: &RuleDefinition, position: usize) -> Result<Self, DeidError> {
        if def.name.trim().is_empty() {
            return Err(DeidError::invalid_rule(
                format!("#{position}"),
                "rule name cannot be empty",
            ));
        }

        let source = if def.case_insensitive {
            format!("(?i){}", def.pattern)
        } else {
            def.pattern.clone()
        };
        let regex =
            Regex::new(&source).map_err(|e| DeidError::invalid_rule(&def.name, e.to_string()))?;

        Expander::default()
            .check(&def.replacement, &regex)
            .map_err(|e| {
                DeidError::invalid_rule(&def.name, format!("invalid replacement template: {e}"))
            })?;

        let matches_empty = regex
            .is_match("")
            .map_err(|e| DeidError::invalid_rule(&def.name, e.to_string()))?;
        if matches_empty {
            return Err(DeidError::invalid_rule(
                &def.name,
                "pattern matches the empty string",
            ));
        }

        Ok(Self {
            name: def.name.clone(),
            regex,
            replacement: def.replacement.clone(),
            order: def.order.unwrap_or(position as i32),
            fallback: def.fallback,
        })
    }

    /// Rule name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective order
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Replacement template
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Whether this is a catch-all rule
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Apply the rule once over `text`, returning the rewritten text and the
    /// number of substitutions
    pub fn apply(&self, text: &str) -> Result<(String, usize), DeidError> {
        let expander = Expander::default();
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut count = 0;

        for caps in self.regex.captures_iter(text) {
            let caps = caps.map_err(|e| DeidError::RuleExecution {
                rule: self.name.clone(),
                reason: e.to_string(),
            })?;
            let Some(whole) = caps.get(0) else {
                continue;
            };
            output.push_str(&text[last..whole.start()]);
            expander.append_expansion(&mut output, &self.replacement, &caps);
            last = whole.end();
            count += 1;
        }

        if count == 0 {
            return Ok((text.to_string(), 0));
        }
        output.push_str(&text[last..]);
        Ok((output, count))
    }
}

/// Text produced by the rule pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePassOutput {
    /// Rewritten text
    pub text: String,
    /// Rules that made at least one substitution, in application order
    pub hits: Vec<RuleHit>,
}

/// Immutable, ordered rule list
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<RulePattern>,
}

impl RuleSet {
    /// Compile and validate rule definitions
    ///
    /// Rules keep their declaration order unless every definition carries an
    /// explicit `order`, in which case they are sorted by it.
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::InvalidRuleConfig`] if a pattern or template is
    /// malformed, a name or explicit order repeats, only some rules have an
    /// explicit order, or a fallback rule precedes a specific rule.
    pub fn new(definitions: &[RuleDefinition]) -> Result<Self, DeidError> {
        let explicit = definitions.iter().filter(|d| d.order.is_some()).count();
        if explicit != 0 && explicit != definitions.len() {
            return Err(DeidError::invalid_rule(
                "rules",
                "either every rule sets `order` or none does",
            ));
        }

        let mut names = HashSet::new();
        let mut orders = HashSet::new();
        let mut rules = Vec::with_capacity(definitions.len());

        for (position, def) in definitions.iter().enumerate() {
            if !names.insert(def.name.as_str()) {
                return Err(DeidError::invalid_rule(&def.name, "duplicate rule name"));
            }
            if let Some(order) = def.order {
                if !orders.insert(order) {
                    return Err(DeidError::invalid_rule(
                        &def.name,
                        format!("order {order} is used by another rule"),
                    ));
                }
            }
            rules.push(RulePattern::compile(def, position)?);
        }

        rules.sort_by_key(RulePattern::order);

        if let Some(pos) = rules.iter().position(RulePattern::is_fallback) {
            if let Some(specific) = rules[pos..].iter().find(|r| !r.is_fallback()) {
                return Err(DeidError::invalid_rule(
                    &rules[pos].name,
                    format!(
                        "fallback rule must run after every specific rule, but '{}' follows it",
                        specific.name
                    ),
                ));
            }
        }

        tracing::debug!(rules = rules.len(), "Compiled rule set");
        Ok(Self { rules })
    }

    /// Rules in application order
    pub fn rules(&self) -> &[RulePattern] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order
    pub fn apply(&self, text: &str) -> Result<RulePassOutput, DeidError> {
        let mut current = text.to_string();
        let mut hits = Vec::new();

        for rule in &self.rules {
            let (next, count) = rule.apply(&current)?;
            if count > 0 {
                tracing::trace!(rule = %rule.name, count, "Rule applied");
                hits.push(RuleHit {
                    rule: rule.name.clone(),
                    count,
                });
                current = next;
            }
        }

        Ok(RulePassOutput {
            text: current,
            hits,
        })
    }
}

/// Apply `rules` to `text` in order, returning only the rewritten text
pub fn apply_rules(text: &str, rules: &RuleSet) -> Result<String, DeidError> {
    rules.apply(text).map(|out| out.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, pattern: &str, replacement: &str) -> RuleDefinition {
        RuleDefinition {
            name: name.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            order: None,
            case_insensitive: true,
            fallback: false,
            description: None,
        }
    }

    #[test]
    fn test_rules_apply_in_declared_order() {
        let specific_first = RuleSet::new(&[
            def("policy", r"\bPOL-\d{8}\b", "[POLICY_ID]"),
            def("digits", r"\d{5,}", "[NUM]"),
        ])
        .unwrap();
        let generic_first = RuleSet::new(&[
            def("digits", r"\d{5,}", "[NUM]"),
            def("policy", r"\bPOL-\d{8}\b", "[POLICY_ID]"),
        ])
        .unwrap();

        let text = "policy POL-12345678";
        assert_eq!(apply_rules(text, &specific_first).unwrap(), "policy [POLICY_ID]");
        assert_eq!(apply_rules(text, &generic_first).unwrap(), "policy POL-[NUM]");
    }

    #[test]
    fn test_explicit_order_sorts_rules() {
        let mut a = def("a", "x", "1");
        a.order = Some(20);
        let mut b = def("b", "y", "2");
        b.order = Some(10);
        let set = RuleSet::new(&[a, b]).unwrap();
        let names: Vec<_> = set.rules().iter().map(RulePattern::name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_mixed_explicit_order_rejected() {
        let mut a = def("a", "x", "1");
        a.order = Some(1);
        let err = RuleSet::new(&[a, def("b", "y", "2")]).unwrap_err();
        assert!(matches!(err, DeidError::InvalidRuleConfig { .. }));
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut a = def("a", "x", "1");
        a.order = Some(1);
        let mut b = def("b", "y", "2");
        b.order = Some(1);
        assert!(RuleSet::new(&[a, b]).is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = RuleSet::new(&[def("a", "x", "1"), def("a", "y", "2")]).unwrap_err();
        assert_eq!(err, DeidError::invalid_rule("a", "duplicate rule name"));
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let err = RuleSet::new(&[def("broken", r"(\d{3}", "x")]).unwrap_err();
        assert!(matches!(err, DeidError::InvalidRuleConfig { ref rule, .. } if rule == "broken"));
    }

    #[test]
    fn test_template_referencing_missing_group_rejected() {
        let err = RuleSet::new(&[def("zip", r"\b(\d{3})\d{2}\b", "${2}[ZIP]")]).unwrap_err();
        assert!(matches!(err, DeidError::InvalidRuleConfig { ref reason, .. } if reason.contains("template")));
    }

    #[test]
    fn test_empty_match_pattern_rejected() {
        assert!(RuleSet::new(&[def("star", r"\d*", "[N]")]).is_err());
    }

    #[test]
    fn test_fallback_must_be_last() {
        let mut fallback = def("fallback", r"\d{5,}", "[NUM]");
        fallback.fallback = true;
        let err = RuleSet::new(&[fallback.clone(), def("ssn", r"\d{3}-\d{2}-\d{4}", "[SSN]")])
            .unwrap_err();
        assert!(matches!(err, DeidError::InvalidRuleConfig { ref rule, .. } if rule == "fallback"));

        assert!(RuleSet::new(&[def("ssn", r"\d{3}-\d{2}-\d{4}", "[SSN]"), fallback]).is_ok());
    }

    #[test]
    fn test_capture_group_replacement() {
        let set = RuleSet::new(&[def("zip", r"\b(\d{3})\d{2,4}\b", "${1}[ZIP]")]).unwrap();
        assert_eq!(apply_rules("mail to 90210", &set).unwrap(), "mail to 902[ZIP]");
    }

    #[test]
    fn test_case_insensitive_flag() {
        let set = RuleSet::new(&[def("mrn", r"\bMRN\d{3,10}\b", "[MRN]")]).unwrap();
        assert_eq!(apply_rules("chart mrn12345", &set).unwrap(), "chart [MRN]");

        let mut strict = def("mrn", r"\bMRN\d{3,10}\b", "[MRN]");
        strict.case_insensitive = false;
        let set = RuleSet::new(&[strict]).unwrap();
        assert_eq!(apply_rules("chart mrn12345", &set).unwrap(), "chart mrn12345");
    }

    #[test]
    fn test_substitution_is_not_recursive() {
        // The replacement contains text the pattern matches; it must not be
        // re-scanned within the same rule.
        let set = RuleSet::new(&[def("echo", r"\d{3}", "123-")]).unwrap();
        assert_eq!(apply_rules("555", &set).unwrap(), "123-");
    }

    #[test]
    fn test_hits_reported_in_order() {
        let set = RuleSet::new(&[
            def("ssn", r"\b\d{3}-\d{2}-\d{4}\b", "[SSN]"),
            def("unused", r"zzz", "[Z]"),
            def("num", r"\b\d{5,}\b", "[NUM]"),
        ])
        .unwrap();
        let out = set.apply("123-45-6789 and 98765 and 11111").unwrap();
        assert_eq!(out.text, "[SSN] and [NUM] and [NUM]");
        assert_eq!(
            out.hits,
            vec![
                RuleHit {
                    rule: "ssn".to_string(),
                    count: 1
                },
                RuleHit {
                    rule: "num".to_string(),
                    count: 2
                },
            ]
        );
    }
}
