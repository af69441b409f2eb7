//! Rule library loading
//!
//! A rule library is a TOML document with an ordered `[[rules]]` array. The
//! default library is compiled into the binary; a deployment can point
//! `rules.library_path` at its own file instead.

use super::{RuleDefinition, RuleSet};
use crate::domain::{DeidError, Result, ScrubError};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_LIBRARY: &str = include_str!("../../../patterns/transcript_rules.toml");

/// Parsed, not yet compiled, rule library
#[derive(Debug, Clone, Deserialize)]
pub struct RuleLibrary {
    /// Rule definitions in declaration order
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleLibrary {
    /// Parse a library from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, DeidError> {
        toml::from_str(content).map_err(|e| DeidError::invalid_rule("rules", e.to_string()))
    }

    /// Read and parse a library file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScrubError::Configuration(format!(
                "Failed to read rule library {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// The built-in library
    pub fn builtin() -> std::result::Result<Self, DeidError> {
        Self::from_toml_str(DEFAULT_LIBRARY)
    }

    /// Compile into an executable rule set
    pub fn compile(&self) -> std::result::Result<RuleSet, DeidError> {
        if self.rules.is_empty() {
            return Err(DeidError::invalid_rule(
                "rules",
                "rule library contains no rules",
            ));
        }
        RuleSet::new(&self.rules)
    }
}

impl RuleSet {
    /// The built-in transcript rule set
    pub fn builtin() -> std::result::Result<Self, DeidError> {
        RuleLibrary::builtin()?.compile()
    }

    /// Parse and compile a library from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, DeidError> {
        RuleLibrary::from_toml_str(content)?.compile()
    }
}

/// Load the rule set from `path`, or the built-in library when `None`
pub fn load_rule_set(path: Option<&Path>) -> Result<RuleSet> {
    let library = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading rule library");
            RuleLibrary::from_file(path)?
        }
        None => RuleLibrary::builtin()?,
    };
    let rules = library.compile()?;
    tracing::info!(rules = rules.len(), "Rule set ready");
    Ok(rules)
}

/// Raw text of the built-in library, written out by `callscrub init`
pub fn builtin_library_text() -> &'static str {
    DEFAULT_LIBRARY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_library_compiles() {
        let set = RuleSet::builtin().unwrap();
        assert!(set.len() > 20);
        let last = set.rules().last().unwrap();
        assert_eq!(last.name(), "numeric_fallback");
        assert!(last.is_fallback());
    }

    #[test]
    fn test_builtin_rule_names_unique() {
        let library = RuleLibrary::builtin().unwrap();
        let mut names: Vec<_> = library.rules.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), library.rules.len());
    }

    #[test]
    fn test_parse_defaults() {
        let library = RuleLibrary::from_toml_str(
            r#"
[[rules]]
name = "ssn"
pattern = '\b\d{3}-\d{2}-\d{4}\b'
replacement = "[SSN]"
"#,
        )
        .unwrap();
        let rule = &library.rules[0];
        assert!(rule.case_insensitive);
        assert!(!rule.fallback);
        assert!(rule.order.is_none());
    }

    #[test]
    fn test_empty_library_rejected() {
        let library = RuleLibrary::from_toml_str("").unwrap();
        assert!(library.compile().is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = RuleLibrary::from_toml_str("[[rules]]\nname = ").unwrap_err();
        assert!(matches!(err, DeidError::InvalidRuleConfig { ref rule, .. } if rule == "rules"));
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(RuleSet::from_toml_str("[[rules]]\nname = \"x\"\npattern = 'x'\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[rules]]\nname = \"claim\"\npattern = '\\bCLM\\d{{6}}\\b'\nreplacement = \"[CLAIM]\""
        )
        .unwrap();

        let set = load_rule_set(Some(file.path())).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(super::super::apply_rules("ref clm123456", &set).unwrap(), "ref [CLAIM]");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_rule_set(Some(Path::new("/nonexistent/rules.toml"))).unwrap_err();
        assert!(matches!(err, ScrubError::Configuration(_)));
    }
}
