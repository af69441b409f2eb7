//! Secret handling for credentials
//!
//! The analyzer API key is held in a [`SecretString`]: memory is zeroed on
//! drop, `Debug` output is redacted, and reading the value requires an
//! explicit `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use callscrub::config::{secret_string, SecretString};
//! use secrecy::ExposeSecret;
//!
//! let api_key: SecretString = secret_string("analyzer-key".to_string());
//! assert_eq!(api_key.expose_secret(), "analyzer-key");
//! assert!(!format!("{api_key:?}").contains("analyzer-key"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String newtype that satisfies the `secrecy` marker traits
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Whether the value is empty or only whitespace
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A zeroizing, redacted string
pub type SecretString = Secret<SecretValue>;

/// Wrap a string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Wrap an optional string, dropping blank values
///
/// ```rust
/// use callscrub::config::secret_string_opt;
///
/// assert!(secret_string_opt(Some("analyzer-key".to_string())).is_some());
/// assert!(secret_string_opt(Some("  ".to_string())).is_none());
/// assert!(secret_string_opt(None).is_none());
/// ```
#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(secret_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("bearer-token-123".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("bearer-token-123"));
    }

    #[test]
    fn test_blank_values() {
        assert!(secret_string(" ".to_string()).expose_secret().is_blank());
        assert!(secret_string_opt(Some(String::new())).is_none());
    }

    #[test]
    fn test_secret_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            api_key: Option<SecretString>,
        }

        let section: Section = toml::from_str("api_key = \"k-42\"").unwrap();
        assert_eq!(section.api_key.unwrap().expose_secret(), "k-42");

        let section: Section = toml::from_str("").unwrap();
        assert!(section.api_key.is_none());
    }
}
