//! Domain identifier types with validation
//!
//! Newtype wrappers for transcript identifiers and language tags. Each type
//! validates its format on construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transcript identifier newtype wrapper
///
/// Identifies one call transcript within a batch. Any non-blank string is
/// accepted; batches without ids get a generated UUID.
///
/// # Examples
///
/// ```
/// use callscrub::domain::ids::TranscriptId;
/// use std::str::FromStr;
///
/// let id = TranscriptId::from_str("call-2025-06-24-001").unwrap();
/// assert_eq!(id.as_str(), "call-2025-06-24-001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptId(String);

impl TranscriptId {
    /// Creates a new TranscriptId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(TranscriptId)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Transcript ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Generates a random (v4 UUID) transcript identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the transcript ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TranscriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TranscriptId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TranscriptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Language tag newtype wrapper
///
/// A lowercase BCP-47 style primary tag with an optional region subtag
/// (`en`, `en-us`, `de`). Defaults to `en`.
///
/// # Examples
///
/// ```
/// use callscrub::domain::ids::LanguageTag;
///
/// let tag = LanguageTag::new("EN-us").unwrap();
/// assert_eq!(tag.as_str(), "en-us");
/// assert_eq!(LanguageTag::default().as_str(), "en");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Creates a new LanguageTag, normalizing to lowercase
    pub fn new(tag: impl Into<String>) -> Result<Self, String> {
        let tag = tag.into().trim().to_lowercase();
        let mut parts = tag.split('-');
        let primary = parts.next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(format!("Invalid language tag: '{tag}'"));
        }
        for part in parts {
            if part.is_empty() || part.len() > 8 || !part.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(format!("Invalid language tag: '{tag}'"));
            }
        }
        Ok(Self(tag))
    }

    /// Returns the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LanguageTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}
