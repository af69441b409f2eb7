//! Transcript domain model
//!
//! A transcript is the immutable input of the de-identification pipeline.
//! Its text is guaranteed to be valid UTF-8, so span offsets are only ever
//! computed on valid text.

use super::errors::DeidError;
use super::ids::{LanguageTag, TranscriptId};
use serde::{Deserialize, Serialize};

/// Immutable call transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    id: TranscriptId,
    text: String,
    #[serde(default)]
    language: LanguageTag,
}

impl Transcript {
    /// Create a transcript from already-decoded text
    pub fn new(id: TranscriptId, text: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            id,
            text: text.into(),
            language,
        }
    }

    /// Create a transcript from raw bytes, rejecting invalid UTF-8
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::Encoding`] with the offset of the first invalid
    /// byte sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// use callscrub::domain::{LanguageTag, Transcript, TranscriptId};
    ///
    /// let id = TranscriptId::new("call-1").unwrap();
    /// assert!(Transcript::from_bytes(id.clone(), b"hello", LanguageTag::default()).is_ok());
    /// assert!(Transcript::from_bytes(id, &[0x66, 0xff, 0x6f], LanguageTag::default()).is_err());
    /// ```
    pub fn from_bytes(
        id: TranscriptId,
        bytes: &[u8],
        language: LanguageTag,
    ) -> Result<Self, DeidError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            DeidError::Encoding(format!(
                "transcript {id} is not valid UTF-8 (first invalid byte at offset {})",
                e.valid_up_to()
            ))
        })?;
        Ok(Self::new(id, text, language))
    }

    /// Transcript identifier
    pub fn id(&self) -> &TranscriptId {
        &self.id
    }

    /// Transcript text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Declared language
    pub fn language(&self) -> &LanguageTag {
        &self.language
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_valid_multibyte() {
        let id = TranscriptId::new("t1").unwrap();
        let t = Transcript::from_bytes(id, "₹1,25,000 out of pocket".as_bytes(), LanguageTag::default())
            .unwrap();
        assert!(t.text().starts_with('₹'));
        assert_eq!(t.language().as_str(), "en");
    }

    #[test]
    fn test_from_bytes_invalid_reports_offset() {
        let id = TranscriptId::new("t2").unwrap();
        let err = Transcript::from_bytes(id, &[b'o', b'k', 0xc3], LanguageTag::default())
            .unwrap_err();
        assert!(matches!(err, DeidError::Encoding(ref msg) if msg.contains("offset 2")));
    }

    #[test]
    fn test_deserialize_defaults_language() {
        let t: Transcript =
            serde_json::from_str(r#"{"id": "c-9", "text": "hi"}"#).unwrap();
        assert_eq!(t.language(), &LanguageTag::default());
        assert_eq!(t.id().as_str(), "c-9");
    }
}
