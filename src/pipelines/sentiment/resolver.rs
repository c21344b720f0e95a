use super::classifier::Classification;
use crate::config::normalize_phrases;
use crate::error::Result;

/// Forces a `NEUTRAL` result for texts containing a configured phrase.
///
/// Matching is a case-insensitive substring test. Phrases are checked in configuration order
/// and the first hit wins; all hits produce the same result.
#[derive(Debug, Clone, Default)]
pub struct NeutralOverrideResolver {
    phrases: Vec<String>,
}

impl NeutralOverrideResolver {
    /// Build a resolver. Fails on blank phrases, which would match every text.
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Result<Self> {
        Ok(Self {
            phrases: normalize_phrases(phrases)?,
        })
    }

    /// The configured phrases, lowercased.
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// The first configured phrase found in `text`, if any.
    pub fn matching_phrase(&self, text: &str) -> Option<&str> {
        if self.phrases.is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| lowered.contains(phrase.as_str()))
            .map(String::as_str)
    }

    /// `NEUTRAL` with score 1.0 on a match, `None` to defer to the classifier.
    pub fn resolve(&self, text: &str) -> Option<Classification> {
        self.matching_phrase(text)
            .map(|_| Classification::override_neutral())
    }
}
