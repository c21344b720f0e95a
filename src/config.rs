//! Pipeline configuration.
//!
//! A [`FeedbackConfig`] can be built in code, or loaded from TOML or JSON:
//!
//! ```toml
//! confidence_threshold = 0.6
//! neutral_phrases = ["neither satisfied nor dissatisfied", "there's room for improvement"]
//! max_concurrency = 4
//! timeout_ms = 5000
//! ```
//!
//! Every field is optional; missing keys fall back to [`FeedbackConfig::default`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Threshold applied when none is configured.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Phrases treated as neutral when none are configured.
pub const DEFAULT_NEUTRAL_PHRASES: &[&str] = &[
    "neither satisfied nor dissatisfied",
    "there's room for improvement",
];

/// Classifier calls allowed in flight by [`run_concurrent`](crate::sentiment::FeedbackPipeline::run_concurrent).
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Settings for a [`FeedbackPipeline`](crate::sentiment::FeedbackPipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Classifier scores below this are relabelled `NEUTRAL`. Must be in `[0, 1]`.
    pub confidence_threshold: f32,
    /// Substrings that force a `NEUTRAL` result without calling the classifier.
    pub neutral_phrases: Vec<String>,
    /// Upper bound on concurrent classifier calls. Must be at least 1.
    pub max_concurrency: usize,
    /// Per-item classifier time limit for concurrent runs, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            neutral_phrases: DEFAULT_NEUTRAL_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_ms: None,
        }
    }
}

impl FeedbackConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|e| PipelineError::Config(format!("Failed to parse JSON config: {e}")))
    }

    /// Load from a file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read '{}': {e}", path.display()))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }

    /// The per-item timeout, if one is set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.confidence_threshold)?;
        normalize_phrases(&self.neutral_phrases)?;

        if self.max_concurrency == 0 {
            return Err(PipelineError::Config(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(PipelineError::Config(
                "timeout_ms must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(PipelineError::Config(format!(
            "confidence_threshold must be within [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

/// Lowercases phrases and drops duplicates, keeping first-seen order.
pub(crate) fn normalize_phrases<S: AsRef<str>>(phrases: &[S]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(phrases.len());
    for phrase in phrases {
        let phrase = phrase.as_ref();
        if phrase.trim().is_empty() {
            return Err(PipelineError::Config(
                "neutral phrases must not be empty".into(),
            ));
        }
        let lowered = phrase.to_lowercase();
        if !normalized.contains(&lowered) {
            normalized.push(lowered);
        }
    }
    Ok(normalized)
}
