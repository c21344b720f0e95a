use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Sentiment category attached to a feedback item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    /// Favourable feedback.
    Positive,
    /// Unfavourable feedback.
    Negative,
    /// Neither, either by override phrase, low model confidence, or the model itself.
    Neutral,
    /// Classification failed for this item.
    Unknown,
}

impl SentimentLabel {
    /// Map a label emitted by a model (`"positive"`, `"NEGATIVE"`, ...) to a category.
    ///
    /// `UNKNOWN` is reserved for failures and is never accepted from a model.
    pub fn parse_model_label(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(PipelineError::Classification(format!(
                "Unrecognised sentiment label '{other}'"
            ))),
        }
    }

    /// Upper-case name, as shown in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A label with its confidence score.
///
/// `score` is in `[0, 1]`. It is fixed at `1.0` for override-neutral results and carries no
/// meaning for `UNKNOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The sentiment category.
    pub label: SentimentLabel,
    /// Confidence score (0.0 to 1.0).
    pub score: f32,
}

impl Classification {
    /// Create a classification.
    pub fn new(label: SentimentLabel, score: f32) -> Self {
        Self { label, score }
    }

    /// The result emitted when a neutral phrase matched.
    pub fn override_neutral() -> Self {
        Self::new(SentimentLabel::Neutral, 1.0)
    }

    /// The result emitted when classification failed.
    pub fn unknown() -> Self {
        Self::new(SentimentLabel::Unknown, 0.0)
    }
}

/// A text sentiment model.
///
/// Implementors classify exactly one text per [`classify`](Self::classify) call and never retry.
/// They only need to emit `POSITIVE` and `NEGATIVE`; neutral handling is done by the pipeline.
///
/// # Examples
///
/// ```rust
/// use feedback_sentiment::error::Result;
/// use feedback_sentiment::sentiment::{Classification, SentimentClassifier, SentimentLabel};
///
/// struct Exclamations;
///
/// impl SentimentClassifier for Exclamations {
///     fn classify(&self, text: &str) -> Result<Classification> {
///         let label = if text.ends_with('!') {
///             SentimentLabel::Positive
///         } else {
///             SentimentLabel::Negative
///         };
///         Ok(Classification::new(label, 0.9))
///     }
/// }
/// ```
pub trait SentimentClassifier {
    /// Classify one text.
    fn classify(&self, text: &str) -> Result<Classification>;

    /// Classify several texts in one call.
    ///
    /// Must return one entry per input, in order. The default calls
    /// [`classify`](Self::classify) once per text; models that can pad and batch override it.
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        Ok(texts.iter().map(|text| self.classify(text)).collect())
    }
}

impl<C: SentimentClassifier + ?Sized> SentimentClassifier for &C {
    fn classify(&self, text: &str) -> Result<Classification> {
        (**self).classify(text)
    }

    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        (**self).classify_batch(texts)
    }
}

impl<C: SentimentClassifier + ?Sized> SentimentClassifier for Box<C> {
    fn classify(&self, text: &str) -> Result<Classification> {
        (**self).classify(text)
    }

    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        (**self).classify_batch(texts)
    }
}

impl<C: SentimentClassifier + ?Sized> SentimentClassifier for std::sync::Arc<C> {
    fn classify(&self, text: &str) -> Result<Classification> {
        (**self).classify(text)
    }

    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        (**self).classify_batch(texts)
    }
}

/// Reject model output the pipeline cannot trust.
pub(crate) fn check_model_output(result: Classification) -> Result<Classification> {
    if result.label == SentimentLabel::Unknown {
        return Err(PipelineError::Classification(
            "Classifier returned the reserved UNKNOWN label".into(),
        ));
    }
    if !result.score.is_finite() || !(0.0..=1.0).contains(&result.score) {
        return Err(PipelineError::Classification(format!(
            "Classifier score {} is outside [0, 1]",
            result.score
        )));
    }
    Ok(result)
}
