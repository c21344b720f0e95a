use std::time::Duration;

use candle_core::Device;

use super::classifier::SentimentClassifier;
use super::pipeline::FeedbackPipeline;
use crate::config::FeedbackConfig;
use crate::error::Result;
use crate::models::modernbert::{ModernBertClassifier, ModernBertSize};
use crate::pipelines::utils::{impl_device_methods, DeviceRequest};

type Loader<C> = Box<dyn FnOnce(Device) -> Result<C> + Send>;

enum ClassifierSource<C> {
    Ready(C),
    Load(Loader<C>),
}

/// Builder for [`FeedbackPipeline`].
///
/// Starts from [`FeedbackConfig::default`]. Configuration is checked in
/// [`build`](Self::build) before any model is loaded.
///
/// # Examples
///
/// ```rust,no_run
/// # use feedback_sentiment::sentiment::{FeedbackPipelineBuilder, ModernBertSize};
/// # fn main() -> feedback_sentiment::error::Result<()> {
/// let pipeline = FeedbackPipelineBuilder::modernbert(ModernBertSize::Base)
///     .confidence_threshold(0.7)
///     .neutral_phrase("it's fine")
///     .cpu()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FeedbackPipelineBuilder<C> {
    source: ClassifierSource<C>,
    config: FeedbackConfig,
    device_request: DeviceRequest,
}

impl FeedbackPipelineBuilder<ModernBertClassifier> {
    /// Classify with a ModernBERT sentiment model, downloaded on `build()`.
    pub fn modernbert(size: ModernBertSize) -> Self {
        Self::with_source(ClassifierSource::Load(Box::new(move |device| {
            ModernBertClassifier::new(size, device)
        })))
    }
}

impl<C: SentimentClassifier> FeedbackPipelineBuilder<C> {
    /// Classify with an already constructed classifier.
    pub fn new(classifier: C) -> Self {
        Self::with_source(ClassifierSource::Ready(classifier))
    }

    fn with_source(source: ClassifierSource<C>) -> Self {
        Self {
            source,
            config: FeedbackConfig::default(),
            device_request: DeviceRequest::default(),
        }
    }

    /// Replace every setting with `config`.
    pub fn config(mut self, config: FeedbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Scores below `threshold` are relabelled `NEUTRAL`. Must be in `[0, 1]`.
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Replace the neutral phrases. An empty list disables the override.
    pub fn neutral_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.neutral_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Add one neutral phrase.
    pub fn neutral_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.config.neutral_phrases.push(phrase.into());
        self
    }

    /// Maximum classifier calls in flight during `run_concurrent`.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.config.max_concurrency = limit;
        self
    }

    /// Per-item classifier time limit during `run_concurrent`, rounded up to whole milliseconds.
    pub fn timeout(mut self, limit: Duration) -> Self {
        let millis = limit.as_micros().div_ceil(1000);
        self.config.timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Validate the configuration, load the classifier if needed, and build the pipeline.
    pub fn build(self) -> Result<FeedbackPipeline<C>> {
        self.config.validate()?;

        let classifier = match self.source {
            ClassifierSource::Ready(classifier) => classifier,
            ClassifierSource::Load(load) => load(self.device_request.resolve()?)?,
        };

        FeedbackPipeline::from_config(classifier, &self.config)
    }
}

impl_device_methods!(FeedbackPipelineBuilder<C>);
