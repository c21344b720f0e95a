use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::aggregate::{aggregate, SentimentSummary};
use super::classifier::{check_model_output, Classification, SentimentClassifier, SentimentLabel};
use super::resolver::NeutralOverrideResolver;
use crate::config::FeedbackConfig;
use crate::error::{PipelineError, Result};
use crate::pipelines::stats::{PipelineStats, PipelineStatsBuilder};

// ============ Output types ============

/// How a result was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A neutral phrase matched; the classifier was not called.
    Override,
    /// The classifier's answer, unchanged.
    Model,
    /// The classifier scored below the threshold; relabelled `NEUTRAL`, score kept.
    LowConfidence,
    /// Classification failed; the result is `UNKNOWN`.
    Failed,
}

/// Single-text output from `run()`.
#[derive(Debug)]
pub struct Output {
    /// Final classification.
    pub classification: Classification,
    /// How the classification was reached.
    pub origin: Origin,
    /// The contained failure, when `origin` is [`Origin::Failed`].
    pub error: Option<PipelineError>,
    /// Execution statistics.
    pub stats: PipelineStats,
}

/// Single result in batch output.
#[derive(Debug)]
pub struct BatchResult {
    /// Input text.
    pub text: String,
    /// Final classification.
    pub classification: Classification,
    /// How the classification was reached.
    pub origin: Origin,
    /// The contained failure, when `origin` is [`Origin::Failed`].
    pub error: Option<PipelineError>,
}

/// Batch output from `run()`, one result per input in input order.
#[derive(Debug)]
pub struct BatchOutput {
    /// Results for each input.
    pub results: Vec<BatchResult>,
    /// Execution statistics.
    pub stats: PipelineStats,
}

impl BatchOutput {
    /// The classifications alone, in input order.
    pub fn classifications(&self) -> Vec<Classification> {
        self.results.iter().map(|r| r.classification).collect()
    }

    /// Counts and percentages over all results.
    pub fn summary(&self) -> SentimentSummary {
        aggregate(self.results.iter().map(|r| &r.classification))
    }

    /// Input texts whose final label is `label`, in input order.
    pub fn texts_with_label(&self, label: SentimentLabel) -> impl Iterator<Item = &str> + '_ {
        self.results
            .iter()
            .filter(move |r| r.classification.label == label)
            .map(|r| r.text.as_str())
    }
}

struct Resolved {
    classification: Classification,
    origin: Origin,
    error: Option<PipelineError>,
}

impl Resolved {
    fn overridden() -> Self {
        Self {
            classification: Classification::override_neutral(),
            origin: Origin::Override,
            error: None,
        }
    }

    fn failed(error: PipelineError) -> Self {
        Self {
            classification: Classification::unknown(),
            origin: Origin::Failed,
            error: Some(error),
        }
    }
}

// ============ Input trait for type-based dispatch ============

#[doc(hidden)]
pub trait FeedbackInput<'a> {
    /// Output type for `.run()`.
    type Output;

    #[doc(hidden)]
    fn into_texts(self) -> Vec<&'a str>;
    #[doc(hidden)]
    fn convert_output(results: Vec<BatchResult>, stats: PipelineStats) -> Self::Output;
}

impl<'a> FeedbackInput<'a> for &'a str {
    type Output = Output;

    fn into_texts(self) -> Vec<&'a str> {
        vec![self]
    }

    fn convert_output(mut results: Vec<BatchResult>, stats: PipelineStats) -> Self::Output {
        let result = results.pop().unwrap_or_else(|| BatchResult {
            text: String::new(),
            classification: Classification::unknown(),
            origin: Origin::Failed,
            error: Some(PipelineError::Unexpected("No result returned".into())),
        });
        Output {
            classification: result.classification,
            origin: result.origin,
            error: result.error,
            stats,
        }
    }
}

impl<'a> FeedbackInput<'a> for &'a [&'a str] {
    type Output = BatchOutput;

    fn into_texts(self) -> Vec<&'a str> {
        self.to_vec()
    }

    fn convert_output(results: Vec<BatchResult>, stats: PipelineStats) -> Self::Output {
        BatchOutput { results, stats }
    }
}

impl<'a, const N: usize> FeedbackInput<'a> for &'a [&'a str; N] {
    type Output = BatchOutput;

    fn into_texts(self) -> Vec<&'a str> {
        self.as_slice().to_vec()
    }

    fn convert_output(results: Vec<BatchResult>, stats: PipelineStats) -> Self::Output {
        BatchOutput { results, stats }
    }
}

// ============ Pipeline ============

/// Classifies feedback as positive, negative, or neutral.
///
/// For each item, in order:
/// 1. A configured neutral phrase in the text gives `NEUTRAL` with score 1.0. The classifier is
///    not called.
/// 2. Otherwise the classifier runs. A score under the confidence threshold is relabelled
///    `NEUTRAL` with the original score kept; anything else passes through unchanged.
/// 3. A classifier failure gives `UNKNOWN` with score 0.0, is logged, and the batch continues.
///
/// Output always has one result per input, in input order.
///
/// Construct with [`FeedbackPipelineBuilder`](super::FeedbackPipelineBuilder).
///
/// # Examples
///
/// ```rust,no_run
/// # use feedback_sentiment::sentiment::{FeedbackPipelineBuilder, ModernBertSize};
/// # fn main() -> feedback_sentiment::error::Result<()> {
/// let pipeline = FeedbackPipelineBuilder::modernbert(ModernBertSize::Base).build()?;
///
/// let output = pipeline.run(&["Great job!", "I am neither satisfied nor dissatisfied."]);
/// for r in &output.results {
///     println!("{} → {} ({:.2})", r.text, r.classification.label, r.classification.score);
/// }
/// println!("{}", output.summary());
/// # Ok(())
/// # }
/// ```
pub struct FeedbackPipeline<C: SentimentClassifier> {
    pub(crate) classifier: Arc<C>,
    pub(crate) resolver: NeutralOverrideResolver,
    pub(crate) threshold: f32,
    pub(crate) max_concurrency: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) permits: Arc<Semaphore>,
}

impl<C: SentimentClassifier> FeedbackPipeline<C> {
    /// Create a pipeline around `classifier`, failing on invalid configuration.
    pub fn from_config(classifier: C, config: &FeedbackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: Arc::new(classifier),
            resolver: NeutralOverrideResolver::new(&config.neutral_phrases)?,
            threshold: config.confidence_threshold,
            max_concurrency: config.max_concurrency,
            timeout: config.timeout(),
            permits: Arc::new(Semaphore::new(
                config.max_concurrency.min(Semaphore::MAX_PERMITS),
            )),
        })
    }

    /// Classify feedback.
    ///
    /// Single input → [`Output`], batch → [`BatchOutput`]. Never fails: per-item problems
    /// are reported as `UNKNOWN` results.
    pub fn run<'a, I: FeedbackInput<'a>>(&self, input: I) -> I::Output {
        let mut stats = PipelineStats::start();
        let texts = input.into_texts();

        let results = self.resolve_sequential(&texts, &mut stats);
        let stats = stats.finish(results.len());
        log_finished(&stats);

        I::convert_output(results, stats)
    }

    /// Classify a batch and return only the classifications, in input order.
    pub fn classify_batch(&self, items: &[&str]) -> Vec<Classification> {
        self.run(items).classifications()
    }

    /// Scores below this become `NEUTRAL`.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The neutral-phrase resolver.
    pub fn resolver(&self) -> &NeutralOverrideResolver {
        &self.resolver
    }

    /// The wrapped classifier.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Concurrency limit used by [`run_concurrent`](Self::run_concurrent).
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Per-item time limit used by [`run_concurrent`](Self::run_concurrent).
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn resolve_sequential(
        &self,
        texts: &[&str],
        stats: &mut PipelineStatsBuilder,
    ) -> Vec<BatchResult> {
        let mut resolved: Vec<Option<Resolved>> = (0..texts.len()).map(|_| None).collect();
        let mut pending: Vec<usize> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.resolve_without_model(text) {
                Some(r) => resolved[i] = Some(r),
                None => pending.push(i),
            }
        }

        if !pending.is_empty() {
            let pending_texts: Vec<&str> = pending.iter().map(|&i| texts[i]).collect();

            let batch = catch_unwind(AssertUnwindSafe(|| {
                self.classifier.classify_batch(&pending_texts)
            }));

            match batch {
                Ok(Ok(predictions)) => {
                    if predictions.len() != pending.len() {
                        warn!(
                            expected = pending.len(),
                            returned = predictions.len(),
                            "classifier returned the wrong number of results"
                        );
                    }
                    let mut predictions = predictions.into_iter();
                    for &i in &pending {
                        resolved[i] = Some(match predictions.next() {
                            Some(prediction) => self.apply_threshold(prediction),
                            None => self.classify_one(texts[i]),
                        });
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "batched classification failed, retrying items one at a time");
                    for &i in &pending {
                        resolved[i] = Some(self.classify_one(texts[i]));
                    }
                }
                Err(panic) => {
                    warn!(
                        panic = panic_message(panic.as_ref()),
                        "batched classification panicked, retrying items one at a time"
                    );
                    for &i in &pending {
                        resolved[i] = Some(self.classify_one(texts[i]));
                    }
                }
            }
        }

        texts
            .iter()
            .zip(resolved)
            .map(|(text, r)| {
                let r = r.unwrap_or_else(|| {
                    Resolved::failed(PipelineError::Unexpected("Item was never classified".into()))
                });
                settle(text, r, stats)
            })
            .collect()
    }

    /// One classifier call for one text, with a panic contained as a failure.
    fn classify_one(&self, text: &str) -> Resolved {
        match catch_unwind(AssertUnwindSafe(|| self.classifier.classify(text))) {
            Ok(prediction) => self.apply_threshold(prediction),
            Err(panic) => Resolved::failed(PipelineError::Unexpected(format!(
                "Classifier panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// Steps that never touch the classifier: phrase override and blank-text rejection.
    fn resolve_without_model(&self, text: &str) -> Option<Resolved> {
        if let Some(phrase) = self.resolver.matching_phrase(text) {
            debug!(text, phrase, "neutral phrase matched");
            return Some(Resolved::overridden());
        }
        if text.trim().is_empty() {
            return Some(Resolved::failed(PipelineError::InvalidInput(
                "Feedback text is empty".into(),
            )));
        }
        None
    }

    fn apply_threshold(&self, prediction: Result<Classification>) -> Resolved {
        match prediction.and_then(check_model_output) {
            Ok(c) if c.score < self.threshold => Resolved {
                classification: Classification::new(SentimentLabel::Neutral, c.score),
                origin: Origin::LowConfidence,
                error: None,
            },
            Ok(c) => Resolved {
                classification: c,
                origin: Origin::Model,
                error: None,
            },
            Err(e) => Resolved::failed(e),
        }
    }
}

impl<C> FeedbackPipeline<C>
where
    C: SentimentClassifier + Send + Sync + 'static,
{
    /// Classify a batch with classifier calls running in parallel.
    ///
    /// Each call runs on Tokio's blocking pool, at most
    /// [`max_concurrency`](Self::max_concurrency) at a time across all runs on this pipeline.
    /// With a [`timeout`](Self::timeout) set, a call that takes longer gives `UNKNOWN` for that
    /// item. The abandoned call keeps running in the background and holds its slot until the
    /// classifier returns, so later items wait for it rather than exceed the limit.
    ///
    /// Results come back in input order. Must be called from within a Tokio runtime.
    pub async fn run_concurrent(&self, texts: &[&str]) -> BatchOutput {
        let mut stats = PipelineStats::start();

        let resolved: Vec<Resolved> = stream::iter(texts.iter().map(|text| self.resolve_one(text)))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let results: Vec<BatchResult> = texts
            .iter()
            .zip(resolved)
            .map(|(text, r)| settle(text, r, &mut stats))
            .collect();
        let stats = stats.finish(results.len());
        log_finished(&stats);

        BatchOutput { results, stats }
    }

    async fn resolve_one(&self, text: &str) -> Resolved {
        if let Some(r) = self.resolve_without_model(text) {
            return r;
        }

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return Resolved::failed(PipelineError::Unexpected(e.to_string())),
        };

        let classifier = Arc::clone(&self.classifier);
        let owned = text.to_owned();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            classifier.classify(&owned)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => return Resolved::failed(PipelineError::Timeout(limit)),
            },
            None => task.await,
        };

        let prediction = joined
            .map_err(|e| PipelineError::Unexpected(format!("Classifier task failed: {e}")))
            .and_then(|prediction| prediction);
        self.apply_threshold(prediction)
    }
}

fn settle(text: &str, resolved: Resolved, stats: &mut PipelineStatsBuilder) -> BatchResult {
    stats.record(resolved.origin);

    match (&resolved.origin, &resolved.error) {
        (Origin::Failed, Some(e)) => error!(text, error = %e, "failed to classify feedback"),
        (Origin::LowConfidence, _) => debug!(
            text,
            score = resolved.classification.score,
            "low confidence, relabelled neutral"
        ),
        _ => {}
    }

    BatchResult {
        text: text.to_string(),
        classification: resolved.classification,
        origin: resolved.origin,
        error: resolved.error,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn log_finished(stats: &PipelineStats) {
    info!(
        items = stats.items_processed,
        overrides = stats.overrides,
        low_confidence = stats.low_confidence,
        failures = stats.failures,
        elapsed_ms = stats.total_time.as_secs_f64() * 1000.0,
        "feedback batch classified"
    );
}
