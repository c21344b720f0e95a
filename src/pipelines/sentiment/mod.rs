//! Feedback sentiment pipeline.
//!
//! Classify feedback as `POSITIVE`, `NEGATIVE`, or `NEUTRAL`, then summarize the batch.
//! A rule-based override forces `NEUTRAL` for configured phrases, low-confidence model
//! answers become `NEUTRAL`, and items the model fails on come back `UNKNOWN` instead of
//! aborting the batch.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use feedback_sentiment::sentiment::{FeedbackPipelineBuilder, ModernBertSize};
//!
//! # fn main() -> feedback_sentiment::error::Result<()> {
//! let pipeline = FeedbackPipelineBuilder::modernbert(ModernBertSize::Base).build()?;
//!
//! // Single text - direct access
//! let output = pipeline.run("The workshop was excellent.");
//! println!("{} ({:.2})", output.classification.label, output.classification.score);
//! # Ok(())
//! # }
//! ```
//!
//! # Batches and Summaries
//!
//! ```rust,no_run
//! # use feedback_sentiment::sentiment::{FeedbackPipelineBuilder, ModernBertSize, SentimentLabel};
//! # fn main() -> feedback_sentiment::error::Result<()> {
//! # let pipeline = FeedbackPipelineBuilder::modernbert(ModernBertSize::Base).build()?;
//! let feedback = &[
//!     "My work was highly appreciated in the team meeting.",
//!     "Recognition is not consistent across the team.",
//!     "I am neither satisfied nor dissatisfied with the training sessions.",
//! ];
//!
//! let output = pipeline.run(feedback);
//! let summary = output.summary();
//! println!("{summary}");
//!
//! for text in output.texts_with_label(SentimentLabel::Positive) {
//!     println!("+ {text}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Classifiers
//!
//! Any [`SentimentClassifier`] can back the pipeline, e.g. a remote service client or a test
//! double: `FeedbackPipelineBuilder::new(my_classifier).build()?`.
//!
//! # Supported Models
//!
//! | Model | Sizes | Builder Method |
//! |-------|-------|----------------|
//! | ModernBERT | `Base`, `Large` | [`FeedbackPipelineBuilder::modernbert`] |

// ============ Internal API ============

pub(crate) mod aggregate;
pub(crate) mod builder;
pub(crate) mod classifier;
pub(crate) mod pipeline;
pub(crate) mod resolver;

// ============ Public API ============

pub use crate::models::modernbert::{ModernBertClassifier, ModernBertSize};
pub use crate::pipelines::stats::PipelineStats;
pub use aggregate::{aggregate, SentimentCounts, SentimentPercentages, SentimentSummary};
pub use builder::FeedbackPipelineBuilder;
pub use classifier::{Classification, SentimentClassifier, SentimentLabel};
pub use pipeline::{BatchOutput, BatchResult, FeedbackPipeline, Origin, Output};
pub use resolver::NeutralOverrideResolver;

#[doc(hidden)]
pub use pipeline::FeedbackInput;
