//! Sentiment classification for batches of human-written feedback.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). Wraps a sentiment model with a
//! rule-based neutral override and a confidence threshold, isolates per-item failures, and
//! aggregates the results into counts and percentages.

#![deny(missing_docs)]

// ============ Internal API ============

pub(crate) mod models;
pub(crate) mod pipelines;

// ============ Public API ============

pub mod config;
pub mod error;

pub use pipelines::sentiment;
