use std::time::{Duration, Instant};

use super::sentiment::Origin;

/// Statistics for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Total execution time.
    pub total_time: Duration,
    /// Number of items processed.
    pub items_processed: usize,
    /// Items resolved by a neutral phrase, without calling the classifier.
    pub overrides: usize,
    /// Items relabelled `NEUTRAL` because the classifier score was under the threshold.
    pub low_confidence: usize,
    /// Items that came out `UNKNOWN`.
    pub failures: usize,
}

impl PipelineStats {
    /// Create a new stats tracker (call at start of operation).
    pub(crate) fn start() -> PipelineStatsBuilder {
        PipelineStatsBuilder {
            start_time: Instant::now(),
            overrides: 0,
            low_confidence: 0,
            failures: 0,
        }
    }
}

/// Builder for PipelineStats - tracks timing from creation to finish.
pub(crate) struct PipelineStatsBuilder {
    start_time: Instant,
    overrides: usize,
    low_confidence: usize,
    failures: usize,
}

impl PipelineStatsBuilder {
    pub fn record(&mut self, origin: Origin) {
        match origin {
            Origin::Override => self.overrides += 1,
            Origin::LowConfidence => self.low_confidence += 1,
            Origin::Failed => self.failures += 1,
            Origin::Model => {}
        }
    }

    /// Finalize stats with the number of items processed.
    pub fn finish(self, items_processed: usize) -> PipelineStats {
        PipelineStats {
            total_time: self.start_time.elapsed(),
            items_processed,
            overrides: self.overrides,
            low_confidence: self.low_confidence,
            failures: self.failures,
        }
    }
}
