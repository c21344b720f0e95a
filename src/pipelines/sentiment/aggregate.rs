use serde::Serialize;

use super::classifier::{Classification, SentimentLabel};

/// Number of results per tracked category. `UNKNOWN` is not tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    /// `POSITIVE` results.
    pub positive: usize,
    /// `NEGATIVE` results.
    pub negative: usize,
    /// `NEUTRAL` results, from any source.
    pub neutral: usize,
}

impl SentimentCounts {
    /// Count for `label`. Always 0 for `UNKNOWN`.
    pub fn get(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Unknown => 0,
        }
    }

    /// Sum of the three tracked categories.
    pub fn tracked(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Share of all results per tracked category, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SentimentPercentages {
    /// Percentage of `POSITIVE` results.
    pub positive: f64,
    /// Percentage of `NEGATIVE` results.
    pub negative: f64,
    /// Percentage of `NEUTRAL` results.
    pub neutral: f64,
}

/// Counts and percentages over one batch of results.
///
/// Percentages use every result as the denominator, `UNKNOWN` included, so they only sum
/// to 100 when nothing failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SentimentSummary {
    /// Per-category counts.
    pub counts: SentimentCounts,
    /// Per-category percentages in `[0, 100]`.
    pub percentages: SentimentPercentages,
    /// Number of results summarized, the percentage denominator.
    pub total: usize,
}

impl SentimentSummary {
    /// Results that were counted in no category.
    pub fn unknown(&self) -> usize {
        self.total.saturating_sub(self.counts.tracked())
    }
}

impl std::fmt::Display for SentimentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "positive: {} ({:.2}%), negative: {} ({:.2}%), neutral: {} ({:.2}%)",
            self.counts.positive,
            self.percentages.positive,
            self.counts.negative,
            self.percentages.negative,
            self.counts.neutral,
            self.percentages.neutral,
        )
    }
}

/// Reduce classification results to a [`SentimentSummary`].
///
/// An empty input gives all-zero counts and percentages.
pub fn aggregate<'a, I>(results: I) -> SentimentSummary
where
    I: IntoIterator<Item = &'a Classification>,
{
    let mut counts = SentimentCounts::default();
    let mut total = 0usize;

    for result in results {
        total += 1;
        match result.label {
            SentimentLabel::Positive => counts.positive += 1,
            SentimentLabel::Negative => counts.negative += 1,
            SentimentLabel::Neutral => counts.neutral += 1,
            SentimentLabel::Unknown => {}
        }
    }

    let percent = |count: usize| {
        if total == 0 {
            0.0
        } else {
            100.0 * count as f64 / total as f64
        }
    };

    SentimentSummary {
        percentages: SentimentPercentages {
            positive: percent(counts.positive),
            negative: percent(counts.negative),
            neutral: percent(counts.neutral),
        },
        counts,
        total,
    }
}
