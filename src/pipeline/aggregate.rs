//! Monthly aggregation of classified reviews.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::pipeline::types::{ClassifiedReview, SentimentLabel};

/// Per-month summary of a filtered review subset.
///
/// `label_counts` always holds every label (zero when absent) and its values
/// sum to `sample_reviews.len()`. `mean_confidence` is `None` for an empty
/// bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub month: String,
    pub label_counts: BTreeMap<SentimentLabel, usize>,
    pub mean_confidence: Option<f64>,
    pub sample_reviews: Vec<ClassifiedReview>,
}

impl AggregateBucket {
    pub fn is_empty(&self) -> bool {
        self.sample_reviews.is_empty()
    }

    pub fn count(&self, label: SentimentLabel) -> usize {
        self.label_counts.get(&label).copied().unwrap_or(0)
    }
}

/// Aggregate the reviews whose month is exactly `month`.
///
/// An empty match is a valid bucket, not an error.
pub fn aggregate(reviews: &[ClassifiedReview], month: &str) -> AggregateBucket {
    let sample_reviews: Vec<ClassifiedReview> = reviews
        .iter()
        .filter(|r| r.review.month == month)
        .cloned()
        .collect();

    let mut label_counts: BTreeMap<SentimentLabel, usize> =
        SentimentLabel::ALL.iter().map(|label| (*label, 0)).collect();
    for review in &sample_reviews {
        *label_counts.entry(review.label()).or_insert(0) += 1;
    }

    let mean_confidence = mean_confidence(&sample_reviews);

    debug!(
        month,
        count = sample_reviews.len(),
        mean_confidence = ?mean_confidence,
        "Aggregated month"
    );

    AggregateBucket {
        month: month.to_string(),
        label_counts,
        mean_confidence,
        sample_reviews,
    }
}

/// Arithmetic mean of confidences, `None` when empty.
fn mean_confidence(reviews: &[ClassifiedReview]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }

    // Summed in sorted order so the result is independent of input order.
    let mut confidences: Vec<f64> = reviews.iter().map(|r| r.confidence()).collect();
    confidences.sort_by(f64::total_cmp);
    Some(confidences.iter().sum::<f64>() / confidences.len() as f64)
}

/// Distinct months present in `reviews`, in first-appearance order.
pub fn available_months(reviews: &[ClassifiedReview]) -> Vec<String> {
    let mut months: Vec<String> = Vec::new();
    for review in reviews {
        if !months.contains(&review.review.month) {
            months.push(review.review.month.clone());
        }
    }
    months
}
