//! Per-month artifacts handed to the presentation layer.
//!
//! The core renders nothing; it hands over exactly four things per month:
//! the review rows, the label counts, the mean confidence as a formatted
//! percentage (or an explicit no-data marker), and the concatenated review
//! text for a word cloud.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::pipeline::aggregate::AggregateBucket;
use crate::pipeline::types::{ClassifiedReview, SentimentLabel};

/// Mean confidence as displayed: a percentage, or nothing to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConfidenceMetric {
    Percent(String),
    NoData,
}

impl ConfidenceMetric {
    pub fn from_mean(mean: Option<f64>) -> Self {
        match mean {
            Some(m) => Self::Percent(format_percent(m)),
            None => Self::NoData,
        }
    }
}

impl fmt::Display for ConfidenceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => f.write_str(p),
            Self::NoData => f.write_str("no data"),
        }
    }
}

/// Format a fraction as a two-decimal percentage, e.g. `0.825` → `"82.50%"`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Everything the presentation layer needs for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub month: String,
    pub rows: Vec<ClassifiedReview>,
    pub label_counts: BTreeMap<SentimentLabel, usize>,
    pub mean_confidence: ConfidenceMetric,
    pub word_cloud_text: String,
}

impl MonthView {
    pub fn from_bucket(bucket: AggregateBucket) -> Self {
        let word_cloud_text = bucket
            .sample_reviews
            .iter()
            .map(|r| r.review.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            month: bucket.month,
            label_counts: bucket.label_counts,
            mean_confidence: ConfidenceMetric::from_mean(bucket.mean_confidence),
            rows: bucket.sample_reviews,
            word_cloud_text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::aggregate;
    use crate::pipeline::types::{Review, Sentiment};
    use chrono::NaiveDate;

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(0.825), "82.50%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(0.123456), "12.35%");
    }

    #[test]
    fn metric_display() {
        assert_eq!(ConfidenceMetric::from_mean(Some(0.5)).to_string(), "50.00%");
        assert_eq!(ConfidenceMetric::from_mean(None).to_string(), "no data");
    }

    #[test]
    fn view_joins_text_in_row_order() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        let reviews = vec![
            ClassifiedReview::new(
                Review::new("a", "Great product!", 5.0, date),
                Sentiment::new(SentimentLabel::Positive, 1.0),
            ),
            ClassifiedReview::new(
                Review::new("b", "Awful.", 1.0, date),
                Sentiment::new(SentimentLabel::Negative, 0.5),
            ),
        ];

        let view = MonthView::from_bucket(aggregate(&reviews, "January"));
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.word_cloud_text, "Great product! Awful.");
        assert_eq!(view.mean_confidence, ConfidenceMetric::Percent("75.00%".into()));
        assert_eq!(view.label_counts[&SentimentLabel::Positive], 1);
    }

    #[test]
    fn empty_view_signals_no_data() {
        let view = MonthView::from_bucket(aggregate(&[], "May"));
        assert!(view.is_empty());
        assert_eq!(view.word_cloud_text, "");
        assert_eq!(view.mean_confidence, ConfidenceMetric::NoData);
        assert_eq!(view.label_counts[&SentimentLabel::Negative], 0);
    }

    #[test]
    fn metric_serializes_tagged() {
        let json = serde_json::to_value(ConfidenceMetric::NoData).unwrap();
        assert_eq!(json["kind"], "no_data");
    }
}
