//! Shared types for the review pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Full month names indexed by `month0()`.
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Full English month name for a date, e.g. `"January"`.
pub fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

// ── Raw record ──────────────────────────────────────────────────────

/// One review record exactly as a source delivers it.
///
/// Every field is optional here so the ingestion adapter can report
/// which one is missing instead of a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub id: Option<String>,
    pub text: Option<String>,
    pub rating: Option<f64>,
    pub date: Option<String>,
}

// ── Review ──────────────────────────────────────────────────────────

/// A validated review with its derived calendar month.
///
/// Serializes to the same shape sources deliver (`id`, `text`, `rating`,
/// `date`) plus `month`, so a snapshot can be ingested again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub text: String,
    pub rating: f64,
    pub date: NaiveDate,
    pub month: String,
}

impl Review {
    /// Build a review, deriving `month` from `date`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, rating: f64, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            rating,
            date,
            month: month_name(date).to_string(),
        }
    }
}

// ── Sentiment ───────────────────────────────────────────────────────

/// Binary sentiment label. There is no neutral class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    /// Every label, in tally order.
    pub const ALL: [SentimentLabel; 2] = [SentimentLabel::Positive, SentimentLabel::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" | "POS" => Ok(Self::Positive),
            "NEGATIVE" | "NEG" => Ok(Self::Negative),
            other => Err(format!("unknown sentiment label '{other}'")),
        }
    }
}

/// A label and the classifier's confidence in it, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(rename = "sentiment")]
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, confidence: f64) -> Self {
        Self { label, confidence }
    }
}

// ── Classified review ───────────────────────────────────────────────

/// A review enriched with its sentiment. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReview {
    #[serde(flatten)]
    pub review: Review,
    #[serde(flatten)]
    pub sentiment: Sentiment,
}

impl ClassifiedReview {
    pub fn new(review: Review, sentiment: Sentiment) -> Self {
        Self { review, sentiment }
    }

    pub fn label(&self) -> SentimentLabel {
        self.sentiment.label
    }

    pub fn confidence(&self) -> f64 {
        self.sentiment.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_name_covers_calendar() {
        assert_eq!(month_name(date(2023, 1, 5)), "January");
        assert_eq!(month_name(date(2023, 6, 30)), "June");
        assert_eq!(month_name(date(2023, 12, 31)), "December");
    }

    #[test]
    fn review_new_derives_month() {
        let review = Review::new("r1", "Great product!", 5.0, date(2023, 3, 14));
        assert_eq!(review.month, "March");
    }

    #[test]
    fn label_parses_case_insensitively() {
        assert_eq!("positive".parse::<SentimentLabel>(), Ok(SentimentLabel::Positive));
        assert_eq!(" NEGATIVE ".parse::<SentimentLabel>(), Ok(SentimentLabel::Negative));
        assert!("NEUTRAL".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn classified_review_serializes_flat() {
        let review = Review::new("r1", "Awful.", 1.0, date(2023, 1, 10));
        let classified =
            ClassifiedReview::new(review, Sentiment::new(SentimentLabel::Negative, 1.0));

        let json = serde_json::to_value(&classified).unwrap();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["date"], "2023-01-10");
        assert_eq!(json["month"], "January");
        assert_eq!(json["sentiment"], "NEGATIVE");
        assert_eq!(json["confidence"], 1.0);
    }

    #[test]
    fn raw_review_tolerates_extra_fields() {
        let raw: RawReview = serde_json::from_str(
            r#"{"id": "a", "text": "ok", "rating": 4, "date": "2023-02-01", "month": "February"}"#,
        )
        .unwrap();
        assert_eq!(raw.rating, Some(4.0));
        assert_eq!(raw.date.as_deref(), Some("2023-02-01"));
    }
}
