//! Ingestion adapter: loads raw review records and normalizes them.
//!
//! Sources are pure I/O ([`ReviewSource`]); validation and month derivation
//! live here so every source gets identical semantics:
//! - every record must carry `id`, `text`, `rating` and `date`
//! - `text` must be non-empty after trimming
//! - `date` must parse as an ISO-8601 date (a full timestamp is accepted
//!   and truncated to its calendar date)
//!
//! Records are neither deduplicated nor reordered.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::IngestionError;
use crate::pipeline::types::{RawReview, Review};

// ── Source trait ────────────────────────────────────────────────────

/// Trait for review sources: pure I/O, no validation.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Source name for logging and error messages.
    fn name(&self) -> &str;

    /// Read every raw record from the source, once, in source order.
    async fn fetch_records(&self) -> Result<Vec<RawReview>, IngestionError>;
}

// ── File source ─────────────────────────────────────────────────────

/// Reads a JSON array of review objects from a local file.
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl ReviewSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_records(&self) -> Result<Vec<RawReview>, IngestionError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestionError::SourceMissing {
                    path: self.name.clone(),
                });
            }
            Err(e) => return Err(IngestionError::Io(e)),
        };

        parse_records(&content)
    }
}

/// Parse a JSON document holding an array of review objects.
pub fn parse_records(content: &str) -> Result<Vec<RawReview>, IngestionError> {
    serde_json::from_str(content).map_err(|e| IngestionError::Malformed(e.to_string()))
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load and normalize every record from `source`.
///
/// Fails on the first invalid record; no partial set is returned.
pub async fn load(source: &dyn ReviewSource) -> Result<Vec<Review>, IngestionError> {
    info!(source = %source.name(), "Loading reviews");

    let records = source.fetch_records().await?;
    let reviews = normalize_all(records)?;

    info!(source = %source.name(), count = reviews.len(), "Reviews loaded");
    Ok(reviews)
}

/// Like [`load`], but gives up once `timeout` elapses.
///
/// No retry is attempted; the timeout surfaces as
/// [`IngestionError::Timeout`].
pub async fn load_with_timeout(
    source: &dyn ReviewSource,
    timeout: Duration,
) -> Result<Vec<Review>, IngestionError> {
    match tokio::time::timeout(timeout, load(source)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(source = %source.name(), ?timeout, "Review source timed out");
            Err(IngestionError::Timeout {
                source_name: source.name().to_string(),
                timeout,
            })
        }
    }
}

/// Normalize a batch of raw records, preserving order.
pub fn normalize_all(records: Vec<RawReview>) -> Result<Vec<Review>, IngestionError> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize(index, raw).inspect_err(|e| {
                warn!(index, error = %e, "Rejecting review record");
            })
        })
        .collect()
}

/// Validate one raw record and derive its month.
pub fn normalize(index: usize, raw: RawReview) -> Result<Review, IngestionError> {
    let id = raw
        .id
        .ok_or(IngestionError::MissingField { index, field: "id" })?;
    let text = raw
        .text
        .ok_or(IngestionError::MissingField { index, field: "text" })?;
    let rating = raw
        .rating
        .ok_or(IngestionError::MissingField { index, field: "rating" })?;
    let date_str = raw
        .date
        .ok_or(IngestionError::MissingField { index, field: "date" })?;

    if text.trim().is_empty() {
        return Err(IngestionError::EmptyText { index, id });
    }

    let date = parse_date(&date_str).ok_or_else(|| IngestionError::InvalidDate {
        index,
        value: date_str.clone(),
    })?;

    debug!(index, id = %id, date = %date, "Normalized review");
    Ok(Review::new(id, text, rating, date))
}

/// Parse an ISO-8601 date or timestamp into a calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn raw(id: &str, text: &str, date: &str) -> RawReview {
        RawReview {
            id: Some(id.into()),
            text: Some(text.into()),
            rating: Some(5.0),
            date: Some(date.into()),
        }
    }

    #[test]
    fn parse_date_accepts_iso_forms() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        assert_eq!(parse_date("2023-01-05"), Some(expected));
        assert_eq!(parse_date("2023-01-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("2023-01-05T10:30:00.250"), Some(expected));
        assert_eq!(parse_date("2023-01-05 10:30:00"), Some(expected));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2023-13-01"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn normalize_derives_month() {
        let review = normalize(0, raw("r1", "Great product!", "2023-01-05")).unwrap();
        assert_eq!(review.id, "r1");
        assert_eq!(review.month, "January");
        assert_eq!(review.rating, 5.0);
    }

    #[test]
    fn normalize_reports_missing_field() {
        let mut record = raw("r1", "Great", "2023-01-05");
        record.rating = None;
        let err = normalize(3, record).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::MissingField { index: 3, field: "rating" }
        ));
    }

    #[test]
    fn normalize_rejects_blank_text() {
        let err = normalize(0, raw("r1", "   ", "2023-01-05")).unwrap_err();
        assert!(matches!(err, IngestionError::EmptyText { index: 0, .. }));
    }

    #[test]
    fn normalize_all_fails_whole_batch_on_bad_date() {
        let records = vec![
            raw("r1", "Fine", "2023-01-05"),
            raw("r2", "Also fine", "yesterday"),
        ];
        let err = normalize_all(records).unwrap_err();
        match err {
            IngestionError::InvalidDate { index, value } => {
                assert_eq!(index, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("Expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn normalize_all_preserves_order_and_duplicates() {
        let records = vec![
            raw("b", "Second", "2023-02-01"),
            raw("a", "First", "2023-01-01"),
            raw("b", "Second", "2023-02-01"),
        ];
        let reviews = normalize_all(records).unwrap();
        let ids: Vec<&str> = reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "b"]);
    }

    #[test]
    fn parse_records_rejects_non_array() {
        let err = parse_records(r#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, IngestionError::Malformed(_)));
    }

    #[tokio::test]
    async fn file_source_missing_path() {
        let tmp = TempDir::new().unwrap();
        let source = FileSource::new(tmp.path().join("reviews.json"));
        let err = load(&source).await.unwrap_err();
        assert!(matches!(err, IngestionError::SourceMissing { .. }));
    }

    #[tokio::test]
    async fn file_source_loads_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reviews.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "r1", "text": "Great product!", "rating": 5, "date": "2023-01-05"},
                {"id": "r2", "text": "Awful.", "rating": 1, "date": "2023-02-10"}
            ]"#,
        )
        .unwrap();

        let reviews = load(&FileSource::new(&path)).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].month, "January");
        assert_eq!(reviews[1].month, "February");
    }

    struct SlowSource;

    #[async_trait]
    impl ReviewSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch_records(&self) -> Result<Vec<RawReview>, IngestionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn load_with_timeout_surfaces_timeout() {
        let err = load_with_timeout(&SlowSource, Duration::from_millis(20))
            .await
            .unwrap_err();
        match err {
            IngestionError::Timeout { source_name, timeout } => {
                assert_eq!(source_name, "slow");
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("Expected Timeout, got {other:?}"),
        }
    }
}
