//! Review sentiment pipeline.
//!
//! Data flows strictly forward:
//! 1. `ingest::load()`: read a [`ReviewSource`] and normalize records
//! 2. `Classifier::enrich()`: attach a sentiment to every review
//! 3. `aggregate::aggregate()`: per-month label counts and mean confidence
//! 4. `view::MonthView`: artifacts for the presentation layer
//!
//! A failure at any stage ends the run for the current view; nothing
//! partial is handed downstream.

pub mod aggregate;
pub mod fetch;
pub mod ingest;
pub mod snapshot;
pub mod types;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::Result;
use crate::pipeline::aggregate::AggregateBucket;
use crate::pipeline::ingest::ReviewSource;
use crate::pipeline::types::ClassifiedReview;
use crate::pipeline::view::MonthView;
use crate::sentiment::Classifier;

/// Default source timeout.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ingest → classify, producing a read-only set of classified reviews.
pub struct ReviewPipeline {
    source: Arc<dyn ReviewSource>,
    classifier: Classifier,
    timeout: Duration,
}

impl ReviewPipeline {
    pub fn new(source: Arc<dyn ReviewSource>, classifier: Classifier) -> Self {
        Self {
            source,
            classifier,
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    /// Bound how long loading the source may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load and classify every review from the source.
    pub async fn run(&self) -> Result<AnalyzedReviews> {
        let reviews = ingest::load_with_timeout(self.source.as_ref(), self.timeout).await?;
        let classified = self.classifier.enrich(reviews).await?;

        info!(
            source = %self.source.name(),
            backend = self.classifier.backend_name(),
            count = classified.len(),
            "Pipeline run complete"
        );
        Ok(AnalyzedReviews::new(classified))
    }
}

/// The classified output of one run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedReviews {
    reviews: Vec<ClassifiedReview>,
}

impl AnalyzedReviews {
    pub fn new(reviews: Vec<ClassifiedReview>) -> Self {
        Self { reviews }
    }

    pub fn reviews(&self) -> &[ClassifiedReview] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Months available for selection, in first-appearance order.
    pub fn months(&self) -> Vec<String> {
        aggregate::available_months(&self.reviews)
    }

    pub fn aggregate(&self, month: &str) -> AggregateBucket {
        aggregate::aggregate(&self.reviews, month)
    }

    pub fn view(&self, month: &str) -> MonthView {
        MonthView::from_bucket(self.aggregate(month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, IngestionError};
    use crate::pipeline::types::RawReview;
    use crate::sentiment::LexicalBackend;
    use async_trait::async_trait;

    struct StaticSource(Vec<RawReview>);

    #[async_trait]
    impl ReviewSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_records(&self) -> std::result::Result<Vec<RawReview>, IngestionError> {
            Ok(self.0.clone())
        }
    }

    fn raw(id: &str, text: &str, date: &str) -> RawReview {
        RawReview {
            id: Some(id.into()),
            text: Some(text.into()),
            rating: Some(4.0),
            date: Some(date.into()),
        }
    }

    fn pipeline(records: Vec<RawReview>) -> ReviewPipeline {
        ReviewPipeline::new(
            Arc::new(StaticSource(records)),
            Classifier::new(Arc::new(LexicalBackend::new())),
        )
    }

    #[tokio::test]
    async fn run_classifies_every_review() {
        let analyzed = pipeline(vec![
            raw("a", "Great product!", "2023-01-05"),
            raw("b", "Terrible support", "2023-02-01"),
        ])
        .run()
        .await
        .unwrap();

        assert_eq!(analyzed.len(), 2);
        assert_eq!(analyzed.months(), ["January", "February"]);
        assert_eq!(analyzed.view("February").rows[0].review.id, "b");
    }

    #[tokio::test]
    async fn empty_source_is_valid() {
        let analyzed = pipeline(vec![]).run().await.unwrap();
        assert!(analyzed.is_empty());
        assert!(analyzed.months().is_empty());
        assert!(analyzed.view("January").is_empty());
    }

    #[tokio::test]
    async fn ingestion_failure_surfaces() {
        let err = pipeline(vec![raw("a", "Fine", "32/01/2023")])
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ingestion(IngestionError::InvalidDate { .. })
        ));
    }
}
