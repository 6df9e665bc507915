//! Remote review source: pulls reviews from a GraphQL endpoint.
//!
//! Issues a single `reviews(first, after)` query and unwraps the
//! `data.reviews.edges[].node` records. Validation is left to the
//! ingestion adapter, and the caller supplies the timeout via
//! [`load_with_timeout`](crate::pipeline::ingest::load_with_timeout).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::IngestionError;
use crate::pipeline::ingest::ReviewSource;
use crate::pipeline::types::RawReview;

/// Default public reviews endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://web-scraping.dev/api/graphql";

/// Default number of reviews requested per fetch.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Browser-like user agent; the endpoint rejects bare clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const REVIEWS_QUERY: &str = r#"
query GetReviews($first: Int, $after: String) {
  reviews(first: $first, after: $after) {
    edges {
      node {
        id
        text
        rating
        date
      }
    }
  }
}
"#;

// ── Response shape ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ReviewsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReviewsData {
    reviews: ReviewConnection,
}

#[derive(Debug, Deserialize)]
struct ReviewConnection {
    edges: Vec<ReviewEdge>,
}

#[derive(Debug, Deserialize)]
struct ReviewEdge {
    node: RawReview,
}

// ── Source ──────────────────────────────────────────────────────────

/// Review source backed by a GraphQL endpoint.
pub struct GraphQlSource {
    client: reqwest::Client,
    endpoint: String,
    page_size: u32,
    after: String,
}

impl GraphQlSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            page_size: DEFAULT_PAGE_SIZE,
            after: String::new(),
        }
    }

    /// Number of reviews to request.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Cursor to start after (empty string for the first page).
    pub fn with_cursor(mut self, after: impl Into<String>) -> Self {
        self.after = after.into();
        self
    }

    fn request_body(&self) -> serde_json::Value {
        json!({
            "query": REVIEWS_QUERY,
            "variables": {
                "first": self.page_size,
                "after": self.after,
            }
        })
    }

    fn invalid(&self, reason: impl Into<String>) -> IngestionError {
        IngestionError::InvalidResponse {
            source_name: self.endpoint.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ReviewSource for GraphQlSource {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_records(&self) -> Result<Vec<RawReview>, IngestionError> {
        debug!(endpoint = %self.endpoint, first = self.page_size, "Requesting reviews");

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&self.request_body())
            .send()
            .await
            .map_err(|e| IngestionError::Http {
                source_name: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestionError::Http {
                source_name: self.endpoint.clone(),
                reason: format!("status {status}"),
            });
        }

        let body = response.text().await.map_err(|e| IngestionError::Http {
            source_name: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let records = parse_reviews_response(&body).map_err(|reason| self.invalid(reason))?;
        info!(endpoint = %self.endpoint, count = records.len(), "Fetched reviews");
        Ok(records)
    }
}

/// Unwrap `data.reviews.edges[].node` from a GraphQL response body.
fn parse_reviews_response(body: &str) -> Result<Vec<RawReview>, String> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| format!("JSON parse error: {e}"))?;

    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(format!("GraphQL errors: {}", messages.join("; ")));
    }

    let data = response.data.ok_or("response has no data")?;
    Ok(data.reviews.edges.into_iter().map(|edge| edge.node).collect())
}
