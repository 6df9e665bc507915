//! Error types for Brand Monitor.

use std::time::Duration;

/// Top-level error type for a monitoring run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while loading and normalizing review records.
///
/// Any of these is terminal for the current load: no partial review set
/// is ever returned alongside one.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Review source not found: {path}")]
    SourceMissing { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed review source: {0}")]
    Malformed(String),

    #[error("Record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Record {index} ({id}) has empty text")]
    EmptyText { index: usize, id: String },

    #[error("Record {index} has unparsable date '{value}'")]
    InvalidDate { index: usize, value: String },

    #[error("Source {source_name} timed out after {timeout:?}")]
    Timeout {
        source_name: String,
        timeout: Duration,
    },

    #[error("HTTP error from {source_name}: {reason}")]
    Http { source_name: String, reason: String },

    #[error("Invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },
}

/// Errors raised by sentiment classification.
///
/// Classification is all-or-nothing per batch; none of these ever comes
/// with partially assigned labels.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Backend returned {actual} results for a batch of {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Sentiment backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Confidence {value} at index {index} is outside [0, 1]")]
    InvalidConfidence { index: usize, value: f64 },

    #[error("Invalid sentiment model: {reason}")]
    InvalidModel { reason: String },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Errors raised while persisting the review snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for a monitoring run.
pub type Result<T> = std::result::Result<T, Error>;
