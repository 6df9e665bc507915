//! Sentiment classification.
//!
//! Two interchangeable backends implement [`SentimentBackend`]:
//! - **lexical**: heuristic word-level polarity, confidence = |polarity|
//! - **pretrained**: a fine-tuned transformer classifier, confidence = model probability
//!
//! Callers go through [`Classifier`], which owns the batch contract: output
//! is aligned with input (same length, same order), every confidence lies
//! in `[0, 1]`, and a batch either classifies completely or fails.

pub mod lexical;
pub mod lexicon;
pub mod pretrained;

pub use lexical::LexicalBackend;
pub use pretrained::{
    LabelModel, ModelLoader, ModelSlot, ModelSource, PretrainedBackend, TransformerClassifier,
    shared_slot,
};

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::error::ClassificationError;
use crate::pipeline::types::{ClassifiedReview, Review, Sentiment};

// ── Backend trait ───────────────────────────────────────────────────

/// A sentiment strategy.
///
/// Implementations return one result per input text, in input order. The
/// [`Classifier`] verifies this, so a misbehaving backend fails the batch
/// rather than misaligning labels.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    /// Backend name (e.g. "lexical", "pretrained").
    fn name(&self) -> &str;

    /// Classify a batch of texts.
    async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Sentiment>, ClassificationError>;
}

/// Supported sentiment backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Lexical,
    Pretrained,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => f.write_str("lexical"),
            Self::Pretrained => f.write_str("pretrained"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "textblob" => Ok(Self::Lexical),
            "pretrained" | "model" => Ok(Self::Pretrained),
            other => Err(format!("unknown backend '{other}' (expected lexical or pretrained)")),
        }
    }
}

/// Create a backend from configuration.
///
/// The pretrained backend shares the process-wide model slot.
pub fn create_backend(kind: BackendKind, model: &ModelSource) -> Arc<dyn SentimentBackend> {
    info!(backend = %kind, "Using sentiment backend");
    match kind {
        BackendKind::Lexical => Arc::new(LexicalBackend::new()),
        BackendKind::Pretrained => Arc::new(PretrainedBackend::new(Arc::new(model.clone()))),
    }
}

// ── Tokenization ────────────────────────────────────────────────────

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z]+)?|!").expect("token regex is valid"));

/// Lower-cased word tokens plus `!` marks, in text order.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    let normalized = text.to_lowercase().replace('\u{2019}', "'");
    TOKEN_RE
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

// ── Classifier ──────────────────────────────────────────────────────

/// Enforces the batch contract over a [`SentimentBackend`].
#[derive(Clone)]
pub struct Classifier {
    backend: Arc<dyn SentimentBackend>,
}

impl Classifier {
    pub fn new(backend: Arc<dyn SentimentBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Classify `texts`, returning one sentiment per text in input order.
    ///
    /// An empty batch returns immediately without touching the backend.
    pub async fn classify(&self, texts: &[&str]) -> Result<Vec<Sentiment>, ClassificationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.backend.classify_batch(texts).await?;
        check_batch(texts.len(), &results)?;

        debug!(
            backend = self.backend.name(),
            count = results.len(),
            "Classified batch"
        );
        Ok(results)
    }

    /// Classify a batch of reviews by their text.
    ///
    /// All-or-nothing: on error no review comes back enriched.
    pub async fn enrich(
        &self,
        reviews: Vec<Review>,
    ) -> Result<Vec<ClassifiedReview>, ClassificationError> {
        let texts: Vec<&str> = reviews.iter().map(|r| r.text.as_str()).collect();
        let sentiments = self.classify(&texts).await?;

        Ok(reviews
            .into_iter()
            .zip(sentiments)
            .map(|(review, sentiment)| ClassifiedReview::new(review, sentiment))
            .collect())
    }
}

/// Validate backend output against its input batch.
fn check_batch(expected: usize, results: &[Sentiment]) -> Result<(), ClassificationError> {
    if results.len() != expected {
        return Err(ClassificationError::LengthMismatch {
            expected,
            actual: results.len(),
        });
    }

    if let Some((index, s)) = results
        .iter()
        .enumerate()
        .find(|(_, s)| !(0.0..=1.0).contains(&s.confidence))
    {
        return Err(ClassificationError::InvalidConfidence {
            index,
            value: s.confidence,
        });
    }

    Ok(())
}
