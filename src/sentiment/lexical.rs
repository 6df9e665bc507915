//! Lexical sentiment strategy: heuristic polarity from a word lexicon.
//!
//! Each sentiment word found in the text yields one assessment:
//! - intensifiers directly before it multiply its polarity
//! - a negation within the preceding few words flips and halves it
//! - every `!` amplifies the most recent assessment by 1.25
//!
//! The text's polarity is the mean of its assessments, clamped to `[-1, 1]`,
//! or `0` when no sentiment word is found.

use async_trait::async_trait;
use tracing::debug;

use super::{SentimentBackend, lexicon, tokens};
use crate::error::ClassificationError;
use crate::pipeline::types::{Sentiment, SentimentLabel};

/// How many words a negation reaches forward.
const NEGATION_WINDOW: usize = 3;

/// Factor applied to a negated assessment.
const NEGATION_FACTOR: f64 = -0.5;

/// Factor applied per exclamation mark.
const EXCLAMATION_FACTOR: f64 = 1.25;

/// Polarity score in `[-1, 1]` for `text`.
pub fn polarity(text: &str) -> f64 {
    let mut assessments: Vec<f64> = Vec::new();
    let mut modifier: Option<f64> = None;
    let mut negation_left = 0usize;

    for token in tokens(text) {
        if token == "!" {
            if let Some(last) = assessments.last_mut() {
                *last = (*last * EXCLAMATION_FACTOR).clamp(-1.0, 1.0);
            }
            continue;
        }

        if lexicon::is_negation(&token) {
            negation_left = NEGATION_WINDOW;
            modifier = None;
            continue;
        }

        if let Some(m) = lexicon::intensity(&token) {
            modifier = Some(modifier.unwrap_or(1.0) * m);
            continue;
        }

        if let Some(p) = lexicon::polarity(&token) {
            let mut score = p * modifier.take().unwrap_or(1.0);
            if negation_left > 0 {
                score *= NEGATION_FACTOR;
                negation_left = 0;
            }
            assessments.push(score.clamp(-1.0, 1.0));
            continue;
        }

        // Neutral word: intensifiers only bind to the adjacent word.
        modifier = None;
        negation_left = negation_left.saturating_sub(1);
    }

    if assessments.is_empty() {
        return 0.0;
    }

    let mean = assessments.iter().sum::<f64>() / assessments.len() as f64;
    mean.clamp(-1.0, 1.0)
}

/// Map a polarity to a binary sentiment.
///
/// `p > 0` is positive; zero polarity falls to `NEGATIVE` with confidence 0.
pub fn sentiment_from_polarity(p: f64) -> Sentiment {
    let label = if p > 0.0 {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Negative
    };
    Sentiment::new(label, p.abs())
}

/// Lexicon-based backend. Stateless and cheap to construct.
#[derive(Debug, Clone, Default)]
pub struct LexicalBackend;

impl LexicalBackend {
    pub fn new() -> Self {
        Self
    }

    /// Score a single text.
    pub fn score(&self, text: &str) -> Sentiment {
        sentiment_from_polarity(polarity(text))
    }
}

#[async_trait]
impl SentimentBackend for LexicalBackend {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Sentiment>, ClassificationError> {
        debug!(count = texts.len(), "Scoring batch with lexicon");
        Ok(texts.iter().map(|text| self.score(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn plain_sentiment_words() {
        assert!(approx(polarity("good"), 0.7));
        assert!(approx(polarity("awful"), -1.0));
    }

    #[test]
    fn no_sentiment_words_is_zero() {
        assert_eq!(polarity("The package arrived on Tuesday."), 0.0);
        assert_eq!(polarity(""), 0.0);
    }

    #[test]
    fn exclamation_amplifies_preceding_assessment() {
        assert!(approx(polarity("Great product!"), 1.0));
        assert!(approx(polarity("good!"), 0.875));
    }

    #[test]
    fn exclamation_reaches_back_over_neutral_words() {
        assert!(approx(polarity("good product, it is here at last!"), 0.875));
        assert!(approx(polarity("good and late!"), (0.7 - 0.375) / 2.0));
        assert_eq!(polarity("Wow, it is here!"), polarity("Wow, it is here"));
    }

    #[test]
    fn intensifier_multiplies_next_word() {
        assert!(approx(polarity("very good"), 0.91));
        assert!(approx(polarity("slightly bad"), -0.42));
    }

    #[test]
    fn intensifier_does_not_skip_neutral_words() {
        assert!(approx(polarity("very much good"), 0.7));
    }

    #[test]
    fn negation_flips_and_halves() {
        assert!(approx(polarity("not good"), -0.35));
        assert!(approx(polarity("not a good one"), -0.35));
        assert!(approx(polarity("isn't bad"), 0.35));
    }

    #[test]
    fn negation_window_expires() {
        assert!(approx(polarity("not one of the few good"), 0.7));
    }

    #[test]
    fn mean_of_assessments() {
        // (0.8 + -0.7) / 2
        assert!(approx(polarity("great screen, bad battery"), 0.05));
    }

    #[test]
    fn polarity_is_clamped() {
        let p = polarity("absolutely perfect!!! extremely awesome!!");
        assert!(approx(p, 1.0));
        let n = polarity("extremely terrible!!!");
        assert!(approx(n, -1.0));
    }

    #[test]
    fn zero_polarity_tie_breaks_negative() {
        let s = sentiment_from_polarity(0.0);
        assert_eq!(s.label, SentimentLabel::Negative);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn confidence_is_absolute_polarity() {
        let s = sentiment_from_polarity(-0.4);
        assert_eq!(s.label, SentimentLabel::Negative);
        assert!(approx(s.confidence, 0.4));

        let s = sentiment_from_polarity(0.25);
        assert_eq!(s.label, SentimentLabel::Positive);
        assert!(approx(s.confidence, 0.25));
    }

    #[tokio::test]
    async fn batch_is_aligned() {
        let backend = LexicalBackend::new();
        let texts = ["Great product!", "Awful.", "It exists."];
        let results = backend.classify_batch(&texts).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].label, SentimentLabel::Positive);
        assert_eq!(results[1].label, SentimentLabel::Negative);
        assert_eq!(results[2], Sentiment::new(SentimentLabel::Negative, 0.0));
    }

    #[test]
    fn confidence_always_in_unit_range() {
        let samples = [
            "I love it, best purchase ever!!!",
            "worst. thing. ever!!!!!",
            "not not not good",
            "extremely incredibly absolutely perfect",
            "barely okay but kinda cheap and slow",
            "",
        ];
        for text in samples {
            let s = LexicalBackend::new().score(text);
            assert!((0.0..=1.0).contains(&s.confidence), "{text}: {}", s.confidence);
        }
    }
}
