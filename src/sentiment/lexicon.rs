//! Word-level sentiment lexicon for the lexical scorer.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Polarity of sentiment-bearing words, in `[-1, 1]`.
static POLARITY: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        // Strong positive
        ("amazing", 0.6),
        ("awesome", 1.0),
        ("best", 1.0),
        ("brilliant", 0.9),
        ("excellent", 1.0),
        ("exceptional", 0.67),
        ("fantastic", 0.4),
        ("flawless", 1.0),
        ("incredible", 0.9),
        ("love", 0.5),
        ("loved", 0.7),
        ("loves", 0.5),
        ("magnificent", 1.0),
        ("outstanding", 0.5),
        ("perfect", 1.0),
        ("perfectly", 1.0),
        ("superb", 1.0),
        ("wonderful", 1.0),
        // Moderate positive
        ("beautiful", 0.85),
        ("delicious", 1.0),
        ("enjoy", 0.4),
        ("enjoyed", 0.4),
        ("favorite", 0.5),
        ("fine", 0.42),
        ("fresh", 0.3),
        ("friendly", 0.38),
        ("glad", 0.5),
        ("good", 0.7),
        ("great", 0.8),
        ("happy", 0.8),
        ("helpful", 0.5),
        ("impressed", 1.0),
        ("impressive", 1.0),
        ("lovely", 0.5),
        ("nice", 0.6),
        ("pleasant", 0.73),
        ("pleased", 0.5),
        ("quality", 0.3),
        ("recommend", 0.5),
        ("recommended", 0.5),
        ("reliable", 0.4),
        ("satisfied", 0.5),
        ("smooth", 0.4),
        ("solid", 0.3),
        ("sturdy", 0.4),
        ("tasty", 0.6),
        ("useful", 0.3),
        ("worth", 0.3),
        // Mild positive
        ("better", 0.5),
        ("cool", 0.35),
        ("decent", 0.17),
        ("easy", 0.43),
        ("fast", 0.2),
        ("ok", 0.5),
        ("okay", 0.5),
        ("quick", 0.33),
        ("right", 0.29),
        ("well", 0.1),
        // Mild negative
        ("average", -0.15),
        ("cheap", -0.1),
        ("late", -0.3),
        ("mediocre", -0.3),
        ("slow", -0.3),
        ("small", -0.25),
        ("strange", -0.05),
        ("weird", -0.5),
        ("wrong", -0.5),
        // Moderate negative
        ("annoying", -0.8),
        ("bad", -0.7),
        ("boring", -1.0),
        ("broken", -0.4),
        ("cold", -0.6),
        ("damaged", -0.5),
        ("defective", -0.6),
        ("difficult", -0.5),
        ("disappointed", -0.75),
        ("disappointing", -0.6),
        ("expensive", -0.5),
        ("flimsy", -0.5),
        ("hard", -0.29),
        ("poor", -0.4),
        ("sad", -0.5),
        ("stale", -0.5),
        ("useless", -0.5),
        ("waste", -0.2),
        ("worse", -0.4),
        // Strong negative
        ("awful", -1.0),
        ("disgusting", -1.0),
        ("dreadful", -1.0),
        ("garbage", -0.8),
        ("hate", -0.8),
        ("hated", -0.9),
        ("horrible", -1.0),
        ("pathetic", -1.0),
        ("terrible", -1.0),
        ("worst", -1.0),
    ]
    .into_iter()
    .collect()
});

/// Multipliers applied to the next sentiment word.
static INTENSIFIERS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        ("absolutely", 1.4),
        ("completely", 1.3),
        ("extremely", 1.5),
        ("highly", 1.3),
        ("incredibly", 1.4),
        ("most", 1.2),
        ("quite", 1.1),
        ("really", 1.25),
        ("so", 1.2),
        ("super", 1.3),
        ("too", 1.1),
        ("totally", 1.3),
        ("very", 1.3),
        // Diminishers
        ("barely", 0.5),
        ("kinda", 0.7),
        ("slightly", 0.6),
        ("somewhat", 0.7),
    ]
    .into_iter()
    .collect()
});

/// Words that invert the next sentiment word.
const NEGATIONS: &[&str] = &[
    "aren't", "can't", "cannot", "didn't", "doesn't", "don't", "hardly", "isn't", "never",
    "no", "nor", "not", "wasn't", "weren't", "won't", "wouldn't",
];

/// Polarity of `word`, if it carries sentiment.
pub fn polarity(word: &str) -> Option<f64> {
    POLARITY.get(word).copied()
}

/// Intensity multiplier of `word`, if it modifies the next sentiment word.
pub fn intensity(word: &str) -> Option<f64> {
    INTENSIFIERS.get(word).copied()
}

/// Whether `word` negates the next sentiment word.
pub fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarities_stay_in_range() {
        assert!(POLARITY.values().all(|p| (-1.0..=1.0).contains(p)));
    }

    #[test]
    fn word_classes_do_not_overlap() {
        for word in INTENSIFIERS.keys() {
            assert!(polarity(word).is_none(), "{word} is both intensifier and sentiment");
        }
        for word in NEGATIONS {
            assert!(polarity(word).is_none(), "{word} is both negation and sentiment");
            assert!(intensity(word).is_none(), "{word} is both negation and intensifier");
        }
    }

    #[test]
    fn lookups() {
        assert_eq!(polarity("great"), Some(0.8));
        assert_eq!(polarity("awful"), Some(-1.0));
        assert_eq!(polarity("product"), None);
        assert_eq!(intensity("very"), Some(1.3));
        assert!(is_negation("not"));
        assert!(!is_negation("great"));
    }
}
