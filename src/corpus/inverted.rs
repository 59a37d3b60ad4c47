use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Word → zero-based token positions, the way OpenAlex ships abstracts.
///
/// Positions across all words are expected to be unique and to cover
/// `[0, N)`. Non-numeric positions are rejected at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex(HashMap<String, Vec<usize>>);

impl InvertedIndex {
    /// Build an index from whitespace-separated text.
    #[cfg(test)]
    pub fn from_text(text: &str) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, word) in text.split_whitespace().enumerate() {
            index.entry(word.to_string()).or_default().push(position);
        }
        Self(index)
    }

    /// Number of tokens (positions) in the index.
    pub fn token_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<usize>)> for InvertedIndex {
    fn from_iter<I: IntoIterator<Item = (S, Vec<usize>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(w, p)| (w.into(), p)).collect())
    }
}

/// Rebuild plain text by ordering words by position and joining with a
/// single space. No normalization is applied.
///
/// Duplicate positions are not resolved: colliding words come out in map
/// iteration order.
pub fn reconstruct_text(index: &InvertedIndex) -> String {
    let mut word_index: Vec<(&str, usize)> = index
        .0
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |&p| (word.as_str(), p)))
        .collect();
    word_index.sort_by_key(|&(_, position)| position);

    word_index
        .into_iter()
        .map(|(word, _)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_position() {
        let index: InvertedIndex = [("hello", vec![1]), ("world", vec![0])].into_iter().collect();
        assert_eq!(reconstruct_text(&index), "world hello");
    }

    #[test]
    fn test_single_word() {
        let index: InvertedIndex = [("x", vec![0])].into_iter().collect();
        assert_eq!(reconstruct_text(&index), "x");
    }

    #[test]
    fn test_empty_index() {
        let index = InvertedIndex::default();
        assert_eq!(index.token_count(), 0);
        assert_eq!(reconstruct_text(&index), "");
    }

    #[test]
    fn test_repeated_words_round_trip() {
        let sentence = "the patients in the control arm received the placebo";
        let index = InvertedIndex::from_text(sentence);
        assert_eq!(index.token_count(), 9);
        assert_eq!(reconstruct_text(&index), sentence);
    }

    #[test]
    fn test_round_trip_normalizes_whitespace() {
        let index = InvertedIndex::from_text("  Depression   affects\nmany adults. ");
        assert_eq!(reconstruct_text(&index), "Depression affects many adults.");
    }

    #[test]
    fn test_no_case_or_punctuation_normalization() {
        let json = r#"{"Background:": [0], "RCT,": [1], "n=120": [2]}"#;
        let index: InvertedIndex = serde_json::from_str(json).unwrap();
        assert_eq!(reconstruct_text(&index), "Background: RCT, n=120");
    }

    #[test]
    fn test_non_numeric_position_rejected() {
        let json = r#"{"word": ["zero"]}"#;
        assert!(serde_json::from_str::<InvertedIndex>(json).is_err());
    }
}
