//! Typed view of the structured-relations output format.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::TURN_END;

#[derive(Debug, Error)]
pub enum RelationParseError {
    #[error("no JSON array found in answer")]
    NoJsonArray,

    #[error("invalid relation JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PicoElement {
    Population,
    Intervention,
    Comparison,
    Outcome,
}

impl FromStr for PicoElement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "population" | "p" => Ok(Self::Population),
            "intervention" | "i" => Ok(Self::Intervention),
            "comparison" | "c" => Ok(Self::Comparison),
            "outcome" | "o" => Ok(Self::Outcome),
            other => Err(format!("not a PICO element: {}", other)),
        }
    }
}

/// One extracted head → relation → tail tuple.
///
/// Types are kept as the model wrote them; use [`PicoRelation::head_element`]
/// and [`PicoRelation::tail_element`] for the typed reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicoRelation {
    pub head: String,
    pub head_type: String,
    pub relation: String,
    pub tail: String,
    pub tail_type: String,
}

impl PicoRelation {
    pub fn head_element(&self) -> Option<PicoElement> {
        self.head_type.parse().ok()
    }

    pub fn tail_element(&self) -> Option<PicoElement> {
        self.tail_type.parse().ok()
    }

    /// Both ends carry a PICO element type.
    pub fn is_pico_typed(&self) -> bool {
        self.head_element().is_some() && self.tail_element().is_some()
    }
}

/// Body of a ```json fence, if the answer has one.
fn fenced_json(answer: &str) -> Option<&str> {
    let start = answer.find("```json")?;
    let after_fence = &answer[start + 7..];
    let end = after_fence.find("```")?;
    Some(after_fence[..end].trim())
}

/// Parse the relation list out of an answer.
///
/// Only the model's own turn is searched: anything after the first
/// `<|im_end|>` is ignored. Without a fence, each `[` is tried in order and
/// the first one that opens a relation list wins.
pub fn parse_relations(answer: &str) -> Result<Vec<PicoRelation>, RelationParseError> {
    let answer = answer.split(TURN_END).next().unwrap_or(answer);

    if let Some(block) = fenced_json(answer) {
        return Ok(serde_json::from_str(block)?);
    }

    let mut last_err = None;
    for (start, _) in answer.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&answer[start..]).into_iter::<Vec<PicoRelation>>();
        match stream.next() {
            Some(Ok(relations)) => return Ok(relations),
            Some(Err(e)) => last_err = Some(e),
            None => {}
        }
    }

    Err(last_err
        .map(RelationParseError::Json)
        .unwrap_or(RelationParseError::NoJsonArray))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = r#" Here are the relations:
[
  {"head": "adults with MDD", "head_type": "Population", "relation": "received", "tail": "sertraline", "tail_type": "Intervention"},
  {"head": "sertraline", "head_type": "intervention", "relation": "reduced", "tail": "HAM-D score", "tail_type": "Outcome"}
]
<|im_end|>"#;

    #[test]
    fn test_parse_bare_array() {
        let relations = parse_relations(ANSWER).unwrap();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].head, "adults with MDD");
        assert_eq!(relations[0].head_element(), Some(PicoElement::Population));
        assert_eq!(relations[1].head_element(), Some(PicoElement::Intervention));
        assert_eq!(relations[1].tail_element(), Some(PicoElement::Outcome));
    }

    #[test]
    fn test_parse_fenced_array() {
        let answer = "```json\n[{\"head\": \"a\", \"head_type\": \"Comparison\", \"relation\": \"vs\", \"tail\": \"b\", \"tail_type\": \"Drug\"}]\n```";
        let relations = parse_relations(answer).unwrap();
        assert_eq!(relations[0].head_element(), Some(PicoElement::Comparison));
        assert_eq!(relations[0].tail_element(), None);
    }

    #[test]
    fn test_bullet_answer_has_no_array() {
        let err = parse_relations("- Population: adults\n- Outcome: remission").unwrap_err();
        assert!(matches!(err, RelationParseError::NoJsonArray));
    }

    #[test]
    fn test_bracketed_prose_before_array() {
        let answer = " I found the [10] relations: [{\"head\": \"a\", \"head_type\": \"Population\", \"relation\": \"r\", \"tail\": \"b\", \"tail_type\": \"Outcome\"}] (see [1])";
        let relations = parse_relations(answer).unwrap();
        assert_eq!(relations.len(), 1);
        assert!(relations[0].is_pico_typed());
    }

    #[test]
    fn test_text_after_turn_end_ignored() {
        let answer = "[]<|im_end|>\n<|im_start|>user\n[not json]";
        assert!(parse_relations(answer).unwrap().is_empty());

        let answer = "no list here<|im_end|>\n[{\"head\": \"a\", \"head_type\": \"Population\", \"relation\": \"r\", \"tail\": \"b\", \"tail_type\": \"Outcome\"}]";
        assert!(matches!(
            parse_relations(answer).unwrap_err(),
            RelationParseError::NoJsonArray
        ));
    }

    #[test]
    fn test_is_pico_typed() {
        let relations = parse_relations(ANSWER).unwrap();
        assert!(relations.iter().all(PicoRelation::is_pico_typed));

        let mut off = relations[0].clone();
        off.tail_type = "Drug".to_string();
        assert!(!off.is_pico_typed());
    }

    #[test]
    fn test_truncated_array_is_an_error() {
        let err = parse_relations("[{\"head\": \"a\", \"head_type\": ]").unwrap_err();
        assert!(matches!(err, RelationParseError::Json(_)));
    }
}
