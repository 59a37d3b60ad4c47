use serde::{Deserialize, Serialize};

use super::inverted::InvertedIndex;

/// One work from the OpenAlex `/works` endpoint.
///
/// Only `title` and `abstract_inverted_index` drive the pipeline; every
/// other field of the API item is carried along untouched in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub doi: Option<String>,
    pub publication_year: Option<i32>,
    pub abstract_inverted_index: Option<InvertedIndex>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaperRecord {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// Body of a `/works` search response.
#[derive(Debug, Deserialize)]
pub(crate) struct WorksResponse {
    pub meta: Option<WorksMeta>,
    pub results: Option<Vec<PaperRecord>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorksMeta {
    pub count: Option<u64>,
}
