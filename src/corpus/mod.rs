//! OpenAlex works search.
//!
//! API documentation: https://docs.openalex.org/api-entities/works/search-works

pub mod inverted;
pub mod types;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::state::Settings;
use inverted::reconstruct_text;
use types::{PaperRecord, WorksResponse};

pub const DEFAULT_RESULT_COUNT: usize = 10;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse works response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("works response has no `results` array")]
    MissingResults,

    #[error("result {index} ({title}) has no abstract_inverted_index")]
    MissingAbstract { index: usize, title: String },
}

/// Search parameters for the `/works` endpoint.
#[derive(Debug, Clone)]
pub struct WorksQuery {
    pub search: String,
    pub per_page: usize,
    /// Inserted verbatim into `from_publication_date:{min_year}-01-01`.
    pub min_year: String,
}

impl WorksQuery {
    pub fn new(search: &str, per_page: usize, min_year: &str) -> Self {
        Self {
            search: search.to_string(),
            per_page,
            min_year: min_year.to_string(),
        }
    }

    /// Works with an abstract and full text, published on or after Jan 1 of `min_year`.
    pub fn filters(&self) -> Vec<String> {
        vec![
            "has_abstract:true".to_string(),
            "has_fulltext:true".to_string(),
            format!("from_publication_date:{}-01-01", self.min_year),
        ]
    }

    pub fn params(&self, mailto: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("search", self.search.clone()),
            ("filter", self.filters().join(",")),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(mailto) = mailto {
            params.push(("mailto", mailto.to_string()));
        }
        params
    }
}

/// Source of papers and their decoded abstracts.
///
/// The two returned sequences are index-aligned: `abstracts[i]` belongs to
/// `results[i]`.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn search(
        &self,
        search_phrase: &str,
        result_count: usize,
        min_year: &str,
    ) -> Result<(Vec<PaperRecord>, Vec<String>), RetrievalError>;
}

/// Split a `/works` response body into records and decoded abstracts.
pub fn parse_works_response(
    body: &str,
) -> Result<(Vec<PaperRecord>, Vec<String>), RetrievalError> {
    let response: WorksResponse = serde_json::from_str(body)?;
    let results = response.results.ok_or(RetrievalError::MissingResults)?;

    let abstracts = results
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let index_ref = record.abstract_inverted_index.as_ref();
            if let Some(inverted) = index_ref {
                debug!(index, tokens = inverted.token_count(), "Decoding abstract");
            }
            index_ref
                .map(reconstruct_text)
                .ok_or_else(|| RetrievalError::MissingAbstract {
                    index,
                    title: record.display_title().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(total) = response.meta.and_then(|m| m.count) {
        info!(fetched = results.len(), total, "OpenAlex works parsed");
    }

    Ok((results, abstracts))
}

pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.openalex_base_url.clone(),
            mailto: settings.openalex_mailto.clone(),
        })
    }

    fn works_endpoint(&self) -> String {
        format!("{}/works", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CorpusSource for OpenAlexClient {
    async fn search(
        &self,
        search_phrase: &str,
        result_count: usize,
        min_year: &str,
    ) -> Result<(Vec<PaperRecord>, Vec<String>), RetrievalError> {
        let query = WorksQuery::new(search_phrase, result_count, min_year);
        info!(
            search = %query.search,
            filters = %query.filters().join(","),
            per_page = query.per_page,
            "Searching OpenAlex"
        );

        let resp = self
            .client
            .get(self.works_endpoint())
            .header("Accept", "application/json")
            .query(&query.params(self.mailto.as_deref()))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RetrievalError::Status { status, body });
        }

        let body = resp.text().await?;
        let (results, abstracts) = parse_works_response(&body)?;
        info!(count = results.len(), "OpenAlex search complete");
        Ok((results, abstracts))
    }
}
