pub mod prompts;
pub mod relations;
pub mod report;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::corpus::types::PaperRecord;
use crate::corpus::CorpusSource;
use crate::llm::{extract_answer, render_prompt, GenerationRequest, Message, TextGenerator};
use crate::state::TokenBudgets;

use prompts::PromptKind;
use relations::{parse_relations, PicoRelation};

/// How the system instruction reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// System turn sent once in a priming call, then user turns only.
    InitialSystemMessage,
    /// System and user turn in every call.
    RepeatedSystemMessage,
    /// Summary request built but not sent; a user-only itemize call per paper.
    Stepwise,
}

impl Protocol {
    pub fn default_prompt(self) -> &'static str {
        match self {
            Protocol::InitialSystemMessage | Protocol::RepeatedSystemMessage => {
                prompts::PICO_BULLETPOINTS_ABSTRACT
            }
            Protocol::Stepwise => prompts::PICO_STEPWISE,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::InitialSystemMessage => write!(f, "initial_system_message"),
            Protocol::RepeatedSystemMessage => write!(f, "repeated_system_message"),
            Protocol::Stepwise => write!(f, "stepwise"),
        }
    }
}

/// Result for one paper.
#[derive(Debug, Clone, Serialize)]
pub struct PaperAnalysis {
    /// 1-based position in retrieval order.
    pub ordinal: usize,
    pub title: String,
    pub answer: String,
    pub protocol: Protocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<PicoRelation>>,
    pub analysed_at: DateTime<Utc>,
}

pub struct PicoAnalyser {
    corpus: Arc<dyn CorpusSource>,
    generator: Arc<dyn TextGenerator>,
    budgets: TokenBudgets,
    min_year: String,
}

impl PicoAnalyser {
    pub fn new(
        corpus: Arc<dyn CorpusSource>,
        generator: Arc<dyn TextGenerator>,
        budgets: TokenBudgets,
        min_year: &str,
    ) -> Self {
        Self {
            corpus,
            generator,
            budgets,
            min_year: min_year.to_string(),
        }
    }

    /// Retrieve papers for `search_phrase` and analyse them one at a time.
    ///
    /// `on_paper` sees each result as soon as it is extracted. The first
    /// failure aborts the remaining papers.
    pub async fn run(
        &self,
        protocol: Protocol,
        search_phrase: &str,
        number_of_abstracts: usize,
        prompt_override: Option<&str>,
        mut on_paper: impl FnMut(&PaperAnalysis),
    ) -> Result<Vec<PaperAnalysis>> {
        let (results, abstracts) = self
            .corpus
            .search(search_phrase, number_of_abstracts, &self.min_year)
            .await
            .context("Paper search failed")?;

        let system_message = prompt_override.unwrap_or_else(|| protocol.default_prompt());

        info!(
            %protocol,
            search_phrase,
            papers = results.len(),
            custom_prompt = prompt_override.is_some(),
            "Starting PICO analysis"
        );

        if protocol == Protocol::InitialSystemMessage {
            self.prime(system_message).await?;
        }

        let mut analyses = Vec::with_capacity(results.len());
        for (i, (record, abstract_text)) in results.iter().zip(&abstracts).enumerate() {
            let ordinal = i + 1;
            let analysis = self
                .analyse_paper(protocol, system_message, ordinal, record, abstract_text)
                .await
                .with_context(|| {
                    format!("Analysis of paper {} ({}) failed", ordinal, record.display_title())
                })?;
            on_paper(&analysis);
            analyses.push(analysis);
        }

        info!(%protocol, papers = analyses.len(), "PICO analysis complete");
        Ok(analyses)
    }

    /// Send the system turn alone. The output is discarded; later calls
    /// depend on the generator keeping this context.
    async fn prime(&self, system_message: &str) -> Result<()> {
        let prompt = render_prompt(&[Message::system(system_message)]);
        let request = GenerationRequest::new(prompt, self.budgets.priming).pad_with_eos();
        debug!(max_new_tokens = request.max_new_tokens, "Priming system message");
        self.generator
            .generate(&request)
            .await
            .context("Priming call failed")?;
        Ok(())
    }

    /// Prompt and budget of the call that answers for one paper.
    fn paper_request(
        &self,
        protocol: Protocol,
        system_message: &str,
        abstract_text: &str,
    ) -> GenerationRequest {
        match protocol {
            Protocol::InitialSystemMessage => GenerationRequest::new(
                render_prompt(&[Message::user(prompts::extract_knowledge_graph(abstract_text))]),
                self.budgets.initial,
            ),
            Protocol::RepeatedSystemMessage => GenerationRequest::new(
                render_prompt(&[
                    Message::system(system_message),
                    Message::user(prompts::extract_content(abstract_text)),
                ]),
                self.budgets.repeated,
            ),
            Protocol::Stepwise => {
                let summary_request = render_prompt(&[
                    Message::system(system_message),
                    Message::user(prompts::extract_content(abstract_text)),
                ]);
                debug!(
                    prompt_len = summary_request.len(),
                    "Summary request built, not sent"
                );
                GenerationRequest::new(
                    render_prompt(&[Message::user(prompts::format_summary_bullets(abstract_text))]),
                    self.budgets.stepwise,
                )
            }
        }
    }

    async fn analyse_paper(
        &self,
        protocol: Protocol,
        system_message: &str,
        ordinal: usize,
        record: &PaperRecord,
        abstract_text: &str,
    ) -> Result<PaperAnalysis> {
        let request = self.paper_request(protocol, system_message, abstract_text);
        debug!(
            ordinal,
            max_new_tokens = request.max_new_tokens,
            prompt_len = request.prompt.len(),
            "Generating"
        );

        let generated = self.generator.generate(&request).await?;
        let answer = extract_answer(&generated)?;
        info!(ordinal, answer_len = answer.len(), "Answer extracted");

        // The stepwise itemize call never carries the system turn.
        let sent_system_message = protocol != Protocol::Stepwise;
        let relations = if sent_system_message
            && PromptKind::of(system_message) == Some(PromptKind::Relations)
        {
            match parse_relations(&answer) {
                Ok(relations) => {
                    let (typed, off_schema): (Vec<_>, Vec<_>) = relations
                        .into_iter()
                        .partition(PicoRelation::is_pico_typed);
                    if !off_schema.is_empty() {
                        debug!(
                            ordinal,
                            dropped = off_schema.len(),
                            "Relations with non-PICO types dropped"
                        );
                    }
                    debug!(ordinal, count = typed.len(), "Relations parsed");
                    Some(typed)
                }
                Err(e) => {
                    debug!(ordinal, error = %e, "Answer holds no parseable relations");
                    None
                }
            }
        } else {
            None
        };

        Ok(PaperAnalysis {
            ordinal,
            title: record.display_title().to_string(),
            answer,
            protocol,
            relations,
            analysed_at: Utc::now(),
        })
    }
}
