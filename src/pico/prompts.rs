//! Built-in PICO instruction templates and the fixed user-turn wording.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// JSON list of head/relation/tail tuples typed by PICO element.
pub const PICO_MESSAGE_ABSTRACT: &str = r#"You are an expert agent specialized in extracting PICO elements on abstracts from scientific publications.
The PICO elements are population, intervention, comparison and outcome. Your task is to identify the entities and
relations requested from an abstract of an scientific paper that is given to you in a prompt.
You must generate the output in a JSON containing a list with JSON objects having the following keys:
"head", "head_type", "relation", "tail", and "tail_type".
The "head" key must contain the text of the extracted entity from the provided user prompt,
the "head_type" key must contain the type of the extracted head entity which must be one of the PICO elements, the "relation" key must contain the type of relation
between the "head" and the "tail", the "tail" key must represent the text of an extracted entity which is the tail
of the relation, and the "tail_type" key must contain the type of the tail entity. Attempt to extract around 10 entities and relations.
"#;

/// Bullet points, each prefixed with the PICO element(s) it covers.
pub const PICO_BULLETPOINTS_ABSTRACT: &str = r#"You are an expert agent specialized in extracting PICO elements on abstracts from scientific publications.
The PICO elements are population, intervention, comparison and outcome. Your task is to identify and extract the content from an abstract of an scientific paper that is given to you in a prompt.
You must generate the output in the form of a list of bullet points. The content of each bullet point should summarize an aspect of the abstract with regard to at least one PICO element. Please mention the relevant PICO elements at the beginning of each bullet point.
"#;

/// Free-form PICO summary, to be itemized by a later instruction.
pub const PICO_STEPWISE: &str = r#"You are an expert agent specialized in extracting PICO elements on abstracts from scientific publications.
The PICO elements are population, intervention, comparison and outcome. Your task is to identify and extract the content from an abstract of an scientific paper that is given to you in a prompt.
Summarize the content of the abstract with regard to at the PICO element.
"#;

/// Built-in templates, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Relations,
    BulletPoints,
    Stepwise,
}

impl PromptKind {
    pub fn template(self) -> &'static str {
        match self {
            PromptKind::Relations => PICO_MESSAGE_ABSTRACT,
            PromptKind::BulletPoints => PICO_BULLETPOINTS_ABSTRACT,
            PromptKind::Stepwise => PICO_STEPWISE,
        }
    }

    /// Identify a built-in from its text. Custom instructions yield `None`.
    pub fn of(system_message: &str) -> Option<Self> {
        [Self::Relations, Self::BulletPoints, Self::Stepwise]
            .into_iter()
            .find(|kind| kind.template() == system_message)
    }
}

pub fn extract_knowledge_graph(abstract_text: &str) -> String {
    format!(
        " Extract the knowledge graph fom the following abstract:\n {}",
        abstract_text
    )
}

pub fn extract_content(abstract_text: &str) -> String {
    format!(" Extract the content from the following abstract:\n {}", abstract_text)
}

pub fn format_summary_bullets(abstract_text: &str) -> String {
    format!(
        " Please format the summary into 4 bullet points, each bullet point focusing on one PICO elements (population, intervention, comparison and outcome):\n {}",
        abstract_text
    )
}
