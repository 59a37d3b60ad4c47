use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::corpus::OpenAlexClient;
use crate::llm::LlmClient;
use crate::pico::report::print_analysis;
use crate::pico::{PaperAnalysis, PicoAnalyser, Protocol};
use crate::state::Settings;

/// Load the model once, then retrieve and analyse. Each result is handed to
/// `on_paper` as it completes.
pub async fn run_protocol(
    protocol: Protocol,
    settings: &Settings,
    model_name: &str,
    search_phrase: &str,
    number_of_abstracts: usize,
    prompt: Option<&str>,
    on_paper: impl FnMut(&PaperAnalysis),
) -> Result<Vec<PaperAnalysis>> {
    let corpus = Arc::new(OpenAlexClient::from_settings(settings)?);
    let generator = Arc::new(LlmClient::load(settings, model_name)?);
    info!(model = generator.model(), %protocol, "Generation client ready");

    let analyser = PicoAnalyser::new(corpus, generator, settings.budgets, &settings.min_year);
    analyser
        .run(protocol, search_phrase, number_of_abstracts, prompt, on_paper)
        .await
}

/// Send the system message once, then one user turn per paper.
pub async fn analyse_initial_sys_message(
    settings: &Settings,
    model_name: &str,
    search_phrase: &str,
    number_of_abstracts: usize,
    prompt: Option<&str>,
) -> Result<Vec<PaperAnalysis>> {
    run_protocol(
        Protocol::InitialSystemMessage,
        settings,
        model_name,
        search_phrase,
        number_of_abstracts,
        prompt,
        print_analysis,
    )
    .await
}

/// Send the system message again with every paper.
pub async fn analyse_repeated_sys_message(
    settings: &Settings,
    model_name: &str,
    search_phrase: &str,
    number_of_abstracts: usize,
    prompt: Option<&str>,
) -> Result<Vec<PaperAnalysis>> {
    run_protocol(
        Protocol::RepeatedSystemMessage,
        settings,
        model_name,
        search_phrase,
        number_of_abstracts,
        prompt,
        print_analysis,
    )
    .await
}

/// Ask for the abstract itemized into four PICO bullets.
pub async fn analyse_stepwise(
    settings: &Settings,
    model_name: &str,
    search_phrase: &str,
    number_of_abstracts: usize,
    prompt: Option<&str>,
) -> Result<Vec<PaperAnalysis>> {
    run_protocol(
        Protocol::Stepwise,
        settings,
        model_name,
        search_phrase,
        number_of_abstracts,
        prompt,
        print_analysis,
    )
    .await
}
