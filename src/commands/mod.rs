mod analyse;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::corpus::DEFAULT_RESULT_COUNT;
use crate::pico::prompts::PromptKind;
use crate::pico::report::render_json;
use crate::pico::Protocol;
use crate::state::Settings;

pub use analyse::{
    analyse_initial_sys_message, analyse_repeated_sys_message, analyse_stepwise, run_protocol,
};

/// Extract PICO elements from OpenAlex abstracts with a language model
#[derive(Debug, Parser)]
#[command(name = "pico-extract", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send the system message once, then one user turn per paper
    Initial(AnalyseArgs),
    /// Send the system message with every paper
    Repeated(AnalyseArgs),
    /// Ask for four PICO bullets per paper
    Stepwise(AnalyseArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Print each paper as soon as it is analysed
    Text,
    /// Print all papers as one JSON array at the end
    Json,
}

#[derive(Debug, Args)]
pub struct AnalyseArgs {
    /// Search phrase sent to OpenAlex
    pub search_phrase: String,

    /// Number of papers to analyse
    #[arg(short = 'n', long = "number", default_value_t = DEFAULT_RESULT_COUNT)]
    pub number_of_abstracts: usize,

    /// Model identifier (defaults to LLM_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Custom system message
    #[arg(long, conflicts_with = "prompt_kind")]
    pub prompt: Option<String>,

    /// Built-in system message
    #[arg(long, value_enum)]
    pub prompt_kind: Option<PromptKind>,

    /// Earliest publication year (defaults to PICO_MIN_YEAR)
    #[arg(long)]
    pub min_year: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl AnalyseArgs {
    fn system_message(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .or_else(|| self.prompt_kind.map(PromptKind::template))
    }
}

pub async fn run(cli: Cli, mut settings: Settings) -> Result<()> {
    let (protocol, args) = match cli.command {
        Command::Initial(args) => (Protocol::InitialSystemMessage, args),
        Command::Repeated(args) => (Protocol::RepeatedSystemMessage, args),
        Command::Stepwise(args) => (Protocol::Stepwise, args),
    };

    if let Some(min_year) = &args.min_year {
        settings.min_year = min_year.clone();
    }
    let model = args.model.clone().unwrap_or_else(|| settings.llm_model.clone());
    let prompt = args.system_message();

    match args.format {
        OutputFormat::Text => {
            match protocol {
                Protocol::InitialSystemMessage => {
                    analyse_initial_sys_message(
                        &settings,
                        &model,
                        &args.search_phrase,
                        args.number_of_abstracts,
                        prompt,
                    )
                    .await?
                }
                Protocol::RepeatedSystemMessage => {
                    analyse_repeated_sys_message(
                        &settings,
                        &model,
                        &args.search_phrase,
                        args.number_of_abstracts,
                        prompt,
                    )
                    .await?
                }
                Protocol::Stepwise => {
                    analyse_stepwise(
                        &settings,
                        &model,
                        &args.search_phrase,
                        args.number_of_abstracts,
                        prompt,
                    )
                    .await?
                }
            };
        }
        OutputFormat::Json => {
            let analyses = run_protocol(
                protocol,
                &settings,
                &model,
                &args.search_phrase,
                args.number_of_abstracts,
                prompt,
                |_| {},
            )
            .await?;
            println!("{}", render_json(&analyses).context("Failed to serialize results")?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pico::prompts::PICO_MESSAGE_ABSTRACT;

    fn parse(argv: &[&str]) -> AnalyseArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Initial(args) | Command::Repeated(args) | Command::Stepwise(args) => args,
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["pico-extract", "repeated", "depression treatment"]);
        assert_eq!(args.search_phrase, "depression treatment");
        assert_eq!(args.number_of_abstracts, 10);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.system_message(), None);
    }

    #[test]
    fn test_prompt_kind_selects_builtin() {
        let args = parse(&["pico-extract", "stepwise", "x", "--prompt-kind", "relations", "-n", "3"]);
        assert_eq!(args.number_of_abstracts, 3);
        assert_eq!(args.system_message(), Some(PICO_MESSAGE_ABSTRACT));
    }

    #[test]
    fn test_prompt_and_kind_conflict() {
        let res = Cli::try_parse_from([
            "pico-extract",
            "initial",
            "x",
            "--prompt",
            "custom",
            "--prompt-kind",
            "stepwise",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
