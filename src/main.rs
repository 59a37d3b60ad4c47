mod commands;
mod corpus;
mod llm;
mod pico;
mod state;

use clap::Parser;
use tracing::{info, Level};

use commands::Cli;
use state::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    let level = dotenv::var("PICO_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    // stdout carries the report
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    info!(
        openalex = %settings.openalex_base_url,
        llm = %settings.llm_base_url,
        min_year = %settings.min_year,
        "Settings loaded"
    );

    commands::run(cli, settings).await
}
