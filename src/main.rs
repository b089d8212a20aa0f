//! TubeQA CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubeqa::cli::{commands, Cli, Commands};
use tubeqa::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(|path| Settings::expand_path(path))
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tubeqa={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    let project = settings.tracing.project.clone().unwrap_or_default();
    let span = info_span!("tubeqa", project = %project);

    run(cli.command, settings, config_path).instrument(span).await
}

async fn run(command: Commands, settings: Settings, config_path: PathBuf) -> Result<()> {
    match command {
        Commands::Ask { question, videos } => {
            commands::run_ask(&question, &videos, settings).await?;
        }

        Commands::Chat { videos } => {
            commands::run_chat(&videos, settings).await?;
        }

        Commands::Ingest { videos } => {
            commands::run_ingest(&videos, settings).await?;
        }

        Commands::Search {
            query,
            videos,
            limit,
        } => {
            commands::run_search(&query, &videos, limit, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Info { video } => {
            commands::run_info(&video, settings).await?;
        }

        Commands::Clear { target } => {
            commands::run_clear(target, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, &settings, &config_path)?;
        }
    }

    Ok(())
}
