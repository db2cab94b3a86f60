use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

mod cli;
mod config;
mod error;
mod harvest;
mod merge;
mod models;
mod providers;
mod store;

use cli::{Cli, Command};
use config::Config;
use error::Result;
use harvest::Harvester;
use providers::ProviderClient;
use store::{newest_first, open_store};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging (info by default, RUST_LOG overrides)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "news-harvester failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?.with_overrides(&cli.overrides());

    if cli.persist {
        let path = cli.config.clone().unwrap_or_else(Config::config_path);
        config.save_to(&path)?;
        tracing::info!(path = %path.display(), "Saved settings");
    }

    match cli.command() {
        Command::Run => fetch(&config).await,
        Command::List { tag, limit } => list(&config, tag.as_deref(), limit).await,
    }
}

async fn fetch(config: &Config) -> Result<()> {
    let keywords = config.keyword_list();
    let store = open_store(config).await?;
    let source = ProviderClient::new(
        config.api_provider,
        config.resolved_api_key(),
        config.max_results,
    )?;
    tracing::info!(
        provider = source.provider().name(),
        store = %store.describe(),
        "Harvesting news"
    );

    let harvester = Harvester::new(
        &source,
        store.as_ref(),
        Duration::from_millis(config.request_interval_ms),
    );
    let report = harvester.run_cycle(&keywords).await?;

    if report.is_noop() {
        println!("No news found for {} keywords", report.keywords_processed);
    } else {
        println!(
            "Processed {} keywords: {} fetched, {} inserted, {} updated",
            report.keywords_processed, report.fetched, report.inserted, report.updated
        );
    }
    Ok(())
}

async fn list(config: &Config, tag: Option<&str>, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let records = newest_first(store.load_all().await?, tag, limit);

    if records.is_empty() {
        println!("No stored news");
        return Ok(());
    }

    for record in records {
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        println!("{:>5}  {}  {}", record.id, record.published_at, record.title);
        println!("       {} [{}]", record.link, tags.join(", "));
    }
    Ok(())
}
