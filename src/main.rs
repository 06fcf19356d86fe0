//! HN AI Scraper — Binary Entrypoint
//! `scrape` runs the ingestion pipeline once; `serve` boots the Axum read API.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hn_ai_scraper::api::{self, AppState};
use hn_ai_scraper::classify::OpenAiClassifier;
use hn_ai_scraper::config::ScraperConfig;
use hn_ai_scraper::extract::ArticleExtractor;
use hn_ai_scraper::hn::HnClient;
use hn_ai_scraper::scraper::Scraper;
use hn_ai_scraper::store::StoryStore;

#[derive(Parser)]
#[command(
    name = "hn-ai-scraper",
    about = "Scrape, classify, and serve Hacker News stories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, classify, and store top stories once
    Scrape {
        /// Max candidate ids to process (default: HN_MAX_STORIES)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Serve the read API over the story store
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op where the vars come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "hn_ai_scraper=info,warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();
    let store = Arc::new(StoryStore::open(&config.database_path)?);

    match cli.command {
        Commands::Scrape { limit } => {
            let feed = HnClient::new()?;
            let extractor = ArticleExtractor::new()?;
            let classifier =
                OpenAiClassifier::new(config.openai_api_key.clone(), config.model.clone())?;
            let scraper = Scraper::new(
                Box::new(feed),
                Box::new(extractor),
                Box::new(classifier),
                store,
                config,
            );
            let summary = scraper.run_once(limit).await?;
            tracing::info!(
                attempted = summary.attempted,
                saved = summary.saved,
                "scrape complete"
            );
        }
        Commands::Serve => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            let router = api::create_router(AppState { store });
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "serving read api");
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
