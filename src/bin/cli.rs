//! bgg-harvest CLI
//!
//! Local execution entry point for crawling and recommendation queries.

use std::path::PathBuf;
use std::sync::Arc;

use bgg_harvest::{
    error::Result,
    models::Config,
    pipeline::{self, TraversalEngine},
    services::{Fetcher, HttpTransport, Recommender, RetryPolicy},
    storage::{LocalStorage, RatingStore},
    utils::{Endpoints, create_async_client},
};
use clap::{Parser, Subcommand};

/// bgg-harvest - BoardGameGeek ratings crawler and recommender
#[derive(Parser, Debug)]
#[command(
    name = "bgg-harvest",
    version,
    about = "Crawl BoardGameGeek collections and recommend games"
)]
struct Cli {
    /// Path to storage directory holding config.toml and harvested rows
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl forum lists from the stored checkpoint onwards
    Crawl {
        /// Stop after this many passes (default: run until stopped)
        #[arg(long)]
        passes: Option<usize>,

        /// Start from this forum list instead of the checkpoint
        #[arg(long)]
        from: Option<i64>,
    },

    /// Recommend games for a user and print them as JSON
    Recommend {
        /// BoardGameGeek user name
        user: String,

        /// Re-fetch the user's collection even if it is stored
        #[arg(long)]
        refresh: bool,

        /// Number of recommendations (overrides recommender.top_k)
        #[arg(long)]
        top: Option<usize>,
    },

    /// Validate configuration file
    Validate,

    /// Show checkpoint and stored row counts
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn build_engine(config: &Config, store: Arc<dyn RatingStore>) -> Result<TraversalEngine> {
    let client = create_async_client(&config.crawler)?;
    let fetcher = Fetcher::new(
        Arc::new(HttpTransport::new(client)),
        RetryPolicy::from(&config.crawler),
    );
    let endpoints = Endpoints::new(&config.api)?;
    TraversalEngine::resume(fetcher, endpoints, store).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    log::info!("Using storage directory {}", cli.storage_dir.display());

    let storage = Arc::new(LocalStorage::new(&cli.storage_dir));

    match cli.command {
        Command::Crawl { passes, from } => {
            config.validate()?;
            let mut engine = build_engine(&config, storage.clone()).await?;
            if let Some(id) = from {
                engine = engine.starting_at(id);
            }

            log::info!(
                "Crawling from forum list {} ({} ms between requests)",
                engine.checkpoint(),
                config.crawler.request_delay_ms
            );
            let done = pipeline::run_crawler(&mut engine, passes).await;
            log::info!("Crawl stopped after {} passes", done);
        }

        Command::Recommend { user, refresh, top } => {
            if let Some(top) = top {
                config.recommender.top_k = top;
            }
            config.validate()?;

            let engine = build_engine(&config, storage.clone()).await?;
            let recommender = Recommender::new(storage.clone(), config.recommender.clone());
            let recommendations =
                pipeline::run_recommend(&engine, &recommender, storage.as_ref(), &user, refresh)
                    .await?;

            println!("{}", serde_json::to_string_pretty(&recommendations)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            Endpoints::new(&config.api)?;
            log::info!("Config OK");
        }

        Command::Info => {
            match storage.load_checkpoint().await? {
                Some(id) => log::info!("Next forum list: {}", id),
                None => log::info!("No checkpoint yet, crawl starts at forum list 0"),
            }

            let stats = storage.stats().await?;
            log::info!("Collection rows: {}", stats.collection_rows);
            log::info!("Games: {}", stats.games);
            log::info!("Ratings records: {}", stats.ratings_records);
        }
    }

    Ok(())
}
