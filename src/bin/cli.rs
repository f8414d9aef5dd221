//! Coupon feed CLI
//!
//! Local entry point: watch the feed, refresh once, or inspect the cache.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use coupon_feed::{
    error::{AppError, Result},
    models::{CacheEntry, Config, Snapshot},
    pipeline::{IngestionPipeline, RefreshOutcome, Scheduler},
    presentation::{BadgePicker, ConsolePresenter, DEFAULT_BADGE_THRESHOLD, Presenter},
    storage::{CacheStore, LocalStorage},
};
use tokio::sync::watch;

/// coupon-feed - Published coupon spreadsheet reader
#[derive(Parser, Debug)]
#[command(
    name = "coupon-feed",
    version,
    about = "Fetch, cache, and display a published coupon spreadsheet"
)]
struct Cli {
    /// Directory holding the cache file (overrides config and environment)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show cached coupons, then refresh on an interval until Ctrl-C
    Watch {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Run one refresh cycle and print the result
    Refresh {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Render the cached coupons without touching the network
    Show {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,

        /// Mark roughly 30% of cards as exclusive, reproducibly
        #[arg(long)]
        badge_seed: Option<u64>,
    },

    /// List the categories in the cache
    Categories,

    /// Show cache location and state
    Info,

    /// Validate configuration
    Validate,

    /// Remove the cached entry
    Clear,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(cli: &Cli) -> (Config, Option<String>) {
    let path = cli.config.clone().unwrap_or_else(|| {
        cli.storage_dir
            .clone()
            .unwrap_or_else(|| Config::default().storage.dir)
            .join("config.toml")
    });

    let (config, warning) = match Config::load(&path) {
        Ok(config) => (config, None),
        Err(e) => (
            Config::default(),
            Some(format!(
                "Config load failed from {}: {}. Using defaults.",
                path.display(),
                e
            )),
        ),
    };

    let mut config = config.with_env_overrides();
    if let Some(dir) = &cli.storage_dir {
        config.storage.dir = dir.clone();
    }
    (config, warning)
}

fn presenter(config: &Config, category: Option<String>) -> ConsolePresenter {
    let presenter = ConsolePresenter::new(config.fields.clone());
    match category {
        Some(category) => presenter.with_category(category),
        None => presenter,
    }
}

async fn cached_entry(store: &LocalStorage) -> Result<CacheEntry> {
    match store.load().await? {
        Some(entry) => Ok(entry),
        None => {
            log::warn!("No cache found at {}", store.location());
            Ok(CacheEntry::empty())
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, warning) = load_config(&cli);
    init_logging(cli.verbose, &config.logging.level);
    if let Some(warning) = warning {
        log::warn!("{}", warning);
    }

    let store = Arc::new(LocalStorage::from_config(&config.storage));
    log::debug!("Cache entry: {}", store.location());

    match cli.command {
        Command::Watch { category } => {
            config.validate()?;
            let (tx, rx) = watch::channel(false);

            let presenter = Arc::new(presenter(&config, category));
            let mut pipeline = IngestionPipeline::from_config(&config, store, presenter)?
                .with_shutdown(rx.clone());
            pipeline.seed_from_cache().await;

            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                }
                log::info!("Shutting down...");
                let _ = tx.send(true);
            });

            let pipeline = Scheduler::from_config(pipeline, &config.refresh)
                .run(rx)
                .await;
            log::info!("{}", pipeline.status_line());
        }

        Command::Refresh { category } => {
            config.validate()?;
            let presenter = Arc::new(presenter(&config, category));
            let mut pipeline = IngestionPipeline::from_config(&config, store, presenter)?;

            match pipeline.refresh().await {
                RefreshOutcome::Failed => {
                    return Err(AppError::network("feed unavailable and no cache present"));
                }
                outcome => log::info!("Refresh finished: {:?}", outcome),
            }
        }

        Command::Show {
            category,
            badge_seed,
        } => {
            let entry = cached_entry(&store).await?;
            let snapshot = entry
                .to_snapshot()
                .unwrap_or_else(|| Snapshot::empty(Utc::now()));

            let mut presenter = presenter(&config, category);
            if let Some(seed) = badge_seed {
                presenter =
                    presenter.with_badges(BadgePicker::seeded(DEFAULT_BADGE_THRESHOLD, seed));
            }
            presenter.on_categories_ready(&snapshot.categories(&config.fields.category));
            presenter.on_snapshot_ready(&snapshot);
        }

        Command::Categories => {
            let entry = cached_entry(&store).await?;
            if let Some(snapshot) = entry.to_snapshot() {
                for category in snapshot.categories(&config.fields.category) {
                    println!("{}", category);
                }
            }
        }

        Command::Info => {
            log::info!("Feed: {}", config.feed.url);
            log::info!("Cache entry: {}", store.location());

            match store.load().await {
                Ok(Some(entry)) => match entry.to_snapshot() {
                    Some(snapshot) => {
                        let fresh = snapshot.is_fresh(Utc::now(), config.refresh.cache_duration());
                        log::info!("Records: {}", snapshot.len());
                        log::info!(
                            "Last updated: {} ({})",
                            snapshot.last_updated().format("%Y-%m-%d %H:%M:%S UTC"),
                            if fresh { "fresh" } else { "stale" }
                        );
                        log::info!("Fingerprint: {}", snapshot.fingerprint());
                    }
                    None => log::info!("Cache entry holds no data."),
                },
                Ok(None) => log::info!("No cache found yet."),
                Err(e) => log::warn!("Cache unreadable: {}", e),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Clear => {
            store.clear().await?;
            log::info!("Removed {}", store.location());
        }
    }

    Ok(())
}
