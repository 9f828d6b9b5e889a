//! Chapter Feeds CLI
//!
//! Batch entry point: one invocation builds the requested feeds and exits.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use chapter_feeds::{
    error::{AppError, Result},
    hosts::{FeedCommentSource, HostRegistry},
    models::{Config, FeedKind},
    overrides::Overrides,
    pipeline::{CommentsRunner, FeedRunner},
    storage::{HistoryStore, LocalHistoryStore},
    utils::http,
};

/// Chapter Feeds - aggregated novel chapter RSS
#[derive(Parser, Debug)]
#[command(
    name = "chapter-feeds",
    version,
    about = "Aggregates novel chapter releases and reader comments into RSS feeds"
)]
struct Cli {
    /// Path to storage directory containing config.toml, history and feeds
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
    /// Scrape hosts and rebuild feeds
    Run {
        /// Which feed to build
        #[arg(long, value_enum, default_value_t = FeedChoice::All)]
        feed: FeedChoice,

        /// Merge and render without saving history or writing feeds
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and overrides
    Validate,

    /// Show the stored history of one novel (`host-slug/title-slug`)
    History { novel_id: String },

    /// Show configured hosts, novels and output paths
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FeedChoice {
    Free,
    Paid,
    Comments,
    All,
}

impl FeedChoice {
    fn kinds(self) -> Vec<FeedKind> {
        match self {
            FeedChoice::Free => vec![FeedKind::Free],
            FeedChoice::Paid => vec![FeedKind::Paid],
            FeedChoice::Comments => Vec::new(),
            FeedChoice::All => vec![FeedKind::Free, FeedKind::Paid],
        }
    }

    fn includes_comments(self) -> bool {
        matches!(self, FeedChoice::Comments | FeedChoice::All)
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let overrides_path = config.overrides_path(&cli.storage_dir);
    let store = LocalHistoryStore::from_config(&config, &cli.storage_dir);

    match cli.command {
        Command::Run { feed, dry_run } => {
            config.validate()?;
            let overrides = Overrides::load(&overrides_path)?;
            overrides.validate(&config)?;
            if !overrides.is_empty() {
                log::info!("Loaded {} overrides", overrides.len());
            }

            let client = http::create_async_client(&config.crawler)?;
            let registry = HostRegistry::from_config(&config, client.clone());

            let mut runner = FeedRunner::new(&config, &registry, &store).with_overrides(overrides);
            runner = if dry_run {
                runner.dry_run()
            } else {
                runner.with_storage_dir(&cli.storage_dir)
            };

            let mut write_failures = Vec::new();
            for kind in feed.kinds() {
                let summary = runner.run(kind, Utc::now()).await;
                for (novel_id, reason) in &summary.failures {
                    log::warn!("  {}: {}", novel_id, reason);
                }
                match (&summary.feed_path, &summary.feed_error) {
                    (Some(path), _) => log::info!("{} feed written to {}", kind, path.display()),
                    (None, Some(e)) => write_failures.push(format!("{kind}: {e}")),
                    (None, None) => {}
                }
            }

            if feed.includes_comments() {
                let source = FeedCommentSource::new(client);
                let mut comments = CommentsRunner::new(&config, &source);
                if !dry_run {
                    comments = comments.with_storage_dir(&cli.storage_dir);
                }
                let summary = comments.run(Utc::now()).await;
                for (host, reason) in &summary.failures {
                    log::warn!("  {}: {}", host, reason);
                }
                match (&summary.feed_path, &summary.feed_error) {
                    (Some(path), _) => log::info!("comments feed written to {}", path.display()),
                    (None, Some(e)) => write_failures.push(format!("comments: {e}")),
                    (None, None) => {}
                }
            }

            if !write_failures.is_empty() {
                return Err(AppError::serialization(write_failures.join("; ")));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} novels)", config.all_novels().len());

            let overrides = Overrides::load(&overrides_path)?;
            if let Err(e) = overrides.validate(&config) {
                log::error!("Overrides validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Overrides OK ({} entries)", overrides.len());

            log::info!("All validations passed!");
        }

        Command::History { novel_id } => {
            let snapshot = store.peek(&novel_id).await?;
            if snapshot.is_empty() {
                let path = store.path_for(&novel_id);
                log::info!("No history for {} ({})", novel_id, path.display());
                return Ok(());
            }
            if let Some(updated) = snapshot.updated_at {
                log::info!("Last updated: {}", updated.to_rfc3339());
            }
            let mut entries: Vec<_> = snapshot.entries.values().collect();
            entries.sort_by(|a, b| b.record.published_at.cmp(&a.record.published_at));
            for entry in entries {
                log::info!(
                    "{}  {:<24} {}",
                    entry.record.published_at.format("%Y-%m-%d %H:%M"),
                    entry.record.guid,
                    entry.record.label()
                );
            }
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            for host in &config.hosts {
                log::info!("{} ({:?}, {} novels)", host.name, host.adapter, host.novels.len());
                for novel in host.all_novels() {
                    log::info!("  {}", novel.novel_id());
                }
            }
            for kind in [FeedKind::Free, FeedKind::Paid] {
                let path = config.feed_path(&cli.storage_dir, kind);
                log::info!(
                    "{} feed: {} ({})",
                    kind,
                    path.display(),
                    if path.exists() { "exists" } else { "not found" }
                );
            }
            let comments = config.comments_feed_path(&cli.storage_dir);
            log::info!(
                "comments feed: {} ({})",
                comments.display(),
                if comments.exists() { "exists" } else { "not found" }
            );
            log::info!("History: {}", store.dir().display());
        }
    }

    log::info!("Done!");

    Ok(())
}
