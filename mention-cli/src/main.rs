//! Mention CLI
//!
//! Sends webmentions for a feed, accepts and verifies incoming ones, and
//! exposes the triage operations an HTTP front end would call.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mention_core::{Config, MemoryStore};
use mention_runtime::{Runtime, Submission};

#[derive(Parser)]
#[command(name = "mention")]
#[command(author, version, about = "Send, receive and triage webmentions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store snapshot file (overrides the config file)
    #[arg(long, env = "MENTION_STORE", global = true)]
    store: Option<PathBuf>,

    /// Host that accepted targets must live on
    #[arg(long, env = "MENTION_ALLOWED_HOST", global = true)]
    allowed_host: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "MENTION_TIMEOUT_SECS", global = true)]
    timeout: Option<u64>,

    /// Caller holds the administrator capability
    #[arg(long, global = true)]
    admin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send webmentions for every changed entry of a feed
    Send {
        /// Atom or RSS feed file
        #[arg(short, long)]
        feed: PathBuf,
    },

    /// Verify all queued mentions
    Verify,

    /// Accept an inbound mention
    Submit {
        #[arg(short, long)]
        source: String,

        #[arg(short, long)]
        target: String,
    },

    /// List mentions for triage, newest first (admin only)
    Triage {
        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Override the state of a mention (admin only)
    Update {
        #[arg(short, long)]
        key: String,

        /// untriaged, good or spam
        #[arg(short, long)]
        state: String,
    },

    /// Show verified mentions of a target
    Mentions {
        #[arg(short, long)]
        target: String,
    },

    /// Write a stored thumbnail to a file
    Thumbnail {
        #[arg(short, long)]
        id: String,

        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = load_config(&cli)?;
    let store = Arc::new(MemoryStore::load(&config.store_path)?);
    let runtime = Runtime::new(&config, store.clone())?;

    let mutated = match cli.command {
        Commands::Send { feed } => {
            let run = runtime.feeds.process_feed_file(&feed).await?;
            for e in &run.parse_errors {
                warn!("{}", e);
            }
            let report = &run.dispatch;
            println!("📡 Sources: {} ({} already sent)", run.sources, report.skipped.len());
            println!(
                "✅ Sent: {} | ⚠️  Failed: {}",
                report.sent_count(),
                report.failure_count()
            );
            true
        }
        Commands::Verify => {
            let report = runtime.sweeper.verify_queued().await;
            println!(
                "🔍 Verified {}: {} good, {} spam",
                report.processed(),
                report.good.len(),
                report.spam.len()
            );
            for (key, reason) in &report.spam {
                println!("   {} {}", key, reason);
            }
            if !report.write_failures.is_empty() {
                println!("⚠️  {} mentions could not be saved", report.write_failures.len());
            }
            true
        }
        Commands::Submit { source, target } => {
            match runtime.mentions.submit_mention(&source, &target) {
                Submission::Accepted { key } => println!("✅ Accepted: {}", key),
                Submission::Rejected { reason } => bail!("Rejected: {}", reason),
            }
            true
        }
        Commands::Triage { limit, offset } => {
            if !cli.admin {
                warn!("Triage listing requires --admin");
            }
            let page = runtime.mentions.triage_page(cli.admin, limit, offset);
            println!("{}", serde_json::to_string_pretty(&page)?);
            false
        }
        Commands::Update { key, state } => {
            runtime.mentions.update_mention(cli.admin, &key, &state)?;
            println!("✅ {} is now {}", key, state.trim().to_lowercase());
            true
        }
        Commands::Mentions { target } => {
            let good = runtime.mentions.good_mentions_for(&target);
            println!("{}", serde_json::to_string_pretty(&good)?);
            false
        }
        Commands::Thumbnail { id, out } => {
            let bytes = runtime.mentions.thumbnail(&id)?;
            fs::write(&out, &bytes)?;
            println!("📄 Thumbnail saved to: {}", out.display());
            false
        }
    };

    if mutated {
        save_store(&store, &config.store_path)?;
    }

    Ok(())
}

/// Config file, then flag and environment overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    if let Some(host) = &cli.allowed_host {
        config.allowed_host = host.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }

    Ok(config)
}

fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    store.save(path)?;
    info!(
        "Saved {} mentions and {} thumbnails to {}",
        store.mention_count(),
        store.thumbnail_count(),
        path.display()
    );
    Ok(())
}
