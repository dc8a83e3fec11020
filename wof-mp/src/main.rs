//! Media Player Pool (wof-mp) - Main entry point
//!
//! Replays a saved outfit feed (JSON array as returned by the feed
//! endpoints) through a `MediaPlayerPool` to exercise capacity, eviction
//! and cleanup against real payloads.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wof_mp::feed::ScrollSession;
use wof_mp::{Config, ConfigOverrides, MediaPlayerPool};

/// Command-line arguments for wof-mp
#[derive(Parser, Debug)]
#[command(name = "wof-mp")]
#[command(about = "Bounded media player pool for outfit feeds")]
#[command(version)]
struct Args {
    /// Feed file (JSON array of outfits)
    feed: PathBuf,

    /// Config file (default: ~/.config/wof/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of live players
    #[arg(long, env = "WOF_POOL_CAPACITY")]
    capacity: Option<usize>,

    /// Idle threshold for hidden players, in seconds
    #[arg(long)]
    max_idle_secs: Option<u64>,

    /// Background sweep period, in seconds
    #[arg(long)]
    sweep_interval_secs: Option<u64>,

    /// Time each card stays on screen, in milliseconds
    #[arg(long, default_value = "1500")]
    dwell_ms: u64,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config = Config::load(ConfigOverrides {
        config_path: args.config.clone(),
        capacity: args.capacity,
        max_idle_secs: args.max_idle_secs,
        sweep_interval_secs: args.sweep_interval_secs,
    })
    .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the config file level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wof_mp={0},wof_common={0}", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting WOF media player pool replay");
    match &config.source {
        Some(source) => info!(
            "Config file: {} ({:?})",
            source.path.display(),
            source.source
        ),
        None => info!("No config file found, using defaults"),
    }

    let body = tokio::fs::read_to_string(&args.feed)
        .await
        .with_context(|| format!("Failed to read feed file {}", args.feed.display()))?;
    let outfits = wof_common::models::parse_feed(&body).context("Failed to parse feed")?;
    info!(
        "Loaded {} outfit(s) from {}",
        outfits.len(),
        args.feed.display()
    );

    let pool = MediaPlayerPool::new(config.pool.clone())
        .context("Failed to create media player pool")?;
    pool.start_sweeper().await;

    let session = ScrollSession::new(
        pool.clone(),
        config.feed.release_window,
        Duration::from_millis(args.dwell_ms),
    );

    tokio::select! {
        result = session.run(&outfits) => {
            let summary = result.context("Feed replay failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "cards={} played={} fallbacks={} released={}",
                    summary.cards, summary.played, summary.fallbacks, summary.released
                );
                println!(
                    "acquired={} reused={} evicted(capacity={}, idle={}, other={}) overruns={} creation_failures={}",
                    summary.events.acquired,
                    summary.events.reused,
                    summary.events.evicted_capacity,
                    summary.events.evicted_idle,
                    summary.events.evicted_other,
                    summary.events.capacity_overruns,
                    summary.events.creation_failures
                );
            }
        }
        _ = shutdown_signal() => {
            pool.shutdown().await;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
