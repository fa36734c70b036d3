//! # curia-daemon
//!
//! Boots the Curia core: loads configuration, installs logging, assembles
//! the key ring (refusing to start on bad key material), the curation
//! engine, the rater and the curator scorer, then keeps the replay guard swept until SIGINT or
//! SIGTERM.

mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use curia_envelope::{HexWalletDirectory, spawn_replay_sweeper};
use curia_rating::{CuratorScorer, EloRater};
use curia_rounds::CurationEngine;
use curia_types::constants::{ENGINE_NAME, VERSION};
use curia_types::CuriaConfig;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "curia-daemon", version, about = "Commit-reveal curation core")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, env = "CURIA_CONFIG")]
    config: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CuriaConfig::from_toml_file(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => CuriaConfig::default(),
    };
    if args.print_config {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    logging::init(&config.logging)?;
    info!(engine = ENGINE_NAME, version = VERSION, "Starting");
    if config.commit_security.allow_legacy_unsigned_commits {
        warn!("Legacy unsigned commits are enabled");
    }

    let security = &config.commit_security;
    let engine = CurationEngine::new(security, Arc::new(HexWalletDirectory))
        .context("assembling curation engine")?;
    let rater = EloRater::new(&config.rating).context("assembling rater")?;
    let curators = CuratorScorer::new();
    info!(
        active_key = %engine.key_ring().active_key_id()?,
        keys = engine.key_ring().key_ids()?.len(),
        k_factor = config.rating.k_factor,
        rated_agents = rater.leaderboard()?.len(),
        scored_curators = curators.standings()?.len(),
        "Core ready"
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let sweeper = spawn_replay_sweeper(
        Arc::clone(engine.replay_guard()),
        Duration::from_secs(security.sweep_interval_secs),
        shutdown_rx,
    );

    shutdown_signal().await?;
    info!("Shutdown requested");
    // An error only means the sweeper already stopped.
    let _ = shutdown_tx.send(());
    sweeper.await.context("joining replay sweeper")?;
    info!("Stopped");
    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?;
        tokio::select! {
            res = signal::ctrl_c() => res.context("waiting for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    Ok(())
}
