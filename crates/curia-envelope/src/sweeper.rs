//! Background replay-guard maintenance.
//!
//! A missed sweep only grows the working set; `admit` already treats
//! expired entries as absent, so correctness never depends on this task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::replay::ReplayGuard;

/// Spawn the sweep loop. It exits when `shutdown` fires or its sender drops.
pub fn spawn_replay_sweeper(
    guard: Arc<ReplayGuard>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "Replay sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match guard.sweep_expired(Utc::now()) {
                        Ok(0) => debug!("Replay sweep: nothing expired"),
                        Ok(purged) => info!(purged, "Replay sweep purged expired entries"),
                        Err(e) => error!(error = %e, "Replay sweep failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Replay sweeper stopping");
                    break;
                }
            }
        }
    })
}
