//! TTL Cleanup Daemon
//!
//! Background task that periodically sweeps the expiry index and removes
//! entries whose expiration has passed, through the same delete path
//! foreground callers use.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheShared;
use crate::error::{CacheError, Result};

// == Cleanup Handle ==
/// Lifecycle handle for the running cleanup daemon.
///
/// The stop signal is cooperative: the daemon checks it once per wake-up,
/// so stopping is bounded by one sweep interval.
pub struct CleanupHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Signals the daemon to exit on its next wake-up without waiting for
    /// it.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Signals the daemon to stop and waits until it has exited.
    pub async fn stop(self) {
        self.signal_stop();
        if let Err(err) = self.task.await {
            warn!(%err, "cleanup daemon did not shut down cleanly");
        }
    }
}

// == Spawn ==
/// Spawns the cleanup daemon on the current tokio runtime.
///
/// Fails when no runtime is running; the caller treats that as fatal to
/// open, so a cache configured with a sweep interval never runs without
/// its daemon.
pub fn spawn_cleanup_task(
    shared: Arc<CacheShared>,
    cleanup_interval_secs: u64,
) -> Result<CleanupHandle> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|err| CacheError::DaemonStart(err.to_string()))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let task = runtime.spawn(cleanup_loop(shared, cleanup_interval_secs, stop_rx));

    info!(interval_secs = cleanup_interval_secs, "cleanup daemon started");
    Ok(CleanupHandle { stop_tx, task })
}

// == Cleanup Loop ==
/// Sleep, sweep, repeat until the stop signal arrives.
async fn cleanup_loop(
    shared: Arc<CacheShared>,
    cleanup_interval_secs: u64,
    mut stop_rx: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(cleanup_interval_secs);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    debug!("cleanup daemon observed stop signal");
                    return;
                }
            }
        }

        let removed = shared.sweep_expired();
        if removed > 0 {
            info!(removed, "cleanup sweep removed expired entries");
        } else {
            debug!("cleanup sweep found no expired entries");
        }
    }
}
