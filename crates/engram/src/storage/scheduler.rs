//! Periodic background consolidation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::storage::store::MemoryStore;

/// Longest supported interval between passes (one year).
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Spawns a task that calls [`MemoryStore::consolidate`] on a fixed interval.
pub struct ConsolidationScheduler;

impl ConsolidationScheduler {
    /// Start the task on the current tokio runtime.
    ///
    /// The first pass runs one full `interval` after spawning. The interval
    /// is clamped to between one millisecond and [`MAX_INTERVAL`].
    pub fn spawn(store: Arc<MemoryStore>, interval: Duration) -> SchedulerHandle {
        let interval = interval.clamp(Duration::from_millis(1), MAX_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_secs = interval.as_secs(), "Consolidation scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = store.consolidate();
                        tracing::debug!(
                            promoted = report.promoted.len(),
                            evicted = report.evictions.len(),
                            "Scheduled consolidation finished"
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Consolidation scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running scheduler; dropping it also stops the task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the task to stop and wait for it to finish its current pass.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Consolidation scheduler task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
