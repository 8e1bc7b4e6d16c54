//! Background expiry of unconfirmed reservations.
//!
//! A [`Sweeper`] is a tokio task that calls
//! [`Allocator::sweep_expired`](crate::Allocator::sweep_expired) on a fixed
//! interval. It only does anything when the allocator has a reservation
//! time-to-live configured.

use crate::allocator::Allocator;
use crate::category::Category;
use crate::config::SweepIntervalMs;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Spawns background sweep tasks.
#[derive(Debug, Clone, Copy)]
pub struct Sweeper;

impl Sweeper {
    /// Starts sweeping `allocator` every `interval`.
    ///
    /// Must be called from within a tokio runtime. The first sweep happens one
    /// full interval after spawning. `SweepIntervalMs` is at least 10ms, so
    /// the interval can never be zero.
    pub fn spawn<C: Category>(
        allocator: Arc<Allocator<C>>,
        interval: SweepIntervalMs,
    ) -> SweeperHandle {
        let interval = interval.as_duration();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;

            info!(?interval, "reservation sweeper started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let freed = allocator.sweep_expired();
                        if !freed.is_empty() {
                            debug!(count = freed.len(), "sweep freed reservations");
                        }
                    }
                }
            }
            info!("reservation sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Starts sweeping at the allocator's configured interval.
    pub fn spawn_configured<C: Category>(allocator: Arc<Allocator<C>>) -> SweeperHandle {
        let interval = allocator.config().sweep_interval_ms;
        Self::spawn(allocator, interval)
    }
}

/// Controls a running sweep task. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the task and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "reservation sweeper ended abnormally");
            }
        }
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
