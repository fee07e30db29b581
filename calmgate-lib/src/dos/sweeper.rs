use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::dos::clock::MonotonicClock;
use crate::dos::registry::TrackerRegistry;

pub(crate) const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that periodically evicts idle trackers from the registry.
#[derive(Debug)]
pub struct IdleSweeper {
    handle: JoinHandle<()>,
}

impl IdleSweeper {
    /// Spawns the sweep loop on the current tokio runtime.
    pub fn spawn(
        registry: Arc<TrackerRegistry>,
        clock: MonotonicClock,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if registry.is_empty() {
                    continue;
                }
                let removed = registry.sweep(clock.now_nanos());
                if removed > 0 {
                    debug!(removed, remaining = registry.len(), "idle tracker sweep");
                }
            }
        });
        Self { handle }
    }

    /// Cancels the sweep. An in-flight pass may complete but will not re-arm.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for IdleSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
