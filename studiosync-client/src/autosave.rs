//! Autosave scheduling
//!
//! A fixed-period timer drives [`SaveCoordinator::autosave`] for the
//! lifetime of the editing session. A tick never overlaps an in-flight
//! save: whoever is saving holds the coordinator lock, and a tick that
//! cannot take it immediately is skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::coordinator::SaveCoordinator;
use crate::editor::SourceHandler;

/// Attempt to save projects every 30 seconds.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Recurring autosave timer.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    period: Duration,
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self {
            period: AUTOSAVE_INTERVAL,
        }
    }
}

impl AutosaveScheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Drive autosave cycles until the task is dropped. Failures are logged
    /// and never retried; the next cycle starts fresh.
    pub async fn run<H>(self, coordinator: Arc<Mutex<SaveCoordinator<H>>>)
    where
        H: SourceHandler + Send,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; the first
        // autosave should happen one full period after arming.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Ok(mut coordinator) = coordinator.try_lock() else {
                tracing::debug!("save in flight, skipping autosave tick");
                continue;
            };
            if let Err(err) = coordinator.autosave().await {
                tracing::error!("autosave failed: {err}");
            }
        }
    }
}
