//! The polling task that drives alarm firing.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::AlarmRegistry;
use crate::tracing::prelude::*;

/// Default poll cadence. Worst-case firing latency is one interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Poll the registry until cancelled. The daemon joins this task on
/// shutdown so no tick is left mid-flight.
pub async fn task(registry: Arc<AlarmRegistry>, poll_interval: Duration, running: CancellationToken) {
    trace!("alarm scheduler started");
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = running.cancelled() => {
                info!("alarm scheduler shutdown requested");
                break;
            }
            _ = interval.tick() => registry.tick().await,
        }
    }
    trace!("alarm scheduler stopped");
}
