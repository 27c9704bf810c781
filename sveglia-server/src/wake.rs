//! Best-effort suspension avoidance.
//!
//! Hosts that aggressively park idle processes (Termux/Android) can
//! starve the scheduler. The wake guard periodically asserts activity so
//! the poll loop keeps getting CPU time. Everything here is best-effort:
//! a missing `termux-api` degrades to the liveness marker alone, and no
//! failure ever stops the keep-alive loop.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::host::run_quiet;
use crate::tracing::prelude::*;

/// Keep-alive loop cadence, independent of the alarm poll loop.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum gap between liveness re-assertions.
const REFRESH_THRESHOLD: Duration = Duration::from_secs(25);

/// Capability to ask the host not to suspend the process.
#[async_trait]
pub trait StayAwake: Send + Sync {
    /// Request the hold. Failures are logged, never surfaced: the
    /// keep-alive loop continues regardless.
    async fn acquire(&self);

    /// Re-assert activity if the refresh threshold has elapsed.
    async fn refresh(&self);

    /// Reverse `acquire`, best-effort.
    async fn release(&self);
}

/// Termux implementation: `termux-wake-lock` plus a liveness marker file
/// rewritten as a lightweight idempotent side effect.
pub struct TermuxWakeLock {
    marker: PathBuf,
    last_refresh: Mutex<Option<Instant>>,
}

impl TermuxWakeLock {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            last_refresh: Mutex::new(None),
        }
    }

    fn touch_marker(&self) {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        if let Err(e) = std::fs::write(&self.marker, stamp.to_string()) {
            debug!("could not write liveness marker {}: {e}", self.marker.display());
        }
    }
}

#[async_trait]
impl StayAwake for TermuxWakeLock {
    async fn acquire(&self) {
        match run_quiet("termux-wake-lock", &[]).await {
            Ok(()) => info!("wake lock acquired"),
            Err(e) => warn!("could not acquire wake lock (termux-api missing?): {e}"),
        }
        self.touch_marker();
        *self.last_refresh.lock() = Some(Instant::now());
    }

    async fn refresh(&self) {
        let due = match *self.last_refresh.lock() {
            Some(last) => last.elapsed() > REFRESH_THRESHOLD,
            None => true,
        };
        if !due {
            return;
        }

        self.touch_marker();
        // A byte of terminal output counts as activity for some reapers.
        print!("\r");
        let _ = std::io::stdout().flush();
        *self.last_refresh.lock() = Some(Instant::now());
        trace!("liveness re-asserted");
    }

    async fn release(&self) {
        if let Err(e) = run_quiet("termux-wake-unlock", &[]).await {
            debug!("wake unlock failed: {e}");
        }
        info!("wake lock released");
    }
}

/// Keep-alive loop. Runs on its own tick so a slow wake-lock invocation
/// can never delay an alarm poll.
pub async fn keep_awake_task(guard: Arc<dyn StayAwake>, running: CancellationToken) {
    trace!("keep-alive task started");
    guard.acquire().await;

    let mut interval = tokio::time::interval(KEEP_ALIVE_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = running.cancelled() => break,
            _ = interval.tick() => {
                guard.refresh().await;
                trace!("keep-alive tick");
            }
        }
    }

    guard.release().await;
    trace!("keep-alive task stopped");
}
