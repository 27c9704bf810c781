//! The repeating alert session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Notifier;
use super::mechanism::{AlertMechanism, Haptics};
use crate::tracing::prelude::*;

/// Gap between alert beats while a session is active.
const ALERT_CADENCE: Duration = Duration::from_millis(1500);

struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// [`Notifier`] that drives the mechanism chain on a fixed cadence.
pub struct AlertNotifier {
    mechanisms: Arc<Vec<Box<dyn AlertMechanism>>>,
    haptics: Arc<dyn Haptics>,
    session: Mutex<Option<Session>>,
    playing: Arc<AtomicBool>,
}

impl AlertNotifier {
    pub fn new(mechanisms: Vec<Box<dyn AlertMechanism>>, haptics: Arc<dyn Haptics>) -> Self {
        Self {
            mechanisms: Arc::new(mechanisms),
            haptics,
            session: Mutex::new(None),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel a session and wait for its loop to exit, so no alert
    /// activity survives the call.
    async fn end_session(&self, session: Option<Session>) {
        if let Some(session) = session {
            session.cancel.cancel();
            if let Err(e) = session.handle.await {
                debug!("alert loop task failed: {e}");
            }
        }
    }
}

#[async_trait]
impl Notifier for AlertNotifier {
    async fn play(&self, sound: &str, vibrate: bool) {
        let previous = self.session.lock().take();
        self.end_session(previous).await;

        self.playing.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(alert_loop(
            Arc::clone(&self.mechanisms),
            Arc::clone(&self.haptics),
            sound.to_owned(),
            vibrate,
            Arc::clone(&self.playing),
            cancel.clone(),
        ));
        *self.session.lock() = Some(Session { cancel, handle });
    }

    async fn stop(&self) {
        let session = self.session.lock().take();
        self.end_session(session).await;
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

async fn alert_loop(
    mechanisms: Arc<Vec<Box<dyn AlertMechanism>>>,
    haptics: Arc<dyn Haptics>,
    sound: String,
    vibrate: bool,
    playing: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    debug!(%sound, vibrate, "alert loop started");
    let mut interval = tokio::time::interval(ALERT_CADENCE);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut beat: u32 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                attempt_chain(&mechanisms, &sound).await;
                // Haptic pulse on every other beat.
                if vibrate && beat % 2 == 0 {
                    if let Err(e) = haptics.pulse().await {
                        debug!("vibration unavailable: {e}");
                    }
                }
                beat += 1;
            }
        }
    }

    playing.store(false, Ordering::SeqCst);
    debug!("alert loop stopped");
}

/// Try each mechanism in order; the beat is satisfied by the first
/// success. When everything fails, fall back to a console banner.
async fn attempt_chain(mechanisms: &[Box<dyn AlertMechanism>], sound: &str) {
    for mechanism in mechanisms {
        match mechanism.alert(sound).await {
            Ok(()) => return,
            Err(e) => debug!("alert mechanism {} failed: {e}", mechanism.name()),
        }
    }

    println!();
    println!("🔔🔔🔔 ALARM 🔔🔔🔔");
    println!("⏰ Stop it from the web interface or `sveglia-cli stop`");
    println!();
}
