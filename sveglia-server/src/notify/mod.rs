//! Audible/haptic alerting with a cascading fallback chain.

mod mechanism;
mod player;

pub use mechanism::{
    AlertMechanism, Haptics, MediaPlayer, TerminalBell, TermuxNotification, TermuxVibrator,
    default_chain,
};
pub use player::AlertNotifier;

use async_trait::async_trait;

/// Alert dispatch as seen by the alarm registry.
///
/// One session at a time: `play` while a session is active replaces it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Start a repeating alert session for the given sound selector.
    async fn play(&self, sound: &str, vibrate: bool);

    /// Stop the session and wait for the alert loop to fully exit. No-op
    /// when nothing is playing.
    async fn stop(&self);

    fn is_playing(&self) -> bool;
}
