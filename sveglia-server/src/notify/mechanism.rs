//! Delivery mechanisms tried in priority order on each alert beat.

use async_trait::async_trait;

use crate::host::run_quiet;

/// Host alarm tone the `"default"` selector resolves to.
const DEFAULT_ALARM_TONE: &str = "/system/media/audio/alarms/Argon.ogg";

/// One way of making noise.
///
/// Implementations are best-effort: a missing binary or non-zero exit is
/// an error the chain absorbs before trying the next mechanism.
#[async_trait]
pub trait AlertMechanism: Send + Sync {
    fn name(&self) -> &'static str;

    async fn alert(&self, sound: &str) -> anyhow::Result<()>;
}

/// `termux-media-player`, the preferred mechanism.
#[derive(Debug, Default)]
pub struct MediaPlayer;

#[async_trait]
impl AlertMechanism for MediaPlayer {
    fn name(&self) -> &'static str {
        "media-player"
    }

    async fn alert(&self, sound: &str) -> anyhow::Result<()> {
        let path = if sound == crate::registry::DEFAULT_SOUND {
            DEFAULT_ALARM_TONE
        } else {
            sound
        };
        run_quiet("termux-media-player", &["play", path]).await
    }
}

/// `termux-notification` with sound, for hosts where media playback is
/// unavailable but the notification shade still chimes.
#[derive(Debug, Default)]
pub struct TermuxNotification;

#[async_trait]
impl AlertMechanism for TermuxNotification {
    fn name(&self) -> &'static str {
        "termux-notification"
    }

    async fn alert(&self, _sound: &str) -> anyhow::Result<()> {
        run_quiet(
            "termux-notification",
            &["--title", "Sveglia", "--content", "Alarm ringing", "--sound"],
        )
        .await
    }
}

/// Terminal bell via `tput bel`.
#[derive(Debug, Default)]
pub struct TerminalBell;

#[async_trait]
impl AlertMechanism for TerminalBell {
    fn name(&self) -> &'static str {
        "terminal-bell"
    }

    async fn alert(&self, _sound: &str) -> anyhow::Result<()> {
        run_quiet("tput", &["bel"]).await
    }
}

/// The production chain, highest priority first. The console banner last
/// resort lives in the alert loop itself, not here.
pub fn default_chain() -> Vec<Box<dyn AlertMechanism>> {
    vec![
        Box::new(MediaPlayer),
        Box::new(TermuxNotification),
        Box::new(TerminalBell),
    ]
}

/// Haptic pulse capability, separate from the audible chain: it runs in
/// addition to the winning mechanism, not as a fallback.
#[async_trait]
pub trait Haptics: Send + Sync {
    async fn pulse(&self) -> anyhow::Result<()>;
}

/// Pulse length in milliseconds.
const VIBRATE_MS: &str = "500";

/// `termux-vibrate` haptics.
#[derive(Debug, Default)]
pub struct TermuxVibrator;

#[async_trait]
impl Haptics for TermuxVibrator {
    async fn pulse(&self) -> anyhow::Result<()> {
        run_quiet("termux-vibrate", &["-d", VIBRATE_MS]).await
    }
}
