//! The persistent alarm definition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque alarm identifier, stable for the alarm's lifetime and never
/// reused within a registry.
pub type AlarmId = String;

/// Label applied when a creation request omits one, and shown when the
/// ringing alarm can no longer be resolved.
pub const DEFAULT_LABEL: &str = "Alarma";

/// Sound selector resolved by the notifier to the host's alarm tone.
pub const DEFAULT_SOUND: &str = "default";

/// A daily wall-clock trigger definition.
///
/// `hour` and `minute` are stored as given; range enforcement happens at
/// the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub hour: u8,
    pub minute: u8,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub vibrate: bool,
    #[serde(default = "default_sound")]
    pub sound_file: String,
    /// Set once the alarm has fired since the last midnight rearm. Never
    /// persisted: every restart begins a fresh day.
    #[serde(skip)]
    pub triggered_today: bool,
}

fn default_label() -> String {
    DEFAULT_LABEL.to_owned()
}

fn default_sound() -> String {
    DEFAULT_SOUND.to_owned()
}

fn default_true() -> bool {
    true
}

static ID_SALT: AtomicU64 = AtomicU64::new(0x6b72_616c);

/// Mint an `alarm_xxxxxxxx` id (the wire format clients already expect)
/// that `taken` does not report as in use.
pub(super) fn fresh_id<F: Fn(&str) -> bool>(taken: F) -> AlarmId {
    loop {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::from(d.subsec_nanos()))
            .unwrap_or(0);
        let salt = ID_SALT.fetch_add(0x9e37_79b9, Ordering::Relaxed);
        let id = format!("alarm_{:08x}", (nanos ^ salt) as u32);
        if !taken(&id) {
            return id;
        }
    }
}
