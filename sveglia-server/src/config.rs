//! Daemon configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::tracing::prelude::*;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    pub listen: SocketAddr,

    /// Path of the persisted alarm set.
    pub alarms_file: PathBuf,

    /// Liveness marker rewritten by the wake guard.
    pub wake_marker: PathBuf,

    /// Scheduler poll cadence. Bounds worst-case firing latency.
    pub poll_interval: Duration,

    /// How long an unattended alarm rings before it is auto-stopped.
    pub ring_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: ([0, 0, 0, 0], 8082).into(),
            alarms_file: "alarms.json".into(),
            wake_marker: ".keep_alive".into(),
            poll_interval: Duration::from_secs(15),
            ring_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl ServerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(listen) = std::env::var("SVEGLIA_LISTEN") {
            match listen.parse() {
                Ok(addr) => config.listen = addr,
                Err(e) => warn!("ignoring invalid SVEGLIA_LISTEN {listen:?}: {e}"),
            }
        }
        if let Ok(path) = std::env::var("SVEGLIA_ALARMS_FILE") {
            config.alarms_file = path.into();
        }
        if let Ok(path) = std::env::var("SVEGLIA_WAKE_MARKER") {
            config.wake_marker = path.into();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_values() {
        let config = ServerConfig::default();
        assert_eq!(config.listen.port(), 8082);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.ring_timeout, Duration::from_secs(300));
        assert_eq!(config.alarms_file, PathBuf::from("alarms.json"));
    }
}
