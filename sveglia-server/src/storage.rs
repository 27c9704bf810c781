//! Durable alarm storage.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::Result;
use crate::registry::Alarm;
use crate::tracing::prelude::*;

/// Full-set load/save as consumed by the registry.
///
/// Implementations hold no alarm state beyond a single call. Saves run
/// inside the registry lock, so they should stay cheap.
pub trait AlarmStore: Send {
    fn load(&self) -> Result<Vec<Alarm>>;
    fn save(&self, alarms: &[Alarm]) -> Result<()>;
}

/// Pretty-printed JSON array in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlarmStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Alarm>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no alarm file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    fn save(&self, alarms: &[Alarm]) -> Result<()> {
        let json = serde_json::to_vec_pretty(alarms)?;
        fs::write(&self.path, json)?;
        debug!("saved {} alarm(s) to {}", alarms.len(), self.path.display());
        Ok(())
    }
}
