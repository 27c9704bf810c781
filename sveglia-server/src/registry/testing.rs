//! Shared test doubles for the registry's seams.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Alarm, AlarmRegistry};
use crate::clock::{LocalTime, WallClock};
use crate::error::Result;
use crate::notify::Notifier;
use crate::storage::AlarmStore;

/// Scripted clock the tests move by hand.
pub struct FakeClock {
    now: Mutex<LocalTime>,
}

impl FakeClock {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self {
            now: Mutex::new(LocalTime::new(hour, minute)),
        }
    }

    pub fn set(&self, hour: u8, minute: u8) {
        *self.now.lock() = LocalTime::new(hour, minute);
    }
}

impl WallClock for FakeClock {
    fn now(&self) -> LocalTime {
        *self.now.lock()
    }
}

/// Notifier that only keeps score.
#[derive(Default)]
pub struct FakeNotifier {
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub last_sound: Mutex<Option<String>>,
    playing: AtomicBool,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn play(&self, sound: &str, _vibrate: bool) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        *self.last_sound.lock() = Some(sound.to_owned());
        self.playing.store(true, Ordering::SeqCst);
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct MemStoreState {
    alarms: Mutex<Vec<Alarm>>,
    saves: AtomicUsize,
    fail_load: bool,
    fail_save: AtomicBool,
}

/// In-memory store; clones share state so tests can inspect what the
/// registry persisted.
#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<MemStoreState>,
}

impl MemStore {
    fn failing_load() -> Self {
        Self {
            state: Arc::new(MemStoreState {
                fail_load: true,
                ..Default::default()
            }),
        }
    }

    /// Make subsequent saves fail (or recover) mid-test.
    pub fn fail_saves(&self, fail: bool) {
        self.state.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.state.saves.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<Alarm> {
        self.state.alarms.lock().clone()
    }
}

impl AlarmStore for MemStore {
    fn load(&self) -> Result<Vec<Alarm>> {
        if self.state.fail_load {
            return Err(std::io::Error::other("rigged load failure").into());
        }
        Ok(self.state.alarms.lock().clone())
    }

    fn save(&self, alarms: &[Alarm]) -> Result<()> {
        if self.state.fail_save.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("rigged save failure").into());
        }
        *self.state.alarms.lock() = alarms.to_vec();
        self.state.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Rig {
    pub registry: Arc<AlarmRegistry>,
    pub clock: Arc<FakeClock>,
    pub notifier: Arc<FakeNotifier>,
    pub store: MemStore,
}

pub fn rig() -> Rig {
    rig_with_timeout(Duration::from_secs(300))
}

pub fn rig_with_timeout(ring_timeout: Duration) -> Rig {
    build(MemStore::default(), ring_timeout)
}

pub fn rig_with_failing_load() -> Rig {
    build(MemStore::failing_load(), Duration::from_secs(300))
}

fn build(store: MemStore, ring_timeout: Duration) -> Rig {
    let clock = Arc::new(FakeClock::new(12, 0));
    let notifier = Arc::new(FakeNotifier::default());
    let registry = AlarmRegistry::new(
        Box::new(store.clone()),
        Arc::clone(&clock) as Arc<dyn WallClock>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        ring_timeout,
    );
    Rig {
        registry,
        clock,
        notifier,
        store,
    }
}

/// Give spawned tasks a chance to run between clock advances.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
