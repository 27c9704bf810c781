//! The alarm registry and firing engine.
//!
//! Owns the authoritative alarm set and the single ringing slot, and
//! implements the polling protocol the scheduler task drives.
//!
//! # State machines
//!
//! Per alarm, one daily cycle:
//!
//! ```text
//!  ARMED ──(time match, enabled)──► FIRED ──(00:00 rearm)──► ARMED
//! ```
//!
//! The ringing slot:
//!
//! ```text
//!  SILENT ──(any fire)──► RINGING(id) ──(user stop | auto-stop)──► SILENT
//! ```
//!
//! At most one alarm rings at a time. When several alarms come due in the
//! same poll tick, the first in insertion order claims the slot; a fire in
//! a later tick replaces the occupant and cancels its pending auto-stop.
//!
//! All operations and the poll tick share one coarse mutex. Alarm counts
//! are small and operations cheap, so contention is a non-issue; saves run
//! synchronously inside the mutation path and may briefly stall the next
//! tick.

mod alarm;
#[cfg(test)]
pub mod testing;

pub use alarm::{Alarm, AlarmId, DEFAULT_LABEL, DEFAULT_SOUND};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api_client::types::AlarmState;
use crate::clock::WallClock;
use crate::notify::Notifier;
use crate::storage::AlarmStore;
use crate::tracing::prelude::*;

struct Inner {
    alarms: Vec<Alarm>,
    ringing_id: Option<AlarmId>,
    /// Cancels the pending auto-stop when the occupant changes or the
    /// user stops the alarm first.
    auto_stop: Option<CancellationToken>,
    /// Latch: the 00:00 rearm already ran for the current midnight
    /// minute.
    rearmed_today: bool,
    store: Box<dyn AlarmStore>,
}

impl Inner {
    /// Synchronous save under the registry lock. A failed save keeps the
    /// in-memory mutation; durable state catches up on the next success.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.alarms) {
            error!("failed to persist alarms: {e}");
        }
    }
}

/// The registry context object. Owned by the daemon's main and shared by
/// handle with the HTTP layer and the scheduler task.
pub struct AlarmRegistry {
    inner: Mutex<Inner>,
    /// Lock-free mirror of `ringing_id.is_some()` for "is ringing"
    /// queries.
    ringing: AtomicBool,
    clock: Arc<dyn WallClock>,
    notifier: Arc<dyn Notifier>,
    ring_timeout: Duration,
    /// Self-handle for the auto-stop tasks this registry spawns.
    weak: Weak<AlarmRegistry>,
}

impl AlarmRegistry {
    /// Load persisted alarms and build the registry. A load failure is
    /// logged and yields an empty set.
    pub fn new(
        store: Box<dyn AlarmStore>,
        clock: Arc<dyn WallClock>,
        notifier: Arc<dyn Notifier>,
        ring_timeout: Duration,
    ) -> Arc<Self> {
        let alarms = match store.load() {
            Ok(alarms) => {
                info!("loaded {} alarm(s)", alarms.len());
                alarms
            }
            Err(e) => {
                error!("failed to load alarms, starting empty: {e}");
                Vec::new()
            }
        };

        Arc::new_cyclic(|weak| Self {
            inner: Mutex::new(Inner {
                alarms,
                ringing_id: None,
                auto_stop: None,
                rearmed_today: false,
                store,
            }),
            ringing: AtomicBool::new(false),
            clock,
            notifier,
            ring_timeout,
            weak: weak.clone(),
        })
    }

    /// Register a new alarm, enabled and armed for today. Values are
    /// stored as given.
    pub fn create(
        &self,
        hour: u8,
        minute: u8,
        label: String,
        vibrate: bool,
        sound_file: String,
    ) -> AlarmId {
        let mut inner = self.inner.lock();
        let id = alarm::fresh_id(|candidate| inner.alarms.iter().any(|a| a.id == candidate));
        inner.alarms.push(Alarm {
            id: id.clone(),
            hour,
            minute,
            label,
            enabled: true,
            vibrate,
            sound_file,
            triggered_today: false,
        });
        inner.persist();
        info!(%id, hour, minute, "alarm created");
        id
    }

    /// Remove an alarm. Returns whether a match was found; unknown ids
    /// are not an error and do not touch storage.
    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.alarms.len();
        inner.alarms.retain(|a| a.id != id);
        if inner.alarms.len() == before {
            return false;
        }
        inner.persist();
        info!(%id, "alarm deleted");
        true
    }

    /// Flip an alarm's enabled flag. Returns whether a match was found.
    pub fn toggle(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(alarm) = inner.alarms.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        alarm.enabled = !alarm.enabled;
        let enabled = alarm.enabled;
        inner.persist();
        info!(%id, enabled, "alarm toggled");
        true
    }

    /// Point-in-time snapshot of every alarm, annotated with whether it
    /// owns the ringing slot.
    pub fn list(&self) -> Vec<AlarmState> {
        let inner = self.inner.lock();
        inner
            .alarms
            .iter()
            .map(|a| AlarmState {
                id: a.id.clone(),
                hour: a.hour,
                minute: a.minute,
                label: a.label.clone(),
                enabled: a.enabled,
                vibrate: a.vibrate,
                sound_file: a.sound_file.clone(),
                ringing: inner.ringing_id.as_deref() == Some(a.id.as_str()),
            })
            .collect()
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing.load(Ordering::SeqCst)
    }

    /// Label of the ringing alarm, empty when silent. An alarm deleted
    /// while ringing keeps a presentable generic label.
    pub fn current_ringing_label(&self) -> String {
        let inner = self.inner.lock();
        let Some(id) = &inner.ringing_id else {
            return String::new();
        };
        match inner.alarms.iter().find(|a| &a.id == id) {
            Some(alarm) => alarm.label.clone(),
            None => DEFAULT_LABEL.to_owned(),
        }
    }

    /// Stop whatever is ringing and cancel its pending auto-stop. No-op
    /// when silent.
    pub async fn stop_ringing(&self) {
        let stopped = {
            let mut inner = self.inner.lock();
            if let Some(token) = inner.auto_stop.take() {
                token.cancel();
            }
            inner.ringing_id.take()
        };
        let Some(id) = stopped else { return };

        self.ringing.store(false, Ordering::SeqCst);
        self.notifier.stop().await;
        info!(%id, "alarm stopped");
    }

    /// One pass of the polling protocol. Driven by the scheduler task;
    /// races freely with API mutations, which take the same lock.
    pub async fn tick(&self) {
        let now = self.clock.now();

        let fired = {
            let mut inner = self.inner.lock();

            // The daily rearm runs before the due check so an alarm set
            // for 00:00 still fires, and the latch keeps it to exactly
            // once per midnight.
            if now.hour == 0 && now.minute == 0 {
                if !inner.rearmed_today {
                    for alarm in &mut inner.alarms {
                        alarm.triggered_today = false;
                    }
                    inner.rearmed_today = true;
                    debug!("daily rearm: all alarms armed");
                }
            } else {
                inner.rearmed_today = false;
            }

            let mut winner: Option<Alarm> = None;
            for alarm in &mut inner.alarms {
                if !alarm.enabled || alarm.triggered_today {
                    continue;
                }
                if alarm.hour != now.hour || alarm.minute != now.minute {
                    continue;
                }
                alarm.triggered_today = true;
                if winner.is_none() {
                    winner = Some(alarm.clone());
                } else {
                    info!(id = %alarm.id, "alarm due in same tick; ringing slot already claimed");
                }
            }

            winner.map(|alarm| {
                if let Some(stale) = inner.auto_stop.take() {
                    stale.cancel();
                }
                inner.ringing_id = Some(alarm.id.clone());
                let token = CancellationToken::new();
                inner.auto_stop = Some(token.clone());
                (alarm, token)
            })
        };

        if let Some((alarm, token)) = fired {
            self.ringing.store(true, Ordering::SeqCst);
            info!(id = %alarm.id, label = %alarm.label, "alarm fired");
            self.notifier.play(&alarm.sound_file, alarm.vibrate).await;

            // A stop that arrived while the session was starting has
            // already released the slot; finish its silencing here
            // instead of arming the timeout.
            if token.is_cancelled() {
                self.ringing.store(false, Ordering::SeqCst);
                self.notifier.stop().await;
            } else {
                self.arm_auto_stop(alarm.id, token);
            }
        }
    }

    /// Spawn the cancellable auto-stop for a fresh fire.
    fn arm_auto_stop(&self, id: AlarmId, token: CancellationToken) {
        let registry = self.weak.clone();
        let timeout = self.ring_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    // The registry may be gone during shutdown.
                    if let Some(registry) = registry.upgrade() {
                        registry.auto_stop(&id).await;
                    }
                }
            }
        });
    }

    /// Timeout body: silence the alarm only if it is still the occupant,
    /// never one that started ringing after the timeout was armed.
    async fn auto_stop(&self, id: &str) {
        {
            let mut inner = self.inner.lock();
            if inner.ringing_id.as_deref() != Some(id) {
                return;
            }
            inner.ringing_id = None;
            inner.auto_stop = None;
        }

        self.ringing.store(false, Ordering::SeqCst);
        self.notifier.stop().await;
        warn!(%id, "alarm auto-stopped after ringing unattended");
    }

    #[cfg(test)]
    fn triggered_flags(&self) -> Vec<(AlarmId, bool)> {
        self.inner
            .lock()
            .alarms
            .iter()
            .map(|a| (a.id.clone(), a.triggered_today))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tokio::time;

    use super::testing::{self, Rig, rig, rig_with_timeout, settle};
    use super::*;

    const RING_TIMEOUT: Duration = Duration::from_secs(300);

    /// Notifier whose `play` parks until released, exposing the window
    /// between claiming the ringing slot and the session start.
    #[derive(Default)]
    struct GatedNotifier {
        playing: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Notifier for GatedNotifier {
        async fn play(&self, _sound: &str, _vibrate: bool) {
            self.playing.store(true, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
        }

        async fn stop(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    /// Create an alarm, move the clock onto it, and tick once.
    async fn fire_one(rig: &Rig, hour: u8, minute: u8, label: &str) -> AlarmId {
        let id = rig
            .registry
            .create(hour, minute, label.into(), false, DEFAULT_SOUND.into());
        rig.clock.set(hour, minute);
        rig.registry.tick().await;
        id
    }

    #[tokio::test(start_paused = true)]
    async fn fires_when_clock_matches() {
        let rig = rig();
        let id = fire_one(&rig, 7, 30, "wake").await;

        assert!(rig.registry.is_ringing());
        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 1);

        let listed = rig.registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert!(listed[0].ringing);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_off_the_minute() {
        let rig = rig();
        rig.registry
            .create(7, 30, "wake".into(), false, DEFAULT_SOUND.into());
        rig.clock.set(7, 29);
        rig.registry.tick().await;
        rig.clock.set(7, 31);
        rig.registry.tick().await;

        assert!(!rig.registry.is_ringing());
        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_alarm_never_fires() {
        let rig = rig();
        let id = rig
            .registry
            .create(7, 30, "wake".into(), false, DEFAULT_SOUND.into());
        assert!(rig.registry.toggle(&id));

        rig.clock.set(7, 30);
        rig.registry.tick().await;
        assert!(!rig.registry.is_ringing());
        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_most_once_per_day() {
        let rig = rig();
        fire_one(&rig, 7, 30, "wake").await;
        rig.registry.stop_ringing().await;

        // Several more ticks inside the matching minute.
        rig.registry.tick().await;
        rig.registry.tick().await;

        // And the same wall-clock time again later the same day.
        rig.clock.set(12, 0);
        rig.registry.tick().await;
        rig.clock.set(7, 30);
        rig.registry.tick().await;

        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn midnight_rearms_every_alarm_including_disabled() {
        let rig = rig();
        let early = fire_one(&rig, 6, 0, "early").await;
        rig.registry.stop_ringing().await;
        rig.clock.set(6, 5);
        rig.registry.tick().await;

        let late = fire_one(&rig, 22, 0, "late").await;
        rig.registry.stop_ringing().await;
        // Disable one fired alarm; rearm must reach it regardless.
        assert!(rig.registry.toggle(&late));
        assert!(
            rig.registry
                .triggered_flags()
                .iter()
                .all(|(_, triggered)| *triggered)
        );

        rig.clock.set(0, 0);
        rig.registry.tick().await;
        assert!(
            rig.registry
                .triggered_flags()
                .iter()
                .all(|(_, triggered)| !*triggered)
        );

        // Both can fire again on the new day (re-enable the disabled one).
        assert!(rig.registry.toggle(&late));
        rig.clock.set(6, 0);
        rig.registry.tick().await;
        assert!(rig.registry.is_ringing());
        let _ = early;
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_at_midnight_fires_exactly_once() {
        let rig = rig();
        rig.registry
            .create(0, 0, "midnight".into(), false, DEFAULT_SOUND.into());
        rig.clock.set(0, 0);

        // The whole midnight minute is several poll ticks long.
        rig.registry.tick().await;
        rig.registry.tick().await;
        rig.registry.tick().await;
        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 1);

        // Next day's midnight fires again.
        rig.clock.set(0, 1);
        rig.registry.tick().await;
        rig.clock.set(0, 0);
        rig.registry.tick().await;
        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_silent_is_a_noop() {
        let rig = rig();
        rig.registry.stop_ringing().await;
        assert!(!rig.registry.is_ringing());
        assert_eq!(rig.notifier.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_silences_and_clears_the_slot() {
        let rig = rig();
        let id = fire_one(&rig, 7, 30, "wake").await;
        rig.registry.stop_ringing().await;

        assert!(!rig.registry.is_ringing());
        assert!(!rig.notifier.is_playing());
        assert_eq!(rig.registry.current_ringing_label(), "");
        let listed = rig.registry.list();
        assert!(!listed.iter().any(|a| a.ringing));
        let _ = id;
    }

    #[tokio::test(start_paused = true)]
    async fn ringing_label_resolves_and_falls_back_after_delete() {
        let rig = rig();
        assert_eq!(rig.registry.current_ringing_label(), "");

        let id = fire_one(&rig, 7, 30, "standup").await;
        assert_eq!(rig.registry.current_ringing_label(), "standup");

        assert!(rig.registry.delete(&id));
        assert!(rig.registry.is_ringing());
        assert_eq!(rig.registry.current_ringing_label(), DEFAULT_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_ids_report_false_without_saving() {
        let rig = rig();
        rig.registry
            .create(7, 30, "wake".into(), false, DEFAULT_SOUND.into());
        let saves = rig.store.saves();

        assert!(!rig.registry.toggle("alarm_deadbeef"));
        assert!(!rig.registry.delete("alarm_deadbeef"));
        assert_eq!(rig.store.saves(), saves);
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_persist() {
        let rig = rig();
        let id = rig
            .registry
            .create(5, 15, "run".into(), true, "horn.ogg".into());
        assert_eq!(rig.store.saved().len(), 1);

        assert!(rig.registry.toggle(&id));
        assert!(!rig.store.saved()[0].enabled);

        assert!(rig.registry.delete(&id));
        assert!(rig.store.saved().is_empty());
        assert_eq!(rig.store.saves(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_values_are_stored_as_given() {
        // Range policy lives at the API boundary.
        let rig = rig();
        rig.registry
            .create(99, 77, "weird".into(), false, DEFAULT_SOUND.into());
        let listed = rig.registry.list();
        assert_eq!((listed[0].hour, listed[0].minute), (99, 77));
    }

    #[tokio::test(start_paused = true)]
    async fn load_failure_starts_empty() {
        let rig = testing::rig_with_failing_load();
        assert!(rig.registry.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn same_tick_tie_break_is_first_inserted() {
        let rig = rig();
        let first = rig
            .registry
            .create(7, 30, "first".into(), false, DEFAULT_SOUND.into());
        let second = rig
            .registry
            .create(7, 30, "second".into(), false, DEFAULT_SOUND.into());

        rig.clock.set(7, 30);
        rig.registry.tick().await;

        // Both consumed their daily trigger, one notifier session.
        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 1);
        assert!(
            rig.registry
                .triggered_flags()
                .iter()
                .all(|(_, triggered)| *triggered)
        );

        let listed = rig.registry.list();
        let ringing: Vec<_> = listed.iter().filter(|a| a.ringing).collect();
        assert_eq!(ringing.len(), 1);
        assert_eq!(ringing[0].id, first);
        let _ = second;
    }

    #[tokio::test(start_paused = true)]
    async fn later_fire_replaces_the_occupant() {
        let rig = rig();
        let first = fire_one(&rig, 7, 30, "first").await;
        let second = rig
            .registry
            .create(7, 31, "second".into(), false, DEFAULT_SOUND.into());

        rig.clock.set(7, 31);
        rig.registry.tick().await;

        assert_eq!(rig.notifier.plays.load(Ordering::SeqCst), 2);
        let listed = rig.registry.list();
        assert!(!listed.iter().find(|a| a.id == first).unwrap().ringing);
        assert!(listed.iter().find(|a| a.id == second).unwrap().ringing);
        assert_eq!(rig.registry.current_ringing_label(), "second");
    }

    #[tokio::test(start_paused = true)]
    async fn auto_stop_fires_after_the_timeout_and_not_before() {
        let rig = rig_with_timeout(RING_TIMEOUT);
        fire_one(&rig, 7, 30, "wake").await;
        settle().await;

        time::advance(RING_TIMEOUT - Duration::from_secs(1)).await;
        settle().await;
        assert!(rig.registry.is_ringing());

        time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(!rig.registry.is_ringing());
        assert!(!rig.notifier.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_stop_cancels_the_pending_auto_stop() {
        let rig = rig_with_timeout(RING_TIMEOUT);
        fire_one(&rig, 7, 30, "first").await;
        settle().await;

        // Stop by hand, then start a second alarm before the first
        // timeout would have expired.
        time::advance(Duration::from_secs(60)).await;
        settle().await;
        rig.registry.stop_ringing().await;

        rig.registry
            .create(7, 35, "second".into(), false, DEFAULT_SOUND.into());
        rig.clock.set(7, 35);
        rig.registry.tick().await;
        settle().await;

        // Past the first alarm's would-be deadline: the second must
        // still be ringing.
        time::advance(RING_TIMEOUT - Duration::from_secs(30)).await;
        settle().await;
        assert!(rig.registry.is_ringing());
        assert_eq!(rig.registry.current_ringing_label(), "second");

        // The second alarm's own deadline still applies.
        time::advance(Duration::from_secs(31)).await;
        settle().await;
        assert!(!rig.registry.is_ringing());
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_fire_reschedules_auto_stop() {
        let rig = rig_with_timeout(RING_TIMEOUT);
        fire_one(&rig, 7, 30, "first").await;
        settle().await;

        time::advance(Duration::from_secs(240)).await;
        settle().await;
        rig.registry
            .create(7, 34, "second".into(), false, DEFAULT_SOUND.into());
        rig.clock.set(7, 34);
        rig.registry.tick().await;
        settle().await;

        // The first alarm's deadline passes without silencing the
        // replacement.
        time::advance(Duration::from_secs(90)).await;
        settle().await;
        assert!(rig.registry.is_ringing());
        assert_eq!(rig.registry.current_ringing_label(), "second");

        time::advance(RING_TIMEOUT).await;
        settle().await;
        assert!(!rig.registry.is_ringing());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_racing_a_fresh_fire_still_silences() {
        let clock = Arc::new(testing::FakeClock::new(7, 30));
        let notifier = Arc::new(GatedNotifier::default());
        let registry = AlarmRegistry::new(
            Box::new(testing::MemStore::default()),
            Arc::clone(&clock) as Arc<dyn WallClock>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            RING_TIMEOUT,
        );
        registry.create(7, 30, "wake".into(), false, DEFAULT_SOUND.into());

        let ticker = Arc::clone(&registry);
        let tick = tokio::spawn(async move { ticker.tick().await });
        notifier.entered.notified().await;

        // The slot is claimed but the session is still starting.
        registry.stop_ringing().await;
        notifier.release.notify_one();
        tick.await.unwrap();

        assert!(!registry.is_ringing());
        assert!(!notifier.is_playing());
        assert!(!registry.list().iter().any(|a| a.ringing));

        // The stale timeout must never silence a later fire.
        time::advance(RING_TIMEOUT * 2).await;
        settle().await;
        assert!(!notifier.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn save_failure_does_not_poison_registry_state() {
        let rig = rig();
        rig.store.fail_saves(true);

        let id = rig
            .registry
            .create(7, 30, "wake".into(), false, DEFAULT_SOUND.into());
        assert!(rig.registry.toggle(&id));

        // Mutations land in memory even though nothing reached the store.
        let listed = rig.registry.list();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].enabled);
        assert!(rig.store.saved().is_empty());

        // The next mutation after the store recovers writes the full set.
        rig.store.fail_saves(false);
        assert!(rig.registry.toggle(&id));
        assert_eq!(rig.store.saved().len(), 1);
        assert!(rig.store.saved()[0].enabled);
    }
}
