//! Wall-clock source for the scheduler.

use time::OffsetDateTime;

/// Local time of day, truncated to what alarm matching needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl LocalTime {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self {
            hour,
            minute,
            second: 0,
        }
    }
}

/// Source of the current local time of day.
///
/// The scheduler only ever asks "what o'clock is it"; keeping this a
/// trait lets tests drive the firing logic with a scripted clock.
pub trait WallClock: Send + Sync {
    fn now(&self) -> LocalTime;
}

/// The host's clock, in the host's local timezone.
///
/// Falls back to UTC when the local offset is indeterminate (stripped
/// down hosts may lack timezone data).
#[derive(Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> LocalTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        LocalTime {
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
        }
    }
}
