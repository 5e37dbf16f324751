use chrono::{DateTime, Local, TimeDelta, TimeZone, Timelike};
use std::time::Duration;

/// Fixed period between ticks once the first boundary has been hit.
pub const TICK_INTERVAL_MS: u64 = 60_000;

/// Source of wall-clock time for the scheduler.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// The real local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Milliseconds elapsed since the start of the minute containing `now`.
fn millis_into_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> u64 {
    // nanosecond() exceeds 999_999_999 only during a leap second.
    let millis = (now.nanosecond() / 1_000_000).min(999);
    u64::from(now.second()) * 1000 + u64::from(millis)
}

/// Delay from `now` to the next wall-clock minute boundary.
///
/// `60000 - (seconds * 1000 + milliseconds)`; exactly on a boundary this is a
/// full minute, never zero.
pub fn delay_until_next_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    Duration::from_millis(TICK_INTERVAL_MS - millis_into_minute(now))
}

/// `now` with seconds and sub-second components zeroed.
pub fn truncate_to_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let into_minute =
        TimeDelta::seconds(i64::from(now.second())) + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    now.clone() - into_minute
}
