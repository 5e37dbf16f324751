use chrono::{DateTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::truncate_to_minute;

pub const CONNECTED_MESSAGE: &str = "Connected to tick server";

/// Payload pushed to subscribers. Immutable once built, never persisted.
///
/// Wire: `{"timestamp":"2026-01-15T09:15:00.000Z","minute":15,"hour":10,"date":"Thu Jan 15 2026","message":"Tick at 10:15:00"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvent {
    /// ISO-8601 UTC instant with millisecond precision.
    pub timestamp: String,
    /// Minute component in the service's local time zone.
    pub minute: u32,
    /// Hour component in the service's local time zone.
    pub hour: u32,
    /// Local calendar date, e.g. `Thu Jan 15 2026`.
    pub date: String,
    pub message: String,
}

impl TickEvent {
    /// Tick for the minute containing `now`: seconds and sub-seconds are
    /// zeroed, so timer jitter never leaks into the payload.
    pub fn at_minute<Tz>(now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let minute = truncate_to_minute(now);
        let message = format!("Tick at {}:{:02}:00", minute.hour(), minute.minute());
        Self::build(&minute, message)
    }

    /// Courtesy acknowledgment sent once on subscribe. Carries the live
    /// instant, not the minute boundary.
    pub fn connected<Tz>(now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self::build(now, CONNECTED_MESSAGE.to_string())
    }

    fn build<Tz>(at: &DateTime<Tz>, message: String) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            timestamp: at
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            minute: at.minute(),
            hour: at.hour(),
            date: at.format("%a %b %d %Y").to_string(),
            message,
        }
    }
}

/// Read-only snapshot returned by `TickService::stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub subscriber_count: usize,
    /// Seconds since this `TickService` was created. The gateway builds it
    /// at startup, so there this is the process uptime.
    pub uptime: f64,
}

/// Timer lifecycle — linear progression, `ShutDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    WaitingForBoundary,
    Ticking,
    ShutDown,
}

/// How the timer task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerExit {
    /// Returned after a shutdown signal, or was aborted.
    Stopped,
    /// Panicked; carries the panic message.
    Panicked(String),
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::WaitingForBoundary => "waiting_for_boundary",
            SchedulerState::Ticking => "ticking",
            SchedulerState::ShutDown => "shut_down",
        };
        write!(f, "{s}")
    }
}
