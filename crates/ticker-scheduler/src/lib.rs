//! `ticker-scheduler` — subscriber registry and minute-aligned tick broadcaster.
//!
//! # Overview
//!
//! [`TickService`] owns every connected subscriber (an id bound to an
//! [`EventSink`]) and a background timer that wakes on each wall-clock minute
//! boundary and fans a [`TickEvent`] out to all of them.
//!
//! # Scheduler lifecycle
//!
//! | State                | Meaning                                          |
//! |----------------------|--------------------------------------------------|
//! | `Idle`               | Created, timer not armed                         |
//! | `WaitingForBoundary` | One-shot timer armed for the next `:00.000`      |
//! | `Ticking`            | First tick sent, fixed 60 s period running       |
//! | `ShutDown`           | Timer cancelled, all sinks released (terminal)   |

pub mod engine;
pub mod error;
pub mod registry;
pub mod schedule;
pub mod sink;
pub mod types;

pub use engine::TickService;
pub use error::{Result, SinkError};
pub use schedule::{Clock, SystemClock};
pub use sink::{EventSink, SSE_PREAMBLE};
pub use types::{SchedulerState, Stats, TickEvent, TimerExit};
