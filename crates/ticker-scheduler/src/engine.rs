use std::any::Any;
use std::sync::{atomic::AtomicU64, Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    registry::Subscriber,
    schedule::{delay_until_next_minute, Clock, SystemClock, TICK_INTERVAL_MS},
    types::{SchedulerState, Stats, TickEvent, TimerExit},
};

/// Cancellation handle for the running timer task.
struct TimerHandle {
    shutdown: watch::Sender<bool>,
    task: AbortHandle,
}

/// Subscriber registry plus the minute-aligned timer that feeds it.
///
/// Create one per process, wrap it in an `Arc`, call [`start`](Self::start)
/// once and [`shutdown`](Self::shutdown) on exit. Subscribe/unsubscribe and
/// broadcast may run concurrently from different tasks.
pub struct TickService {
    pub(crate) subscribers: DashMap<String, Subscriber>,
    pub(crate) next_connection: AtomicU64,
    pub(crate) clock: Arc<dyn Clock>,
    state: watch::Sender<SchedulerState>,
    timer: Mutex<Option<TimerHandle>>,
    exit: watch::Sender<Option<TimerExit>>,
    started_at: Instant,
}

impl TickService {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Build a service reading wall-clock time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        let (exit, _) = watch::channel(None);
        Self {
            subscribers: DashMap::new(),
            next_connection: AtomicU64::new(0),
            clock,
            state,
            timer: Mutex::new(None),
            exit,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch scheduler state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            subscriber_count: self.subscribers.len(),
            uptime: self.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Arm the timer: one-shot to the next minute boundary, then every 60 s.
    /// Only valid from `Idle`; any other state is logged and ignored.
    pub fn start(self: &Arc<Self>) {
        let armed = self.state.send_if_modified(|s| {
            if *s == SchedulerState::Idle {
                *s = SchedulerState::WaitingForBoundary;
                true
            } else {
                false
            }
        });
        if !armed {
            warn!(state = %self.state(), "tick scheduler start ignored");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(Arc::clone(self), shutdown_rx));
        *self.timer.lock().unwrap_or_else(PoisonError::into_inner) = Some(TimerHandle {
            shutdown,
            task: task.abort_handle(),
        });

        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            let exit = match task.await {
                Err(e) if e.is_panic() => TimerExit::Panicked(panic_detail(e.into_panic())),
                _ => TimerExit::Stopped,
            };
            if let TimerExit::Panicked(detail) = &exit {
                error!(panic = %detail, "tick scheduler task panicked");
            }
            if let Some(service) = service.upgrade() {
                service.exit.send_replace(Some(exit));
            }
        });
    }

    /// Resolves once the timer task started by [`start`](Self::start) has
    /// ended, reporting whether it stopped or panicked. Never resolves if the
    /// timer was never started.
    pub async fn timer_exit(&self) -> TimerExit {
        let mut rx = self.exit.subscribe();
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(exit) => exit.clone().unwrap_or(TimerExit::Stopped),
            Err(_) => TimerExit::Stopped,
        };
        exit
    }

    /// Build a tick for the current minute and broadcast it now.
    /// Returns how many subscribers it was delivered to.
    pub fn trigger_tick(&self) -> usize {
        let event = TickEvent::at_minute(&self.clock.now());
        self.broadcast(&event)
    }

    /// Cancel the timer, release every sink and clear the registry.
    ///
    /// Idempotent: a second call finds no timer and no subscribers.
    pub fn shutdown(&self) {
        let previous = self.state.send_replace(SchedulerState::ShutDown);

        if let Some(timer) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = timer.shutdown.send(true);
            timer.task.abort();
        }

        let ids: Vec<String> = self.subscribers.iter().map(|e| e.key().clone()).collect();
        let mut released = 0usize;
        for id in ids {
            if let Some((id, subscriber)) = self.subscribers.remove(&id) {
                subscriber.release(&id);
                released += 1;
            }
        }

        if previous == SchedulerState::ShutDown {
            debug!(released, "tick service already shut down");
        } else {
            info!(released, "tick service shut down");
        }
    }

    fn advance(&self, from: SchedulerState, to: SchedulerState) {
        self.state.send_if_modified(|s| {
            if *s == from {
                *s = to;
                true
            } else {
                false
            }
        });
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

impl Default for TickService {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer loop. Exits when `shutdown` flips to `true` or its sender is dropped.
async fn run(service: Arc<TickService>, mut shutdown: watch::Receiver<bool>) {
    let now = service.clock.now();
    let delay = delay_until_next_minute(&now);
    info!(
        next_tick_in_ms = delay.as_millis() as u64,
        local_time = %now.format("%Y-%m-%d %H:%M:%S%.3f"),
        "tick scheduler started"
    );

    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.changed() => {
            info!("tick scheduler cancelled before first tick");
            return;
        }
    }

    service.trigger_tick();
    service.advance(SchedulerState::WaitingForBoundary, SchedulerState::Ticking);

    // Fixed period from the first boundary; drift is not re-synchronised.
    let period = Duration::from_millis(TICK_INTERVAL_MS);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                service.trigger_tick();
            }
            _ = shutdown.changed() => {
                info!("tick scheduler stopped");
                break;
            }
        }
    }
}
