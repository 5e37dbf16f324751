#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Local, TimeDelta, TimeZone};
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use ticker_scheduler::{Clock, EventSink, SinkError, TickEvent};

struct Inner {
    preamble: Mutex<Vec<(String, String)>>,
    frames: Mutex<Vec<String>>,
    failing: AtomicBool,
    failing_close: AtomicBool,
    close_calls: AtomicUsize,
    closed: watch::Sender<bool>,
}

/// Sink that records every frame; its twin [`Tap`] stays with the test.
pub struct MockSink {
    inner: Arc<Inner>,
}

#[derive(Clone)]
pub struct Tap {
    inner: Arc<Inner>,
}

impl MockSink {
    pub fn new() -> (Self, Tap) {
        let (closed, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            preamble: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            failing_close: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            closed,
        });
        (
            Self {
                inner: Arc::clone(&inner),
            },
            Tap { inner },
        )
    }
}

impl EventSink for MockSink {
    fn begin(&self, preamble: &[(&'static str, &'static str)]) -> Result<(), SinkError> {
        let mut stored = self.inner.preamble.lock().unwrap();
        if !stored.is_empty() {
            return Err(SinkError::AlreadyStarted);
        }
        stored.extend(preamble.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Ok(())
    }

    fn send(&self, payload: &str) -> Result<(), SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Full { capacity: 0 });
        }
        self.inner.frames.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() || self.inner.failing_close.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.inner.closed.send_replace(true);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let mut rx = self.inner.closed.subscribe();
        Box::pin(async move {
            let _ = rx.wait_for(|closed| *closed).await;
        })
    }
}

impl Tap {
    pub fn frames(&self) -> Vec<String> {
        self.inner.frames.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<TickEvent> {
        self.frames()
            .iter()
            .map(|f| serde_json::from_str(f).expect("frame is a TickEvent"))
            .collect()
    }

    pub fn preamble(&self) -> Vec<(String, String)> {
        self.inner.preamble.lock().unwrap().clone()
    }

    pub fn fail_writes(&self) {
        self.inner.failing.store(true, Ordering::SeqCst);
    }

    /// Make `close()` report an error while leaving the sink open.
    pub fn fail_closes(&self) {
        self.inner.failing_close.store(true, Ordering::SeqCst);
    }

    /// Simulate the remote end going away.
    pub fn disconnect(&self) {
        self.inner.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

/// Wall clock that advances with tokio's (pausable) clock.
pub struct PausedClock {
    base: DateTime<Local>,
    origin: tokio::time::Instant,
}

impl PausedClock {
    pub fn starting_at(base: DateTime<Local>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = tokio::time::Instant::now() - self.origin;
        self.base + TimeDelta::from_std(elapsed).expect("elapsed fits")
    }
}

/// Clock that panics on every read.
pub struct BrokenClock;

impl Clock for BrokenClock {
    fn now(&self) -> DateTime<Local> {
        panic!("clock source unavailable")
    }
}

/// A local instant on a date with no DST transition near it.
pub fn local(h: u32, m: u32, s: u32, ms: i64) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 1, 15, h, m, s)
        .single()
        .expect("unambiguous local time")
        + TimeDelta::milliseconds(ms)
}

/// Let spawned watcher tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
