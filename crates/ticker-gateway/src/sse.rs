//! [`EventSink`] backed by an axum SSE response.
//!
//! `channel()` returns the sink (handed to the registry) and its feed (turned
//! into the response body). Frames travel through a bounded mpsc channel so
//! the broadcaster never waits on a slow client; the shared cancellation
//! token fires when either side goes away.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::sse::Event;
use futures_util::{future::BoxFuture, Stream};
use ticker_scheduler::{EventSink, SinkError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

type Preamble = Vec<(&'static str, &'static str)>;

pub struct SseSink {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    capacity: usize,
    preamble: Arc<OnceLock<Preamble>>,
    closed: CancellationToken,
}

/// Receiving half: becomes the SSE body.
pub struct SseFeed {
    rx: mpsc::Receiver<String>,
    preamble: Arc<OnceLock<Preamble>>,
    closed: CancellationToken,
}

pub fn channel(capacity: usize) -> (SseSink, SseFeed) {
    let (tx, rx) = mpsc::channel(capacity);
    let preamble = Arc::new(OnceLock::new());
    let closed = CancellationToken::new();
    (
        SseSink {
            tx: Mutex::new(Some(tx)),
            capacity,
            preamble: Arc::clone(&preamble),
            closed: closed.clone(),
        },
        SseFeed {
            rx,
            preamble,
            closed,
        },
    )
}

impl EventSink for SseSink {
    fn begin(&self, preamble: &[(&'static str, &'static str)]) -> Result<(), SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        self.preamble
            .set(preamble.to_vec())
            .map_err(|_| SinkError::AlreadyStarted)
    }

    fn send(&self, payload: &str) -> Result<(), SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(SinkError::Closed);
        };
        tx.try_send(payload.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn close(&self) -> Result<(), SinkError> {
        // Dropping the sender ends the body once queued frames are flushed.
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.closed.cancel();
        match tx {
            Some(_) => Ok(()),
            None => Err(SinkError::Closed),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let token = self.closed.clone();
        Box::pin(async move { token.cancelled().await })
    }
}

impl SseFeed {
    /// True once the registry accepted the stream and wrote its preamble.
    pub fn is_started(&self) -> bool {
        self.preamble.get().is_some()
    }

    /// Preamble written by the registry, as response headers.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for &(name, value) in self.preamble.get().into_iter().flatten() {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    /// SSE body. Dropping it (client disconnect) closes the sink.
    pub fn into_stream(self) -> impl Stream<Item = Result<Event, Infallible>> {
        let SseFeed { mut rx, closed, .. } = self;
        let guard = closed.drop_guard();
        async_stream::stream! {
            let _guard = guard;
            while let Some(payload) = rx.recv().await {
                yield Ok(Event::default().data(payload));
            }
        }
    }
}
