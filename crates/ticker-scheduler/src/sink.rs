use futures_util::future::BoxFuture;

use crate::error::Result;

/// Response metadata written once when a subscriber's stream opens.
pub const SSE_PREAMBLE: [(&str, &str); 3] = [
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
];

/// One open, long-lived outbound connection owned by a single subscriber.
///
/// Implementations are provided by the transport layer. `send` must never
/// block: a slow consumer reports [`SinkError::Full`](crate::SinkError::Full)
/// instead of stalling the broadcast.
pub trait EventSink: Send + Sync {
    /// Write the stream preamble (status metadata / headers). Called once,
    /// before the first `send`.
    fn begin(&self, preamble: &[(&'static str, &'static str)]) -> Result<()>;

    /// Queue one message; the sink applies its own framing.
    fn send(&self, payload: &str) -> Result<()>;

    /// Release the connection. Errors if it was already closed.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Resolves once the sink closes, whether the remote end went away or
    /// `close` was called. Resolves immediately if already closed.
    fn closed(&self) -> BoxFuture<'static, ()>;
}
