use thiserror::Error;

/// Errors raised by an [`EventSink`](crate::sink::EventSink) implementation.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The remote end went away or the sink was already released.
    #[error("Sink closed")]
    Closed,

    /// The outbound buffer is at capacity; the client is not keeping up.
    #[error("Sink buffer full (capacity {capacity})")]
    Full { capacity: usize },

    /// `begin` was called twice on the same sink.
    #[error("Stream already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, SinkError>;
