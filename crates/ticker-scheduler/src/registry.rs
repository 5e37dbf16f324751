//! Subscriber bookkeeping for [`TickService`]: subscribe, unsubscribe and
//! the per-subscriber send path used by broadcasts.

use std::sync::{atomic::Ordering, Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    engine::TickService,
    sink::{EventSink, SSE_PREAMBLE},
    types::{SchedulerState, TickEvent},
};

/// One registered client. The registry is the sole owner of its sink.
pub(crate) struct Subscriber {
    sink: Box<dyn EventSink>,
    /// Distinguishes this connection from a later one reusing the same id.
    connection: u64,
    last_delivery: Option<DateTime<Utc>>,
}

impl Subscriber {
    /// Close the sink unless the remote end already did. Errors are logged.
    pub(crate) fn release(self, id: &str) {
        if self.sink.is_closed() {
            return;
        }
        if let Err(e) = self.sink.close() {
            warn!(client_id = %id, error = %e, "failed to close client stream");
        }
    }
}

/// Close a sink that was never registered, logging any error.
fn close_refused(id: &str, sink: &dyn EventSink) {
    if sink.is_closed() {
        return;
    }
    if let Err(e) = sink.close() {
        warn!(client_id = %id, error = %e, "failed to close refused stream");
    }
}

impl TickService {
    /// Register `sink` under `client_id` and greet it with a "connected" event.
    ///
    /// An absent or blank id is replaced by a random UUID. Reusing an id
    /// replaces (and releases) the previous subscriber. When the sink later
    /// closes, the subscriber is removed automatically. Returns the id used.
    pub fn subscribe(self: &Arc<Self>, client_id: Option<&str>, sink: Box<dyn EventSink>) -> String {
        let id = match client_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        if self.state() == SchedulerState::ShutDown {
            warn!(client_id = %id, "subscribe after shutdown; closing stream");
            close_refused(&id, sink.as_ref());
            return id;
        }

        if let Err(e) = sink.begin(&SSE_PREAMBLE) {
            warn!(client_id = %id, error = %e, "failed to open event stream");
            close_refused(&id, sink.as_ref());
            return id;
        }

        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let closed = sink.closed();
        let previous = self.subscribers.insert(
            id.clone(),
            Subscriber {
                sink,
                connection,
                last_delivery: None,
            },
        );
        if let Some(previous) = previous {
            debug!(client_id = %id, "client id reused; replacing previous stream");
            previous.release(&id);
        }

        // Lost a race with shutdown: it already drained the registry.
        if self.state() == SchedulerState::ShutDown {
            self.unsubscribe(&id);
            return id;
        }

        info!(client_id = %id, subscribers = self.subscribers.len(), "client connected");

        let watcher = Arc::downgrade(self);
        let watched = id.clone();
        tokio::spawn(async move {
            closed.await;
            if let Some(service) = watcher.upgrade() {
                service.remove_connection(&watched, connection);
            }
        });

        self.send(&id, &TickEvent::connected(&self.clock.now()));
        id
    }

    /// Remove `client_id` and release its sink. Unknown ids are a no-op.
    pub fn unsubscribe(&self, client_id: &str) {
        if let Some((id, subscriber)) = self.subscribers.remove(client_id) {
            subscriber.release(&id);
            info!(client_id = %id, subscribers = self.subscribers.len(), "client disconnected");
        }
    }

    /// Closure path: only evicts if the entry still belongs to `connection`.
    fn remove_connection(&self, client_id: &str, connection: u64) {
        if let Some((id, subscriber)) = self
            .subscribers
            .remove_if(client_id, |_, s| s.connection == connection)
        {
            subscriber.release(&id);
            info!(client_id = %id, subscribers = self.subscribers.len(), "client disconnected");
        }
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.subscribers.contains_key(client_id)
    }

    /// Time of the last successful write to `client_id`, if any.
    pub fn last_delivery(&self, client_id: &str) -> Option<DateTime<Utc>> {
        self.subscribers.get(client_id).and_then(|s| s.last_delivery)
    }

    /// Send `event` to every subscriber registered at call time.
    ///
    /// Works on a snapshot of ids: subscribers added during the loop wait for
    /// the next broadcast. A failing subscriber is dropped without affecting
    /// the rest. Returns the number of successful deliveries.
    pub(crate) fn broadcast(&self, event: &TickEvent) -> usize {
        let ids: Vec<String> = self.subscribers.iter().map(|e| e.key().clone()).collect();
        if ids.is_empty() {
            debug!("no clients to broadcast to");
            return 0;
        }

        info!(subscribers = ids.len(), timestamp = %event.timestamp, "broadcasting tick event");

        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "failed to serialize tick event");
                return 0;
            }
        };

        ids.iter().filter(|id| self.deliver(id, &payload)).count()
    }

    /// Serialize and send one event to one subscriber.
    pub(crate) fn send(&self, client_id: &str, event: &TickEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(payload) => self.deliver(client_id, &payload),
            Err(e) => {
                error!(client_id = %client_id, error = %e, "failed to serialize event");
                false
            }
        }
    }

    fn deliver(&self, client_id: &str, payload: &str) -> bool {
        // The map guard must be dropped before unsubscribe touches the same shard.
        let result = match self.subscribers.get_mut(client_id) {
            Some(mut subscriber) => {
                let sent = subscriber.sink.send(payload);
                if sent.is_ok() {
                    subscriber.last_delivery = Some(Utc::now());
                }
                sent
            }
            None => return false,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "failed to send event to client");
                self.unsubscribe(client_id);
                false
            }
        }
    }
}
