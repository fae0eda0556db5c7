//! Event bus for fanning graph events out to live subscribers

use super::{EventEmitter, GraphEvent, GraphEventKind};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Registry of live subscribers.
///
/// Every subscriber owns an unbounded queue, so emitting never blocks and one
/// slow reader cannot hold up the others. A subscriber whose receiving end has
/// been dropped is removed on the next emit.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<DashMap<u64, mpsc::UnboundedSender<GraphEvent>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// `greeting`, when given, is queued for this subscriber only, ahead of
    /// any broadcast it may later receive.
    pub fn subscribe_with(&self, greeting: Option<GraphEventKind>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(kind) = greeting {
            // The receiver is alive in this scope, send cannot fail
            let _ = tx.send(GraphEvent::new(kind));
        }
        self.subscribers.insert(id, tx);
        debug!(subscriber_id = id, "Subscriber registered");
        Subscription { id, rx }
    }

    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with(None)
    }

    /// Remove a subscriber explicitly. Dropping the [`Subscription`] has the
    /// same effect at the next emit.
    pub fn unsubscribe(&self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            debug!(subscriber_id = id, "Subscriber removed");
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: GraphEvent) {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
        let delivered = self.subscribers.len();
        if delivered < before {
            debug!(dropped = before - delivered, "Pruned disconnected subscribers");
        }
        debug!(event_type = event.tag(), subscribers = delivered, "GraphEvent emitted");
    }
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<GraphEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event. `None` once the bus has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<GraphEvent> {
        self.rx.recv().await
    }

    /// Next queued event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<GraphEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued so far.
    pub fn drain(&mut self) -> Vec<GraphEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
