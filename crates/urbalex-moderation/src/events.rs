//! Process-wide notification channel with named topics.
//!
//! Replaces the browser console's window-global custom event: components
//! subscribe to a topic by name and stop receiving when they drop the
//! subscription. The moderation session publishes [`RULES_UPDATED`] after a
//! finalize run that persisted changes, so sibling views (e.g. the
//! navigation category list) can refetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

/// Topic published after a finalize run persisted at least one change.
pub const RULES_UPDATED: &str = "rules-updated";

const TOPIC_CAPACITY: usize = 16;

/// Cloneable handle to the process-wide bus.
#[derive(Clone, Default)]
pub struct EventBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<()>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic. Dropping the returned [`Subscription`]
    /// unsubscribes.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let mut topics = self.topics.lock().expect("event bus lock poisoned");
        let sender = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        Subscription {
            receiver: sender.subscribe(),
        }
    }

    /// Publish to a topic. Returns the number of live subscribers notified.
    pub fn publish(&self, topic: &str) -> usize {
        let topics = self.topics.lock().expect("event bus lock poisoned");
        match topics.get(topic) {
            Some(sender) => sender.send(()).unwrap_or(0),
            None => 0,
        }
    }
}

/// A live subscription to one topic.
pub struct Subscription {
    receiver: broadcast::Receiver<()>,
}

impl Subscription {
    /// Wait for the next notification. Returns `false` once the bus is gone
    /// and no buffered notifications remain.
    pub async fn notified(&mut self) -> bool {
        match self.receiver.recv().await {
            Ok(()) => true,
            // missed notifications collapse into one wake-up
            Err(broadcast::error::RecvError::Lagged(_)) => true,
            Err(broadcast::error::RecvError::Closed) => false,
        }
    }

    /// Non-blocking check for a buffered notification.
    pub fn try_notified(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(()) => true,
            Err(broadcast::error::TryRecvError::Lagged(_)) => true,
            Err(_) => false,
        }
    }
}
