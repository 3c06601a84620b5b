//! WebSocket subscription management.
//!
//! Tracks active `eth_subscribe` subscriptions, routes notifications to
//! their receivers and fires each subscription's one-shot error signal when
//! the connection goes away.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use chainwatch_core::FeedError;

/// A unique subscription ID returned by `eth_subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving half of one subscription.
#[derive(Debug)]
pub struct SubscriptionStreams {
    pub items: mpsc::UnboundedReceiver<Value>,
    pub errors: oneshot::Receiver<FeedError>,
}

struct SubscriptionEntry {
    /// The subscription type (e.g. `"newPendingTransactions"`).
    kind: String,
    sender: mpsc::UnboundedSender<Value>,
    error: oneshot::Sender<FeedError>,
}

/// Manages active WebSocket subscriptions.
#[derive(Clone, Default)]
pub struct SubscriptionManager {
    entries: Arc<Mutex<HashMap<SubscriptionId, SubscriptionEntry>>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionId, SubscriptionEntry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new subscription.
    pub fn register(&self, id: SubscriptionId, kind: String) -> SubscriptionStreams {
        let (sender, items) = mpsc::unbounded_channel();
        let (error, errors) = oneshot::channel();
        self.lock().insert(id, SubscriptionEntry { kind, sender, error });
        SubscriptionStreams { items, errors }
    }

    /// Forward an incoming notification to the correct subscription.
    ///
    /// Returns `false` if the id is unknown or its receiver is gone.
    pub fn dispatch(&self, id: &SubscriptionId, message: Value) -> bool {
        match self.lock().get(id) {
            Some(entry) => entry.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Remove a subscription (e.g. after `eth_unsubscribe`). Its item stream
    /// ends and its error signal resolves as dropped.
    pub fn remove(&self, id: &SubscriptionId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Fire every subscription's error signal with `reason` and drop them.
    ///
    /// The error is sent before the item sender is dropped, so a consumer
    /// that sees its item stream end can always read the reason.
    pub fn fail_all(&self, reason: FeedError) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            tracing::debug!(subscription = %id, kind = %entry.kind, "failing subscription");
            let _ = entry.error.send(reason.clone());
            drop(entry.sender);
        }
        count
    }

    /// Kinds of all active subscriptions.
    pub fn active_kinds(&self) -> Vec<String> {
        self.lock().values().map(|e| e.kind.clone()).collect()
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if there are no active subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
