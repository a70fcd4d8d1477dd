//! Fan-out of snapshots to subscribed observers.
//!
//! Each observer (typically one open `WebSocket`) gets its own unbounded
//! channel. [`UpdateNotifier::broadcast`] hands the same shared snapshot to
//! every channel; a channel whose receiver is gone is pruned on the spot
//! and never retried. Delivery is best-effort and latest-state-wins, so
//! there is no backpressure.
//!
//! The registry lock is held only for non-blocking sends and map edits,
//! and it is separate from the store's exclusion boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dogrota_types::{ObserverId, Snapshot};
use tokio::sync::mpsc;
use tracing::debug;

type Observers = HashMap<ObserverId, mpsc::UnboundedSender<Arc<Snapshot>>>;

/// One observer's end of the registry.
#[derive(Debug)]
pub struct Subscription {
    /// Handle to pass to [`UpdateNotifier::unsubscribe`].
    pub id: ObserverId,
    /// Snapshots broadcast after subscribing.
    pub rx: mpsc::UnboundedReceiver<Arc<Snapshot>>,
}

/// Registry of observers with best-effort broadcast.
#[derive(Debug, Default)]
pub struct UpdateNotifier {
    observers: Mutex<Observers>,
}

impl UpdateNotifier {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(&self) -> MutexGuard<'_, Observers> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ObserverId::new();
        let count = {
            let mut observers = self.observers();
            observers.insert(id, tx);
            observers.len()
        };
        debug!(observer = %id, observers = count, "Observer subscribed");
        Subscription { id, rx }
    }

    /// Remove an observer. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers().remove(&id).is_some();
        if removed {
            debug!(observer = %id, "Observer unsubscribed");
        }
        removed
    }

    /// Send `snapshot` to every observer, pruning closed ones.
    ///
    /// Returns the number of observers that accepted it. Zero observers is
    /// not an error.
    pub fn broadcast(&self, snapshot: Snapshot) -> usize {
        let snapshot = Arc::new(snapshot);
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|id, tx| {
            let delivered = tx.send(Arc::clone(&snapshot)).is_ok();
            if !delivered {
                debug!(observer = %id, "Dropping closed observer");
            }
            delivered
        });
        let delivered = observers.len();
        debug!(
            delivered,
            pruned = before.saturating_sub(delivered),
            "Broadcast snapshot"
        );
        delivered
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }
}
