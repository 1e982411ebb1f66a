use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

/// Events broadcast to session holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The server no longer accepts the current credentials
    Unauthenticated,
}

type Callback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(u64, Callback)>,
}

/// Typed publish/subscribe channel for session events.
///
/// Delivery is synchronous and in publish order. Clone is cheap; clones
/// share subscribers.
#[derive(Clone, Default)]
pub struct SessionBus {
    registry: Arc<Mutex<Registry>>,
}

impl SessionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` until the returned handle is dropped.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn publish(&self, event: SessionEvent) {
        // Snapshot so callbacks may subscribe or unsubscribe without deadlocking
        let callbacks: Vec<Callback> = self
            .registry
            .lock()
            .subscribers
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        debug!(?event, subscribers = callbacks.len(), "Publishing session event");
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }
}

/// Live subscription handle; unsubscribes on drop.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
