//! Listener registries for samples, status transitions and diagnostics
//!
//! Dispatch iterates a snapshot of the listener list taken when the event is
//! published, so listeners may subscribe or unsubscribe (themselves included)
//! from inside a callback. Such changes take effect from the next event on.

use parking_lot::Mutex;
use pulse_shared::{ConnectionState, SignalSample};
use std::sync::{Arc, Weak};

use crate::connection::LinkEvent;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Ordered fan-out of `T` to registered callbacks
pub struct Registry<T> {
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: 'static> Registry<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Append a callback; it runs after every callback registered before it
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = self.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.lock().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Deliver `event` to every callback registered at call time
    pub fn dispatch(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(event);
        }
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability to remove one registered callback
///
/// Dropping a `Subscription` leaves the callback registered.
#[must_use = "dropping a Subscription keeps the callback registered forever"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the callback; later events are no longer delivered to it
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

/// All registries published by the link
#[derive(Default)]
pub struct Subscribers {
    /// Decoded samples
    pub signals: Registry<SignalSample>,
    /// Connection state transitions
    pub status: Registry<ConnectionState>,
    /// Diagnostics (transitions, decode failures, staleness, retries)
    pub events: Registry<LinkEvent>,
}
