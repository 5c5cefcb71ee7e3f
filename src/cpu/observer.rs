//! Synchronous publish/subscribe for state snapshots.
//!
//! Subscribers are closures called in registration order. A new subscriber
//! receives the current state immediately, then one call per change.

use serde::{Serialize, Deserialize};

/// Handle returned by `register`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(u64);

/// A boxed snapshot handler.
pub type Subscriber<T> = Box<dyn FnMut(&T) + Send>;

/// Ordered list of subscribers for snapshots of type `T`.
pub struct Observers<T> {
    next_id: u64,
    subscribers: Vec<(ObserverId, Subscriber<T>)>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    /// Add a subscriber and deliver `current` to it right away.
    pub fn register(&mut self, mut subscriber: Subscriber<T>, current: &T) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        subscriber(current);
        self.subscribers.push((id, subscriber));
        tracing::trace!(?id, total = self.subscribers.len(), "observer registered");
        id
    }

    /// Remove a subscriber. Returns false if the id was not registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    /// True if nobody is listening, so snapshots need not be built.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver a snapshot to every subscriber, oldest first.
    pub fn notify(&mut self, snapshot: &T) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(snapshot);
        }
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_register_delivers_current_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut observers = Observers::new();
        observers.register(Box::new(move |v: &u32| sink.lock().unwrap().push(*v)), &7);

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_notify_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::new();
        for tag in ["a", "b", "c"] {
            let sink = Arc::clone(&seen);
            observers.register(
                Box::new(move |v: &u32| sink.lock().unwrap().push(format!("{}{}", tag, v))),
                &0,
            );
        }
        seen.lock().unwrap().clear();

        observers.notify(&1);
        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_remove_observer() {
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let mut observers = Observers::new();
        let id = observers.register(Box::new(move |_: &u32| *sink.lock().unwrap() += 1), &0);

        assert!(observers.remove(id));
        assert!(!observers.remove(id));
        assert!(observers.is_empty());

        observers.notify(&1);
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
