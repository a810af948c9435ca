//! Per-node callback list.
//!
//! A node never owns a subscriber or its `Event`; it holds a non-owning
//! `Arc` and relies on explicit `unregister` on the sink's drop path
//! (spec §9, "Cyclic/backref between Node and callback sinks"). The list
//! is small and only touched under the node mutex, so a `Vec` with
//! pointer-identity dedup is simpler and faster than a hash set.

use std::sync::Arc;

use crate::event::Event;

/// A set of notification sinks with idempotent registration.
#[derive(Default)]
pub struct CallbackList {
    sinks: Vec<Arc<Event>>,
}

impl CallbackList {
    /// Creates an empty callback list.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Registers `sink` if not already present. No-op if already
    /// registered (spec invariant: "no duplicates; idempotent").
    pub fn register(&mut self, sink: &Arc<Event>) {
        if !self.contains(sink) {
            self.sinks.push(sink.clone());
        }
    }

    /// Unregisters `sink`. No-op if absent.
    pub fn unregister(&mut self, sink: &Arc<Event>) {
        self.sinks.retain(|s| !Arc::ptr_eq(s, sink));
    }

    fn contains(&self, sink: &Arc<Event>) -> bool {
        self.sinks.iter().any(|s| Arc::ptr_eq(s, sink))
    }

    /// Posts to every registered sink. Non-blocking (spec §4.2 step 6).
    pub fn notify_all(&self) {
        for sink in &self.sinks {
            sink.post();
        }
    }

    /// Drops every registered sink, used during node teardown (spec
    /// "Lifecycle": destruction first empties the callback list).
    pub fn clear(&mut self) {
        self.sinks.clear();
    }

    /// Number of currently registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the list has no registered sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
