//! Thin typed handle API.
//!
//! Spec §1 calls this "the thin C-style handle API" a peripheral
//! concern, external to the core. This module is the Rust-idiomatic
//! rendering of that layer: `Publisher<T>`/`Subscriber<T>` map a
//! `Topic`-bound record type to an untyped `DeviceNode` plus a cursor,
//! the way the teacher's `ProducerBuilder`/`ConsumerBuilder`
//! (`flux/src/disruptor/spsc/{producer,consumer}.rs`) wrap the raw
//! ring buffer for ergonomic, type-safe use.

use std::sync::Arc;

use crate::error::Result;
use crate::node::{ Cursor, DeviceNode };
use crate::registry::registry;
use crate::topic::Topic;

/// A typed publisher bound to one topic instance.
pub struct Publisher<T: Topic> {
    node: Arc<DeviceNode>,
    queue_size: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Topic> Publisher<T> {
    /// Creates (or reuses) the node for instance `instance` of `T`'s
    /// topic, requesting `queue_size` slots (spec §6 `create_pub_fixed`).
    pub fn new(instance: u16, queue_size: usize) -> Self {
        let node = registry().open_or_create(T::META, instance, queue_size);
        Self { node, queue_size, _marker: std::marker::PhantomData }
    }

    /// Creates a publisher on the first free instance of `T`'s topic
    /// (spec §6 `create_pub`), returning the handle and the instance it
    /// was assigned.
    pub fn new_auto_instance(queue_size: usize) -> (Self, u16) {
        let (node, instance) = registry().open_next_free_publisher(T::META, queue_size);
        (Self { node, queue_size, _marker: std::marker::PhantomData }, instance)
    }

    /// The instance this publisher writes to.
    pub fn instance(&self) -> u16 {
        self.node.instance()
    }

    /// Publishes `record`. Queue growth to this publisher's requested
    /// `queue_size` happens transparently on whichever publish call
    /// first needs it (spec §4.4).
    pub fn publish(&self, record: &T) -> Result<bool> {
        self.node.publish(self.queue_size, record.as_bytes())
    }
}

/// A typed subscriber bound to one topic instance, owning its own
/// cursor.
pub struct Subscriber<T: Topic> {
    node: Arc<DeviceNode>,
    cursor: Cursor,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Topic> Subscriber<T> {
    /// Subscribes to `instance` of `T`'s topic, lazily creating the
    /// node if no publisher has done so yet (spec §6 `create_sub`).
    pub fn new(instance: u16) -> Self {
        let node = registry().open_or_create(T::META, instance, T::META.default_queue_depth);
        Self { node, cursor: Cursor::new(), _marker: std::marker::PhantomData }
    }

    /// The instance this subscriber reads from.
    pub fn instance(&self) -> u16 {
        self.node.instance()
    }

    /// Whether new data is available without consuming it.
    pub fn check_update(&self) -> bool {
        self.node.check_update(&self.cursor)
    }

    /// Copies the next unread record, if any, advancing the cursor.
    pub fn copy(&mut self) -> Result<Option<T>> {
        let mut buf = vec![0u8; T::META.record_size];
        if self.node.copy(&mut self.cursor, &mut buf)? {
            Ok(Some(T::from_bytes(&buf)))
        } else {
            Ok(None)
        }
    }

    /// Registers `sink` on this subscriber's node, e.g. to add it to a
    /// `PollSet` without going through `PollSet::add`'s own bookkeeping.
    pub fn register_callback(&self, sink: &Arc<crate::event::Event>) {
        self.node.register_callback(sink);
    }

    /// Unregisters `sink` from this subscriber's node.
    pub fn unregister_callback(&self, sink: &Arc<crate::event::Event>) {
        self.node.unregister_callback(sink);
    }

    /// Exposes the underlying node and a copy of the cursor, for
    /// callers building their own `PollSet` membership.
    pub fn node_and_cursor(&self) -> (Arc<DeviceNode>, Cursor) {
        (self.node.clone(), self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare_topic;

    declare_topic!(HandleTestTopic, "handle_test_topic", 1, struct HandleTestRecord { val: i32 });

    #[test]
    fn publish_then_subscribe_round_trips_typed_value() {
        let publisher = Publisher::<HandleTestRecord>::new(0, 1);
        let mut subscriber = Subscriber::<HandleTestRecord>::new(0);

        publisher.publish(&HandleTestRecord { val: 42 }).unwrap();
        let received = subscriber.copy().unwrap();
        assert_eq!(received.map(|r| r.val), Some(42));
    }

    #[test]
    fn auto_instance_publishers_are_assigned_in_order() {
        declare_topic!(HandleAutoTopic, "handle_auto_test_topic", 1, struct HandleAutoRecord { val: i32 });
        for expected in 0u16..3 {
            let (publisher, instance) = Publisher::<HandleAutoRecord>::new_auto_instance(1);
            assert_eq!(instance, expected);
            publisher.publish(&HandleAutoRecord { val: 0 }).unwrap();
        }
    }

    #[test]
    fn check_update_reflects_pending_data() {
        declare_topic!(HandleCheckTopic, "handle_check_test_topic", 1, struct HandleCheckRecord { val: i32 });
        let publisher = Publisher::<HandleCheckRecord>::new(0, 1);
        let mut subscriber = Subscriber::<HandleCheckRecord>::new(0);
        assert!(!subscriber.check_update());

        publisher.publish(&HandleCheckRecord { val: 1 }).unwrap();
        assert!(subscriber.check_update());
        subscriber.copy().unwrap();
        assert!(!subscriber.check_update());
    }
}
