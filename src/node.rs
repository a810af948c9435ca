//! `DeviceNode` — one ring buffer per (topic, instance).
//!
//! This is the hard part of the crate (spec: "the core"). Grounded in
//! the teacher's `disruptor::spsc::RingBuffer<T>`
//! (`flux/src/disruptor/spsc/ring_buffer.rs`), but generalized from a
//! lock-free single-producer/single-consumer sequence pair to a
//! mutex-guarded multi-producer/multi-subscriber ring keyed by a
//! monotonic generation counter rather than separate producer/consumer
//! atomics, because `DeviceNode` must support an arbitrary number of
//! independent subscriber cursors rather than one shared consumer
//! sequence.

use std::sync::Arc;

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use tracing::{ debug, trace, warn };

use crate::callback::CallbackList;
use crate::error::{ BusError, Result };
use crate::event::Event;
use crate::topic::TopicMeta;

/// A subscriber's read position on a single node.
///
/// `synchronized` distinguishes "never read" from "caught up to
/// generation 0": a fresh cursor on an already-advertised node must
/// deliver only the latest record on its first `copy` (spec §4.3 step 3
/// special case), not replay the whole backlog.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    last_generation: u64,
    synchronized: bool,
}

impl Cursor {
    /// A cursor that has never read from its node.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last generation this cursor has consumed, if any.
    pub fn last_generation(&self) -> Option<u64> {
        self.synchronized.then_some(self.last_generation)
    }
}

struct NodeInner {
    buffer: Vec<u8>,
    record_size: usize,
    queue_size: usize,
    generation: CachePadded<u64>,
    advertised: bool,
    callbacks: CallbackList,
}

impl NodeInner {
    fn slot_offset(&self, generation_1_based: u64) -> usize {
        let slot = (generation_1_based.wrapping_sub(1) as usize) & (self.queue_size - 1);
        slot * self.record_size
    }

    /// Reallocates the ring to `new_size` slots (must be a power of two
    /// no smaller than the current size), preserving the surviving
    /// records at their `(generation - 1) mod new_size` slots (spec
    /// §4.4).
    fn grow(&mut self, new_size: usize) {
        debug_assert!(new_size.is_power_of_two());
        debug_assert!(new_size >= self.queue_size);
        if new_size == self.queue_size {
            return;
        }

        let mut new_buffer = vec![0u8; new_size * self.record_size];
        let gen = *self.generation;
        let surviving = gen.min(self.queue_size as u64);
        let oldest = gen.wrapping_sub(surviving);
        for g in (oldest.wrapping_add(1))..=gen {
            let old_slot = (g.wrapping_sub(1) as usize) & (self.queue_size - 1);
            let new_slot = (g.wrapping_sub(1) as usize) & (new_size - 1);
            let old_off = old_slot * self.record_size;
            let new_off = new_slot * self.record_size;
            new_buffer[new_off..new_off + self.record_size]
                .copy_from_slice(&self.buffer[old_off..old_off + self.record_size]);
        }

        self.buffer = new_buffer;
        self.queue_size = new_size;
    }
}

/// One instance of one topic: the ring buffer, generation counter, queue
/// depth, and callback list (spec §3 "DeviceNode").
pub struct DeviceNode {
    meta: &'static TopicMeta,
    instance: u16,
    inner: Mutex<NodeInner>,
}

fn next_pow2(n: usize) -> usize {
    if n <= 1 { 1 } else { n.next_power_of_two() }
}

impl DeviceNode {
    /// Creates a new, unadvertised node for `meta`/`instance` with a
    /// queue sized to the next power of two at or above
    /// `requested_queue_size` (spec §4.1). Most callers should go
    /// through `DeviceMaster::open_or_create` instead, which
    /// deduplicates by `(meta, instance)`; this constructor is exposed
    /// directly for tests and for embedders that intentionally want an
    /// unregistered, private node.
    pub fn new(meta: &'static TopicMeta, instance: u16, requested_queue_size: usize) -> Self {
        let queue_size = next_pow2(requested_queue_size.max(1));
        let record_size = meta.record_size;
        debug!(topic = meta.name, instance, queue_size, "creating node");
        Self {
            meta,
            instance,
            inner: Mutex::new(NodeInner {
                buffer: vec![0u8; queue_size * record_size],
                record_size,
                queue_size,
                generation: CachePadded::new(0),
                advertised: false,
                callbacks: CallbackList::new(),
            }),
        }
    }

    /// The topic this node belongs to.
    pub fn meta(&self) -> &'static TopicMeta {
        self.meta
    }

    /// The instance index of this node within its topic.
    pub fn instance(&self) -> u16 {
        self.instance
    }

    /// The current queue depth (a power of two).
    pub fn queue_size(&self) -> usize {
        self.inner.lock().queue_size
    }

    /// Whether at least one publish has ever succeeded on this node.
    pub fn is_advertised(&self) -> bool {
        self.inner.lock().advertised
    }

    /// The current generation counter (number of successful publishes).
    pub fn generation(&self) -> u64 {
        *self.inner.lock().generation
    }

    /// Publishes `record` (must be exactly `meta.record_size` bytes),
    /// growing the queue to `requested_queue_size` first if that is
    /// larger than the node's current depth (spec §4.2, §4.4).
    pub fn publish(&self, requested_queue_size: usize, record: &[u8]) -> Result<bool> {
        if record.len() != self.meta.record_size {
            return Err(BusError::RecordSizeMismatch {
                expected: self.meta.record_size,
                actual: record.len(),
            });
        }

        let wanted = next_pow2(requested_queue_size.max(1));
        if wanted > crate::constants::MAX_QUEUE_DEPTH {
            return Err(BusError::QueueSizeExceeded {
                requested: wanted,
                max: crate::constants::MAX_QUEUE_DEPTH,
            });
        }

        let mut inner = self.inner.lock();

        if wanted > inner.queue_size {
            inner.grow(wanted);
        }

        // `generation` wraps rather than panics on overflow: spec §8.5
        // exercises exactly this by forcing the counter to near `u64::MAX`.
        let gen = inner.generation.wrapping_add(1);
        let offset = inner.slot_offset(gen);
        let record_size = inner.record_size;
        inner.buffer[offset..offset + record_size].copy_from_slice(record);
        *inner.generation = gen;
        if !inner.advertised {
            inner.advertised = true;
        }
        inner.callbacks.notify_all();
        trace!(topic = self.meta.name, instance = self.instance, generation = gen, "published");

        Ok(true)
    }

    /// Copies the next unread record for `cursor` into `out`
    /// (`out.len()` must be `meta.record_size`), advancing the cursor.
    /// Returns `false` if nothing new is available (spec §4.3).
    pub fn copy(&self, cursor: &mut Cursor, out: &mut [u8]) -> Result<bool> {
        if out.len() != self.meta.record_size {
            return Err(BusError::RecordSizeMismatch {
                expected: self.meta.record_size,
                actual: out.len(),
            });
        }

        let inner = self.inner.lock();
        if !inner.advertised {
            return Ok(false);
        }

        let gen = *inner.generation;
        if cursor.synchronized && cursor.last_generation == gen {
            return Ok(false);
        }

        let mut effective_last = if cursor.synchronized { cursor.last_generation } else { gen - 1 };

        // Wrapping distance rather than a plain `<` comparison: once `gen`
        // has wrapped past `u64::MAX`, a stale cursor's raw value can sit
        // numerically "ahead of" the current oldest-surviving generation
        // even though it is actually a full lap behind (spec §8.5).
        let surviving = gen.min(inner.queue_size as u64);
        let behind = gen.wrapping_sub(effective_last);
        if behind > surviving {
            warn!(
                topic = self.meta.name,
                instance = self.instance,
                missed = behind - surviving,
                "subscriber overflow: skipping to oldest surviving record"
            );
            effective_last = gen.wrapping_sub(surviving);
        }

        let target = effective_last.wrapping_add(1);
        let offset = inner.slot_offset(target);
        let record_size = inner.record_size;
        out.copy_from_slice(&inner.buffer[offset..offset + record_size]);

        drop(inner);
        cursor.last_generation = target;
        cursor.synchronized = true;
        trace!(topic = self.meta.name, instance = self.instance, generation = target, "copied");

        Ok(true)
    }

    /// Pure check: is there unread data for `cursor`? Does not advance
    /// the cursor (spec §4.4).
    pub fn check_update(&self, cursor: &Cursor) -> bool {
        let inner = self.inner.lock();
        if !inner.advertised {
            return false;
        }
        let gen = *inner.generation;
        if !cursor.synchronized {
            return true;
        }
        gen != cursor.last_generation
    }

    /// Requests a queue depth grow (only grows; a smaller request is
    /// ignored). Unlike `publish`, this does not take effect
    /// immediately if it cannot be done losslessly; callers that need
    /// the "grow on first publish" semantics should instead pass their
    /// desired depth to every `publish` call, which is what
    /// `handle::Publisher` does.
    pub fn set_queue_size(&self, requested: usize) -> Result<()> {
        let wanted = next_pow2(requested.max(1));
        if wanted > crate::constants::MAX_QUEUE_DEPTH {
            return Err(BusError::QueueSizeExceeded {
                requested: wanted,
                max: crate::constants::MAX_QUEUE_DEPTH,
            });
        }
        let mut inner = self.inner.lock();
        if wanted > inner.queue_size {
            inner.grow(wanted);
        }
        Ok(())
    }

    /// Registers `sink` to be posted on every future publish.
    pub fn register_callback(&self, sink: &Arc<Event>) {
        self.inner.lock().callbacks.register(sink);
    }

    /// Unregisters `sink`. No-op if not registered.
    pub fn unregister_callback(&self, sink: &Arc<Event>) {
        self.inner.lock().callbacks.unregister(sink);
    }

    /// Drops every registered callback sink. Called by the registry
    /// during teardown (spec "Lifecycle").
    pub(crate) fn clear_callbacks(&self) {
        self.inner.lock().callbacks.clear();
    }

    /// Forces the generation counter to an arbitrary value. Exists so
    /// the wrap-around scenario in spec §8.5 can be exercised without
    /// actually performing 2^64 publishes; not part of the stable API.
    #[doc(hidden)]
    pub fn force_generation_for_testing(&self, generation: u64) {
        let mut inner = self.inner.lock();
        *inner.generation = generation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare_topic;

    declare_topic!(NodeTestTopic, "node_test_topic", 8);

    fn node() -> DeviceNode {
        DeviceNode::new(&NodeTestTopic::META, 0, 1)
    }

    #[test]
    fn fresh_node_is_not_advertised() {
        let n = node();
        assert!(!n.is_advertised());
        assert_eq!(n.generation(), 0);
    }

    #[test]
    fn publish_sets_advertised_and_bumps_generation() {
        let n = node();
        assert!(n.publish(1, &[1u8; 8]).unwrap());
        assert!(n.is_advertised());
        assert_eq!(n.generation(), 1);
    }

    #[test]
    fn publish_rejects_wrong_size() {
        let n = node();
        let err = n.publish(1, &[0u8; 4]).unwrap_err();
        assert!(matches!(err, BusError::RecordSizeMismatch { expected: 8, actual: 4 }));
    }

    #[test]
    fn copy_before_any_publish_returns_false() {
        let n = node();
        let mut cursor = Cursor::new();
        let mut out = [0u8; 8];
        assert!(!n.copy(&mut cursor, &mut out).unwrap());
    }

    #[test]
    fn fresh_cursor_gets_latest_record_after_several_publishes() {
        let n = DeviceNode::new(&NodeTestTopic::META, 0, 16);
        for v in 0u64..5 {
            n.publish(16, &v.to_le_bytes()).unwrap();
        }
        let mut cursor = Cursor::new();
        let mut out = [0u8; 8];
        assert!(n.copy(&mut cursor, &mut out).unwrap());
        assert_eq!(u64::from_le_bytes(out), 4);
        assert!(!n.check_update(&cursor));
    }

    #[test]
    fn round_trip_preserves_order_within_queue_size() {
        let n = DeviceNode::new(&NodeTestTopic::META, 0, 4);
        let mut cursor = Cursor::new();
        let mut out = [0u8; 8];
        // synchronize first so the "fresh cursor" rule does not apply
        n.publish(4, &0u64.to_le_bytes()).unwrap();
        n.copy(&mut cursor, &mut out).unwrap();

        for v in 1u64..4 {
            n.publish(4, &v.to_le_bytes()).unwrap();
        }
        for expected in 1u64..4 {
            assert!(n.copy(&mut cursor, &mut out).unwrap());
            assert_eq!(u64::from_le_bytes(out), expected);
        }
        assert!(!n.copy(&mut cursor, &mut out).unwrap());
    }

    #[test]
    fn overflow_skips_to_oldest_surviving_record() {
        let n = DeviceNode::new(&NodeTestTopic::META, 0, 16);
        let mut cursor = Cursor::new();
        let mut out = [0u8; 8];
        n.publish(16, &0u64.to_le_bytes()).unwrap();
        n.copy(&mut cursor, &mut out).unwrap();

        for v in 0u64..19 {
            n.publish(16, &v.to_le_bytes()).unwrap();
        }

        let mut received = Vec::new();
        while n.copy(&mut cursor, &mut out).unwrap() {
            received.push(u64::from_le_bytes(out));
        }
        assert_eq!(received, (3u64..=18).collect::<Vec<_>>());
    }

    #[test]
    fn check_update_does_not_advance_cursor() {
        let n = node();
        n.publish(1, &1u64.to_le_bytes()).unwrap();
        let cursor = Cursor::new();
        assert!(n.check_update(&cursor));
        assert!(n.check_update(&cursor));
    }

    #[test]
    fn generation_wraps_around_without_breaking_slot_arithmetic() {
        let n = DeviceNode::new(&NodeTestTopic::META, 0, 4);
        {
            let mut inner = n.inner.lock();
            *inner.generation = u64::MAX - 2;
        }
        let mut cursor = Cursor {
            last_generation: u64::MAX - 2,
            synchronized: true,
        };
        // publish across the wrap point
        for v in 0u64..6 {
            n.publish(4, &v.to_le_bytes()).unwrap();
        }
        let mut out = [0u8; 8];
        let mut received = Vec::new();
        while n.copy(&mut cursor, &mut out).unwrap() {
            received.push(u64::from_le_bytes(out));
        }
        assert_eq!(received.last().copied(), Some(5));
        assert!(received.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn register_and_unregister_callback_are_idempotent() {
        let n = node();
        let sink = Arc::new(Event::new());
        n.register_callback(&sink);
        n.register_callback(&sink);
        n.publish(1, &0u64.to_le_bytes()).unwrap();
        assert!(sink.try_wait());
        assert!(!sink.try_wait());

        n.unregister_callback(&sink);
        n.unregister_callback(&sink);
        n.publish(1, &0u64.to_le_bytes()).unwrap();
        assert!(!sink.try_wait());
    }

    #[test]
    fn publish_rejects_queue_depth_above_the_maximum() {
        let n = node();
        let over = crate::constants::MAX_QUEUE_DEPTH * 2;
        let err = n.publish(over, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, BusError::QueueSizeExceeded { max, .. } if max == crate::constants::MAX_QUEUE_DEPTH));
    }

    #[test]
    fn set_queue_size_rejects_depth_above_the_maximum() {
        let n = node();
        let over = crate::constants::MAX_QUEUE_DEPTH * 2;
        let err = n.set_queue_size(over).unwrap_err();
        assert!(matches!(err, BusError::QueueSizeExceeded { max, .. } if max == crate::constants::MAX_QUEUE_DEPTH));
        assert_eq!(n.queue_size(), 1);
    }

    #[test]
    fn grow_preserves_surviving_records_and_slots() {
        let n = DeviceNode::new(&NodeTestTopic::META, 0, 2);
        n.publish(2, &1u64.to_le_bytes()).unwrap();
        n.publish(2, &2u64.to_le_bytes()).unwrap();
        // grow to 4 on next publish
        n.publish(4, &3u64.to_le_bytes()).unwrap();
        assert_eq!(n.queue_size(), 4);

        let mut cursor = Cursor {
            last_generation: 0,
            synchronized: true,
        };
        let mut out = [0u8; 8];
        let mut received = Vec::new();
        while n.copy(&mut cursor, &mut out).unwrap() {
            received.push(u64::from_le_bytes(out));
        }
        assert_eq!(received, vec![1, 2, 3]);
    }
}
