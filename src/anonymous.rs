//! Anonymous fast path (spec §4.6).
//!
//! Convenience functions that act on instance 0 of a topic without
//! requiring the caller to hold a long-lived publisher or subscriber
//! handle. `copy_anonymous` does not persist a cursor across calls: it
//! always returns the latest record, equivalent to a throw-away cursor
//! with `last_generation = generation - 1`.

use crate::error::Result;
use crate::node::Cursor;
use crate::registry::registry;
use crate::topic::TopicMeta;

const ANONYMOUS_INSTANCE: u16 = 0;

/// Publishes `record` to instance 0 of `meta`, creating the node at the
/// literal queue depth `1` if it does not already exist (spec §4.6 — the
/// anonymous path always opens at depth 1, regardless of the topic's
/// `default_queue_depth`).
pub fn publish_anonymous(meta: &'static TopicMeta, record: &[u8]) -> Result<bool> {
    let node = registry().open_or_create(meta, ANONYMOUS_INSTANCE, 1);
    node.publish(1, record)
}

/// Copies the latest record of instance 0 of `meta` into `out`,
/// unconditionally (no cursor persistence between calls). Returns
/// `false` if the instance has never been published to.
pub fn copy_anonymous(meta: &'static TopicMeta, out: &mut [u8]) -> Result<bool> {
    let node = registry().open_or_create(meta, ANONYMOUS_INSTANCE, 1);
    // A fresh, never-synchronized cursor is exactly the "deliver the
    // latest record" rule `DeviceNode::copy` already applies (spec
    // §4.3 step 3 special case), so no bespoke logic is needed here.
    let mut cursor = Cursor::new();
    node.copy(&mut cursor, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare_topic;

    declare_topic!(AnonTestTopic, "anon_test_topic", 1, struct AnonTestRecord { val: i32 });

    #[test]
    fn publish_then_copy_anonymous_round_trips() {
        let record = AnonTestRecord { val: 2 };
        publish_anonymous(AnonTestTopic::META, &record.to_bytes()).unwrap();

        let mut out = [0u8; 4];
        assert!(copy_anonymous(AnonTestTopic::META, &mut out).unwrap());
        assert_eq!(AnonTestRecord::from_le(&out).val, 2);
    }

    #[test]
    fn second_copy_anonymous_without_publish_returns_same_value() {
        let record = AnonTestRecord { val: 2 };
        publish_anonymous(AnonTestTopic::META, &record.to_bytes()).unwrap();

        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        copy_anonymous(AnonTestTopic::META, &mut first).unwrap();
        assert!(copy_anonymous(AnonTestTopic::META, &mut second).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn copy_anonymous_before_any_publish_returns_false() {
        declare_topic!(NeverPublished, "anon_never_published_topic", 1, struct NeverPublishedRecord { val: i32 });
        let mut out = [0u8; 4];
        assert!(!copy_anonymous(NeverPublished::META, &mut out).unwrap());
    }

    impl AnonTestRecord {
        fn to_bytes(self) -> [u8; 4] {
            self.val.to_le_bytes()
        }

        fn from_le(bytes: &[u8]) -> Self {
            Self { val: i32::from_le_bytes(bytes.try_into().unwrap()) }
        }
    }
}
