//! Topic metadata.
//!
//! Spec §3 treats `TopicMeta` as an external collaborator: "generated
//! per-topic metadata (name, record size, default queue depth) supplied
//! at registration time" is explicitly out of core scope. There is no
//! code-generation step in this crate, so the stand-in is a small
//! `declare_topic!` macro that defines a record struct together with a
//! `'static TopicMeta` describing it, in the spirit of the teacher's
//! concrete slot types (`SmallSlot`, `Slot16`, `Slot32`, `Slot64` in
//! `flux/src/disruptor/slots.rs`).
//!
//! Identity for the registry is by `&'static TopicMeta` pointer (spec
//! §3: "pointer-equality or numeric id is sufficient since instances are
//! interned").

/// Immutable, process-wide description of a topic's wire shape.
#[derive(Debug)]
pub struct TopicMeta {
    /// Human-readable topic name, used for diagnostics and logging.
    pub name: &'static str,
    /// Fixed byte size of one record of this topic.
    pub record_size: usize,
    /// Queue depth new instances of this topic default to when no
    /// explicit depth is requested.
    pub default_queue_depth: usize,
}

impl TopicMeta {
    /// A stable numeric identity for this topic, used as half of the
    /// registry key. Two `TopicMeta` values are the "same topic" iff
    /// this id matches, which holds for any two `&'static` references
    /// to the one static produced by `declare_topic!`.
    pub fn id(&'static self) -> usize {
        self as *const TopicMeta as usize
    }
}

/// A Rust type that is the record type of a topic, with an associated
/// `'static` `TopicMeta` describing it. Implemented by the type
/// `declare_topic!` generates; the handle layer (`crate::handle`) is
/// generic over this trait so it never touches raw bytes directly.
pub trait Topic: Sized + Copy + 'static {
    /// The metadata describing this topic.
    const META: &'static TopicMeta;

    /// Borrows `self` as the raw bytes `DeviceNode::publish` expects.
    /// # Safety
    /// The implementation generated by `declare_topic!` satisfies this
    /// by being a `#[repr(C)]` plain-old-data struct with no padding
    /// bytes that alias interior pointers; callers must not implement
    /// `Topic` for types containing references, `Drop` impls, or
    /// uninitialized padding.
    fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts((self as *const Self).cast::<u8>(), std::mem::size_of::<Self>()) }
    }

    /// Reconstructs a record from bytes previously produced by
    /// `as_bytes` (or an equal-length, equal-layout source).
    fn from_bytes(bytes: &[u8]) -> Self;
}

/// Declares a fixed-size topic record type and its `TopicMeta`.
///
/// ```
/// use topicbus::declare_topic;
///
/// declare_topic!(OrbTest, "orb_test", 1, struct OrbTestData { val: i32 });
/// ```
///
/// The three-argument form (`declare_topic!(Name, "topic_name",
/// record_size)`) declares a bare `[u8; record_size]`-backed record for
/// tests that only care about opaque bytes.
#[macro_export]
macro_rules! declare_topic {
    ($name:ident, $topic_name:expr, $depth:expr, struct $record:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[repr(C)]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $record {
            $(pub $field: $ty),*
        }

        pub struct $name;

        impl $name {
            pub const META: &'static $crate::topic::TopicMeta = &$crate::topic::TopicMeta {
                name: $topic_name,
                record_size: std::mem::size_of::<$record>(),
                default_queue_depth: $depth,
            };
        }

        impl $crate::topic::Topic for $record {
            const META: &'static $crate::topic::TopicMeta = $name::META;

            fn from_bytes(bytes: &[u8]) -> Self {
                assert_eq!(bytes.len(), std::mem::size_of::<Self>());
                let mut record = Self::default();
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        bytes.as_ptr(),
                        (&mut record as *mut Self).cast::<u8>(),
                        bytes.len(),
                    );
                }
                record
            }
        }
    };

    ($name:ident, $topic_name:expr, $depth:expr) => {
        pub struct $name;

        impl $name {
            pub const META: &'static $crate::topic::TopicMeta = &$crate::topic::TopicMeta {
                name: $topic_name,
                record_size: 8,
                default_queue_depth: $depth,
            };
        }
    };
}
