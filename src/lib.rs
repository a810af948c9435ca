//! topicbus — an in-process publish/subscribe bus for fixed-size,
//! strongly-typed topics.
//!
//! The core is the topic registry plus per-topic node
//! (`registry`/`node`): it uniquely identifies and lazily materializes
//! topic instances, accepts writes into a bounded ring buffer with a
//! monotonic generation counter, gives each subscriber an independent
//! read cursor with "missed overflow" semantics, and wakes waiters
//! efficiently when new data arrives. Everything else in this crate —
//! the `declare_topic!` macro, the typed `Publisher`/`Subscriber`
//! handles, the anonymous fast path — is plumbing around that core.
//!
//! ```
//! use topicbus::{declare_topic, handle::{Publisher, Subscriber}};
//!
//! declare_topic!(OrbTest, "orb_test", 1, struct OrbTestData { val: i32 });
//!
//! let publisher = Publisher::<OrbTestData>::new(0, 1);
//! let mut subscriber = Subscriber::<OrbTestData>::new(0);
//!
//! publisher.publish(&OrbTestData { val: 2 }).unwrap();
//! assert_eq!(subscriber.copy().unwrap().map(|r| r.val), Some(2));
//! ```

pub mod anonymous;
pub mod callback;
pub mod clock;
pub mod constants;
pub mod error;
pub mod event;
pub mod handle;
pub mod node;
pub mod poll;
pub mod registry;
pub mod topic;

pub use anonymous::{ copy_anonymous, publish_anonymous };
pub use error::{ BusError, Result };
pub use event::Event;
pub use handle::{ Publisher, Subscriber };
pub use node::{ Cursor, DeviceNode };
pub use poll::PollSet;
pub use registry::{ registry, DeviceMaster };
pub use topic::{ Topic, TopicMeta };

/// Crate version, exposed as external metadata (spec §6 "Version").
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
pub fn bus_version() -> &'static str {
    VERSION
}
