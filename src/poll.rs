//! Poll aggregator.
//!
//! A set of `DeviceNode`s sharing one `Event`, so a single `wait` call
//! can block on "any of these has new data" (spec §4.5). Grounded in the
//! teacher's callback-list-plus-shared-waiter idiom
//! (`CallbackList`/`Event`), lifted one level: instead of one waiter per
//! subscriber, `PollSet` registers a single waiter across many nodes.

use std::sync::Arc;
use std::time::Duration;

use crate::node::{ Cursor, DeviceNode };
use crate::event::Event;

struct Member {
    node: Arc<DeviceNode>,
    cursor: Cursor,
}

/// Aggregates several subscriptions behind one wait primitive, mirroring
/// the handle layer's `{fd, events, revents}` poll-file abstraction
/// (spec §4.5 "Poll-file integration"): `revents` there corresponds to
/// `check_update` being true for that member after `wait` returns.
pub struct PollSet {
    waiter: Arc<Event>,
    members: Vec<Member>,
}

impl PollSet {
    /// Creates an empty poll set.
    pub fn new() -> Self {
        Self { waiter: Arc::new(Event::new()), members: Vec::new() }
    }

    /// Adds `node` (with its own cursor) as a member, registering the
    /// shared waiter as a callback on it.
    pub fn add(&mut self, node: Arc<DeviceNode>, cursor: Cursor) {
        node.register_callback(&self.waiter);
        self.members.push(Member { node, cursor });
    }

    /// Removes the member at `index`, unregistering the shared waiter.
    pub fn remove(&mut self, index: usize) {
        let member = self.members.remove(index);
        member.node.unregister_callback(&self.waiter);
    }

    /// Number of members currently tracked.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Drains stale permits, then blocks up to `timeout` for new data on
    /// any member, then re-scans every member with `check_update` to
    /// discover which are actually ready (spec §4.5: "this handles the
    /// N-permit-for-1-update coalescing safely"). Returns the number of
    /// ready members, or 0 on timeout.
    pub fn wait(&self, timeout: Duration) -> usize {
        while self.waiter.try_wait() {
            // drain permits accumulated since the previous wait() call
        }
        self.waiter.wait_for(timeout);
        self.members.iter().filter(|m| m.node.check_update(&m.cursor)).count()
    }

    /// The cursors for currently-ready members, paired with their index,
    /// for callers that want to know *which* members woke up rather than
    /// just the count.
    pub fn ready_indices(&self) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.node.check_update(&m.cursor))
            .map(|(i, _)| i)
            .collect()
    }

    /// Copies the next record for member `index` into `out`, advancing
    /// its cursor.
    pub fn copy(&mut self, index: usize, out: &mut [u8]) -> crate::error::Result<bool> {
        let member = &mut self.members[index];
        member.node.copy(&mut member.cursor, out)
    }
}

impl Default for PollSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollSet {
    fn drop(&mut self) {
        for member in &self.members {
            member.node.unregister_callback(&self.waiter);
        }
    }
}
