//! Counting wait primitive.
//!
//! `Event` is the "wait strategy" of this library: a counting semaphore
//! that subscribers block on and that `DeviceNode::publish` posts to.
//! Modeled on the teacher's `BlockingWaitStrategy`
//! (`parking_lot::Mutex` + `Condvar`), generalized from "wait for a
//! specific sequence" to "wait for at least one pending permit", which is
//! all a subscriber needs: permits are coalesced away by re-scanning
//! `check_update` after waking (spec §4.2, §4.5).

use std::time::{ Duration, Instant };

use parking_lot::{ Condvar, Mutex };

/// A counting, thread-safe notification primitive.
///
/// `post` never blocks and may be called while a node's mutex is held
/// (spec §4.8: callbacks invoked under the node mutex must not block).
/// `wait`/`wait_for`/`try_wait` consume at most one permit per call; a
/// burst of N posts leaves N permits, but a waiter only ever needs to
/// observe "count > 0" to know it should re-scan its subscriptions.
pub struct Event {
    count: Mutex<u64>,
    condvar: Condvar,
}

impl Event {
    /// Creates a new, unposted event.
    pub fn new() -> Self {
        Self { count: Mutex::new(0), condvar: Condvar::new() }
    }

    /// Adds one permit and wakes all waiters. Non-blocking.
    pub fn post(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_add(1);
        self.condvar.notify_all();
    }

    /// Consumes one permit if available without blocking.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks until a permit is available, then consumes it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.condvar.wait(&mut count);
        }
        *count -= 1;
    }

    /// Blocks until a permit is available or `timeout` elapses. Returns
    /// `true` if a permit was consumed, `false` on timeout.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = crate::clock::deadline_from(timeout);
        let mut count = self.count.lock();
        loop {
            if *count > 0 {
                *count -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;
            let result = self.condvar.wait_for(&mut count, remaining);
            if result.timed_out() && *count == 0 {
                return false;
            }
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}
