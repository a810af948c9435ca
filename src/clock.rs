//! Monotonic microsecond clock.
//!
//! The core never reads wall-clock time; it only needs a monotonic
//! source for bounded waits (`Event::wait_for`) and for turning a
//! relative duration into an absolute deadline.

use std::time::{ Duration, Instant };

/// Returns a monotonic timestamp in microseconds since some unspecified
/// epoch (process start). Only differences between two calls are
/// meaningful.
#[inline]
pub fn now_us() -> u64 {
    // `Instant` has no fixed epoch, so we anchor to a lazily-created
    // process-start instant the first time this is called.
    use std::sync::OnceLock;
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Computes an absolute `Instant` deadline `duration` from now. Used by
/// `Event::wait_for` and the poll aggregator's bounded wait.
#[inline]
pub fn deadline_from(duration: Duration) -> Instant {
    Instant::now() + duration
}
