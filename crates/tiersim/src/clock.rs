//! Simulated time.
//!
//! Time is an integer count of nanoseconds since the start of the run. Tier
//! parameters are expressed in seconds and bytes per second, so this module
//! also owns the conversions between the two.

/// Nanoseconds in one second.
pub const NS_PER_SEC: u64 = 1_000_000_000;

/// Converts a duration in seconds to nanoseconds.
///
/// # Panics
///
/// Panics if `secs` is negative, NaN or infinite. A delay like that can only
/// come from a kernel bug and would corrupt event ordering.
pub fn sec_to_ns(secs: f64) -> u64 {
    assert!(
        secs.is_finite() && secs >= 0.0,
        "delay must be a finite, non-negative number of seconds, got {secs}"
    );
    (secs * NS_PER_SEC as f64).round() as u64
}

/// Converts nanoseconds to fractional seconds.
pub fn ns_to_sec(ns: u64) -> f64 {
    ns as f64 / NS_PER_SEC as f64
}

/// Deterministic clock that advances only when the scheduler says so.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ns: u64,
}

impl SimClock {
    /// Creates a new clock starting at time zero.
    pub fn new() -> Self {
        Self { now_ns: 0 }
    }

    /// Creates a clock starting at the specified time.
    pub fn at(now_ns: u64) -> Self {
        Self { now_ns }
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ns
    }

    /// Moves the clock forward to `time_ns`.
    ///
    /// # Panics
    ///
    /// Panics if `time_ns` is earlier than the current time.
    pub fn advance_to(&mut self, time_ns: u64) {
        assert!(
            time_ns >= self.now_ns,
            "time cannot go backwards: current={}, target={}",
            self.now_ns,
            time_ns
        );
        self.now_ns = time_ns;
    }
}
