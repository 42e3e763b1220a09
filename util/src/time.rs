//! Time sources and duration helpers
//!
//! Anything which needs "the current time" takes a [`Clock`] rather than
//! reading the wall clock itself, so that timing logic can be driven by a
//! [`SimClock`] in replays and tests.
//!
//! The session's own elapsed time is available from
//! [`crate::session::get_elapsed_seconds`].

use std::cell::Cell;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time.
pub trait Clock {
    /// The current time.
    ///
    /// Units: seconds, from an arbitrary but fixed epoch
    fn now_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Manually advanced clock.
#[derive(Debug, Default, Clone)]
pub struct SimClock {
    now_s: Cell<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimClock {
    pub fn new(start_s: f64) -> Self {
        Self {
            now_s: Cell::new(start_s),
        }
    }

    /// Move the clock forward by `dt_s` seconds.
    pub fn advance(&self, dt_s: f64) {
        self.now_s.set(self.now_s.get() + dt_s);
    }

    pub fn set(&self, now_s: f64) {
        self.now_s.set(now_s);
    }
}

impl Clock for SimClock {
    fn now_s(&self) -> f64 {
        self.now_s.get()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}
