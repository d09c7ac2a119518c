//! Time tracking utilities
//!
//! Snapshots are stamped with the instant at which their source was read. All `Instant`
//! references are localized to this module, so that tests can substitute a fake clock.

use std::time::Duration;
#[cfg(not(test))]
use std::time::Instant;

#[cfg(test)]
use sn_fake_clock::FakeClock as Instant;

/// A `Timestamp` represents the instant at which some data was captured
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
pub struct Timestamp {
    stamp: Instant,
}

impl Timestamp {
    /// Returns a `Timestamp` referencing the current time
    pub fn now() -> Self {
        Self::from_instant(Instant::now())
    }

    /// Builds a timestamp from an `Instant` value
    pub fn from_instant(instant: Instant) -> Self {
        Self { stamp: instant }
    }

    /// Calculates elapsed time between `self` and `earlier`
    /// If `earlier` is later than `self`, this method will panic
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        self.stamp.duration_since(earlier.stamp)
    }
}
