//! Platform-independant types shared by every snapshot

use std::ops::Deref;

use crate::core::time::Timestamp;

pub mod time;

/// Identifier of a process or of a task
pub type Pid = u32;

/// A record decoded from a single read of some source, along with the instant of that read
///
/// Two snapshots compare equal when their records are equal, whatever their timestamps.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    timestamp: Timestamp,
    record: T,
}

impl<T> Snapshot<T> {
    pub fn new(record: T, timestamp: Timestamp) -> Self {
        Snapshot { timestamp, record }
    }

    /// Returns the instant at which the source of this snapshot was read
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl<T: PartialEq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}
