//! Typed, timestamped snapshots of the Linux `/proc` filesystem, and the metrics derived from them

#[macro_use]
mod macros;

pub mod core;
pub mod metrics;
pub mod procfs;
