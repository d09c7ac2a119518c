//! Values computed by combining the records of several snapshots
//!
//! All functions here are pure: they perform no I/O, and the clock tick rate is given by the
//! caller (see [`crate::procfs::ClockTicks`]).

use thiserror::Error;

use crate::procfs::parsers::process::{PidStat, PidStatm};
use crate::procfs::parsers::system::{Meminfo, Uptime, Vmstat};
use crate::procfs::ProcfsError;

#[derive(Error, Debug)]
pub enum MetricError {
    #[error("Division by zero: '{0}' is null")]
    DivisionByZero(&'static str),
    #[error("Process started at {start}s, which is not before system uptime {uptime}s")]
    NonPositiveElapsed { uptime: f64, start: f64 },
    #[error(transparent)]
    Field(#[from] ProcfsError),
}

/// Estimates the size of a memory page, in kB
///
/// This is an approximation based on the amount of mapped memory, not the authoritative page size
/// of the system.
pub fn page_size_kb(meminfo: &Meminfo, vmstat: &Vmstat) -> Result<f64, MetricError> {
    let mapped_kb = meminfo.mapped()?;
    let mapped_pages = vmstat.nr_mapped()?;

    if mapped_pages == 0 {
        return Err(MetricError::DivisionByZero("nr_mapped"));
    }

    Ok(mapped_kb as f64 / mapped_pages as f64)
}

/// Resident set size of a process, in kB
pub fn resident_set_size_kb(statm: &PidStatm, meminfo: &Meminfo, vmstat: &Vmstat) -> Result<f64, MetricError> {
    Ok(statm.resident() as f64 * page_size_kb(meminfo, vmstat)?)
}

/// Share of the total RAM used by the resident set of a process, between 0 and 1
pub fn memory_fraction(statm: &PidStatm, meminfo: &Meminfo, vmstat: &Vmstat) -> Result<f64, MetricError> {
    let total_kb = meminfo.mem_total()?;

    if total_kb == 0 {
        return Err(MetricError::DivisionByZero("MemTotal"));
    }

    Ok(resident_set_size_kb(statm, meminfo, vmstat)? / total_kb as f64)
}

/// Time spent running by a process, in both user and kernel modes, in seconds
pub fn cpu_time_secs(stat: &PidStat, clock_ticks: u64) -> Result<f64, MetricError> {
    if clock_ticks == 0 {
        return Err(MetricError::DivisionByZero("clock ticks"));
    }

    // summed as floats, utime + stime may not fit in a u64
    let running_time = stat.utime() as f64 + stat.stime() as f64;

    Ok(running_time / clock_ticks as f64)
}

/// Average CPU usage of a process since it started, where 1 means one core fully used
pub fn cpu_usage(stat: &PidStat, uptime: &Uptime, clock_ticks: u64) -> Result<f64, MetricError> {
    let cpu_time = cpu_time_secs(stat, clock_ticks)?;
    let start = stat.starttime() as f64 / clock_ticks as f64;
    let elapsed = uptime.uptime_seconds() - start;

    if elapsed.is_nan() || elapsed <= 0. {
        return Err(MetricError::NonPositiveElapsed {
            uptime: uptime.uptime_seconds(),
            start,
        });
    }

    Ok(cpu_time / elapsed)
}
