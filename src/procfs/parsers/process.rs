use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::Pid;
use crate::procfs::parsers::{single_line, Parse, ProcessData};
use crate::procfs::text::LineSequence;
use crate::procfs::ProcfsError;

/// State of a process, as reported by the third field of `/proc/[pid]/stat`
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum ProcessState {
    Running,
    Sleeping,
    /// Uninterruptible sleep, usually waiting for IO
    DiskSleep,
    Zombie,
    Stopped,
    TracingStop,
    Dead,
    Wakekill,
    Waking,
    Parked,
    Idle,
}

impl FromStr for ProcessState {
    type Err = ProcfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "R" => ProcessState::Running,
            "S" => ProcessState::Sleeping,
            "D" => ProcessState::DiskSleep,
            "Z" => ProcessState::Zombie,
            "T" => ProcessState::Stopped,
            "t" => ProcessState::TracingStop,
            "X" | "x" => ProcessState::Dead,
            "K" => ProcessState::Wakekill,
            "W" => ProcessState::Waking,
            "P" => ProcessState::Parked,
            "I" => ProcessState::Idle,
            _ => return Err(ProcfsError::SchemaMismatch(format!("Unknown process state '{}'", s))),
        })
    }
}

fixed_record! {
    /// Represents data from `/proc/[PID]/stat`
    ///
    /// Times are expressed in clock ticks, see [`crate::procfs::ClockTicks`].
    pub struct PidStat in "stat" {
        pid: u32,
        /// Name of the executable, without the enclosing parentheses
        comm: String,
        state: ProcessState,
        ppid: i64,
        pgrp: i64,
        session: i64,
        tty_nr: i64,
        tpgid: i64,
        flags: u64,
        minflt: u64,
        cminflt: u64,
        majflt: u64,
        cmajflt: u64,
        /// Time spent by the process in user mode
        utime: u64,
        /// Time spent by the process in kernel mode
        stime: u64,
        /// Time spent by the process waiting for children processes in user mode
        cutime: i64,
        /// Time spent by the process waiting for children processes in kernel mode
        cstime: i64,
        priority: i64,
        nice: i64,
        num_threads: i64,
        itrealvalue: i64,
        /// The time the process started after system boot
        starttime: u64,
        /// Virtual memory size in bytes
        vsize: u64,
        /// Resident set size in pages
        rss: i64,
        rsslim: u64,
        startcode: u64,
        endcode: u64,
        startstack: u64,
        kstkesp: u64,
        kstkeip: u64,
        signal: u64,
        blocked: u64,
        sigignore: u64,
        sigcatch: u64,
        wchan: u64,
        nswap: u64,
        cnswap: u64,
        exit_signal: i64,
        /// CPU number last executed on
        processor: i64,
        rt_priority: u64,
        policy: u64,
        delayacct_blkio_ticks: u64,
        guest_time: u64,
        cguest_time: i64,
        start_data: u64,
        end_data: u64,
        start_brk: u64,
        arg_start: u64,
        arg_end: u64,
        env_start: u64,
        env_end: u64,
        exit_code: i64,
    }
}

impl PidStat {
    /// Time spent by the process itself, in clock ticks
    ///
    /// `None` if the sum does not fit in a `u64`.
    pub fn running_time(&self) -> Option<u64> {
        self.utime.checked_add(self.stime)
    }
}

impl Parse for PidStat {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        // the executable name may contain spaces, and even parentheses
        let tokens = single_line("stat", lines)?.split_grouped('(', ')').flatten();

        Self::from_tokens(&tokens)
    }
}

impl ProcessData for PidStat {
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf {
        proc_dir.join(pid.to_string()).join("stat")
    }
}

fixed_record! {
    /// Represents data from `/proc/[PID]/statm`, all values are expressed in pages
    pub struct PidStatm in "statm" {
        /// Total program size
        size: u64,
        /// Resident set size
        resident: u64,
        /// Resident shared pages
        shared: u64,
        text: u64,
        lib: u64,
        /// Data and stack
        data: u64,
        dt: u64,
    }
}

impl Parse for PidStatm {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        let tokens = single_line("statm", lines)?.split_whitespace().flatten();

        Self::from_tokens(&tokens)
    }
}

impl ProcessData for PidStatm {
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf {
        proc_dir.join(pid.to_string()).join("statm")
    }
}
