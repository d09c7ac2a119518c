use std::path::{Path, PathBuf};

use crate::core::{Pid, Snapshot};
use crate::metrics::{self, MetricError};
use crate::procfs::parsers::cpuinfo::Cpuinfo;
use crate::procfs::parsers::system::{Meminfo, Stat, Uptime, Vmstat};
use crate::procfs::parsers::{ProcessData, SystemData};
use crate::procfs::process::{Process, ProcfsScanner};
use crate::procfs::source::ProcFile;
use crate::procfs::{sysconf, ProcfsError};

/// Provides the number of clock ticks per second, used to convert process times to seconds
pub trait ClockTicks {
    fn clock_ticks(&self) -> Result<u64, ProcfsError>;
}

/// Clock tick rate retrieved from the system configuration
#[derive(Default)]
pub struct SysconfClockTicks;

impl ClockTicks for SysconfClockTicks {
    fn clock_ticks(&self) -> Result<u64, ProcfsError> {
        sysconf::clock_ticks()
    }
}

/// Clock tick rate known in advance, e.g. when reading a /proc tree captured on another host
pub struct FixedClockTicks(pub u64);

impl ClockTicks for FixedClockTicks {
    fn clock_ticks(&self) -> Result<u64, ProcfsError> {
        Ok(self.0)
    }
}

/// Takes a snapshot of the file holding `D` for `pid`, within `proc_dir`
///
/// `proc_dir` is either the proc root, or the `task` directory of a process when `pid` is a thread.
pub(crate) fn read_process_file<D>(proc_dir: &Path, pid: Pid) -> Result<Snapshot<D>, ProcfsError>
where
    D: ProcessData,
{
    Snapshot::read(&mut ProcFile::open(&D::filepath(proc_dir, pid))?)
}

/// Entry point to the snapshots of a `/proc` directory
pub struct Procfs {
    root: PathBuf,
    clock: Box<dyn ClockTicks>,
}

impl Default for Procfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Procfs {
    /// Reads the `/proc` directory of the running system
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Reads the proc tree located at `root`
    pub fn with_root<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Procfs {
            root: root.into(),
            clock: Box::new(SysconfClockTicks),
        }
    }

    pub fn with_clock_ticks<C>(mut self, clock: C) -> Self
    where
        C: ClockTicks + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Takes a snapshot of the system-wide file holding `D`
    pub fn read<D>(&self) -> Result<Snapshot<D>, ProcfsError>
    where
        D: SystemData,
    {
        Snapshot::read(&mut ProcFile::open(&D::filepath(&self.root))?)
    }

    /// Takes a snapshot of the file holding `D` for the process `pid`
    pub fn read_process<D>(&self, pid: Pid) -> Result<Snapshot<D>, ProcfsError>
    where
        D: ProcessData,
    {
        read_process_file(&self.root, pid)
    }

    pub fn stat(&self) -> Result<Snapshot<Stat>, ProcfsError> {
        self.read()
    }

    pub fn meminfo(&self) -> Result<Snapshot<Meminfo>, ProcfsError> {
        self.read()
    }

    pub fn vmstat(&self) -> Result<Snapshot<Vmstat>, ProcfsError> {
        self.read()
    }

    pub fn cpuinfo(&self) -> Result<Snapshot<Cpuinfo>, ProcfsError> {
        self.read()
    }

    pub fn uptime(&self) -> Result<Snapshot<Uptime>, ProcfsError> {
        self.read()
    }

    pub fn clock_ticks(&self) -> Result<u64, ProcfsError> {
        self.clock.clock_ticks()
    }

    /// Total usable RAM, in kB
    pub fn total_ram_kb(&self) -> Result<u64, ProcfsError> {
        self.meminfo()?.mem_total()
    }

    /// Estimated size of a memory page, in kB
    pub fn page_size_kb(&self) -> Result<f64, MetricError> {
        metrics::page_size_kb(&*self.meminfo()?, &*self.vmstat()?)
    }

    /// Number of physical CPU packages
    pub fn cpu_count(&self) -> Result<usize, ProcfsError> {
        Ok(self.cpuinfo()?.cpu_count())
    }

    pub fn cpu_physical_core_count(&self) -> Result<usize, ProcfsError> {
        Ok(self.cpuinfo()?.cpu_physical_core_count())
    }

    /// Number of logical CPUs
    pub fn cpu_thread_count(&self) -> Result<usize, ProcfsError> {
        Ok(self.cpuinfo()?.cpu_thread_count())
    }

    /// Identifiers of the processes currently running
    pub fn pids(&self) -> Result<Vec<Pid>, ProcfsError> {
        ProcfsScanner::new(&self.root).scan()
    }

    pub fn process(&self, pid: Pid) -> Process<'_> {
        Process::new(self, pid)
    }
}

#[cfg(test)]
mod test_procfs {
    use std::fs;

    use tempfile::{tempdir, TempDir};

    use crate::procfs::parsers::system::test_utils::{MEMINFO, STAT, UPTIME, VMSTAT};

    use super::*;

    fn proc_dir() -> TempDir {
        let dir = tempdir().expect("Could not create tmp dir");

        for (name, content) in [("stat", STAT), ("meminfo", MEMINFO), ("vmstat", VMSTAT), ("uptime", UPTIME)] {
            fs::write(dir.path().join(name), content).expect("Could not write proc file");
        }

        dir
    }

    #[test]
    fn test_should_read_system_files_from_root() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path());

        assert_eq!(procfs.stat().unwrap().ctxt().unwrap(), 434856843);
        assert_eq!(procfs.total_ram_kb().unwrap(), 32790864);
        assert_eq!(procfs.uptime().unwrap().uptime_seconds(), 10281.87);
        assert_eq!(procfs.page_size_kb().unwrap(), 4.);
    }

    #[test]
    fn test_missing_file_should_be_reported_with_its_path() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path());

        match procfs.cpuinfo() {
            Err(ProcfsError::MissingSource { path, .. }) => assert_eq!(path, dir.path().join("cpuinfo")),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_clock_ticks_should_come_from_given_provider() {
        let procfs = Procfs::with_root("/nonexistent").with_clock_ticks(FixedClockTicks(250));

        assert_eq!(procfs.clock_ticks().unwrap(), 250);
    }

    #[test]
    fn test_default_root_should_be_proc() {
        assert_eq!(Procfs::default().root(), Path::new("/proc"));
    }
}
