//! Process discovery and per-process snapshots

use std::fs::{read_dir, DirEntry};
use std::path::{Path, PathBuf};

use log::warn;

use crate::core::{Pid, Snapshot};
use crate::metrics::{self, MetricError};
use crate::procfs::os::{read_process_file, Procfs};
use crate::procfs::parsers::process::{PidStat, PidStatm};
use crate::procfs::ProcfsError;

/// Lists the processes, or the tasks of a process, by scanning the numeric entries of a directory
pub struct ProcfsScanner {
    proc_dir: PathBuf,
}

impl ProcfsScanner {
    /// Returns a new ProcfsScanner scanning `proc_dir`
    pub fn new<P>(proc_dir: P) -> ProcfsScanner
    where
        P: Into<PathBuf>,
    {
        ProcfsScanner {
            proc_dir: proc_dir.into(),
        }
    }

    /// Parses a PID from a directory name, if it represents an unsigned integer
    fn extract_pid_from_proc_dir(dir_name_opt: Option<&str>) -> Option<Pid> {
        dir_name_opt.and_then(|dir_name| dir_name.parse::<Pid>().ok())
    }

    /// Returns the PIDs found in the scanned directory, in ascending order
    pub fn scan(&self) -> Result<Vec<Pid>, ProcfsError> {
        let path = self.proc_dir.as_path();

        let dir_iter = read_dir(path).map_err(|source| ProcfsError::MissingSource {
            path: path.to_path_buf(),
            source,
        })?;

        let mut pids: Vec<Pid> = dir_iter
            // only retrieve dir entry which are not err
            .filter_map(|r| r.ok())
            // only retrieve directories
            .filter(|de| de.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .filter_map(|de: DirEntry| Self::extract_pid_from_proc_dir(de.file_name().to_str()))
            .collect();

        pids.sort_unstable();
        Ok(pids)
    }
}

/// A process of a proc tree, whose files are read on demand
pub struct Process<'a> {
    pid: Pid,
    dir: PathBuf,
    procfs: &'a Procfs,
}

impl<'a> Process<'a> {
    pub(crate) fn new(procfs: &'a Procfs, pid: Pid) -> Self {
        Process {
            pid,
            dir: procfs.root().join(pid.to_string()),
            procfs,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the process still exists, i.e. its directory is still exposed by the kernel
    pub fn is_alive(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn stat(&self) -> Result<Snapshot<PidStat>, ProcfsError> {
        self.procfs.read_process(self.pid)
    }

    pub fn statm(&self) -> Result<Snapshot<PidStatm>, ProcfsError> {
        self.procfs.read_process(self.pid)
    }

    /// Identifiers of the threads of this process
    pub fn tasks(&self) -> Result<Vec<Pid>, ProcfsError> {
        let tasks = ProcfsScanner::new(self.dir.join("task")).scan()?;

        if tasks.is_empty() {
            warn!("No task found for process {}", self.pid);
        }

        Ok(tasks)
    }

    /// The thread `tid` of this process
    pub fn task(&self, tid: Pid) -> Task<'a> {
        Task {
            pid: self.pid,
            tid,
            task_dir: self.dir.join("task"),
            procfs: self.procfs,
        }
    }

    /// Resident set size, in kB
    pub fn resident_set_size_kb(&self) -> Result<f64, MetricError> {
        metrics::resident_set_size_kb(&*self.statm()?, &*self.procfs.meminfo()?, &*self.procfs.vmstat()?)
    }

    /// Share of the total RAM used by this process, between 0 and 1
    pub fn memory_fraction(&self) -> Result<f64, MetricError> {
        metrics::memory_fraction(&*self.statm()?, &*self.procfs.meminfo()?, &*self.procfs.vmstat()?)
    }

    /// CPU time used by this process since it started, in seconds
    pub fn cpu_time_secs(&self) -> Result<f64, MetricError> {
        metrics::cpu_time_secs(&*self.stat()?, self.procfs.clock_ticks()?)
    }

    /// Average CPU usage of this process since it started
    pub fn cpu_usage(&self) -> Result<f64, MetricError> {
        metrics::cpu_usage(&*self.stat()?, &*self.procfs.uptime()?, self.procfs.clock_ticks()?)
    }
}

/// A thread of a process, exposed under `/proc/[pid]/task/[tid]`
pub struct Task<'a> {
    pid: Pid,
    tid: Pid,
    task_dir: PathBuf,
    procfs: &'a Procfs,
}

impl<'a> Task<'a> {
    /// Identifier of the process owning this thread
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn tid(&self) -> Pid {
        self.tid
    }

    pub fn dir(&self) -> PathBuf {
        self.task_dir.join(self.tid.to_string())
    }

    /// Whether the thread still exists
    pub fn is_alive(&self) -> bool {
        self.dir().is_dir()
    }

    pub fn stat(&self) -> Result<Snapshot<PidStat>, ProcfsError> {
        read_process_file(&self.task_dir, self.tid)
    }

    pub fn statm(&self) -> Result<Snapshot<PidStatm>, ProcfsError> {
        read_process_file(&self.task_dir, self.tid)
    }

    /// CPU time used by this thread since it started, in seconds
    pub fn cpu_time_secs(&self) -> Result<f64, MetricError> {
        metrics::cpu_time_secs(&*self.stat()?, self.procfs.clock_ticks()?)
    }
}


#[cfg(test)]
mod test_pid_scanner {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::{tempdir, NamedTempFile};

    use super::*;

    fn create_tempdir<T: Into<PathBuf>>(name: &str, dir: T) -> std::io::Result<()> {
        fs::create_dir(dir.into().join(name))
    }

    fn create_tempfile<T: Into<PathBuf>>(name: &str, dir: T) -> std::io::Result<fs::File> {
        let fp = dir.into().join(name);

        match NamedTempFile::new_in(fp.parent().expect("File has no parent")) {
            Ok(ntf) => Ok(ntf.persist(fp).expect("Could not persist file")),
            Err(e) => Err(e),
        }
    }

    fn set_dir_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
        let mut perms = fs::metadata(path)?.permissions();

        perms.set_mode(mode);
        fs::set_permissions(path, perms)
    }

    #[test]
    fn test_scan_process() {
        // given we have a fake /proc dir with the following dirs
        // 456 123 abc 1ec 1.2
        // And the following files
        // 987 46a
        let test_proc_dir = tempdir().expect("Could not create tmp dir");

        let proc_subdirs = vec![
            create_tempdir("456", test_proc_dir.path()),
            create_tempdir("123", test_proc_dir.path()),
            create_tempdir("abc", test_proc_dir.path()),
            create_tempdir("1ec", test_proc_dir.path()),
            create_tempdir("1.2", test_proc_dir.path()),
        ];
        let proc_subfiles = vec![
            create_tempfile("987", test_proc_dir.path()),
            create_tempfile("46a", test_proc_dir.path()),
        ];

        if proc_subdirs.iter().any(|i| i.is_err()) || proc_subfiles.iter().any(|i| i.is_err()) {
            panic!(
                "Could not create all temp dir/files: {:?} / {:?}",
                proc_subdirs, proc_subfiles
            );
        }

        let proc_scanner = ProcfsScanner::new(test_proc_dir.path());

        // when we scan processes
        let pids = proc_scanner.scan().expect("Could not scan processes");

        // The PIDs are only those represented by a dir with an integer name
        assert_eq!(vec![123, 456], pids);
    }

    #[test]
    fn test_scan_process_without_permissions() {
        // Given we do not have read access to test /proc dir
        let test_proc_dir = tempdir().expect("Could not create tmp dir");
        set_dir_permissions(test_proc_dir.path(), 0o000).expect("Could not set dir permissions");

        let proc_scanner = ProcfsScanner::new(test_proc_dir.path());

        // when we scan processes
        let pids = proc_scanner.scan();

        // reset permission to allow dir removal
        set_dir_permissions(test_proc_dir.path(), 0o755).expect("Could not set dir permissions");

        // root bypasses directory permissions
        if unsafe { libc::geteuid() } != 0 {
            assert!(matches!(pids, Err(ProcfsError::MissingSource { .. })));
        }
    }

    #[test]
    fn test_scan_missing_dir() {
        let proc_scanner = ProcfsScanner::new("/nonexistent/proc");

        assert!(matches!(proc_scanner.scan(), Err(ProcfsError::MissingSource { .. })));
    }
}

#[cfg(test)]
mod test_process {
    use std::fs;

    use tempfile::{tempdir, TempDir};

    use crate::procfs::parsers::process::test_utils::stat_line;
    use crate::procfs::parsers::system::test_utils::{MEMINFO, VMSTAT};
    use crate::procfs::FixedClockTicks;

    use super::*;

    fn proc_dir() -> TempDir {
        let dir = tempdir().expect("Could not create tmp dir");
        let pid_dir = dir.path().join("1905");

        fs::create_dir_all(pid_dir.join("task").join("1905")).unwrap();
        fs::create_dir_all(pid_dir.join("task").join("1912")).unwrap();
        fs::write(pid_dir.join("stat"), stat_line(9000, 900, 1000)).unwrap();
        fs::write(pid_dir.join("statm"), "5312 500 420 26 0 212 0\n").unwrap();
        fs::write(pid_dir.join("task").join("1912").join("stat"), stat_line(250, 50, 1200)).unwrap();
        fs::write(pid_dir.join("task").join("1912").join("statm"), "5312 120 420 26 0 212 0\n").unwrap();
        fs::write(dir.path().join("uptime"), "1000.00 3500.20\n").unwrap();
        fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();
        fs::write(dir.path().join("vmstat"), VMSTAT).unwrap();

        dir
    }

    #[test]
    fn test_should_read_process_files() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path());
        let process = procfs.process(1905);

        assert!(process.is_alive());
        assert_eq!(process.stat().unwrap().comm(), "python3");
        assert_eq!(process.statm().unwrap().resident(), 500);
        assert_eq!(process.tasks().unwrap(), vec![1905, 1912]);
    }

    #[test]
    fn test_cpu_metrics_should_use_given_clock_ticks() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path()).with_clock_ticks(FixedClockTicks(100));
        let process = procfs.process(1905);

        assert!((process.cpu_time_secs().unwrap() - 99.).abs() < 1e-9);
        assert!((process.cpu_usage().unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_exited_process_should_not_be_readable() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path());
        let process = procfs.process(42);

        assert!(!process.is_alive());
        assert!(matches!(process.stat(), Err(ProcfsError::MissingSource { .. })));
        assert!(matches!(process.tasks(), Err(ProcfsError::MissingSource { .. })));
        assert!(matches!(
            process.resident_set_size_kb(),
            Err(MetricError::Field(ProcfsError::MissingSource { .. }))
        ));
    }

    #[test]
    fn test_memory_metrics_should_combine_process_and_system_files() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path());
        let process = procfs.process(1905);

        assert_eq!(procfs.page_size_kb().unwrap(), 4.);
        assert_eq!(process.resident_set_size_kb().unwrap(), 2000.);
        assert!((process.memory_fraction().unwrap() - 2000. / 32790864.).abs() < 1e-12);
    }

    #[test]
    fn test_should_not_compute_cpu_usage_from_non_finite_uptime() {
        let dir = proc_dir();
        fs::write(dir.path().join("uptime"), "NaN 3500.20\n").unwrap();
        let procfs = Procfs::with_root(dir.path()).with_clock_ticks(FixedClockTicks(100));

        assert!(matches!(
            procfs.process(1905).cpu_usage(),
            Err(MetricError::Field(ProcfsError::SchemaMismatch(_)))
        ));
    }

    #[test]
    fn test_should_read_task_files() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path()).with_clock_ticks(FixedClockTicks(100));
        let task = procfs.process(1905).task(1912);

        assert_eq!(task.pid(), 1905);
        assert_eq!(task.tid(), 1912);
        assert!(task.is_alive());
        assert_eq!(task.stat().unwrap().utime(), 250);
        assert_eq!(task.statm().unwrap().resident(), 120);
        assert!((task.cpu_time_secs().unwrap() - 3.).abs() < 1e-9);
    }

    #[test]
    fn test_exited_task_should_not_be_readable() {
        let dir = proc_dir();
        let procfs = Procfs::with_root(dir.path());
        let task = procfs.process(1905).task(1999);

        assert!(!task.is_alive());
        assert_eq!(task.dir(), dir.path().join("1905").join("task").join("1999"));
        assert!(matches!(task.stat(), Err(ProcfsError::MissingSource { .. })));
    }
}
