use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::procfs::parsers::{single_line, Parse, SystemData};
use crate::procfs::text::{full_match, LineSequence, TokenParser};
use crate::procfs::ProcfsError;

static CPU_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^cpu\d*$").expect("Invalid cpu label regex"));

static CPU_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^cpu\d*(?:\s|$)").expect("Invalid cpu line regex"));

/// Represents data from `/proc/stat`
///
/// All times are expressed in clock ticks.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Stat {
    /// Ticks of the aggregated CPU line followed by those of each logical CPU
    cpus: Vec<Vec<u64>>,
    intr: Vec<u64>,
    softirq: Vec<u64>,
    ctxt: Option<u64>,
    btime: Option<u64>,
    processes: Option<u64>,
    procs_running: Option<u64>,
    procs_blocked: Option<u64>,
}

impl Stat {
    /// Ticks of all CPU lines, the first one being the aggregate of all CPUs
    pub fn cpus(&self) -> &[Vec<u64>] {
        &self.cpus
    }

    /// Ticks spent by all CPUs in each mode (user, nice, system, idle, iowait, ...)
    pub fn cpu_total(&self) -> &[u64] {
        &self.cpus[0]
    }

    /// Ticks of each logical CPU
    pub fn cores(&self) -> &[Vec<u64>] {
        &self.cpus[1..]
    }

    /// Number of interrupts serviced since boot, the total first, then one count per interrupt
    pub fn intr(&self) -> &[u64] {
        &self.intr
    }

    /// Number of softirqs serviced since boot, the total first, then one count per softirq
    pub fn softirq(&self) -> &[u64] {
        &self.softirq
    }

    /// Number of context switches since boot
    pub fn ctxt(&self) -> Result<u64, ProcfsError> {
        present("ctxt", self.ctxt)
    }

    /// Boot time, in seconds since the Epoch
    pub fn btime(&self) -> Result<u64, ProcfsError> {
        present("btime", self.btime)
    }

    /// Number of forks since boot
    pub fn processes(&self) -> Result<u64, ProcfsError> {
        present("processes", self.processes)
    }

    pub fn procs_running(&self) -> Result<u64, ProcfsError> {
        present("procs_running", self.procs_running)
    }

    pub fn procs_blocked(&self) -> Result<u64, ProcfsError> {
        present("procs_blocked", self.procs_blocked)
    }
}

fn present(field: &str, value: Option<u64>) -> Result<u64, ProcfsError> {
    value.ok_or_else(|| ProcfsError::FieldAbsent(field.to_string()))
}

fn parse_counters(label: &str, tokens: &[String]) -> Result<Vec<u64>, ProcfsError> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<u64>()
                .map_err(|_| ProcfsError::SchemaMismatch(format!("stat: invalid '{}' counter: {}", label, t)))
        })
        .collect()
}

/// Reads the single value field expected at `line_no`
///
/// The field is absent if this line does not exist, has another label or has no value.
fn relative_field(tokens: &TokenParser, line_no: usize, label: &str) -> Result<Option<u64>, ProcfsError> {
    match tokens.line(line_no) {
        Some([found, ..]) if found != label => {
            warn!("Expected '{}' at line {} of stat, found '{}'", label, line_no, found);
            Ok(None)
        }
        Some([_, _, ..]) => tokens.token(line_no, 1).map(Some),
        _ => Ok(None),
    }
}

impl Parse for Stat {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        let tokens = lines.split_whitespace();
        let values = tokens.digits();

        let mut cpus = Vec::new();
        let mut intr = Vec::new();
        let mut softirq = Vec::new();

        for (line, line_values) in tokens.lines().iter().zip(values.lines()) {
            match line.first().map(String::as_str) {
                Some(label) if CPU_LABEL.is_match(label) => cpus.push(parse_counters(label, line_values)?),
                Some("intr") => intr = parse_counters("intr", line_values)?,
                Some("softirq") => softirq = parse_counters("softirq", line_values)?,
                _ => {}
            }
        }

        // The amount of CPU lines depends on the machine, the following fields are found after them
        let end = lines
            .numbered()
            .into_iter()
            .filter(|(_, line)| CPU_LINE.is_match(line))
            .map(|(line_no, _)| line_no + 1)
            .last()
            .ok_or_else(|| ProcfsError::SchemaMismatch("stat: no cpu line found".to_string()))?;

        Ok(Stat {
            cpus,
            intr,
            softirq,
            ctxt: relative_field(&tokens, end + 1, "ctxt")?,
            btime: relative_field(&tokens, end + 2, "btime")?,
            processes: relative_field(&tokens, end + 3, "processes")?,
            procs_running: relative_field(&tokens, end + 4, "procs_running")?,
            procs_blocked: relative_field(&tokens, end + 5, "procs_blocked")?,
        })
    }
}

impl SystemData for Stat {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("stat")
    }
}

/// Fields of `/proc/meminfo` that are modeled, in the order in which they are exposed
///
/// Those fields do not depend on a kernel configuration option. Their values are expressed in kB.
pub const MEMINFO_FIELDS: &[&str] = &[
    "MemTotal",
    "MemFree",
    "MemAvailable",
    "Buffers",
    "Cached",
    "SwapCached",
    "Active",
    "Inactive",
    "Active(anon)",
    "Inactive(anon)",
    "Active(file)",
    "Inactive(file)",
    "SwapTotal",
    "SwapFree",
    "Dirty",
    "Writeback",
    "AnonPages",
    "Mapped",
    "Shmem",
    "KReclaimable",
    "Slab",
    "SReclaimable",
    "SUnreclaim",
    "KernelStack",
    "PageTables",
    "NFS_Unstable",
    "Bounce",
    "WritebackTmp",
    "CommitLimit",
    "Committed_AS",
    "VmallocTotal",
    "VmallocUsed",
    "VmallocChunk",
    "DirectMap4k",
];

static MEMINFO_LINE: LazyLock<Regex> = LazyLock::new(|| labelled_lines(MEMINFO_FIELDS, r":.*"));

/// Builds a regex matching the whole lines starting with one of `labels`, followed by `rest`
fn labelled_lines(labels: &[&str], rest: &str) -> Regex {
    let alternatives = labels.iter().map(|l| regex::escape(l)).collect::<Vec<_>>().join("|");

    full_match(&format!("(?:{}){}", alternatives, rest)).expect("Invalid field labels regex")
}

/// Represents data from `/proc/meminfo`
///
/// Only the labels of [`MEMINFO_FIELDS`] are kept, in this same order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Meminfo {
    fields: Vec<(&'static str, u64)>,
}

impl Meminfo {
    /// Returns the value of the field with the given label, in kB
    pub fn get(&self, label: &str) -> Result<u64, ProcfsError> {
        self.fields
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| *v)
            .ok_or_else(|| ProcfsError::FieldAbsent(label.to_string()))
    }

    pub fn fields(&self) -> &[(&'static str, u64)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total usable RAM
    pub fn mem_total(&self) -> Result<u64, ProcfsError> {
        self.get("MemTotal")
    }

    pub fn mem_free(&self) -> Result<u64, ProcfsError> {
        self.get("MemFree")
    }

    /// Estimation of the memory available for starting new applications, without swapping
    pub fn mem_available(&self) -> Result<u64, ProcfsError> {
        self.get("MemAvailable")
    }

    pub fn buffers(&self) -> Result<u64, ProcfsError> {
        self.get("Buffers")
    }

    pub fn cached(&self) -> Result<u64, ProcfsError> {
        self.get("Cached")
    }

    pub fn swap_total(&self) -> Result<u64, ProcfsError> {
        self.get("SwapTotal")
    }

    pub fn swap_free(&self) -> Result<u64, ProcfsError> {
        self.get("SwapFree")
    }

    /// Files which have been mapped into memory, such as libraries
    pub fn mapped(&self) -> Result<u64, ProcfsError> {
        self.get("Mapped")
    }

    pub fn shmem(&self) -> Result<u64, ProcfsError> {
        self.get("Shmem")
    }
}

impl Parse for Meminfo {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        let pairs = lines
            .matching(&MEMINFO_LINE)
            .replaced_literal(" kB", "")
            .split_limit(":", 2)
            .trimmed();

        let mut values = HashMap::new();
        for (line_no, line) in pairs.lines().iter().enumerate() {
            let value: u64 = pairs.token(line_no, 1)?;
            // the first occurrence of a label wins
            values.entry(line[0].as_str()).or_insert(value);
        }

        let fields = MEMINFO_FIELDS
            .iter()
            .filter_map(|label| values.get(label).map(|v| (*label, *v)))
            .collect();

        Ok(Meminfo { fields })
    }
}

impl SystemData for Meminfo {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("meminfo")
    }
}

/// Fields of `/proc/vmstat` that are modeled
///
/// Depending on the kernel configuration, some of them may not be exposed.
pub const VMSTAT_FIELDS: &[&str] = &[
    "nr_free_pages",
    "nr_inactive_anon",
    "nr_active_anon",
    "nr_inactive_file",
    "nr_active_file",
    "nr_unevictable",
    "nr_mlock",
    "nr_anon_pages",
    "nr_mapped",
    "nr_file_pages",
    "nr_dirty",
    "nr_writeback",
    "nr_slab_reclaimable",
    "nr_slab_unreclaimable",
    "nr_page_table_pages",
    "nr_kernel_stack",
    "nr_unstable",
    "nr_bounce",
    "nr_vmscan_write",
    "nr_vmscan_immediate_reclaim",
    "nr_writeback_temp",
    "nr_isolated_anon",
    "nr_isolated_file",
    "nr_shmem",
    "nr_dirtied",
    "nr_written",
    "numa_hit",
    "numa_miss",
    "numa_foreign",
    "numa_interleave",
    "numa_local",
    "numa_other",
    "nr_free_cma",
    "nr_dirty_threshold",
    "nr_dirty_background_threshold",
    "pgpgin",
    "pgpgout",
    "pswpin",
    "pswpout",
    "pgalloc_dma",
    "pgalloc_dma32",
    "pgalloc_normal",
    "pgalloc_movable",
    "pgfree",
    "pgactivate",
    "pgdeactivate",
    "pgfault",
    "pgmajfault",
    "pgscan_direct_throttle",
    "zone_reclaim_failed",
    "pginodesteal",
    "slabs_scanned",
    "kswapd_inodesteal",
    "kswapd_low_wmark_hit_quickly",
    "kswapd_high_wmark_hit_quickly",
    "pageoutrun",
    "pgrotated",
    "drop_pagecache",
    "drop_slab",
    "pgmigrate_success",
    "pgmigrate_fail",
    "compact_migrate_scanned",
    "compact_free_scanned",
    "compact_isolated",
    "compact_stall",
    "compact_fail",
    "compact_success",
    "htlb_buddy_alloc_success",
    "htlb_buddy_alloc_fail",
    "unevictable_pgs_culled",
    "unevictable_pgs_scanned",
    "unevictable_pgs_rescued",
    "unevictable_pgs_mlocked",
    "unevictable_pgs_munlocked",
    "unevictable_pgs_cleared",
    "unevictable_pgs_stranded",
    "thp_fault_alloc",
    "thp_fault_fallback",
    "thp_collapse_alloc",
    "thp_collapse_alloc_failed",
    "thp_zero_page_alloc",
    "thp_zero_page_alloc_failed",
];

static VMSTAT_LINE: LazyLock<Regex> = LazyLock::new(|| labelled_lines(VMSTAT_FIELDS, r" \S+"));

/// Represents data from `/proc/vmstat`
///
/// The fields of [`VMSTAT_FIELDS`] which are not exposed by the running kernel are reported as
/// absent by their accessor.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vmstat {
    values: HashMap<String, u64>,
}

impl Vmstat {
    pub fn get(&self, label: &str) -> Result<u64, ProcfsError> {
        self.values
            .get(label)
            .copied()
            .ok_or_else(|| ProcfsError::FieldAbsent(label.to_string()))
    }

    /// Number of modeled fields exposed by the kernel
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn nr_free_pages(&self) -> Result<u64, ProcfsError> {
        self.get("nr_free_pages")
    }

    /// Number of pages mapped into memory, see [`Meminfo::mapped()`]
    pub fn nr_mapped(&self) -> Result<u64, ProcfsError> {
        self.get("nr_mapped")
    }

    pub fn pgfault(&self) -> Result<u64, ProcfsError> {
        self.get("pgfault")
    }

    pub fn pgmajfault(&self) -> Result<u64, ProcfsError> {
        self.get("pgmajfault")
    }

    pub fn pswpin(&self) -> Result<u64, ProcfsError> {
        self.get("pswpin")
    }

    pub fn pswpout(&self) -> Result<u64, ProcfsError> {
        self.get("pswpout")
    }
}

impl Parse for Vmstat {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        let pairs = lines.matching(&VMSTAT_LINE).split(" ");

        let values = pairs
            .lines()
            .iter()
            .enumerate()
            .map(|(line_no, line)| -> Result<(String, u64), ProcfsError> {
                Ok((line[0].clone(), pairs.token(line_no, 1)?))
            })
            .collect::<Result<_, _>>()?;

        Ok(Vmstat { values })
    }
}

impl SystemData for Vmstat {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("vmstat")
    }
}

fixed_record! {
    /// Represents data from `/proc/uptime`
    pub struct Uptime in "uptime" {
        /// Seconds elapsed since the system booted
        uptime_seconds: f64,
        /// Sum of the seconds spent idle by each CPU
        idle_seconds: f64,
    }
}

impl Parse for Uptime {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        let tokens = single_line("uptime", lines)?.split_whitespace().flatten();
        let uptime = Self::from_tokens(&tokens)?;

        if !uptime.uptime_seconds.is_finite() || !uptime.idle_seconds.is_finite() {
            return Err(ProcfsError::SchemaMismatch(format!(
                "uptime: non finite value in '{}'",
                tokens.join(" ")
            )));
        }

        Ok(uptime)
    }
}

impl SystemData for Uptime {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("uptime")
    }
}
