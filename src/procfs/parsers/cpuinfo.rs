use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::procfs::parsers::{Parse, SystemData};
use crate::procfs::text::LineSequence;
use crate::procfs::ProcfsError;

static WHITESPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Attributes of one logical CPU, as listed by `/proc/cpuinfo`
///
/// Only the `processor` attribute is exposed by all architectures, the others are `None` or
/// empty when the kernel does not report them.
#[derive(PartialEq, Debug, Clone)]
pub struct Processor {
    processor: u32,
    vendor_id: Option<String>,
    cpu_family: Option<String>,
    model: Option<String>,
    model_name: Option<String>,
    stepping: Option<u32>,
    microcode: Option<String>,
    cpu_mhz: Option<f64>,
    cache_size: Option<String>,
    physical_id: Option<u32>,
    siblings: Option<u32>,
    core_id: Option<u32>,
    cpu_cores: Option<u32>,
    apicid: Option<u32>,
    initial_apicid: Option<u32>,
    fpu: Option<String>,
    fpu_exception: Option<String>,
    cpuid_level: Option<u32>,
    wp: Option<String>,
    flags: Vec<String>,
    vmx_flags: Vec<String>,
    bugs: Vec<String>,
    bogomips: Option<f64>,
    tlb_size: Option<String>,
    clflush_size: Option<u32>,
    cache_alignment: Option<u32>,
    address_sizes: Vec<String>,
    power_management: Option<String>,
}

/// Attributes of a block of cpuinfo lines, by label
struct Block(HashMap<String, String>);

impl Block {
    fn text(&self, label: &str) -> Option<String> {
        self.0.get(label).cloned()
    }

    fn number<T>(&self, label: &str) -> Result<Option<T>, ProcfsError>
    where
        T: FromStr,
    {
        self.0
            .get(label)
            .map(|value| {
                value.parse::<T>().map_err(|_| {
                    ProcfsError::SchemaMismatch(format!("cpuinfo: invalid value for '{}': '{}'", label, value))
                })
            })
            .transpose()
    }

    fn list(&self, label: &str, separator: &str) -> Vec<String> {
        self.0
            .get(label)
            .map(|value| {
                value
                    .split(separator)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn into_processor(self) -> Result<Processor, ProcfsError> {
        let processor = self
            .number("processor")?
            .ok_or_else(|| ProcfsError::SchemaMismatch("cpuinfo: block without processor".to_string()))?;

        Ok(Processor {
            processor,
            vendor_id: self.text("vendor_id"),
            cpu_family: self.text("cpu family"),
            model: self.text("model"),
            model_name: self.text("model name"),
            stepping: self.number("stepping")?,
            microcode: self.text("microcode"),
            cpu_mhz: self.number("cpu MHz")?,
            cache_size: self.text("cache size"),
            physical_id: self.number("physical id")?,
            siblings: self.number("siblings")?,
            core_id: self.number("core id")?,
            cpu_cores: self.number("cpu cores")?,
            apicid: self.number("apicid")?,
            initial_apicid: self.number("initial apicid")?,
            fpu: self.text("fpu"),
            fpu_exception: self.text("fpu_exception"),
            cpuid_level: self.number("cpuid level")?,
            wp: self.text("wp"),
            flags: self.list("flags", " "),
            vmx_flags: self.list("vmx flags", " "),
            bugs: self.list("bugs", " "),
            bogomips: self.number("bogomips")?,
            tlb_size: self.text("TLB size"),
            clflush_size: self.number("clflush size")?,
            cache_alignment: self.number("cache_alignment")?,
            address_sizes: self.list("address sizes", ","),
            power_management: self.text("power management"),
        })
    }
}

impl Processor {
    /// Logical identifier of this CPU
    pub fn processor(&self) -> u32 {
        self.processor
    }

    pub fn vendor_id(&self) -> Option<&str> {
        self.vendor_id.as_deref()
    }

    pub fn cpu_family(&self) -> Option<&str> {
        self.cpu_family.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn stepping(&self) -> Option<u32> {
        self.stepping
    }

    pub fn microcode(&self) -> Option<&str> {
        self.microcode.as_deref()
    }

    /// Current clock speed of this CPU
    pub fn cpu_mhz(&self) -> Option<f64> {
        self.cpu_mhz
    }

    /// Size of the cache as reported by the kernel, e.g. "8192 KB"
    pub fn cache_size(&self) -> Option<&str> {
        self.cache_size.as_deref()
    }

    /// Size of the cache, in kB
    pub fn cache_size_kb(&self) -> Option<u64> {
        self.cache_size
            .as_deref()
            .and_then(|size| size.trim_end_matches("KB").trim().parse().ok())
    }

    /// Identifier of the physical package this CPU belongs to
    pub fn physical_id(&self) -> Option<u32> {
        self.physical_id
    }

    pub fn siblings(&self) -> Option<u32> {
        self.siblings
    }

    pub fn core_id(&self) -> Option<u32> {
        self.core_id
    }

    /// Amount of cores in the physical package of this CPU
    pub fn cpu_cores(&self) -> Option<u32> {
        self.cpu_cores
    }

    pub fn apicid(&self) -> Option<u32> {
        self.apicid
    }

    pub fn initial_apicid(&self) -> Option<u32> {
        self.initial_apicid
    }

    pub fn fpu(&self) -> Option<&str> {
        self.fpu.as_deref()
    }

    pub fn fpu_exception(&self) -> Option<&str> {
        self.fpu_exception.as_deref()
    }

    pub fn cpuid_level(&self) -> Option<u32> {
        self.cpuid_level
    }

    pub fn wp(&self) -> Option<&str> {
        self.wp.as_deref()
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn vmx_flags(&self) -> &[String] {
        &self.vmx_flags
    }

    pub fn bugs(&self) -> &[String] {
        &self.bugs
    }

    pub fn bogomips(&self) -> Option<f64> {
        self.bogomips
    }

    pub fn tlb_size(&self) -> Option<&str> {
        self.tlb_size.as_deref()
    }

    pub fn clflush_size(&self) -> Option<u32> {
        self.clflush_size
    }

    pub fn cache_alignment(&self) -> Option<u32> {
        self.cache_alignment
    }

    /// e.g. ["39 bits physical", "48 bits virtual"]
    pub fn address_sizes(&self) -> &[String] {
        &self.address_sizes
    }

    pub fn power_management(&self) -> Option<&str> {
        self.power_management.as_deref()
    }

    fn package(&self) -> u32 {
        self.physical_id.unwrap_or(0)
    }
}

/// Represents data from `/proc/cpuinfo`, one `Processor` per logical CPU in file order
#[derive(PartialEq, Debug, Clone)]
pub struct Cpuinfo {
    processors: Vec<Processor>,
}

impl Cpuinfo {
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Number of physical packages (sockets)
    pub fn cpu_count(&self) -> usize {
        self.processors
            .iter()
            .map(Processor::package)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of physical cores, summed over all packages
    ///
    /// The core count of a package is bounded by the amount of its logical CPUs listed in the file.
    /// On hosts restricting the CPUs visible to this system (e.g. some VMs), this is lower than the
    /// sum of the `cpu cores` values reported by the kernel.
    pub fn cpu_physical_core_count(&self) -> usize {
        let mut packages: HashMap<u32, (usize, usize)> = HashMap::new();

        for processor in &self.processors {
            let (cores, threads) = packages.entry(processor.package()).or_default();
            *cores = processor.cpu_cores.unwrap_or(1).max(1) as usize;
            *threads += 1;
        }

        packages.values().map(|(cores, threads)| (*cores).min(*threads)).sum()
    }

    /// Number of logical CPUs
    pub fn cpu_thread_count(&self) -> usize {
        self.processors.len()
    }
}

impl Parse for Cpuinfo {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        let pairs = lines
            .non_empty()
            .replaced(&WHITESPACES, " ")
            .split_limit(":", 2)
            .trimmed();

        let mut processors = Vec::new();
        let mut block = HashMap::new();

        for line in pairs.lines() {
            let label = line[0].clone();
            let value = line.get(1).cloned().unwrap_or_default();

            // A new block only starts with a processor label
            if label == "processor" && !block.is_empty() {
                processors.push(Block(std::mem::take(&mut block)).into_processor()?);
            }
            block.insert(label, value);
        }

        if !block.is_empty() {
            processors.push(Block(block).into_processor()?);
        }

        if processors.is_empty() {
            return Err(ProcfsError::SchemaMismatch("cpuinfo: no processor found".to_string()));
        }

        debug!("Found {} logical CPUs in cpuinfo", processors.len());
        Ok(Cpuinfo { processors })
    }
}

impl SystemData for Cpuinfo {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("cpuinfo")
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    /// Builds the content of `/proc/cpuinfo`, with one block per (physical id, core id) pair
    pub fn cpuinfo(cpus: &[(u32, u32)], cpu_cores: u32) -> String {
        cpus.iter()
            .enumerate()
            .map(|(i, (physical_id, core_id))| {
                format!(
                    "processor\t: {}
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 142
model name\t: Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz
stepping\t: 12
microcode\t: 0xf8
cpu MHz\t\t: 1992.002
cache size\t: 8192 KB
physical id\t: {}
siblings\t: {}
core id\t\t: {}
cpu cores\t: {}
apicid\t\t: {}
initial apicid\t: {}
fpu\t\t: yes
fpu_exception\t: yes
cpuid level\t: 22
wp\t\t: yes
flags\t\t: fpu vme de pse tsc msr
vmx flags\t: vnmi preemption_timer
bugs\t\t: spectre_v1 spectre_v2
bogomips\t: 3984.00
clflush size\t: 64
cache_alignment\t: 64
address sizes\t: 39 bits physical, 48 bits virtual
power management:
",
                    i,
                    physical_id,
                    cpus.len(),
                    core_id,
                    cpu_cores,
                    i,
                    i
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
