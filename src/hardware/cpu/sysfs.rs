//! Raw CPU facts from Linux sysfs and procfs
//!
//! Reads, per logical processor:
//! - `/sys/devices/system/cpu/cpuN/topology/*` for package, core and cluster ids
//! - `/sys/devices/system/cpu/cpuN/cpufreq/*` for clocks
//! - `/sys/devices/system/cpu/cpuN/cache/indexK/*` for cache geometry
//! - `/proc/cpuinfo` for vendor, identification registers and model names
//!
//! Missing files are normal (VMs, containers, old kernels) and only leave the
//! matching field empty. Only a missing `devices/system/cpu` directory makes
//! the whole source unsupported.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::debug;

use crate::error::ProbeError;

/// Instruction-set family the topology is interpreted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isa {
    X86,
    Arm,
    Other,
}

impl Isa {
    /// Family of the running build target
    pub fn host() -> Self {
        if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            Isa::X86
        } else if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
            Isa::Arm
        } else {
            Isa::Other
        }
    }
}

/// Where CPU facts are read from
#[derive(Debug, Clone)]
pub struct CpuSource {
    pub sysfs_root: PathBuf,
    pub procfs_root: PathBuf,
    pub isa: Isa,
}

impl CpuSource {
    pub fn new(sysfs_root: impl Into<PathBuf>, procfs_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            procfs_root: procfs_root.into(),
            isa: Isa::host(),
        }
    }

    #[cfg(test)]
    pub fn with_isa(mut self, isa: Isa) -> Self {
        self.isa = isa;
        self
    }

    fn cpu_dir(&self) -> PathBuf {
        self.sysfs_root.join("devices/system/cpu")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Data,
    Instruction,
    Unified,
}

/// One `cache/indexK` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub level: u32,
    pub kind: CacheKind,
    pub size: u32,
    pub associativity: u32,
    pub sets: u32,
    pub partitions: u32,
    pub line_size: u32,
    /// Linux ids of the processors sharing this cache
    pub shared_cpus: Vec<u32>,
}

/// Fields of one `processor` block in /proc/cpuinfo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcEntry {
    pub vendor_id: Option<String>,
    pub family: Option<u32>,
    pub model: Option<u32>,
    pub stepping: Option<u32>,
    pub model_name: Option<String>,
    pub apic_id: Option<u32>,
    pub implementer: Option<u32>,
    pub variant: Option<u32>,
    pub architecture: Option<u32>,
    pub part: Option<u32>,
    pub revision: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalCpu {
    pub linux_id: u32,
    pub package_id: u32,
    pub core_id: u32,
    pub cluster_id: Option<u32>,
    pub max_frequency_khz: Option<u64>,
    pub caches: Vec<CacheEntry>,
    pub info: ProcEntry,
}

/// Everything read from the source in one pass, sorted by Linux id
#[derive(Debug, Clone, Default)]
pub struct CpuSnapshot {
    pub cpus: Vec<LogicalCpu>,
    /// `Hardware` line of /proc/cpuinfo (ARM SoC name)
    pub hardware: Option<String>,
}

/// Read the per-processor facts for every present processor
pub fn read_snapshot(source: &CpuSource) -> Result<CpuSnapshot, ProbeError> {
    let cpu_dir = source.cpu_dir();
    if !cpu_dir.is_dir() {
        return Err(ProbeError::Unsupported(format!(
            "CPU topology ({})",
            cpu_dir.display()
        )));
    }

    let linux_ids = present_cpus(&cpu_dir)?;

    let cpuinfo_path = source.procfs_root.join("cpuinfo");
    let (mut entries, hardware) = match fs::read_to_string(&cpuinfo_path) {
        Ok(content) => parse_proc_cpuinfo(&content),
        Err(err) => {
            debug!("{} unavailable: {}", cpuinfo_path.display(), err);
            (BTreeMap::new(), None)
        }
    };

    let mut cpus = Vec::with_capacity(linux_ids.len());
    for linux_id in linux_ids {
        let dir = cpu_dir.join(format!("cpu{}", linux_id));
        let topology = dir.join("topology");

        let package_id = read_i64(&topology.join("physical_package_id"))
            .filter(|id| *id >= 0)
            .unwrap_or(0) as u32;
        let core_id = read_i64(&topology.join("core_id"))
            .filter(|id| *id >= 0)
            .map(|id| id as u32)
            .unwrap_or(linux_id);
        let cluster_id = read_i64(&topology.join("cluster_id"))
            .filter(|id| *id >= 0)
            .map(|id| id as u32);
        let max_frequency_khz = read_i64(&dir.join("cpufreq/cpuinfo_max_freq"))
            .filter(|khz| *khz > 0)
            .map(|khz| khz as u64);

        cpus.push(LogicalCpu {
            linux_id,
            package_id,
            core_id,
            cluster_id,
            max_frequency_khz,
            caches: read_caches(&dir.join("cache"))?,
            info: entries.remove(&linux_id).unwrap_or_default(),
        });
    }

    Ok(CpuSnapshot { cpus, hardware })
}

/// Live state of one logical processor
///
/// Read on demand, never part of the topology snapshot. Clocks are in Hz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStatus {
    /// Whether the processor is listed in `cpu/online`; `None` if the list is missing
    pub online: Option<bool>,
    pub current_frequency: Option<u64>,
    pub minimum_frequency: Option<u64>,
    pub maximum_frequency: Option<u64>,
    pub scaling_current_frequency: Option<u64>,
    pub scaling_minimum_frequency: Option<u64>,
    pub scaling_maximum_frequency: Option<u64>,
}

/// Read the online flag and cpufreq clocks of `cpu<linux_id>`
///
/// `None` if the processor directory does not exist.
pub fn read_status(source: &CpuSource, linux_id: u32) -> Option<CpuStatus> {
    let cpu_dir = source.cpu_dir();
    let dir = cpu_dir.join(format!("cpu{}", linux_id));
    if !dir.is_dir() {
        return None;
    }

    let online = read_trimmed(&cpu_dir.join("online"))
        .map(|list| parse_cpu_list(&list).contains(&linux_id));
    let cpufreq = dir.join("cpufreq");
    let hz = |name: &str| {
        read_i64(&cpufreq.join(name))
            .filter(|khz| *khz > 0)
            .map(|khz| khz as u64 * 1000)
    };

    Some(CpuStatus {
        online,
        current_frequency: hz("cpuinfo_cur_freq"),
        minimum_frequency: hz("cpuinfo_min_freq"),
        maximum_frequency: hz("cpuinfo_max_freq"),
        scaling_current_frequency: hz("scaling_cur_freq"),
        scaling_minimum_frequency: hz("scaling_min_freq"),
        scaling_maximum_frequency: hz("scaling_max_freq"),
    })
}

/// CPU brand string as reported by the OS, used when procfs has no name
pub fn brand_fallback() -> Option<String> {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    sys.cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
}

fn present_cpus(cpu_dir: &Path) -> Result<Vec<u32>, ProbeError> {
    for list in ["present", "possible"] {
        if let Some(content) = read_trimmed(&cpu_dir.join(list)) {
            let ids = parse_cpu_list(&content);
            if !ids.is_empty() {
                return Ok(ids);
            }
        }
    }

    // No list files: fall back to the cpuN directories themselves
    let entries = fs::read_dir(cpu_dir).map_err(|source| ProbeError::Io {
        path: cpu_dir.to_path_buf(),
        source,
    })?;
    let mut ids: Vec<u32> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("cpu"))
                .and_then(|id| id.parse().ok())
        })
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

fn read_caches(cache_dir: &Path) -> Result<Vec<CacheEntry>, ProbeError> {
    if !cache_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(cache_dir).map_err(|source| ProbeError::Io {
        path: cache_dir.to_path_buf(),
        source,
    })?;
    let mut index_dirs: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let index = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("index"))
                .and_then(|index| index.parse().ok())?;
            Some((index, entry.path()))
        })
        .collect();
    index_dirs.sort_by_key(|(index, _)| *index);

    Ok(index_dirs
        .iter()
        .filter_map(|(_, dir)| read_cache_entry(dir))
        .collect())
}

fn read_cache_entry(dir: &Path) -> Option<CacheEntry> {
    let level = read_i64(&dir.join("level"))? as u32;
    let kind = match read_trimmed(&dir.join("type"))?.as_str() {
        "Data" => CacheKind::Data,
        "Instruction" => CacheKind::Instruction,
        "Unified" => CacheKind::Unified,
        _ => return None,
    };
    let size = read_trimmed(&dir.join("size")).and_then(|s| parse_cache_size(&s))?;
    let associativity = read_u32(&dir.join("ways_of_associativity")).unwrap_or(0);
    let line_size = read_u32(&dir.join("coherency_line_size")).unwrap_or(0);
    let partitions = read_u32(&dir.join("physical_line_partition"))
        .filter(|p| *p > 0)
        .unwrap_or(1);
    let sets = read_u32(&dir.join("number_of_sets"))
        .filter(|s| *s > 0)
        .unwrap_or_else(|| {
            let way_bytes = u64::from(associativity) * u64::from(line_size) * u64::from(partitions);
            if way_bytes == 0 {
                0
            } else {
                (u64::from(size) / way_bytes) as u32
            }
        });
    let shared_cpus = read_trimmed(&dir.join("shared_cpu_list"))
        .map(|list| parse_cpu_list(&list))
        .unwrap_or_default();

    Some(CacheEntry {
        level,
        kind,
        size,
        associativity,
        sets,
        partitions,
        line_size,
        shared_cpus,
    })
}

/// Parse the kernel's CPU list syntax, e.g. `0-3,6,8-9`
pub fn parse_cpu_list(list: &str) -> Vec<u32> {
    let mut ids = Vec::new();
    for part in list.trim().split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) {
                    ids.extend(start..=end);
                }
            }
            None => {
                if let Ok(id) = part.parse() {
                    ids.push(id);
                }
            }
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Parse sysfs cache sizes such as `32K`, `1024K` or `8M` into bytes
pub fn parse_cache_size(size: &str) -> Option<u32> {
    let size = size.trim();
    let (digits, multiplier) = match size.chars().last()? {
        'K' | 'k' => (&size[..size.len() - 1], 1024u64),
        'M' | 'm' => (&size[..size.len() - 1], 1024 * 1024),
        'G' | 'g' => (&size[..size.len() - 1], 1024 * 1024 * 1024),
        _ => (size, 1),
    };
    let bytes = digits.trim().parse::<u64>().ok()? * multiplier;
    u32::try_from(bytes).ok()
}

/// Split /proc/cpuinfo into per-processor entries plus the `Hardware` line
pub fn parse_proc_cpuinfo(content: &str) -> (BTreeMap<u32, ProcEntry>, Option<String>) {
    let mut entries = BTreeMap::new();
    let mut hardware = None;
    let mut current: Option<(u32, ProcEntry)> = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key == "processor" {
            if let Some((id, entry)) = current.take() {
                entries.insert(id, entry);
            }
            current = value.parse().ok().map(|id| (id, ProcEntry::default()));
            continue;
        }

        if key == "Hardware" {
            if !value.is_empty() {
                hardware = Some(value.to_string());
            }
            continue;
        }

        let Some((_, entry)) = current.as_mut() else {
            continue;
        };
        match key {
            "vendor_id" => entry.vendor_id = Some(value.to_string()),
            "cpu family" => entry.family = parse_int(value),
            "model" => entry.model = parse_int(value),
            "stepping" => entry.stepping = parse_int(value),
            "model name" => entry.model_name = Some(value.to_string()),
            "apicid" => entry.apic_id = parse_int(value),
            "CPU implementer" => entry.implementer = parse_int(value),
            "CPU variant" => entry.variant = parse_int(value),
            "CPU architecture" => entry.architecture = parse_int(value),
            "CPU part" => entry.part = parse_int(value),
            "CPU revision" => entry.revision = parse_int(value),
            _ => {}
        }
    }

    if let Some((id, entry)) = current {
        entries.insert(id, entry);
    }

    (entries, hardware)
}

fn parse_int(value: &str) -> Option<u32> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_i64(path: &Path) -> Option<i64> {
    read_trimmed(path)?.parse().ok()
}

fn read_u32(path: &Path) -> Option<u32> {
    read_trimmed(path)?.parse().ok()
}
