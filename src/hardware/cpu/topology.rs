//! CPU topology assembly and the scoped topology session
//!
//! Processors are laid out package by package, cluster by cluster and core by
//! core, so every `*_start`/`*_count` pair is a contiguous range of the flat
//! processor, core or cluster arrays. Parent links are array indices and are
//! only resolved into owned records by the `*_record` conversions.

use clap::ValueEnum;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::models::{
    ArchId, Cache, Cluster, Core, Midr, Package, Processor, ProcessorCache, Uarch, UarchInfo,
    Vendor, CACHE_UNIFIED,
};
use super::sysfs::{self, CacheKind, CpuSnapshot, CpuSource, Isa, LogicalCpu};
use super::uarch;
use crate::error::ProbeError;

/// Cache levels exposed by the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum CacheLevel {
    L1i,
    L1d,
    L2,
    L3,
    L4,
}

impl CacheLevel {
    pub const ALL: [CacheLevel; 5] = [
        CacheLevel::L1i,
        CacheLevel::L1d,
        CacheLevel::L2,
        CacheLevel::L3,
        CacheLevel::L4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CacheLevel::L1i => "L1i cache",
            CacheLevel::L1d => "L1d cache",
            CacheLevel::L2 => "L2 cache",
            CacheLevel::L3 => "L3 cache",
            CacheLevel::L4 => "L4 cache",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn for_entry(level: u32, kind: CacheKind) -> Option<Self> {
        match (level, kind) {
            (1, CacheKind::Instruction) => Some(CacheLevel::L1i),
            (1, _) => Some(CacheLevel::L1d),
            (_, CacheKind::Instruction) => None,
            (2, _) => Some(CacheLevel::L2),
            (3, _) => Some(CacheLevel::L3),
            (4, _) => Some(CacheLevel::L4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct RawProcessor {
    smt_id: u32,
    core: Option<usize>,
    cluster: Option<usize>,
    package: Option<usize>,
    linux_id: i32,
    apic_id: Option<u32>,
    cache: [Option<usize>; 5],
}

#[derive(Debug, Clone)]
struct RawCore {
    processor_start: u32,
    processor_count: u32,
    core_id: u32,
    cluster: Option<usize>,
    package: Option<usize>,
    vendor: Vendor,
    uarch: Uarch,
    arch_id: Option<ArchId>,
    frequency: u64,
}

#[derive(Debug, Clone)]
struct RawCluster {
    processor_start: u32,
    processor_count: u32,
    core_start: u32,
    core_count: u32,
    cluster_id: u32,
    package: Option<usize>,
    vendor: Vendor,
    uarch: Uarch,
    arch_id: Option<ArchId>,
    frequency: u64,
}

/// Identity of a core design as seen by one processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Design {
    vendor: Vendor,
    uarch: Uarch,
    arch_id: Option<ArchId>,
}

impl Design {
    fn of(cpu: &LogicalCpu, isa: Isa) -> Self {
        let info = &cpu.info;
        match isa {
            Isa::X86 => {
                let vendor = info
                    .vendor_id
                    .as_deref()
                    .map(Vendor::from_x86_vendor_id)
                    .unwrap_or(Vendor::Unknown);
                let arch_id = match (info.family, info.model) {
                    (Some(family), Some(model)) => Some(ArchId::Cpuid(encode_cpuid(
                        family,
                        model,
                        info.stepping.unwrap_or(0),
                    ))),
                    _ => None,
                };
                let uarch = match (info.family, info.model) {
                    (Some(family), Some(model)) => uarch::from_x86(vendor, family, model),
                    _ => Uarch::UNKNOWN,
                };
                Design {
                    vendor,
                    uarch,
                    arch_id,
                }
            }
            Isa::Arm => match (info.implementer, info.part) {
                (Some(implementer), Some(part)) => {
                    let midr = Midr {
                        implementer,
                        variant: info.variant.unwrap_or(0),
                        // ARMv7 and later report the architecture field as 0xF
                        architecture: match info.architecture {
                            Some(arch) if arch < 7 => arch,
                            _ => 0xF,
                        },
                        part_num: part,
                        revision: info.revision.unwrap_or(0),
                    };
                    Design {
                        vendor: Vendor::from_arm_implementer(implementer),
                        uarch: uarch::from_midr(&midr),
                        arch_id: Some(ArchId::Midr(midr)),
                    }
                }
                _ => Design::unknown(),
            },
            Isa::Other => Design::unknown(),
        }
    }

    fn unknown() -> Self {
        Design {
            vendor: Vendor::Unknown,
            uarch: Uarch::UNKNOWN,
            arch_id: None,
        }
    }
}

/// Re-encode display family/model/stepping as CPUID leaf 1 EAX
fn encode_cpuid(family: u32, model: u32, stepping: u32) -> u32 {
    let (base_family, extended_family) = if family > 0xF {
        (0xF, family - 0xF)
    } else {
        (family, 0)
    };
    (stepping & 0xF)
        | ((model & 0xF) << 4)
        | ((base_family & 0xF) << 8)
        | (((model >> 4) & 0xF) << 16)
        | ((extended_family & 0xFF) << 20)
}

/// Fully assembled topology, the equivalent of the library's global tables
#[derive(Debug, Default)]
struct Topology {
    processors: Vec<RawProcessor>,
    cores: Vec<RawCore>,
    clusters: Vec<RawCluster>,
    packages: Vec<Package>,
    uarchs: Vec<UarchInfo>,
    caches: [Vec<Cache>; 5],
}

impl Topology {
    fn build(snapshot: CpuSnapshot, isa: Isa) -> Self {
        let mut topology = Topology::default();
        let cpus = snapshot.cpus;
        if cpus.is_empty() {
            return topology;
        }

        let package_name = package_name(&cpus, snapshot.hardware.as_deref(), isa);

        // package id -> cpu indices, in Linux id order
        let mut by_package: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (index, cpu) in cpus.iter().enumerate() {
            by_package.entry(cpu.package_id).or_default().push(index);
        }

        // Order in which cpus land in the flat processor array
        let mut order: Vec<usize> = Vec::with_capacity(cpus.len());

        for members in by_package.values() {
            let package_index = topology.packages.len();
            let package = Package {
                name: package_name.clone(),
                processor_start: topology.processors.len() as u32,
                processor_count: 0,
                core_start: topology.cores.len() as u32,
                core_count: 0,
                cluster_start: topology.clusters.len() as u32,
                cluster_count: 0,
            };
            topology.packages.push(package);

            for (cluster_in_package, cluster_members) in
                group_clusters(&cpus, members, isa).into_iter().enumerate()
            {
                let cluster_index = topology.clusters.len();
                let design = Design::of(&cpus[cluster_members[0]], isa);
                let frequency = frequency_hz(&cpus[cluster_members[0]]);
                let mut cluster = RawCluster {
                    processor_start: topology.processors.len() as u32,
                    processor_count: 0,
                    core_start: topology.cores.len() as u32,
                    core_count: 0,
                    cluster_id: cluster_in_package as u32,
                    package: Some(package_index),
                    vendor: design.vendor,
                    uarch: design.uarch,
                    arch_id: design.arch_id,
                    frequency,
                };

                for core_members in group_by_first_seen(&cluster_members, |i| cpus[i].core_id) {
                    let core_index = topology.cores.len();
                    let first = &cpus[core_members[0]];
                    let design = Design::of(first, isa);
                    topology.cores.push(RawCore {
                        processor_start: topology.processors.len() as u32,
                        processor_count: core_members.len() as u32,
                        core_id: first.core_id,
                        cluster: Some(cluster_index),
                        package: Some(package_index),
                        vendor: design.vendor,
                        uarch: design.uarch,
                        arch_id: design.arch_id,
                        frequency: frequency_hz(first),
                    });

                    for (smt_id, &cpu_index) in core_members.iter().enumerate() {
                        let cpu = &cpus[cpu_index];
                        topology.processors.push(RawProcessor {
                            smt_id: smt_id as u32,
                            core: Some(core_index),
                            cluster: Some(cluster_index),
                            package: Some(package_index),
                            linux_id: cpu.linux_id as i32,
                            apic_id: match isa {
                                Isa::X86 => cpu.info.apic_id,
                                _ => None,
                            },
                            cache: [None; 5],
                        });
                        order.push(cpu_index);
                    }

                    cluster.processor_count += core_members.len() as u32;
                    cluster.core_count += 1;
                }

                topology.clusters.push(cluster);
            }

            let processors = topology.processors.len() as u32;
            let cores = topology.cores.len() as u32;
            let clusters = topology.clusters.len() as u32;
            let package = &mut topology.packages[package_index];
            package.processor_count = processors - package.processor_start;
            package.core_count = cores - package.core_start;
            package.cluster_count = clusters - package.cluster_start;
        }

        topology.attach_caches(&cpus, &order);
        topology.uarchs = topology.collect_uarchs();
        topology
    }

    /// Deduplicate caches per level by their sharing set and link processors
    fn attach_caches(&mut self, cpus: &[LogicalCpu], order: &[usize]) {
        let position: HashMap<u32, u32> = order
            .iter()
            .enumerate()
            .map(|(position, &cpu_index)| (cpus[cpu_index].linux_id, position as u32))
            .collect();
        let mut seen: [HashMap<Vec<u32>, usize>; 5] = Default::default();

        for (processor_index, &cpu_index) in order.iter().enumerate() {
            let cpu = &cpus[cpu_index];
            for entry in &cpu.caches {
                let Some(level) = CacheLevel::for_entry(entry.level, entry.kind) else {
                    continue;
                };
                let slot = level.index();
                if self.processors[processor_index].cache[slot].is_some() {
                    continue;
                }

                let mut sharing: Vec<u32> = entry
                    .shared_cpus
                    .iter()
                    .filter_map(|linux_id| position.get(linux_id).copied())
                    .collect();
                if sharing.is_empty() {
                    sharing.push(processor_index as u32);
                }
                sharing.sort_unstable();

                let cache_index = match seen[slot].get(&sharing) {
                    Some(&existing) => existing,
                    None => {
                        let cache = Cache {
                            size: entry.size,
                            associativity: entry.associativity,
                            sets: entry.sets,
                            partitions: entry.partitions,
                            line_size: entry.line_size,
                            flags: if entry.kind == CacheKind::Unified {
                                CACHE_UNIFIED
                            } else {
                                0
                            },
                            processor_start: sharing[0],
                            processor_count: sharing.len() as u32,
                        };
                        self.caches[slot].push(cache);
                        let index = self.caches[slot].len() - 1;
                        seen[slot].insert(sharing, index);
                        index
                    }
                };
                self.processors[processor_index].cache[slot] = Some(cache_index);
            }
        }
    }

    fn collect_uarchs(&self) -> Vec<UarchInfo> {
        let mut uarchs: Vec<UarchInfo> = Vec::new();
        for core in &self.cores {
            match uarchs
                .iter_mut()
                .find(|info| info.uarch == core.uarch && info.arch_id == core.arch_id)
            {
                Some(info) => {
                    info.processor_count += core.processor_count;
                    info.core_count += 1;
                }
                None => uarchs.push(UarchInfo {
                    uarch: core.uarch,
                    arch_id: core.arch_id,
                    processor_count: core.processor_count,
                    core_count: 1,
                }),
            }
        }
        uarchs
    }
}

/// Split a package's cpus into clusters, in order of first appearance.
///
/// On ARM the kernel's `cluster_id` wins when every cpu has one; otherwise
/// cores with the same design and maximum clock share a cluster. x86 kernels
/// expose `cluster_id` as an L2 or module id, so it is ignored there and the
/// cores of one design form one cluster per package.
fn group_clusters(cpus: &[LogicalCpu], members: &[usize], isa: Isa) -> Vec<Vec<usize>> {
    match isa {
        Isa::Arm if members.iter().all(|&i| cpus[i].cluster_id.is_some()) => {
            group_by_first_seen(members, |i| cpus[i].cluster_id)
        }
        Isa::X86 => group_by_first_seen(members, |i| Design::of(&cpus[i], isa)),
        _ => group_by_first_seen(members, |i| {
            (Design::of(&cpus[i], isa).arch_id, cpus[i].max_frequency_khz)
        }),
    }
}

fn group_by_first_seen<K: PartialEq>(members: &[usize], key: impl Fn(usize) -> K) -> Vec<Vec<usize>> {
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
    for &member in members {
        let member_key = key(member);
        match groups.iter_mut().find(|(k, _)| *k == member_key) {
            Some((_, group)) => group.push(member),
            None => groups.push((member_key, vec![member])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

fn frequency_hz(cpu: &LogicalCpu) -> u64 {
    cpu.max_frequency_khz.map(|khz| khz * 1000).unwrap_or(0)
}

fn package_name(cpus: &[LogicalCpu], hardware: Option<&str>, isa: Isa) -> String {
    let model_name = cpus
        .iter()
        .find_map(|cpu| cpu.info.model_name.as_deref())
        .filter(|_| isa == Isa::X86);

    model_name
        .or(hardware)
        .map(str::to_string)
        .or_else(sysfs::brand_fallback)
        .unwrap_or_default()
}

/// Scoped topology session
///
/// Acquired right before a query and dropped right after; nothing is cached
/// between sessions. Each session is an independent snapshot, but callers
/// that need a consistent view across several queries must serialize them
/// externally.
#[derive(Debug)]
pub struct TopologySession {
    topology: Topology,
}

impl TopologySession {
    /// Read and assemble the topology
    pub fn initialize(source: &CpuSource) -> Result<Self, ProbeError> {
        let snapshot = sysfs::read_snapshot(source)?;
        let topology = Topology::build(snapshot, source.isa);
        debug!(
            "CPU topology initialized: {} processors, {} cores, {} clusters, {} packages",
            topology.processors.len(),
            topology.cores.len(),
            topology.clusters.len(),
            topology.packages.len()
        );
        Ok(Self { topology })
    }

    pub fn processors_count(&self) -> usize {
        self.topology.processors.len()
    }

    pub fn cores_count(&self) -> usize {
        self.topology.cores.len()
    }

    pub fn clusters_count(&self) -> usize {
        self.topology.clusters.len()
    }

    pub fn packages_count(&self) -> usize {
        self.topology.packages.len()
    }

    pub fn uarchs_count(&self) -> usize {
        self.topology.uarchs.len()
    }

    pub fn caches_count(&self, level: CacheLevel) -> usize {
        self.topology.caches[level.index()].len()
    }

    pub fn processor_record(&self, index: usize) -> Option<Processor> {
        let raw = self.topology.processors.get(index)?;
        let cache = |level: CacheLevel| {
            raw.cache[level.index()].and_then(|i| self.cache_record(level, i))
        };
        Some(Processor {
            smt_id: raw.smt_id,
            core: raw.core.and_then(|i| self.core_record(i)),
            cluster: raw.cluster.and_then(|i| self.cluster_record(i)),
            package: raw.package.and_then(|i| self.package_record(i)),
            linux_id: raw.linux_id,
            apic_id: raw.apic_id,
            cache: ProcessorCache {
                l1i: cache(CacheLevel::L1i),
                l1d: cache(CacheLevel::L1d),
                l2: cache(CacheLevel::L2),
                l3: cache(CacheLevel::L3),
                l4: cache(CacheLevel::L4),
            },
        })
    }

    pub fn core_record(&self, index: usize) -> Option<Core> {
        let raw = self.topology.cores.get(index)?;
        Some(Core {
            processor_start: raw.processor_start,
            processor_count: raw.processor_count,
            core_id: raw.core_id,
            cluster: raw.cluster.and_then(|i| self.cluster_record(i)),
            package: raw.package.and_then(|i| self.package_record(i)),
            vendor: raw.vendor,
            uarch: raw.uarch,
            arch_id: raw.arch_id,
            frequency: raw.frequency,
        })
    }

    pub fn cluster_record(&self, index: usize) -> Option<Cluster> {
        let raw = self.topology.clusters.get(index)?;
        Some(Cluster {
            processor_start: raw.processor_start,
            processor_count: raw.processor_count,
            core_start: raw.core_start,
            core_count: raw.core_count,
            cluster_id: raw.cluster_id,
            package: raw.package.and_then(|i| self.package_record(i)),
            vendor: raw.vendor,
            uarch: raw.uarch,
            arch_id: raw.arch_id,
            frequency: raw.frequency,
        })
    }

    pub fn package_record(&self, index: usize) -> Option<Package> {
        self.topology.packages.get(index).cloned()
    }

    pub fn uarch_record(&self, index: usize) -> Option<UarchInfo> {
        self.topology.uarchs.get(index).cloned()
    }

    pub fn cache_record(&self, level: CacheLevel, index: usize) -> Option<Cache> {
        self.topology.caches[level.index()].get(index).cloned()
    }
}

impl Drop for TopologySession {
    fn drop(&mut self) {
        debug!("CPU topology deinitialized");
    }
}
