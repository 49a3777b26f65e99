//! CPU topology queries
//!
//! Every entry point opens its own topology session, walks one category in
//! order and appends a converted record per entry to the caller's sink:
//! - Linux: sysfs topology, cpufreq and cache directories plus /proc/cpuinfo
//! - Elsewhere: unsupported, every query appends nothing

mod models;
mod sysfs;
mod topology;
mod uarch;

pub use models::{ArchId, Cache, Cluster, Core, Package, Processor, Uarch, UarchInfo, Vendor};
pub use sysfs::{CpuSource, CpuStatus};
pub use topology::CacheLevel;

use topology::TopologySession;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ProbeError;
use crate::sink::RecordSink;

/// Open a session, or explain why there is none.
///
/// `None` covers both unsupported systems (logged at info) and failed
/// acquisition (logged as an error); neither is escalated.
fn open_session(source: &CpuSource) -> Option<TopologySession> {
    match TopologySession::initialize(source) {
        Ok(session) => Some(session),
        Err(ProbeError::Unsupported(what)) => {
            info!("{} is not supported on this system", what);
            None
        }
        Err(err) => {
            error!("Failed to initialize CPU topology: {}", err);
            None
        }
    }
}

/// Shared enumerate-and-convert loop
fn enumerate<T>(
    source: &CpuSource,
    sink: &mut impl RecordSink<T>,
    record: &'static str,
    plural: &str,
    count: impl Fn(&TopologySession) -> usize,
    convert: impl Fn(&TopologySession, usize) -> Option<T>,
) -> Result<usize, ProbeError> {
    let Some(session) = open_session(source) else {
        return Ok(0);
    };

    let total = count(&session);
    if total == 0 {
        info!("No {} found", plural);
        return Ok(0);
    }

    let mut appended = 0;
    for index in 0..total {
        if let Some(item) = convert(&session, index) {
            sink.append(item)
                .map_err(|source| ProbeError::Boundary { record, source })?;
            appended += 1;
        }
    }
    Ok(appended)
}

pub fn get_processors(
    source: &CpuSource,
    sink: &mut impl RecordSink<Processor>,
) -> Result<usize, ProbeError> {
    enumerate(
        source,
        sink,
        "processor",
        "processors",
        TopologySession::processors_count,
        TopologySession::processor_record,
    )
}

pub fn get_cores(source: &CpuSource, sink: &mut impl RecordSink<Core>) -> Result<usize, ProbeError> {
    enumerate(
        source,
        sink,
        "core",
        "cores",
        TopologySession::cores_count,
        TopologySession::core_record,
    )
}

pub fn get_clusters(
    source: &CpuSource,
    sink: &mut impl RecordSink<Cluster>,
) -> Result<usize, ProbeError> {
    enumerate(
        source,
        sink,
        "cluster",
        "clusters",
        TopologySession::clusters_count,
        TopologySession::cluster_record,
    )
}

pub fn get_packages(
    source: &CpuSource,
    sink: &mut impl RecordSink<Package>,
) -> Result<usize, ProbeError> {
    enumerate(
        source,
        sink,
        "package",
        "packages",
        TopologySession::packages_count,
        TopologySession::package_record,
    )
}

pub fn get_uarchs(
    source: &CpuSource,
    sink: &mut impl RecordSink<UarchInfo>,
) -> Result<usize, ProbeError> {
    enumerate(
        source,
        sink,
        "uarch",
        "microarchitectures",
        TopologySession::uarchs_count,
        TopologySession::uarch_record,
    )
}

/// Caches of one level, each listed once however many processors share it
pub fn get_caches(
    source: &CpuSource,
    level: CacheLevel,
    sink: &mut impl RecordSink<Cache>,
) -> Result<usize, ProbeError> {
    enumerate(
        source,
        sink,
        "cache",
        level.name(),
        |session| session.caches_count(level),
        |session, index| session.cache_record(level, index),
    )
}

pub fn get_l1i_caches(
    source: &CpuSource,
    sink: &mut impl RecordSink<Cache>,
) -> Result<usize, ProbeError> {
    get_caches(source, CacheLevel::L1i, sink)
}

pub fn get_l1d_caches(
    source: &CpuSource,
    sink: &mut impl RecordSink<Cache>,
) -> Result<usize, ProbeError> {
    get_caches(source, CacheLevel::L1d, sink)
}

pub fn get_l2_caches(
    source: &CpuSource,
    sink: &mut impl RecordSink<Cache>,
) -> Result<usize, ProbeError> {
    get_caches(source, CacheLevel::L2, sink)
}

pub fn get_l3_caches(
    source: &CpuSource,
    sink: &mut impl RecordSink<Cache>,
) -> Result<usize, ProbeError> {
    get_caches(source, CacheLevel::L3, sink)
}

pub fn get_l4_caches(
    source: &CpuSource,
    sink: &mut impl RecordSink<Cache>,
) -> Result<usize, ProbeError> {
    get_caches(source, CacheLevel::L4, sink)
}

/// Cluster whose `cluster_id` matches, first package first
pub fn find_cluster(source: &CpuSource, cluster_id: u32) -> Option<Cluster> {
    let session = open_session(source)?;
    (0..session.clusters_count())
        .filter_map(|index| session.cluster_record(index))
        .find(|cluster| cluster.cluster_id == cluster_id)
}

/// First core whose `core_id` matches
pub fn find_core(source: &CpuSource, core_id: u32) -> Option<Core> {
    let session = open_session(source)?;
    (0..session.cores_count())
        .filter_map(|index| session.core_record(index))
        .find(|core| core.core_id == core_id)
}

/// Processor with the given Linux kernel number
pub fn find_processor(source: &CpuSource, linux_id: u32) -> Option<Processor> {
    let session = open_session(source)?;
    (0..session.processors_count())
        .filter_map(|index| session.processor_record(index))
        .find(|processor| processor.linux_id == linux_id as i32)
}

pub fn find_package(source: &CpuSource, index: usize) -> Option<Package> {
    open_session(source)?.package_record(index)
}

pub fn find_uarch(source: &CpuSource, index: usize) -> Option<UarchInfo> {
    open_session(source)?.uarch_record(index)
}

pub fn find_cache(source: &CpuSource, level: CacheLevel, index: usize) -> Option<Cache> {
    open_session(source)?.cache_record(level, index)
}

/// Online state and cpufreq clocks of one processor, read outside any session
pub fn processor_status(source: &CpuSource, linux_id: u32) -> Option<CpuStatus> {
    sysfs::read_status(source, linux_id)
}

/// Number of entries in every topology category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSummary {
    pub processors: usize,
    pub cores: usize,
    pub clusters: usize,
    pub packages: usize,
    pub uarchs: usize,
    pub l1i_caches: usize,
    pub l1d_caches: usize,
    pub l2_caches: usize,
    pub l3_caches: usize,
    pub l4_caches: usize,
}

impl CpuSummary {
    /// Count every category from a single session
    pub fn collect(source: &CpuSource) -> Self {
        let Some(session) = open_session(source) else {
            return Self::default();
        };
        Self {
            processors: session.processors_count(),
            cores: session.cores_count(),
            clusters: session.clusters_count(),
            packages: session.packages_count(),
            uarchs: session.uarchs_count(),
            l1i_caches: session.caches_count(CacheLevel::L1i),
            l1d_caches: session.caches_count(CacheLevel::L1d),
            l2_caches: session.caches_count(CacheLevel::L2),
            l3_caches: session.caches_count(CacheLevel::L3),
            l4_caches: session.caches_count(CacheLevel::L4),
        }
    }

    /// Labelled counts, leaving out empty categories
    pub fn entries(&self) -> Vec<(&'static str, usize)> {
        [
            ("Processors", self.processors),
            ("Cores", self.cores),
            ("Clusters", self.clusters),
            ("Packages", self.packages),
            ("Microarchitectures", self.uarchs),
            ("L1i caches", self.l1i_caches),
            ("L1d caches", self.l1d_caches),
            ("L2 caches", self.l2_caches),
            ("L3 caches", self.l3_caches),
            ("L4 caches", self.l4_caches),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::cpu::models::ProcessorCache;
    use crate::hardware::cpu::sysfs::Isa;
    use crate::sink::testing::FailingSink;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn write_cache(root: &Path, cpu: u32, index: u32, level: u32, kind: &str, size: &str, shared: &str) {
        let dir = format!("sys/devices/system/cpu/cpu{}/cache/index{}", cpu, index);
        write_file(root, &format!("{}/level", dir), &format!("{}\n", level));
        write_file(root, &format!("{}/type", dir), &format!("{}\n", kind));
        write_file(root, &format!("{}/size", dir), &format!("{}\n", size));
        write_file(root, &format!("{}/ways_of_associativity", dir), "8\n");
        write_file(root, &format!("{}/coherency_line_size", dir), "64\n");
        write_file(root, &format!("{}/shared_cpu_list", dir), &format!("{}\n", shared));
    }

    /// One package, two cores with two hardware threads each. Siblings are
    /// numbered the way Linux does it: cpu0/cpu2 on core 0, cpu1/cpu3 on core 1.
    fn x86_fixture() -> (TempDir, CpuSource) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_file(root, "sys/devices/system/cpu/present", "0-3\n");

        let mut cpuinfo = String::new();
        for cpu in 0..4u32 {
            let core = cpu % 2;
            let topology = format!("sys/devices/system/cpu/cpu{}/topology", cpu);
            write_file(root, &format!("{}/physical_package_id", topology), "0\n");
            write_file(root, &format!("{}/core_id", topology), &format!("{}\n", core));
            write_file(
                root,
                &format!("sys/devices/system/cpu/cpu{}/cpufreq/cpuinfo_max_freq", cpu),
                "3800000\n",
            );

            let siblings = if core == 0 { "0,2" } else { "1,3" };
            write_cache(root, cpu, 0, 1, "Data", "32K", siblings);
            write_cache(root, cpu, 1, 1, "Instruction", "32K", siblings);
            write_cache(root, cpu, 2, 2, "Unified", "512K", siblings);
            write_cache(root, cpu, 3, 3, "Unified", "32768K", "0-3");

            cpuinfo.push_str(&format!(
                "processor\t: {}\nvendor_id\t: AuthenticAMD\ncpu family\t: 25\nmodel\t\t: 33\n\
                 model name\t: AMD Ryzen 5 5600X 6-Core Processor\nstepping\t: 0\napicid\t\t: {}\n\n",
                cpu,
                core * 2 + cpu / 2
            ));
        }
        write_file(root, "proc/cpuinfo", &cpuinfo);

        let source = CpuSource::new(root.join("sys"), root.join("proc")).with_isa(Isa::X86);
        (temp_dir, source)
    }

    /// big.LITTLE phone SoC without `cluster_id`: four Cortex-A55 and four
    /// Cortex-A76 cores, no cache directories
    fn arm_fixture() -> (TempDir, CpuSource) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_file(root, "sys/devices/system/cpu/possible", "0-7\n");

        let mut cpuinfo = String::new();
        for cpu in 0..8u32 {
            let big = cpu >= 4;
            let topology = format!("sys/devices/system/cpu/cpu{}/topology", cpu);
            write_file(root, &format!("{}/physical_package_id", topology), "0\n");
            write_file(root, &format!("{}/core_id", topology), &format!("{}\n", cpu % 4));
            write_file(
                root,
                &format!("sys/devices/system/cpu/cpu{}/cpufreq/cpuinfo_max_freq", cpu),
                if big { "2841600\n" } else { "1785600\n" },
            );

            cpuinfo.push_str(&format!(
                "processor\t: {}\nBogoMIPS\t: 38.40\nCPU implementer\t: 0x41\n\
                 CPU architecture: 8\nCPU variant\t: {}\nCPU part\t: {}\nCPU revision\t: 0\n\n",
                cpu,
                if big { "0x4" } else { "0x1" },
                if big { "0xd0b" } else { "0xd05" },
            ));
        }
        cpuinfo.push_str("Hardware\t: Qualcomm Technologies, Inc SM8250\n");
        write_file(root, "proc/cpuinfo", &cpuinfo);

        let source = CpuSource::new(root.join("sys"), root.join("proc")).with_isa(Isa::Arm);
        (temp_dir, source)
    }

    #[test]
    fn test_x86_processors_follow_core_order() {
        let (_temp_dir, source) = x86_fixture();
        let mut processors = Vec::new();

        let count = get_processors(&source, &mut processors).unwrap();
        assert_eq!(count, 4);
        assert_eq!(processors.len(), 4);

        let linux_ids: Vec<i32> = processors.iter().map(|p| p.linux_id).collect();
        assert_eq!(linux_ids, vec![0, 2, 1, 3]);
        let smt_ids: Vec<u32> = processors.iter().map(|p| p.smt_id).collect();
        assert_eq!(smt_ids, vec![0, 1, 0, 1]);
        assert_eq!(processors[1].apic_id, Some(1));

        let second = &processors[2];
        let core = second.core.as_ref().unwrap();
        assert_eq!(core.core_id, 1);
        assert_eq!(core.processor_start, 2);
        assert_eq!(core.processor_count, 2);
        assert_eq!(
            second.package.as_ref().map(|p| p.name.as_str()),
            Some("AMD Ryzen 5 5600X 6-Core Processor")
        );

        let l1d = second.cache.l1d.as_ref().unwrap();
        assert_eq!(l1d.size, 32 * 1024);
        assert_eq!(l1d.processor_start, 2);
        assert_eq!(l1d.processor_count, 2);
        assert_eq!(l1d.sets, 64);
        assert_eq!(second.cache.l3.as_ref().map(|c| c.processor_count), Some(4));
        assert!(second.cache.l4.is_none());
    }

    #[test]
    fn test_x86_cores_carry_cpuid_and_uarch() {
        let (_temp_dir, source) = x86_fixture();
        let mut cores = Vec::new();

        assert_eq!(get_cores(&source, &mut cores).unwrap(), 2);
        let core = &cores[0];
        assert_eq!(core.vendor, Vendor::Amd);
        assert_eq!(core.uarch.name(), "Zen 3");
        assert_eq!(core.arch_id, Some(ArchId::Cpuid(0x00A2_0F10)));
        assert_eq!(core.frequency, 3_800_000_000);
        assert_eq!(core.cluster.as_ref().map(|c| c.core_count), Some(2));
    }

    #[test]
    fn test_x86_caches_are_listed_once() {
        let (_temp_dir, source) = x86_fixture();

        let mut l1d = Vec::new();
        assert_eq!(get_l1d_caches(&source, &mut l1d).unwrap(), 2);
        assert!(!l1d[0].is_unified());
        assert_eq!(
            l1d.iter().map(|c| c.processor_start).collect::<Vec<_>>(),
            vec![0, 2]
        );

        let mut l3 = Vec::new();
        assert_eq!(get_l3_caches(&source, &mut l3).unwrap(), 1);
        assert!(l3[0].is_unified());
        assert_eq!(l3[0].size, 32 * 1024 * 1024);
        assert_eq!(l3[0].processor_count, 4);
    }

    #[test]
    fn test_missing_l4_appends_nothing() {
        let (_temp_dir, source) = x86_fixture();
        let mut l4 = Vec::new();

        assert_eq!(get_l4_caches(&source, &mut l4).unwrap(), 0);
        assert!(l4.is_empty());
    }

    #[test]
    fn test_arm_clusters_split_by_core_design() {
        let (_temp_dir, source) = arm_fixture();
        let mut clusters = Vec::new();

        assert_eq!(get_clusters(&source, &mut clusters).unwrap(), 2);

        let little = &clusters[0];
        assert_eq!(little.cluster_id, 0);
        assert_eq!(little.core_start, 0);
        assert_eq!(little.core_count, 4);
        assert_eq!(little.vendor, Vendor::Arm);
        assert_eq!(little.uarch.name(), "Cortex-A55");
        assert_eq!(little.frequency, 1_785_600_000);

        let big = &clusters[1];
        assert_eq!(big.cluster_id, 1);
        assert_eq!(big.processor_start, 4);
        assert_eq!(big.uarch.name(), "Cortex-A76");
        let Some(ArchId::Midr(midr)) = big.arch_id else {
            panic!("expected a MIDR, got {:?}", big.arch_id);
        };
        assert_eq!(midr.architecture, 0xF);
        assert_eq!(midr.variant, 4);
        assert_eq!(midr.part_num, 0xD0B);
        assert_eq!(
            big.package.as_ref().map(|p| p.name.as_str()),
            Some("Qualcomm Technologies, Inc SM8250")
        );
    }

    #[test]
    fn test_arm_processors_have_no_x86_or_cache_fields() {
        let (_temp_dir, source) = arm_fixture();
        let mut processors = Vec::new();

        assert_eq!(get_processors(&source, &mut processors).unwrap(), 8);
        for processor in &processors {
            assert_eq!(processor.apic_id, None);
            assert_eq!(processor.cache, ProcessorCache::default());
            let arch_id = processor.core.as_ref().unwrap().arch_id;
            assert!(matches!(arch_id, Some(ArchId::Midr(_))));
        }

        let mut l1i = Vec::new();
        assert_eq!(get_l1i_caches(&source, &mut l1i).unwrap(), 0);
    }

    #[test]
    fn test_arm_uarchs_grouped() {
        let (_temp_dir, source) = arm_fixture();
        let mut uarchs = Vec::new();

        assert_eq!(get_uarchs(&source, &mut uarchs).unwrap(), 2);
        assert_eq!(uarchs[0].uarch.name(), "Cortex-A55");
        assert_eq!(uarchs[0].core_count, 4);
        assert_eq!(uarchs[1].processor_count, 4);
    }

    #[test]
    fn test_find_cluster_by_id() {
        let (_temp_dir, source) = arm_fixture();

        let big = find_cluster(&source, 1).unwrap();
        assert_eq!(big.uarch.name(), "Cortex-A76");
        assert!(find_cluster(&source, 2).is_none());
        assert!(find_package(&source, 1).is_none());
    }

    #[test]
    fn test_lookups_use_kernel_ids() {
        let (_temp_dir, source) = x86_fixture();

        // cpu1 is the third processor in core order
        let processor = find_processor(&source, 1).unwrap();
        assert_eq!(processor.linux_id, 1);
        assert_eq!(processor.smt_id, 0);
        assert_eq!(processor.core.as_ref().map(|c| c.processor_start), Some(2));
        assert!(find_processor(&source, 4).is_none());

        let core = find_core(&source, 1).unwrap();
        assert_eq!(core.processor_start, 2);
        assert!(find_core(&source, 2).is_none());

        assert_eq!(find_uarch(&source, 0).map(|u| u.core_count), Some(2));
        assert!(find_uarch(&source, 1).is_none());
        let l2 = find_cache(&source, CacheLevel::L2, 1).unwrap();
        assert_eq!(l2.size, 512 * 1024);
        assert_eq!(l2.processor_start, 2);
        assert!(find_cache(&source, CacheLevel::L3, 1).is_none());
    }

    #[test]
    fn test_processor_status() {
        let (temp_dir, source) = x86_fixture();
        write_file(temp_dir.path(), "sys/devices/system/cpu/online", "0-2\n");
        write_file(
            temp_dir.path(),
            "sys/devices/system/cpu/cpu2/cpufreq/scaling_cur_freq",
            "2200000\n",
        );

        let status = processor_status(&source, 2).unwrap();
        assert_eq!(status.online, Some(true));
        assert_eq!(status.maximum_frequency, Some(3_800_000_000));
        assert_eq!(status.scaling_current_frequency, Some(2_200_000_000));
        assert_eq!(processor_status(&source, 3).and_then(|s| s.online), Some(false));
        assert!(processor_status(&source, 8).is_none());
    }

    /// x86 kernels fill `cluster_id` with per-L2 ids, one per core here
    #[test]
    fn test_x86_cluster_id_is_not_a_core_cluster() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_file(root, "sys/devices/system/cpu/present", "0-7\n");

        let mut cpuinfo = String::new();
        for cpu in 0..8u32 {
            let topology = format!("sys/devices/system/cpu/cpu{}/topology", cpu);
            write_file(root, &format!("{}/physical_package_id", topology), "0\n");
            write_file(root, &format!("{}/core_id", topology), &format!("{}\n", cpu));
            write_file(root, &format!("{}/cluster_id", topology), &format!("{}\n", cpu * 8));
            cpuinfo.push_str(&format!(
                "processor\t: {}\nvendor_id\t: GenuineIntel\ncpu family\t: 6\nmodel\t\t: 85\n\
                 model name\t: Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz\nstepping\t: 4\n\n",
                cpu
            ));
        }
        write_file(root, "proc/cpuinfo", &cpuinfo);
        let source = CpuSource::new(root.join("sys"), root.join("proc")).with_isa(Isa::X86);

        let mut clusters = Vec::new();
        assert_eq!(get_clusters(&source, &mut clusters).unwrap(), 1);
        assert_eq!(clusters[0].core_count, 8);
        assert_eq!(clusters[0].vendor, Vendor::Intel);
        assert_eq!(clusters[0].uarch.name(), "Sky Lake");
        assert_eq!(clusters[0].arch_id, Some(ArchId::Cpuid(0x0005_0654)));
    }

    #[test]
    fn test_arm_cluster_id_is_used() {
        let (temp_dir, source) = arm_fixture();
        // Kernel reports all eight cores in one DynamIQ cluster
        for cpu in 0..8u32 {
            let topology = format!("sys/devices/system/cpu/cpu{}/topology", cpu);
            write_file(temp_dir.path(), &format!("{}/cluster_id", topology), "0\n");
            write_file(temp_dir.path(), &format!("{}/core_id", topology), &format!("{}\n", cpu));
        }

        let mut clusters = Vec::new();
        assert_eq!(get_clusters(&source, &mut clusters).unwrap(), 1);
        assert_eq!(clusters[0].core_count, 8);
        assert_eq!(clusters[0].uarch.name(), "Cortex-A55");
    }

    #[test]
    fn test_packages_ordered_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_file(root, "sys/devices/system/cpu/present", "0-1\n");
        write_file(root, "sys/devices/system/cpu/cpu0/topology/physical_package_id", "1\n");
        write_file(root, "sys/devices/system/cpu/cpu1/topology/physical_package_id", "0\n");
        write_file(root, "proc/cpuinfo", "processor\t: 0\nmodel name\t: Xeon\n");
        let source = CpuSource::new(root.join("sys"), root.join("proc")).with_isa(Isa::X86);

        let mut packages = Vec::new();
        assert_eq!(get_packages(&source, &mut packages).unwrap(), 2);
        assert_eq!(packages[1].processor_start, 1);
        assert_eq!(packages[1].name, "Xeon");

        let cpu0 = find_processor(&source, 0).unwrap();
        assert_eq!(cpu0.package.map(|p| p.processor_start), Some(1));
    }

    #[test]
    fn test_missing_sysfs_appends_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = CpuSource::new(temp_dir.path(), temp_dir.path());

        let mut processors = Vec::new();
        assert_eq!(get_processors(&source, &mut processors).unwrap(), 0);
        assert!(processors.is_empty());
        assert!(find_processor(&source, 0).is_none());
        assert_eq!(CpuSummary::collect(&source), CpuSummary::default());
    }

    #[test]
    fn test_sink_failure_is_a_boundary_fault() {
        let (_temp_dir, source) = x86_fixture();
        let mut sink = FailingSink::new(1);

        match get_processors(&source, &mut sink) {
            Err(ProbeError::Boundary { record, .. }) => assert_eq!(record, "processor"),
            other => panic!("expected boundary fault, got {:?}", other),
        }
        assert_eq!(sink.accepted.len(), 1);
    }

    #[test]
    fn test_summary_omits_empty_categories() {
        let (_temp_dir, source) = x86_fixture();
        let summary = CpuSummary::collect(&source);

        assert_eq!(summary.processors, 4);
        assert_eq!(summary.l4_caches, 0);
        let labels: Vec<&str> = summary.entries().iter().map(|(label, _)| *label).collect();
        assert!(labels.contains(&"L3 caches"));
        assert!(!labels.contains(&"L4 caches"));
    }
}
