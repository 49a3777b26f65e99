//! CPU topology records handed to consumers
//!
//! Each record mirrors one topology-library struct field by field. Parent
//! references (core, cluster, package) are converted copies, so a record owns
//! everything it holds and nothing points back into the topology session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache is shared by data and instructions
///
/// The library's inclusive (0x2) and complex-indexing (0x4) bits come from
/// CPUID leaf 4 and have no sysfs counterpart, so they are never set here.
pub const CACHE_UNIFIED: u32 = 0x0000_0001;

/// Vendor of a processor core design, with the topology library's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Unknown,
    Intel,
    Amd,
    Arm,
    Qualcomm,
    Apple,
    Samsung,
    Nvidia,
    Mips,
    Ibm,
    Ingenic,
    Via,
    Cavium,
    Broadcom,
    Apm,
    Huawei,
    Hygon,
    SiFive,
    TexasInstruments,
    Marvell,
    Rdc,
    Dmp,
    Motorola,
    Transmeta,
    Cyrix,
    Rise,
    Nsc,
    Sis,
    NexGen,
    Umc,
    Dec,
}

impl Vendor {
    /// Vendor from the x86 CPUID vendor string (`vendor_id` in /proc/cpuinfo)
    pub fn from_x86_vendor_id(vendor_id: &str) -> Self {
        match vendor_id.trim() {
            "GenuineIntel" => Vendor::Intel,
            "AuthenticAMD" => Vendor::Amd,
            "HygonGenuine" => Vendor::Hygon,
            "CentaurHauls" | "Shanghai" => Vendor::Via,
            "CyrixInstead" => Vendor::Cyrix,
            "GenuineTMx86" | "TransmetaCPU" => Vendor::Transmeta,
            "RiseRiseRise" => Vendor::Rise,
            "Geode by NSC" => Vendor::Nsc,
            "SiS SiS SiS" => Vendor::Sis,
            "NexGenDriven" => Vendor::NexGen,
            "UMC UMC UMC" => Vendor::Umc,
            "Vortex86 SoC" => Vendor::Dmp,
            _ => Vendor::Unknown,
        }
    }

    /// Vendor from the MIDR implementer code
    pub fn from_arm_implementer(implementer: u32) -> Self {
        match implementer {
            0x41 => Vendor::Arm,
            0x42 => Vendor::Broadcom,
            0x43 => Vendor::Cavium,
            0x44 => Vendor::Dec,
            0x48 => Vendor::Huawei,
            0x4D => Vendor::Motorola,
            0x4E => Vendor::Nvidia,
            0x50 => Vendor::Apm,
            0x51 => Vendor::Qualcomm,
            0x53 => Vendor::Samsung,
            0x56 => Vendor::Marvell,
            0x61 => Vendor::Apple,
            0x69 => Vendor::Intel,
            _ => Vendor::Unknown,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Vendor::Unknown => "Unknown",
            Vendor::Intel => "Intel",
            Vendor::Amd => "AMD",
            Vendor::Arm => "ARM",
            Vendor::Qualcomm => "Qualcomm",
            Vendor::Apple => "Apple",
            Vendor::Samsung => "Samsung",
            Vendor::Nvidia => "NVIDIA",
            Vendor::Mips => "MIPS",
            Vendor::Ibm => "IBM",
            Vendor::Ingenic => "Ingenic",
            Vendor::Via => "VIA",
            Vendor::Cavium => "Cavium",
            Vendor::Broadcom => "Broadcom",
            Vendor::Apm => "APM",
            Vendor::Huawei => "Huawei",
            Vendor::Hygon => "Hygon",
            Vendor::SiFive => "SiFive",
            Vendor::TexasInstruments => "Texas Instruments",
            Vendor::Marvell => "Marvell",
            Vendor::Rdc => "RDC",
            Vendor::Dmp => "DM&P",
            Vendor::Motorola => "Motorola",
            Vendor::Transmeta => "Transmeta",
            Vendor::Cyrix => "Cyrix",
            Vendor::Rise => "Rise",
            Vendor::Nsc => "NSC",
            Vendor::Sis => "SiS",
            Vendor::NexGen => "NexGen",
            Vendor::Umc => "UMC",
            Vendor::Dec => "DEC",
        };
        write!(f, "{}", name)
    }
}

/// Microarchitecture identifier, using the topology library's numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uarch(pub u32);

impl Uarch {
    pub const UNKNOWN: Uarch = Uarch(0);

    pub fn name(self) -> &'static str {
        super::uarch::name(self)
    }
}

impl fmt::Display for Uarch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decoded ARM Main ID Register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Midr {
    pub implementer: u32,
    pub variant: u32,
    pub architecture: u32,
    pub part_num: u32,
    pub revision: u32,
}

impl Midr {
    /// Bits 31-24 implementer, 23-20 variant, 19-16 architecture,
    /// 15-4 part number, 3-0 revision.
    #[cfg(test)]
    pub fn from_value(value: u32) -> Self {
        Self {
            implementer: (value >> 24) & 0xFF,
            variant: (value >> 20) & 0xF,
            architecture: (value >> 16) & 0xF,
            part_num: (value >> 4) & 0xFFF,
            revision: value & 0xF,
        }
    }

    pub fn value(&self) -> u32 {
        ((self.implementer & 0xFF) << 24)
            | ((self.variant & 0xF) << 20)
            | ((self.architecture & 0xF) << 16)
            | ((self.part_num & 0xFFF) << 4)
            | (self.revision & 0xF)
    }
}

/// Architecture-specific identifier of a core design
///
/// Only present when the topology was read for the matching instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchId {
    /// CPUID leaf 1 EAX (x86)
    Cpuid(u32),
    /// Main ID Register (ARM)
    Midr(Midr),
}

impl fmt::Display for ArchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchId::Cpuid(value) => write!(f, "CPUID 0x{:08x}", value),
            ArchId::Midr(midr) => write!(f, "MIDR 0x{:08x}", midr.value()),
        }
    }
}

/// `struct cpuinfo_cache`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    /// Cache size in bytes
    pub size: u32,
    /// Number of ways of associativity
    pub associativity: u32,
    /// Number of sets
    pub sets: u32,
    /// Number of partitions
    pub partitions: u32,
    /// Line size in bytes
    pub line_size: u32,
    /// Binary OR of `CACHE_*` flags
    pub flags: u32,
    /// Index of the first logical processor sharing this cache
    pub processor_start: u32,
    /// Number of logical processors sharing this cache
    pub processor_count: u32,
}

impl Cache {
    pub fn is_unified(&self) -> bool {
        self.flags & CACHE_UNIFIED != 0
    }
}

/// Caches visible to one logical processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorCache {
    pub l1i: Option<Cache>,
    pub l1d: Option<Cache>,
    pub l2: Option<Cache>,
    pub l3: Option<Cache>,
    pub l4: Option<Cache>,
}

/// `struct cpuinfo_package`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// SoC or CPU model name
    pub name: String,
    pub processor_start: u32,
    pub processor_count: u32,
    pub core_start: u32,
    pub core_count: u32,
    pub cluster_start: u32,
    pub cluster_count: u32,
}

/// `struct cpuinfo_cluster`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub processor_start: u32,
    pub processor_count: u32,
    pub core_start: u32,
    pub core_count: u32,
    /// Cluster ID within its package
    pub cluster_id: u32,
    pub package: Option<Package>,
    pub vendor: Vendor,
    pub uarch: Uarch,
    pub arch_id: Option<ArchId>,
    /// Maximum clock rate in Hz (`cpuinfo_max_freq`, boost included), 0 when unknown
    pub frequency: u64,
}

/// `struct cpuinfo_core`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Core {
    pub processor_start: u32,
    pub processor_count: u32,
    /// Core ID within its package
    pub core_id: u32,
    pub cluster: Option<Cluster>,
    pub package: Option<Package>,
    pub vendor: Vendor,
    pub uarch: Uarch,
    pub arch_id: Option<ArchId>,
    pub frequency: u64,
}

/// `struct cpuinfo_processor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processor {
    /// SMT (hyperthread) ID within its core
    pub smt_id: u32,
    pub core: Option<Core>,
    pub cluster: Option<Cluster>,
    pub package: Option<Package>,
    /// Linux kernel processor number
    pub linux_id: i32,
    /// x86 APIC ID, absent on other instruction sets
    pub apic_id: Option<u32>,
    pub cache: ProcessorCache,
}

/// `struct cpuinfo_uarch_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UarchInfo {
    pub uarch: Uarch,
    pub arch_id: Option<ArchId>,
    pub processor_count: u32,
    pub core_count: u32,
}
