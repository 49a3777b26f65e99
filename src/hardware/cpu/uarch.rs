//! Microarchitecture identification
//!
//! Values follow the topology library's `enum cpuinfo_uarch` layout: the high
//! 16 bits select a vendor family and the low bits the design.

use super::models::{Midr, Uarch, Vendor};

const UARCHS: &[(u32, &str)] = &[
    (0x0000_0000, "Unknown"),
    // Intel
    (0x0010_0100, "P5"),
    (0x0010_0101, "Quark"),
    (0x0010_0200, "P6"),
    (0x0010_0201, "Dothan"),
    (0x0010_0202, "Yonah"),
    (0x0010_0203, "Conroe"),
    (0x0010_0204, "Penryn"),
    (0x0010_0205, "Nehalem"),
    (0x0010_0206, "Sandy Bridge"),
    (0x0010_0207, "Ivy Bridge"),
    (0x0010_0208, "Haswell"),
    (0x0010_0209, "Broadwell"),
    (0x0010_020A, "Sky Lake"),
    (0x0010_020B, "Palm Cove"),
    (0x0010_020C, "Sunny Cove"),
    (0x0010_0300, "Willamette"),
    (0x0010_0301, "Prescott"),
    (0x0010_0400, "Bonnell"),
    (0x0010_0401, "Saltwell"),
    (0x0010_0402, "Silvermont"),
    (0x0010_0403, "Airmont"),
    (0x0010_0404, "Goldmont"),
    (0x0010_0405, "Goldmont Plus"),
    (0x0010_0500, "Knights Ferry"),
    (0x0010_0501, "Knights Corner"),
    (0x0010_0502, "Knights Landing"),
    (0x0010_0503, "Knights Hill"),
    (0x0010_0504, "Knights Mill"),
    (0x0010_0600, "XScale"),
    // AMD
    (0x0020_0100, "K5"),
    (0x0020_0101, "K6"),
    (0x0020_0102, "K7"),
    (0x0020_0103, "K8"),
    (0x0020_0104, "K10"),
    (0x0020_0105, "Bulldozer"),
    (0x0020_0106, "Piledriver"),
    (0x0020_0107, "Steamroller"),
    (0x0020_0108, "Excavator"),
    (0x0020_0109, "Zen"),
    (0x0020_010A, "Zen 2"),
    (0x0020_010B, "Zen 3"),
    (0x0020_010C, "Zen 4"),
    (0x0020_0200, "Geode"),
    (0x0020_0201, "Bobcat"),
    (0x0020_0202, "Jaguar"),
    (0x0020_0203, "Puma"),
    // ARM
    (0x0030_0100, "ARM7"),
    (0x0030_0101, "ARM9"),
    (0x0030_0102, "ARM11"),
    (0x0030_0205, "Cortex-A5"),
    (0x0030_0207, "Cortex-A7"),
    (0x0030_0208, "Cortex-A8"),
    (0x0030_0209, "Cortex-A9"),
    (0x0030_0212, "Cortex-A12"),
    (0x0030_0215, "Cortex-A15"),
    (0x0030_0217, "Cortex-A17"),
    (0x0030_0332, "Cortex-A32"),
    (0x0030_0335, "Cortex-A35"),
    (0x0030_0353, "Cortex-A53"),
    (0x0030_0354, "Cortex-A55r0"),
    (0x0030_0355, "Cortex-A55"),
    (0x0030_0357, "Cortex-A57"),
    (0x0030_0365, "Cortex-A65"),
    (0x0030_0372, "Cortex-A72"),
    (0x0030_0373, "Cortex-A73"),
    (0x0030_0375, "Cortex-A75"),
    (0x0030_0376, "Cortex-A76"),
    (0x0030_0377, "Cortex-A77"),
    (0x0030_0378, "Cortex-A78"),
    (0x0030_0400, "Neoverse N1"),
    (0x0030_0401, "Neoverse E1"),
    (0x0030_0402, "Neoverse V1"),
    (0x0030_0403, "Neoverse N2"),
    (0x0030_0404, "Neoverse V2"),
    (0x0030_0501, "Cortex-X1"),
    (0x0030_0502, "Cortex-X2"),
    (0x0030_0503, "Cortex-X3"),
    (0x0030_0504, "Cortex-X4"),
    (0x0030_0551, "Cortex-A510"),
    (0x0030_0552, "Cortex-A520"),
    (0x0030_0571, "Cortex-A710"),
    (0x0030_0572, "Cortex-A715"),
    (0x0030_0573, "Cortex-A720"),
    // Qualcomm
    (0x0040_0100, "Scorpion"),
    (0x0040_0101, "Krait"),
    (0x0040_0102, "Kryo"),
    (0x0040_0103, "Falkor"),
    (0x0040_0104, "Saphira"),
    // Nvidia
    (0x0050_0100, "Denver"),
    (0x0050_0101, "Denver 2"),
    (0x0050_0102, "Carmel"),
    // Samsung
    (0x0060_0100, "Exynos M1"),
    (0x0060_0101, "Exynos M2"),
    (0x0060_0102, "Exynos M3"),
    (0x0060_0103, "Exynos M4"),
    (0x0060_0104, "Exynos M5"),
    // Apple
    (0x0070_0100, "Swift"),
    (0x0070_0101, "Cyclone"),
    (0x0070_0102, "Typhoon"),
    (0x0070_0103, "Twister"),
    (0x0070_0104, "Hurricane"),
    (0x0070_0105, "Monsoon"),
    (0x0070_0106, "Mistral"),
    (0x0070_0107, "Vortex"),
    (0x0070_0108, "Tempest"),
    (0x0070_0109, "Lightning"),
    (0x0070_010A, "Thunder"),
    (0x0070_010B, "Firestorm"),
    (0x0070_010C, "Icestorm"),
    (0x0070_010D, "Avalanche"),
    (0x0070_010E, "Blizzard"),
    // Cavium
    (0x0080_0100, "ThunderX"),
    (0x0080_0200, "ThunderX2"),
    // Marvell
    (0x0090_0100, "PJ4"),
    // Broadcom
    (0x00A0_0100, "Brahma B15"),
    (0x00A0_0101, "Brahma B53"),
    // Applied Micro
    (0x00B0_0100, "X-Gene"),
    // Huawei
    (0x00C0_0100, "TaiShan v110"),
    // Hygon
    (0x0100_0100, "Dhyana"),
];

pub fn name(uarch: Uarch) -> &'static str {
    UARCHS
        .iter()
        .find(|(value, _)| *value == uarch.0)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Identify an ARM core design from its MIDR
pub fn from_midr(midr: &Midr) -> Uarch {
    let value = match (midr.implementer, midr.part_num) {
        (0x41, 0x920) | (0x41, 0x926) => 0x0030_0101,
        (0x41, 0xB02) | (0x41, 0xB36) | (0x41, 0xB56) | (0x41, 0xB76) => 0x0030_0102,
        (0x41, 0xC05) => 0x0030_0205,
        (0x41, 0xC07) => 0x0030_0207,
        (0x41, 0xC08) => 0x0030_0208,
        (0x41, 0xC09) => 0x0030_0209,
        (0x41, 0xC0C) | (0x41, 0xC0D) => 0x0030_0212,
        (0x41, 0xC0F) => 0x0030_0215,
        (0x41, 0xC0E) => 0x0030_0217,
        (0x41, 0xD01) => 0x0030_0332,
        (0x41, 0xD04) => 0x0030_0335,
        (0x41, 0xD03) => 0x0030_0353,
        (0x41, 0xD05) if midr.variant == 0 => 0x0030_0354,
        (0x41, 0xD05) => 0x0030_0355,
        (0x41, 0xD07) => 0x0030_0357,
        (0x41, 0xD06) => 0x0030_0365,
        (0x41, 0xD08) => 0x0030_0372,
        (0x41, 0xD09) => 0x0030_0373,
        (0x41, 0xD0A) => 0x0030_0375,
        // Cortex-A76AE shares the Cortex-A76 value
        (0x41, 0xD0B) | (0x41, 0xD0E) => 0x0030_0376,
        (0x41, 0xD0D) => 0x0030_0377,
        (0x41, 0xD41) | (0x41, 0xD4B) => 0x0030_0378,
        (0x41, 0xD0C) => 0x0030_0400,
        (0x41, 0xD4A) => 0x0030_0401,
        (0x41, 0xD40) => 0x0030_0402,
        (0x41, 0xD49) => 0x0030_0403,
        (0x41, 0xD4F) => 0x0030_0404,
        (0x41, 0xD44) => 0x0030_0501,
        (0x41, 0xD48) => 0x0030_0502,
        (0x41, 0xD4E) => 0x0030_0503,
        (0x41, 0xD82) => 0x0030_0504,
        (0x41, 0xD46) => 0x0030_0551,
        (0x41, 0xD80) => 0x0030_0552,
        (0x41, 0xD47) => 0x0030_0571,
        (0x41, 0xD4D) => 0x0030_0572,
        (0x41, 0xD81) => 0x0030_0573,
        (0x42, 0x00F) => 0x00A0_0100,
        (0x42, 0x100) => 0x00A0_0101,
        (0x43, 0x0A0..=0x0A3) => 0x0080_0100,
        (0x43, 0x0AF) => 0x0080_0200,
        (0x48, 0xD01) => 0x00C0_0100,
        (0x4E, 0x000) => 0x0050_0100,
        (0x4E, 0x003) => 0x0050_0101,
        (0x4E, 0x004) => 0x0050_0102,
        (0x50, 0x000) => 0x00B0_0100,
        (0x51, 0x00F) | (0x51, 0x02D) => 0x0040_0100,
        (0x51, 0x04D) | (0x51, 0x06F) => 0x0040_0101,
        (0x51, 0x201) | (0x51, 0x205) | (0x51, 0x211) => 0x0040_0102,
        // Kryo 2xx to 4xx report Qualcomm part numbers for Cortex designs
        (0x51, 0x800) => 0x0030_0373,
        (0x51, 0x801) => 0x0030_0353,
        (0x51, 0x802) => 0x0030_0375,
        (0x51, 0x803) => 0x0030_0354,
        (0x51, 0x804) => 0x0030_0376,
        (0x51, 0x805) => 0x0030_0355,
        (0x51, 0xC00) => 0x0040_0103,
        (0x51, 0xC01) => 0x0040_0104,
        (0x53, 0x001) if midr.variant >= 4 => 0x0060_0101,
        (0x53, 0x001) => 0x0060_0100,
        (0x53, 0x002) => 0x0060_0102,
        (0x53, 0x003) => 0x0060_0103,
        (0x53, 0x004) => 0x0060_0104,
        (0x56, 0x581) | (0x56, 0x584) => 0x0090_0100,
        (0x61, 0x022) | (0x61, 0x024) | (0x61, 0x028) => 0x0070_010C,
        (0x61, 0x023) | (0x61, 0x025) | (0x61, 0x029) => 0x0070_010B,
        (0x61, 0x032) | (0x61, 0x034) | (0x61, 0x038) => 0x0070_010E,
        (0x61, 0x033) | (0x61, 0x035) | (0x61, 0x039) => 0x0070_010D,
        (0x69, part) if part >> 8 == 2 => 0x0010_0600,
        _ => 0,
    };
    Uarch(value)
}

/// Identify an x86 core design from vendor and display family/model
pub fn from_x86(vendor: Vendor, family: u32, model: u32) -> Uarch {
    let value = match vendor {
        Vendor::Intel => intel(family, model),
        Vendor::Amd => amd(family, model),
        Vendor::Hygon if family == 0x18 => 0x0100_0100,
        _ => 0,
    };
    Uarch(value)
}

fn intel(family: u32, model: u32) -> u32 {
    match (family, model) {
        (0x05, 0x01..=0x04 | 0x07 | 0x08) => 0x0010_0100,
        (0x05, 0x09) => 0x0010_0101,
        (0x06, 0x01 | 0x03 | 0x05 | 0x06 | 0x07 | 0x08 | 0x0A | 0x0B) => 0x0010_0200,
        (0x06, 0x09 | 0x0D) => 0x0010_0201,
        (0x06, 0x0E) => 0x0010_0202,
        (0x06, 0x0F | 0x16) => 0x0010_0203,
        (0x06, 0x17 | 0x1D) => 0x0010_0204,
        (0x06, 0x1A | 0x1E | 0x1F | 0x2E | 0x25 | 0x2C | 0x2F) => 0x0010_0205,
        (0x06, 0x2A | 0x2D) => 0x0010_0206,
        (0x06, 0x3A | 0x3E) => 0x0010_0207,
        (0x06, 0x3C | 0x3F | 0x45 | 0x46) => 0x0010_0208,
        (0x06, 0x3D | 0x47 | 0x4F | 0x56) => 0x0010_0209,
        // Skylake and its 14 nm refreshes (Kaby, Coffee, Comet, Cascade, Cooper Lake)
        (0x06, 0x4E | 0x55 | 0x5E | 0x8E | 0x9E | 0xA5 | 0xA6) => 0x0010_020A,
        (0x06, 0x66) => 0x0010_020B,
        (0x06, 0x6A | 0x6C | 0x7D | 0x7E | 0x9D) => 0x0010_020C,
        (0x06, 0x1C | 0x26) => 0x0010_0400,
        (0x06, 0x27 | 0x35 | 0x36) => 0x0010_0401,
        (0x06, 0x37 | 0x4A | 0x4D | 0x5A | 0x5D) => 0x0010_0402,
        (0x06, 0x4C | 0x75) => 0x0010_0403,
        (0x06, 0x5C | 0x5F) => 0x0010_0404,
        (0x06, 0x7A) => 0x0010_0405,
        (0x06, 0x57) => 0x0010_0502,
        (0x06, 0x85) => 0x0010_0504,
        (0x0B, 0x00) => 0x0010_0500,
        (0x0B, 0x01) => 0x0010_0501,
        (0x0F, 0x00..=0x02) => 0x0010_0300,
        (0x0F, 0x03 | 0x04 | 0x06) => 0x0010_0301,
        _ => 0,
    }
}

fn amd(family: u32, model: u32) -> u32 {
    match (family, model) {
        (0x05, 0x00..=0x03) => 0x0020_0100,
        (0x05, 0x06..=0x08 | 0x0D) => 0x0020_0101,
        (0x05, 0x0A) => 0x0020_0200,
        (0x06, _) => 0x0020_0102,
        (0x0F, _) | (0x11, _) => 0x0020_0103,
        (0x10, _) | (0x12, _) => 0x0020_0104,
        (0x14, _) => 0x0020_0201,
        (0x15, 0x00..=0x0F) => 0x0020_0105,
        (0x15, 0x10..=0x2F) => 0x0020_0106,
        (0x15, 0x30..=0x4F) => 0x0020_0107,
        (0x15, _) => 0x0020_0108,
        (0x16, 0x00..=0x2F) => 0x0020_0202,
        (0x16, _) => 0x0020_0203,
        (0x17, 0x00..=0x2F) => 0x0020_0109,
        (0x17, _) => 0x0020_010A,
        (0x19, 0x10..=0x1F | 0x60..=0x7F | 0xA0..=0xAF) => 0x0020_010C,
        (0x19, _) => 0x0020_010B,
        _ => 0,
    }
}
