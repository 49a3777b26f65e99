//! Display and graphics device records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Split a space separated EGL/GL list, dropping empty entries
pub(crate) fn split_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

/// OpenGL ES strings read through a current EGL context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlInformation {
    pub gl_vendor: Option<String>,
    pub gl_renderer: Option<String>,
    pub gl_version: Option<String>,
    pub gl_extensions: Option<Vec<String>>,
}

/// EGL display properties, plus GL information when a context could be made current
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EglInformation {
    pub egl_vendor: Option<String>,
    pub egl_version: Option<String>,
    pub egl_extensions: Option<Vec<String>>,
    pub egl_client_apis: Option<Vec<String>>,
    pub gl: Option<GlInformation>,
}

/// Packed Vulkan version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkApiVersion {
    pub variant: u32,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VkApiVersion {
    /// Variant in bits 31-29, major 28-22, minor 21-12, patch 11-0
    pub fn from_packed(version: u32) -> Self {
        Self {
            variant: version >> 29,
            major: (version >> 22) & 0x7F,
            minor: (version >> 12) & 0x3FF,
            patch: version & 0xFFF,
        }
    }

    pub fn packed(&self) -> u32 {
        ((self.variant & 0x7) << 29)
            | ((self.major & 0x7F) << 22)
            | ((self.minor & 0x3FF) << 12)
            | (self.patch & 0xFFF)
    }
}

impl fmt::Display for VkApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant != 0 {
            write!(f, "{}.{}.{} (variant {})", self.major, self.minor, self.patch, self.variant)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VkPhysicalDeviceType {
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

impl VkPhysicalDeviceType {
    /// Values outside the core enum are reported as `Other`
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => Self::IntegratedGpu,
            2 => Self::DiscreteGpu,
            3 => Self::VirtualGpu,
            4 => Self::Cpu,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for VkPhysicalDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other => write!(f, "Other"),
            Self::IntegratedGpu => write!(f, "Integrated GPU"),
            Self::DiscreteGpu => write!(f, "Discrete GPU"),
            Self::VirtualGpu => write!(f, "Virtual GPU"),
            Self::Cpu => write!(f, "CPU"),
        }
    }
}

/// Vendor ids registered with Khronos for vendors without a PCI id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VkVendorId {
    Khronos,
    Viv,
    Vsi,
    Kazan,
    Codeplay,
    Mesa,
    Pocl,
    Mobileye,
}

impl VkVendorId {
    const ALL: [VkVendorId; 8] = [
        Self::Khronos,
        Self::Viv,
        Self::Vsi,
        Self::Kazan,
        Self::Codeplay,
        Self::Mesa,
        Self::Pocl,
        Self::Mobileye,
    ];

    pub fn value(self) -> u32 {
        match self {
            Self::Khronos => 0x10000,
            Self::Viv => 0x10001,
            Self::Vsi => 0x10002,
            Self::Kazan => 0x10003,
            Self::Codeplay => 0x10004,
            Self::Mesa => 0x10005,
            Self::Pocl => 0x10006,
            Self::Mobileye => 0x10007,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.value() == value)
    }
}

impl fmt::Display for VkVendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Khronos => write!(f, "Khronos"),
            Self::Viv => write!(f, "Vivante"),
            Self::Vsi => write!(f, "VeriSilicon"),
            Self::Kazan => write!(f, "Kazan"),
            Self::Codeplay => write!(f, "Codeplay"),
            Self::Mesa => write!(f, "Mesa"),
            Self::Pocl => write!(f, "PoCL"),
            Self::Mobileye => write!(f, "Mobileye"),
        }
    }
}

/// GPU vendor by PCI vendor id
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Arm,
    Qualcomm,
    Imagination,
    Apple,
    Samsung,
}

impl GpuVendor {
    pub fn from_pci_id(vendor_id: u32) -> Option<Self> {
        match vendor_id {
            0x10DE => Some(GpuVendor::Nvidia),
            0x1002 | 0x1022 => Some(GpuVendor::Amd),
            0x8086 => Some(GpuVendor::Intel),
            0x13B5 => Some(GpuVendor::Arm),
            0x5143 => Some(GpuVendor::Qualcomm),
            0x1010 => Some(GpuVendor::Imagination),
            0x106B => Some(GpuVendor::Apple),
            0x144D => Some(GpuVendor::Samsung),
            _ => None,
        }
    }
}

impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuVendor::Nvidia => write!(f, "NVIDIA"),
            GpuVendor::Amd => write!(f, "AMD"),
            GpuVendor::Intel => write!(f, "Intel"),
            GpuVendor::Arm => write!(f, "ARM"),
            GpuVendor::Qualcomm => write!(f, "Qualcomm"),
            GpuVendor::Imagination => write!(f, "Imagination Technologies"),
            GpuVendor::Apple => write!(f, "Apple"),
            GpuVendor::Samsung => write!(f, "Samsung"),
        }
    }
}

/// One Vulkan physical device as reported by `vkGetPhysicalDeviceProperties`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkPhysicalDevice {
    /// Packed Vulkan version supported by the device
    pub api_version: u32,
    /// Vendor-specific driver version
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_type: VkPhysicalDeviceType,
    pub device_name: String,
}

impl VkPhysicalDevice {
    pub fn api_version(&self) -> VkApiVersion {
        VkApiVersion::from_packed(self.api_version)
    }

    /// Khronos-registered vendor, absent for PCI vendors
    pub fn registered_vendor(&self) -> Option<VkVendorId> {
        VkVendorId::from_value(self.vendor_id)
    }

    pub fn vendor_name(&self) -> String {
        if let Some(vendor) = GpuVendor::from_pci_id(self.vendor_id) {
            return vendor.to_string();
        }
        match self.registered_vendor() {
            Some(vendor) => vendor.to_string(),
            None => format!("0x{:04x}", self.vendor_id),
        }
    }

    /// Driver version in the vendor's own numbering
    pub fn driver_version_string(&self) -> String {
        let v = self.driver_version;
        match GpuVendor::from_pci_id(self.vendor_id) {
            // 10.8.8.6 bit split
            Some(GpuVendor::Nvidia) => format!(
                "{}.{}.{}.{}",
                v >> 22,
                (v >> 14) & 0xFF,
                (v >> 6) & 0xFF,
                v & 0x3F
            ),
            // 18.14 bit split on Windows drivers, standard packing elsewhere
            Some(GpuVendor::Intel) if cfg!(windows) => format!("{}.{}", v >> 14, v & 0x3FFF),
            _ => VkApiVersion::from_packed(v).to_string(),
        }
    }
}
