//! Device report aggregator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::cpu::{
    self, Cache, CacheLevel, Cluster, Core, CpuSource, CpuSummary, Package, Processor, UarchInfo,
};
use super::gpu::{self, EglInformation, VkPhysicalDevice};
use crate::config::Config;
use crate::error::ProbeError;

/// Deduplicated caches, one list per level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheReport {
    pub l1i: Vec<Cache>,
    pub l1d: Vec<Cache>,
    pub l2: Vec<Cache>,
    pub l3: Vec<Cache>,
    pub l4: Vec<Cache>,
}

impl CacheReport {
    pub fn level(&self, level: CacheLevel) -> &[Cache] {
        match level {
            CacheLevel::L1i => &self.l1i,
            CacheLevel::L1d => &self.l1d,
            CacheLevel::L2 => &self.l2,
            CacheLevel::L3 => &self.l3,
            CacheLevel::L4 => &self.l4,
        }
    }
}

/// Every CPU topology category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuReport {
    pub summary: CpuSummary,
    pub packages: Vec<Package>,
    pub clusters: Vec<Cluster>,
    pub cores: Vec<Core>,
    pub processors: Vec<Processor>,
    pub uarchs: Vec<UarchInfo>,
    pub caches: CacheReport,
}

impl CpuReport {
    pub fn collect(source: &CpuSource) -> Result<Self, ProbeError> {
        let mut report = CpuReport {
            summary: CpuSummary::collect(source),
            ..Default::default()
        };
        cpu::get_packages(source, &mut report.packages)?;
        cpu::get_clusters(source, &mut report.clusters)?;
        cpu::get_cores(source, &mut report.cores)?;
        cpu::get_processors(source, &mut report.processors)?;
        cpu::get_uarchs(source, &mut report.uarchs)?;
        cpu::get_l1i_caches(source, &mut report.caches.l1i)?;
        cpu::get_l1d_caches(source, &mut report.caches.l1d)?;
        cpu::get_l2_caches(source, &mut report.caches.l2)?;
        cpu::get_l3_caches(source, &mut report.caches.l3)?;
        cpu::get_l4_caches(source, &mut report.caches.l4)?;
        Ok(report)
    }
}

/// Complete device information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    /// When the report was collected (UTC)
    pub collected_at: DateTime<Utc>,
    /// Operating system
    pub os: String,
    /// OS version
    pub os_version: Option<String>,
    pub cpu: CpuReport,
    /// Absent when EGL is missing or the display could not be initialized
    pub egl: Option<EglInformation>,
    pub vulkan: Vec<VkPhysicalDevice>,
}

impl DeviceReport {
    /// Probe everything the configuration points at
    pub fn collect(config: &Config) -> Result<Self, ProbeError> {
        let cpu = CpuReport::collect(&config.cpu.source())?;
        let egl = gpu::egl_information(&config.egl);
        let vulkan = gpu::vk_physical_devices(&config.vulkan);

        Ok(DeviceReport {
            collected_at: Utc::now(),
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version(),
            cpu,
            egl,
            vulkan,
        })
    }

    /// Display the report as a boxed text block
    pub fn display(&self) -> String {
        let mut output = String::new();
        let mut boxed = BoxWriter::new(&mut output, "DEVICE INFORMATION");

        // CPU Section
        let package_name = self
            .cpu
            .packages
            .first()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown");
        boxed.line("CPU: ", package_name);
        let counts: Vec<String> = self
            .cpu
            .summary
            .entries()
            .iter()
            .map(|(label, count)| format!("{} {}", count, label.to_lowercase()))
            .collect();
        for chunk in counts.chunks(3) {
            boxed.line("      ", &chunk.join(", "));
        }
        for cluster in &self.cpu.clusters {
            boxed.line("      ", &describe_cluster(cluster));
        }
        for level in CacheLevel::ALL {
            if let Some(text) = describe_caches(level, self.cpu.caches.level(level)) {
                boxed.line("      ", &text);
            }
        }

        boxed.separator();

        // EGL Section
        match &self.egl {
            Some(egl) => {
                let version = egl.egl_version.as_deref().unwrap_or("?");
                let vendor = egl.egl_vendor.as_deref().unwrap_or("Unknown vendor");
                boxed.line("EGL: ", &format!("{} ({})", version, vendor));
                if let Some(apis) = &egl.egl_client_apis {
                    boxed.line("      ", &format!("Client APIs: {}", apis.join(", ")));
                }
                if let Some(extensions) = &egl.egl_extensions {
                    boxed.line("      ", &format!("{} extensions", extensions.len()));
                }
                if let Some(gl) = &egl.gl {
                    boxed.line("GL:  ", gl.gl_renderer.as_deref().unwrap_or("Unknown renderer"));
                    if let Some(version) = &gl.gl_version {
                        boxed.line("      ", version);
                    }
                    if let Some(extensions) = &gl.gl_extensions {
                        boxed.line("      ", &format!("{} extensions", extensions.len()));
                    }
                }
            }
            None => boxed.line("EGL: ", "Not available"),
        }

        boxed.separator();

        // Vulkan Section
        if self.vulkan.is_empty() {
            boxed.line("VK:  ", "No physical devices");
        }
        for (index, device) in self.vulkan.iter().enumerate() {
            let label = if index == 0 { "VK:  " } else { "      " };
            boxed.line(label, &format!("{} ({})", device.device_name, device.device_type));
            boxed.line(
                "      ",
                &format!(
                    "Vulkan {} | {} | driver {}",
                    device.api_version(),
                    device.vendor_name(),
                    device.driver_version_string()
                ),
            );
        }

        boxed.separator();

        // OS Section
        let os_str = match &self.os_version {
            Some(ver) => format!("{} {}", self.os, ver),
            None => self.os.clone(),
        };
        boxed.line("OS:  ", &os_str);
        boxed.line(
            "      ",
            &format!("Collected {}", self.collected_at.format("%Y-%m-%d %H:%M:%S UTC")),
        );

        boxed.finish();
        output
    }
}

/// One line summary of a cluster, e.g. `Cluster 1: 4 x Cortex-A76 @ 2842 MHz`
pub fn describe_cluster(cluster: &Cluster) -> String {
    let mut text = format!(
        "Cluster {}: {} x {} {}",
        cluster.cluster_id, cluster.core_count, cluster.vendor, cluster.uarch
    );
    if cluster.frequency > 0 {
        text.push_str(&format!(" @ {} MHz", cluster.frequency / 1_000_000));
    }
    text
}

/// Summary of one cache level, e.g. `L2 cache: 2 x 512 KB`; `None` if empty
pub fn describe_caches(level: CacheLevel, caches: &[Cache]) -> Option<String> {
    let first = caches.first()?;
    Some(format!(
        "{}: {} x {}",
        level.name(),
        caches.len(),
        format_size(first.size)
    ))
}

pub fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{} MB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

/// Inner width of the text report box
pub const BOX_WIDTH: usize = 62;

/// Writes the `╔═╗` framed layout used by the text report
pub struct BoxWriter<'a> {
    output: &'a mut String,
}

impl<'a> BoxWriter<'a> {
    pub fn new(output: &'a mut String, title: &str) -> Self {
        output.push_str(&format!("╔{}╗\n", "═".repeat(BOX_WIDTH)));
        output.push_str(&format!("║{:^width$}║\n", title, width = BOX_WIDTH));
        output.push_str(&format!("╠{}╣\n", "═".repeat(BOX_WIDTH)));
        Self { output }
    }

    /// A labelled line, truncated to the box width
    pub fn line(&mut self, label: &str, content: &str) {
        let content_width = BOX_WIDTH.saturating_sub(2 + label.chars().count());
        let content: String = content.chars().take(content_width).collect();
        let padding = content_width.saturating_sub(content.chars().count());
        self.output.push_str(&format!(
            "║ {}{}{} ║\n",
            label,
            content,
            " ".repeat(padding)
        ));
    }

    pub fn separator(&mut self) {
        self.output
            .push_str(&format!("╠{}╣\n", "═".repeat(BOX_WIDTH)));
    }

    pub fn finish(self) {
        self.output
            .push_str(&format!("╚{}╝", "═".repeat(BOX_WIDTH)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::cpu::{Uarch, Vendor};
    use crate::hardware::gpu::VkPhysicalDeviceType;

    fn sample_report() -> DeviceReport {
        DeviceReport {
            collected_at: Utc::now(),
            os: "Linux".to_string(),
            os_version: Some("6.8".to_string()),
            cpu: CpuReport {
                summary: CpuSummary {
                    processors: 8,
                    cores: 8,
                    clusters: 1,
                    packages: 1,
                    ..Default::default()
                },
                packages: vec![Package {
                    name: "Qualcomm Technologies, Inc SM8250".to_string(),
                    processor_start: 0,
                    processor_count: 8,
                    core_start: 0,
                    core_count: 8,
                    cluster_start: 0,
                    cluster_count: 1,
                }],
                clusters: vec![Cluster {
                    processor_start: 0,
                    processor_count: 8,
                    core_start: 0,
                    core_count: 8,
                    cluster_id: 0,
                    package: None,
                    vendor: Vendor::Arm,
                    uarch: Uarch(0x0030_0355),
                    arch_id: None,
                    frequency: 1_800_000_000,
                }],
                ..Default::default()
            },
            egl: None,
            vulkan: vec![VkPhysicalDevice {
                api_version: (1 << 22) | (1 << 12) | 128,
                driver_version: 0,
                vendor_id: 0x5143,
                device_id: 0x0650,
                device_type: VkPhysicalDeviceType::IntegratedGpu,
                device_name: "Adreno (TM) 650".to_string(),
            }],
        }
    }

    #[test]
    fn test_display_lines_have_equal_width() {
        let text = sample_report().display();
        let widths: Vec<usize> = text.lines().map(|line| line.chars().count()).collect();

        assert!(widths.iter().all(|w| *w == BOX_WIDTH + 2));
        assert!(text.contains("Qualcomm Technologies, Inc SM8250"));
        assert!(text.contains("Cluster 0: 8 x ARM Cortex-A55 @ 1800 MHz"));
        assert!(text.contains("EGL: Not available"));
        assert!(text.contains("Vulkan 1.1.128 | Qualcomm"));
    }

    #[test]
    fn test_long_content_is_truncated() {
        let mut output = String::new();
        let mut boxed = BoxWriter::new(&mut output, "T");
        boxed.line("GPU: ", &"x".repeat(200));
        boxed.finish();

        assert!(output.lines().all(|line| line.chars().count() == BOX_WIDTH + 2));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(32 * 1024), "32 KB");
        assert_eq!(format_size(8 * 1024 * 1024), "8 MB");
        assert_eq!(format_size(1536 * 1024), "1536 KB");
        assert_eq!(format_size(512), "512 B");
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["cpu"]["clusters"][0]["vendor"], "arm");
        assert_eq!(json["vulkan"][0]["device_type"], "integrated_gpu");
        assert!(json["egl"].is_null());
    }
}
