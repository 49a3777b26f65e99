//! Hardware probing module
//!
//! CPU topology comes from Linux sysfs/procfs, graphics information from the
//! EGL and Vulkan libraries loaded at runtime.

pub mod cpu;
pub mod gpu;
mod system;

pub use system::{describe_cluster, format_size, BoxWriter, DeviceReport};
