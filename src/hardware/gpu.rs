//! Graphics API probing
//!
//! Reports what the installed drivers expose through:
//! - EGL: display strings, plus GL strings from a surfaceless context
//! - Vulkan: properties of every physical device
//!
//! Both libraries are loaded at runtime. A missing library means the API is
//! unsupported, never a hard error.

mod egl;
mod models;
mod vulkan;

pub use egl::egl_information;
pub use models::{
    EglInformation, VkApiVersion, VkPhysicalDevice, VkPhysicalDeviceType,
};
pub use vulkan::vk_physical_devices;
