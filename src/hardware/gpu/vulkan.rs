//! Vulkan physical device enumeration
//!
//! The loader is opened at runtime with `ash::Entry::load`, so a machine
//! without a Vulkan driver simply reports no devices.

use ash::vk;
use std::ffi::CString;
use tracing::{debug, error, info};

use super::models::{VkPhysicalDevice, VkPhysicalDeviceType};
use crate::config::VulkanConfig;
use crate::error::ProbeError;

/// The instance-level calls the probe needs
pub trait InstanceApi {
    type PhysicalDevice: Copy;

    fn enumerate_physical_devices(&self) -> Result<Vec<Self::PhysicalDevice>, ProbeError>;
    fn properties(&self, device: Self::PhysicalDevice) -> VkPhysicalDevice;
    fn destroy(&mut self);
}

/// A Vulkan instance created through the system loader
pub struct AshInstance {
    // Keeps the loader library mapped for as long as the instance lives
    _entry: ash::Entry,
    instance: ash::Instance,
}

impl AshInstance {
    pub fn create(config: &VulkanConfig) -> Result<Self, ProbeError> {
        // SAFETY: loading the Vulkan loader runs its initializers; it is a system library
        let entry = unsafe { ash::Entry::load() }
            .map_err(|err| ProbeError::Unsupported(format!("Vulkan ({})", err)))?;

        // SAFETY: no layer name, the entry is valid
        let available: Vec<String> = unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(|err| ProbeError::acquisition("Vulkan instance extensions", err))?
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let missing = missing_extensions(&available, &config.required_extensions);
        if !missing.is_empty() {
            return Err(ProbeError::acquisition(
                "Vulkan instance",
                format!("missing instance extensions: {}", missing.join(", ")),
            ));
        }

        let extensions = config
            .required_extensions
            .iter()
            .map(|name| CString::new(name.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ProbeError::acquisition("Vulkan instance", err))?;
        let extension_ptrs: Vec<*const std::ffi::c_char> =
            extensions.iter().map(|name| name.as_ptr()).collect();

        let application_name = CString::new(config.application_name.as_str())
            .map_err(|err| ProbeError::acquisition("Vulkan instance", err))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(config.packed_application_version())
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs);

        // SAFETY: create_info and everything it points to outlive the call
        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|err| ProbeError::acquisition("Vulkan instance", err))?;
        debug!("Vulkan instance created");

        Ok(Self {
            _entry: entry,
            instance,
        })
    }
}

impl InstanceApi for AshInstance {
    type PhysicalDevice = vk::PhysicalDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, ProbeError> {
        // SAFETY: the instance is alive until destroy()
        unsafe { self.instance.enumerate_physical_devices() }
            .map_err(|err| ProbeError::acquisition("Vulkan physical devices", err))
    }

    fn properties(&self, device: vk::PhysicalDevice) -> VkPhysicalDevice {
        // SAFETY: device was enumerated from this instance
        let properties = unsafe { self.instance.get_physical_device_properties(device) };
        VkPhysicalDevice {
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            vendor_id: properties.vendor_id,
            device_id: properties.device_id,
            device_type: VkPhysicalDeviceType::from_raw(properties.device_type.as_raw()),
            device_name: properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn destroy(&mut self) {
        // SAFETY: called once by VkSession; no child objects were created
        unsafe { self.instance.destroy_instance(None) };
        debug!("Vulkan instance destroyed");
    }
}

/// Required extensions the loader does not offer, in request order
pub fn missing_extensions(available: &[String], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !available.contains(*name))
        .cloned()
        .collect()
}

/// Owns an instance and destroys it exactly once
pub struct VkSession<I: InstanceApi> {
    instance: Option<I>,
}

impl<I: InstanceApi> VkSession<I> {
    pub fn new(instance: I) -> Self {
        Self {
            instance: Some(instance),
        }
    }

    /// Properties of every physical device, empty on failure
    pub fn physical_devices(&self) -> Vec<VkPhysicalDevice> {
        let Some(instance) = self.instance.as_ref() else {
            return Vec::new();
        };

        match instance.enumerate_physical_devices() {
            Ok(devices) if devices.is_empty() => {
                info!("No Vulkan physical devices found");
                Vec::new()
            }
            Ok(devices) => devices
                .into_iter()
                .map(|device| instance.properties(device))
                .collect(),
            Err(err) => {
                error!("Failed to enumerate Vulkan physical devices: {}", err);
                Vec::new()
            }
        }
    }

    /// Destroy the instance; later calls do nothing
    pub fn release(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            instance.destroy();
        }
    }
}

impl<I: InstanceApi> Drop for VkSession<I> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Create an instance and list its physical devices
pub fn vk_physical_devices(config: &VulkanConfig) -> Vec<VkPhysicalDevice> {
    match AshInstance::create(config) {
        Ok(instance) => VkSession::new(instance).physical_devices(),
        Err(ProbeError::Unsupported(what)) => {
            info!("{} is not available", what);
            Vec::new()
        }
        Err(err) => {
            error!("Failed to create Vulkan instance: {}", err);
            Vec::new()
        }
    }
}
