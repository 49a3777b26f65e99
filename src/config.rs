//! Configuration management for device-info
//!
//! Config file location:
//! - Linux: ~/.config/device-info/config.toml
//! - macOS: ~/Library/Application Support/io.github.device-info.device-info/config.toml
//! - Windows: %APPDATA%/device-info/device-info/config/config.toml
//!
//! You can override the config location by setting `DEVICE_INFO_CONFIG_PATH`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hardware::cpu::CpuSource;
use crate::hardware::gpu::VkApiVersion;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "DEVICE_INFO_CONFIG_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Log filter used when RUST_LOG is unset
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where CPU topology is read from
    #[serde(default)]
    pub cpu: CpuConfig,

    /// EGL/GL probing
    #[serde(default)]
    pub egl: EglConfig,

    /// Vulkan instance parameters
    #[serde(default)]
    pub vulkan: VulkanConfig,

    /// Report output defaults
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file or fall back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, defaults if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, toml)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let proj_dirs = ProjectDirs::from("io.github", "device-info", "device-info")
            .context("Could not determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Write the current configuration if no file exists yet
    pub fn init() -> Result<(Self, PathBuf, bool)> {
        let config_path = Self::config_path()?;
        let config = Self::load_from(&config_path)?;

        let created = !config_path.exists();
        if created {
            config.save_to(&config_path)?;
        }

        Ok((config, config_path, created))
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives, e.g. `info` or `device_info=debug`
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "warn".to_string()
}

/// CPU topology source roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuConfig {
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    #[serde(default = "default_procfs_root")]
    pub procfs_root: PathBuf,
}

impl CpuConfig {
    pub fn source(&self) -> CpuSource {
        CpuSource::new(&self.sysfs_root, &self.procfs_root)
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            procfs_root: default_procfs_root(),
        }
    }
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys")
}

fn default_procfs_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// EGL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EglConfig {
    /// Create a context and read GL strings after the EGL ones
    #[serde(default = "default_true")]
    pub query_gl: bool,

    /// OpenGL ES major version requested for the context (1, 2 or 3)
    #[serde(default = "default_gl_client_version")]
    pub gl_client_version: i32,
}

impl Default for EglConfig {
    fn default() -> Self {
        Self {
            query_gl: true,
            gl_client_version: default_gl_client_version(),
        }
    }
}

fn default_gl_client_version() -> i32 {
    2
}

/// Vulkan instance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulkanConfig {
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// `major.minor.patch`
    #[serde(default = "default_application_version")]
    pub application_version: String,

    /// Instance extensions that must be present, e.g. `VK_KHR_surface`
    #[serde(default)]
    pub required_extensions: Vec<String>,
}

impl VulkanConfig {
    /// Application version packed the Vulkan way, 0.0.0 if unparsable
    pub fn packed_application_version(&self) -> u32 {
        let mut parts = self
            .application_version
            .trim()
            .split('.')
            .map(|part| part.parse::<u32>().ok());
        let mut next = || parts.next().flatten().unwrap_or(0);
        VkApiVersion {
            variant: 0,
            major: next(),
            minor: next(),
            patch: next(),
        }
        .packed()
    }
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            application_version: default_application_version(),
            required_extensions: Vec::new(),
        }
    }
}

fn default_application_name() -> String {
    "device-info".to_string()
}

fn default_application_version() -> String {
    "1.0.0".to_string()
}

/// Report output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Boxed, human readable text
    Text,
    /// One pretty-printed JSON document
    Json,
    /// One JSON record per line
    Jsonl,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Colorize text output
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color: true,
        }
    }
}

fn default_format() -> OutputFormat {
    OutputFormat::Text
}

/// Get configuration file path for display purposes
pub fn get_config_path() -> Result<String> {
    let path = Config::config_path()?;
    Ok(path.display().to_string())
}
