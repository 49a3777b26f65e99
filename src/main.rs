//! device-info - CPU topology, EGL and Vulkan device report
//!
//! A read-only probe:
//! - CPU topology from sysfs/procfs, one record per processor, core, cluster,
//!   package, microarchitecture and cache
//! - EGL display strings and GL strings from a surfaceless context
//! - Vulkan physical device properties
//!
//! Missing drivers or kernel interfaces shrink the report, they never fail it.
//! Only a failure to deliver records (e.g. a closed stdout) is fatal.

mod config;
mod error;
mod hardware;
mod sink;

use crate::config::{Config, OutputFormat};
use crate::error::{ProbeError, SinkError};
use crate::hardware::cpu::{
    self, ArchId, Cache, CacheLevel, Cluster, Core, CpuStatus, CpuSummary, Package, Processor,
    UarchInfo,
};
use crate::hardware::gpu::{self, EglInformation, VkPhysicalDevice};
use crate::hardware::{describe_cluster, format_size, BoxWriter, DeviceReport};
use crate::sink::{JsonLinesSink, RecordSink};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::io::{self, StdoutLock, Write};

/// device-info - Inspect CPU topology and graphics drivers
#[derive(Parser)]
#[command(name = "device-info")]
#[command(version)]
#[command(about = "Report CPU topology, EGL and Vulkan device information")]
struct Cli {
    /// Output format (default: `output.format` from the config file)
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe everything and print the full report (default)
    Detect,

    /// CPU topology
    Cpu {
        #[command(subcommand)]
        command: Option<CpuCommands>,
    },

    /// EGL display and OpenGL ES information
    Egl,

    /// Vulkan physical devices
    Vulkan,

    /// Show configuration file location and effective settings
    Config {
        /// Write the current settings to the config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum CpuCommands {
    /// Number of entries in every category (default)
    Summary,
    /// Logical processors
    Processors,
    /// Physical cores
    Cores,
    /// Core clusters
    Clusters,
    /// Physical packages (sockets / SoCs)
    Packages,
    /// Distinct microarchitectures
    Uarchs,
    /// Caches of one level
    Caches {
        #[arg(value_enum)]
        level: CacheLevel,
    },
    /// One cluster by its id
    Cluster {
        /// Cluster id within its package
        id: u32,
    },
    /// One logical processor with its online state and clocks
    Processor {
        /// Linux kernel processor number (the N in cpuN)
        linux_id: u32,
    },
    /// One core by its core id
    Core { core_id: u32 },
    /// One package by index
    Package { index: usize },
    /// One microarchitecture by index
    Uarch { index: usize },
    /// One cache by level and index
    Cache {
        #[arg(value_enum)]
        level: CacheLevel,
        index: usize,
    },
}

/// A processor record plus its live status, for json output
#[derive(Serialize)]
struct ProcessorDetails<'a> {
    #[serde(flatten)]
    processor: &'a Processor,
    status: Option<&'a CpuStatus>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };

    let color = use_color(cli.no_color, &config);
    init_logging(&config.logging.filter, color);
    if let Some(err) = config_error {
        tracing::warn!("Using default configuration: {:#}", err);
    }

    if !color {
        colored::control::set_override(false);
    }
    let format = cli.format.unwrap_or(config.output.format);

    match cli.command {
        Some(Commands::Detect) | None => {
            let report = DeviceReport::collect(&config).context("Failed to collect device report")?;
            match format {
                OutputFormat::Text => {
                    println!("{}", report.display());
                    print_probe_notes(&report);
                }
                _ => print_document(format, &report)?,
            }
        }
        Some(Commands::Cpu { command }) => {
            run_cpu_command(command.unwrap_or(CpuCommands::Summary), &config, format)?;
        }
        Some(Commands::Egl) => {
            let info = gpu::egl_information(&config.egl);
            match format {
                OutputFormat::Text => print_egl(info.as_ref()),
                _ => print_document(format, &info)?,
            }
        }
        Some(Commands::Vulkan) => {
            let devices = gpu::vk_physical_devices(&config.vulkan);
            run_category(format, "Vulkan physical devices", render_vk_device, |sink| {
                for device in devices {
                    sink.append(device).map_err(|source| ProbeError::Boundary {
                        record: "physical device",
                        source,
                    })?;
                }
                Ok(())
            })?;
        }
        Some(Commands::Config { init }) => {
            show_config_info(&config, init)?;
        }
    }

    Ok(())
}

fn use_color(no_color: bool, config: &Config) -> bool {
    !no_color && config.output.color
}

/// Logs go to stderr so stdout only carries the report
fn init_logging(default_filter: &str, color: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(color)
        .compact()
        .try_init()
        .ok();
}

fn run_cpu_command(command: CpuCommands, config: &Config, format: OutputFormat) -> Result<()> {
    let source = config.cpu.source();

    match command {
        CpuCommands::Summary => {
            let summary = CpuSummary::collect(&source);
            match format {
                OutputFormat::Text => print_cpu_summary(&summary),
                _ => print_document(format, &summary)?,
            }
        }
        CpuCommands::Processors => {
            run_category(format, "Processors", render_processor, |sink| {
                cpu::get_processors(&source, sink).map(drop)
            })?;
        }
        CpuCommands::Cores => {
            run_category(format, "Cores", render_core, |sink| {
                cpu::get_cores(&source, sink).map(drop)
            })?;
        }
        CpuCommands::Clusters => {
            run_category(format, "Clusters", render_cluster, |sink| {
                cpu::get_clusters(&source, sink).map(drop)
            })?;
        }
        CpuCommands::Packages => {
            run_category(format, "Packages", render_package, |sink| {
                cpu::get_packages(&source, sink).map(drop)
            })?;
        }
        CpuCommands::Uarchs => {
            run_category(format, "Microarchitectures", render_uarch, |sink| {
                cpu::get_uarchs(&source, sink).map(drop)
            })?;
        }
        CpuCommands::Caches { level } => {
            run_category(format, level.name(), render_cache, |sink| {
                cpu::get_caches(&source, level, sink).map(drop)
            })?;
        }
        CpuCommands::Cluster { id } => {
            let cluster = cpu::find_cluster(&source, id);
            print_lookup(format, "Cluster", id, cluster.as_ref(), |cluster| {
                let mut text = render_cluster(cluster);
                if let Some(package) = &cluster.package {
                    text.push_str(&format!("\n  {} {}", "Package:".bright_cyan(), package.name));
                }
                text
            })?;
        }
        CpuCommands::Processor { linux_id } => {
            let processor = cpu::find_processor(&source, linux_id);
            let status = cpu::processor_status(&source, linux_id);
            let details = processor.as_ref().map(|processor| ProcessorDetails {
                processor,
                status: status.as_ref(),
            });
            print_lookup(format, "Processor", linux_id, details.as_ref(), |details| {
                let mut text = render_processor(details.processor);
                if let Some(status) = details.status {
                    text.push_str(&render_status(status));
                }
                text
            })?;
        }
        CpuCommands::Core { core_id } => {
            let core = cpu::find_core(&source, core_id);
            print_lookup(format, "Core", core_id, core.as_ref(), render_core)?;
        }
        CpuCommands::Package { index } => {
            let package = cpu::find_package(&source, index);
            print_lookup(format, "Package", index, package.as_ref(), render_package)?;
        }
        CpuCommands::Uarch { index } => {
            let uarch = cpu::find_uarch(&source, index);
            print_lookup(format, "Microarchitecture", index, uarch.as_ref(), render_uarch)?;
        }
        CpuCommands::Cache { level, index } => {
            let cache = cpu::find_cache(&source, level, index);
            let key = format!("#{}", index);
            print_lookup(format, level.name(), key, cache.as_ref(), render_cache)?;
        }
    }

    Ok(())
}

/// Where category records go: buffered for text/json, streamed for jsonl
enum RecordOutput<'a, T> {
    Collect(Vec<T>),
    Stream(JsonLinesSink<StdoutLock<'a>>),
}

impl<T: Serialize> RecordSink<T> for RecordOutput<'_, T> {
    fn append(&mut self, record: T) -> std::result::Result<(), SinkError> {
        match self {
            RecordOutput::Collect(records) => RecordSink::append(records, record),
            RecordOutput::Stream(sink) => sink.append(record),
        }
    }
}

/// Enumerate one category into the output selected by `format`
fn run_category<T: Serialize>(
    format: OutputFormat,
    title: &str,
    render: impl Fn(&T) -> String,
    fetch: impl FnOnce(&mut RecordOutput<'_, T>) -> std::result::Result<(), ProbeError>,
) -> Result<()> {
    let mut output = match format {
        OutputFormat::Jsonl => RecordOutput::Stream(JsonLinesSink::new(io::stdout().lock())),
        _ => RecordOutput::Collect(Vec::new()),
    };

    if let Err(err) = fetch(&mut output) {
        if err.is_fatal() {
            return Err(err).with_context(|| format!("Failed to list {}", title.to_lowercase()));
        }
        tracing::warn!("{} incomplete: {}", title, err);
    }

    match output {
        RecordOutput::Stream(sink) => {
            tracing::debug!("Streamed {} {} records", sink.written(), title.to_lowercase());
            sink.into_inner().flush().context("Failed to flush stdout")?;
        }
        RecordOutput::Collect(records) if format == OutputFormat::Json => {
            print_document(format, &records)?;
        }
        RecordOutput::Collect(records) => {
            println!(
                "{} {}",
                title.bright_cyan().bold(),
                format!("({})", records.len()).bright_black()
            );
            if records.is_empty() {
                println!("  {}", "None found".bright_yellow());
            }
            for (index, record) in records.iter().enumerate() {
                println!("  {} {}", format!("#{}", index).bright_white(), render(record));
            }
        }
    }

    Ok(())
}

/// Print a single looked-up record, or say it does not exist
fn print_lookup<T: Serialize>(
    format: OutputFormat,
    kind: &str,
    key: impl std::fmt::Display,
    record: Option<&T>,
    render: impl Fn(&T) -> String,
) -> Result<()> {
    match (format, record) {
        (OutputFormat::Text, Some(record)) => println!("{}", render(record)),
        (OutputFormat::Text, None) => println!(
            "{} {} {}",
            kind.bright_red(),
            key.to_string().bright_yellow(),
            "not found".bright_red()
        ),
        _ => print_document(format, &record)?,
    }
    Ok(())
}

/// Print one serializable document as json (pretty) or jsonl (single line)
fn print_document<T: Serialize>(format: OutputFormat, document: &T) -> Result<()> {
    let text = match format {
        OutputFormat::Jsonl => serde_json::to_string(document),
        _ => serde_json::to_string_pretty(document),
    }
    .context("Failed to serialize output")?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text).context("Failed to write to stdout")?;
    Ok(())
}

fn arch_suffix(arch_id: Option<ArchId>) -> String {
    arch_id.map(|id| format!(", {}", id)).unwrap_or_default()
}

fn frequency_suffix(frequency: u64) -> String {
    if frequency > 0 {
        format!(" @ {} MHz", frequency / 1_000_000)
    } else {
        String::new()
    }
}

fn render_processor(processor: &Processor) -> String {
    let mut text = format!("cpu{}", processor.linux_id);
    if let Some(core) = &processor.core {
        text.push_str(&format!(" core {} smt {}", core.core_id, processor.smt_id));
    }
    if let Some(cluster) = &processor.cluster {
        text.push_str(&format!(", cluster {}", cluster.cluster_id));
    }
    if let Some(apic_id) = processor.apic_id {
        text.push_str(&format!(", APIC 0x{:x}", apic_id));
    }
    let caches: Vec<String> = [
        ("L1i", &processor.cache.l1i),
        ("L1d", &processor.cache.l1d),
        ("L2", &processor.cache.l2),
        ("L3", &processor.cache.l3),
        ("L4", &processor.cache.l4),
    ]
    .into_iter()
    .filter_map(|(name, cache)| {
        cache
            .as_ref()
            .map(|c| format!("{} {}", name, format_size(c.size)))
    })
    .collect();
    if !caches.is_empty() {
        text.push_str(&format!(" [{}]", caches.join(", ")));
    }
    text
}

/// Status lines shown under a single processor
fn render_status(status: &CpuStatus) -> String {
    let online = match status.online {
        Some(true) => "yes".bright_green().to_string(),
        Some(false) => "no".bright_red().to_string(),
        None => "unknown".bright_black().to_string(),
    };
    let mhz = |hz: Option<u64>| {
        hz.map(|hz| format!("{} MHz", hz / 1_000_000))
            .unwrap_or_else(|| "?".to_string())
    };
    format!(
        "\n  {} {}\n  {} {} (min {}, max {})\n  {} {} (min {}, max {})",
        "Online:".bright_cyan(),
        online,
        "Clock:".bright_cyan(),
        mhz(status.current_frequency),
        mhz(status.minimum_frequency),
        mhz(status.maximum_frequency),
        "Scaling:".bright_cyan(),
        mhz(status.scaling_current_frequency),
        mhz(status.scaling_minimum_frequency),
        mhz(status.scaling_maximum_frequency)
    )
}

fn render_core(core: &Core) -> String {
    format!(
        "core {}: {} thread(s), {} {}{}{}",
        core.core_id,
        core.processor_count,
        core.vendor,
        core.uarch,
        frequency_suffix(core.frequency),
        arch_suffix(core.arch_id)
    )
}

fn render_cluster(cluster: &Cluster) -> String {
    format!("{}{}", describe_cluster(cluster), arch_suffix(cluster.arch_id))
}

fn render_package(package: &Package) -> String {
    let name = if package.name.is_empty() {
        "Unknown"
    } else {
        package.name.as_str()
    };
    format!(
        "{}: {} processors, {} cores, {} clusters",
        name.bright_white(),
        package.processor_count,
        package.core_count,
        package.cluster_count
    )
}

fn render_uarch(info: &UarchInfo) -> String {
    format!(
        "{}: {} cores, {} processors{}",
        info.uarch.to_string().bright_white(),
        info.core_count,
        info.processor_count,
        arch_suffix(info.arch_id)
    )
}

fn render_cache(cache: &Cache) -> String {
    let last = cache.processor_start + cache.processor_count.saturating_sub(1);
    let mut text = format!(
        "{} {}-way, {} sets, {} B lines, processors {}-{}",
        format_size(cache.size),
        cache.associativity,
        cache.sets,
        cache.line_size,
        cache.processor_start,
        last
    );
    if cache.partitions > 1 {
        text.push_str(&format!(", {} partitions", cache.partitions));
    }
    if cache.is_unified() {
        text.push_str(" (unified)");
    }
    text
}

fn render_vk_device(device: &VkPhysicalDevice) -> String {
    format!(
        "{} [{}] Vulkan {}, {} 0x{:04x}, driver {}",
        device.device_name.bright_white(),
        device.device_type,
        device.api_version(),
        device.vendor_name(),
        device.device_id,
        device.driver_version_string()
    )
}

fn print_cpu_summary(summary: &CpuSummary) {
    let entries = summary.entries();
    let mut output = String::new();
    let mut boxed = BoxWriter::new(&mut output, "CPU TOPOLOGY");
    if entries.is_empty() {
        boxed.line("", "No CPU topology available");
    }
    for (label, count) in entries {
        boxed.line(&format!("{:<20}", label), &count.to_string());
    }
    boxed.finish();
    println!("{}", output);
}

fn print_egl(info: Option<&EglInformation>) {
    let Some(info) = info else {
        println!("{}", "EGL is not available on this device".bright_yellow());
        return;
    };

    println!("{}", "EGL".bright_cyan().bold());
    let field = |label: &str, value: &Option<String>| {
        println!(
            "  {} {}",
            label.bright_cyan(),
            value.as_deref().unwrap_or("Unknown")
        );
    };
    field("Vendor:", &info.egl_vendor);
    field("Version:", &info.egl_version);
    print_list("Client APIs:", info.egl_client_apis.as_deref());
    print_list("Extensions:", info.egl_extensions.as_deref());

    match &info.gl {
        Some(gl) => {
            println!("\n{}", "OpenGL ES".bright_cyan().bold());
            field("Vendor:", &gl.gl_vendor);
            field("Renderer:", &gl.gl_renderer);
            field("Version:", &gl.gl_version);
            print_list("Extensions:", gl.gl_extensions.as_deref());
        }
        None => println!(
            "\n{}",
            "OpenGL ES information unavailable (no context)".bright_yellow()
        ),
    }
}

fn print_list(label: &str, items: Option<&[String]>) {
    match items {
        Some(items) => {
            println!("  {} {}", label.bright_cyan(), items.len());
            for item in items {
                println!("    {}", item);
            }
        }
        None => println!("  {} {}", label.bright_cyan(), "Unknown"),
    }
}

/// Point out probes that came back empty
fn print_probe_notes(report: &DeviceReport) {
    if report.cpu.summary == CpuSummary::default() {
        println!(
            "{}",
            "Note: CPU topology is unavailable (no sysfs CPU directory)".bright_yellow()
        );
    }
    if report.egl.is_none() {
        println!(
            "{}",
            "Note: EGL could not be loaded or initialized; run with RUST_LOG=info for details"
                .bright_black()
        );
    }
}

fn show_config_info(config: &Config, init: bool) -> Result<()> {
    println!("{}", "device-info Configuration\n".bright_cyan().bold());

    match config::get_config_path() {
        Ok(path) => {
            println!("{} {}", "Config file:".bright_yellow(), path.bright_white());
            if std::path::Path::new(&path).exists() {
                println!("  {} {}", "Status:".bright_cyan(), "Exists".bright_green());
            } else {
                println!(
                    "  {} {}",
                    "Status:".bright_cyan(),
                    "Not created yet (using defaults)".bright_yellow()
                );
            }
        }
        Err(e) => {
            println!(
                "{} Could not determine config path: {}",
                "Error:".bright_red(),
                e
            );
        }
    }
    println!(
        "  {} {}",
        "Override:".bright_cyan(),
        format!("set {} to use another file", config::CONFIG_PATH_ENV).bright_black()
    );

    if init {
        let (_, path, created) = Config::init()?;
        if created {
            println!(
                "  {} {}",
                "Created:".bright_green(),
                path.display().to_string().bright_white()
            );
        } else {
            println!("  {} {}", "Note:".bright_yellow(), "Config file already exists");
        }
    }

    println!("\n{}", "Effective settings:".bright_white().bold());
    let toml = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
    for line in toml.lines() {
        println!("  {}", line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_follows_flag_and_config() {
        let mut config = Config::default();
        assert!(use_color(false, &config));
        assert!(!use_color(true, &config));

        config.output.color = false;
        assert!(!use_color(false, &config));
    }

    #[test]
    fn test_processor_details_flatten_status() {
        let processor = Processor {
            smt_id: 0,
            core: None,
            cluster: None,
            package: None,
            linux_id: 4,
            apic_id: None,
            cache: Default::default(),
        };
        let status = CpuStatus {
            online: Some(true),
            maximum_frequency: Some(2_841_600_000),
            ..Default::default()
        };
        let details = ProcessorDetails {
            processor: &processor,
            status: Some(&status),
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["linux_id"], 4);
        assert_eq!(json["status"]["online"], true);
        assert_eq!(json["status"]["maximum_frequency"], 2_841_600_000u64);
    }

    #[test]
    fn test_render_status_reports_missing_clocks() {
        colored::control::set_override(false);
        let status = CpuStatus {
            online: Some(false),
            scaling_current_frequency: Some(1_209_600_000),
            ..Default::default()
        };

        let text = render_status(&status);
        assert!(text.contains("Online: no"));
        assert!(text.contains("Clock: ? (min ?, max ?)"));
        assert!(text.contains("Scaling: 1209 MHz"));
    }
}
