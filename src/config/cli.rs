//! CLI argument parsing using clap

use super::{
    parse_duration_secs, parse_size, Config, ExecutionPath, KernelKind, MemTier, OutputFormat,
    TimingModeConfig,
};
use crate::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution path
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PathArg {
    /// CPU-only: kernels run on the worker thread, one slot per worker
    Cpu,
    /// Hardware offload: kernels run on accelerator queues
    Offload,
}

/// Work kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KernelArg {
    /// CRC-64 digest over the payload
    Checksum,
    /// Byte-for-byte copy of the payload
    Copy,
}

/// Memory tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    /// Main memory, cold
    Dram,
    /// Warmed into the last-level cache
    Cache,
}

/// Timed-region policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimingArg {
    /// Setup plus execution
    Full,
    /// Execution only
    Partial,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

/// accelpulse - Accelerator offload throughput benchmark
#[derive(Parser, Debug)]
#[command(name = "accelpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (CLI flags override its values)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Workload Options ===
    /// Execution path [default: offload]
    #[arg(short = 'p', long, value_enum)]
    pub path: Option<PathArg>,

    /// Work kernel each operation executes [default: checksum]
    #[arg(short = 'k', long, value_enum)]
    pub kernel: Option<KernelArg>,

    /// Input payload size (e.g., 4k, 64k, 1M) [default: 64k]
    #[arg(short = 's', long)]
    pub payload_size: Option<String>,

    /// In-flight operations per accelerator (offload path only) [default: 32]
    #[arg(short = 'q', long)]
    pub queue_depth: Option<usize>,

    /// Memory tier for input payloads [default: dram]
    #[arg(long, value_enum)]
    pub in_mem: Option<TierArg>,

    /// Memory tier for output buffers [default: dram]
    #[arg(long, value_enum)]
    pub out_mem: Option<TierArg>,

    /// Timed-region policy passed to each operation [default: full]
    #[arg(long, value_enum)]
    pub timing: Option<TimingArg>,

    /// NUMA node whose accelerators this run targets
    #[arg(long)]
    pub node: Option<u32>,

    /// Seed for payload generation [default: 24301]
    #[arg(long)]
    pub seed: Option<u64>,

    // === Runtime Options ===
    /// Number of worker threads [default: 1]
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Fixed measured-iteration count
    #[arg(short = 'i', long)]
    pub iterations: Option<u64>,

    /// Adaptive mode: iterate until this much measured time (e.g., 2s, 500ms)
    #[arg(long)]
    pub min_time: Option<String>,

    // === Topology Overrides ===
    /// Override discovered accelerator device count
    #[arg(long)]
    pub devices: Option<u32>,

    /// Override discovered physical cores per cluster
    #[arg(long)]
    pub cores_per_cluster: Option<u32>,

    /// Override discovered physical cores per socket
    #[arg(long)]
    pub cores_per_socket: Option<u32>,

    // === Output Options ===
    /// Output format [default: text]
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<FormatArg>,

    /// Include per-worker breakdowns in the report
    #[arg(long)]
    pub per_worker: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the effective configuration: config file first, CLI on top
    ///
    /// Flags the user did not pass leave the file's values (or the built-in
    /// defaults) untouched.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };

        if let Some(path) = self.path {
            config.workload.path = match path {
                PathArg::Cpu => ExecutionPath::Cpu,
                PathArg::Offload => ExecutionPath::Offload,
            };
        }
        if let Some(kernel) = self.kernel {
            config.workload.kernel = match kernel {
                KernelArg::Checksum => KernelKind::Checksum,
                KernelArg::Copy => KernelKind::Copy,
            };
        }
        if let Some(size) = &self.payload_size {
            config.workload.payload_size = parse_size(size)? as usize;
        }
        if let Some(depth) = self.queue_depth {
            config.workload.queue_depth = depth;
        }
        if let Some(tier) = self.in_mem {
            config.workload.input_tier = convert_tier(tier);
        }
        if let Some(tier) = self.out_mem {
            config.workload.output_tier = convert_tier(tier);
        }
        if let Some(timing) = self.timing {
            config.workload.timing = match timing {
                TimingArg::Full => TimingModeConfig::Full,
                TimingArg::Partial => TimingModeConfig::Partial,
            };
        }
        if self.node.is_some() {
            config.workload.node = self.node;
        }
        if let Some(seed) = self.seed {
            config.workload.seed = seed;
        }

        if let Some(threads) = self.threads {
            config.runtime.threads = threads;
        }
        if self.iterations.is_some() {
            config.runtime.iterations = self.iterations;
        }
        if let Some(min_time) = &self.min_time {
            config.runtime.min_time_secs = Some(parse_duration_secs(min_time)?);
        }
        if self.devices.is_some() {
            config.runtime.devices = self.devices;
        }
        if self.cores_per_cluster.is_some() {
            config.runtime.cores_per_cluster = self.cores_per_cluster;
        }
        if self.cores_per_socket.is_some() {
            config.runtime.cores_per_socket = self.cores_per_socket;
        }

        if let Some(format) = self.output {
            config.output.format = match format {
                FormatArg::Text => OutputFormat::Text,
                FormatArg::Json => OutputFormat::Json,
            };
        }
        if self.per_worker {
            config.output.per_worker = true;
        }

        Ok(config)
    }
}

fn convert_tier(arg: TierArg) -> MemTier {
    match arg {
        TierArg::Dram => MemTier::Dram,
        TierArg::Cache => MemTier::Cache,
    }
}
