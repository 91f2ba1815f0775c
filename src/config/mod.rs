//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod validator;

use anyhow::Context;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workload: WorkloadConfig::default(),
            runtime: RuntimeConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Which execution path the operations take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPath {
    /// Run kernels on the worker's CPU; one slot per worker
    Cpu,
    /// Submit kernels to accelerator queues; queue_depth slots per device
    Offload,
}

/// Work kernel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Checksum,
    Copy,
}

/// Memory tier a payload buffer is placed in before measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemTier {
    Dram,
    Cache,
}

/// What the timed region of one operation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingModeConfig {
    Full,
    Partial,
}

/// Workload definition: what each operation slot does
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Execution path (cpu or offload)
    pub path: ExecutionPath,

    /// Work kernel each slot executes
    pub kernel: KernelKind,

    /// Input payload size in bytes
    pub payload_size: usize,

    /// In-flight slots per accelerator (offload path; the CPU path always
    /// uses a depth of 1)
    pub queue_depth: usize,

    /// Memory tier for input payloads
    pub input_tier: MemTier,

    /// Memory tier for output buffers
    pub output_tier: MemTier,

    /// Timed-region policy passed to each slot
    pub timing: TimingModeConfig,

    /// NUMA node whose accelerators this run targets
    pub node: Option<u32>,

    /// Seed for payload generation
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            path: ExecutionPath::Offload,
            kernel: KernelKind::Checksum,
            payload_size: 64 * 1024,
            queue_depth: 32,
            input_tier: MemTier::Dram,
            output_tier: MemTier::Dram,
            timing: TimingModeConfig::Full,
            node: None,
            seed: 0x5EED,
        }
    }
}

/// Runtime settings: concurrency, iteration policy, topology overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of worker threads
    pub threads: usize,

    /// Fixed measured-iteration count; mutually exclusive with `min_time_secs`
    pub iterations: Option<u64>,

    /// Adaptive mode: iterate until this many seconds of measured time
    pub min_time_secs: Option<f64>,

    /// Override discovered accelerator device count (also sizes the emulated
    /// device pool)
    pub devices: Option<u32>,

    /// Override discovered physical cores per cluster
    pub cores_per_cluster: Option<u32>,

    /// Override discovered physical cores per socket
    pub cores_per_socket: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            iterations: None,
            min_time_secs: None,
            devices: None,
            cores_per_cluster: None,
            cores_per_socket: None,
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// Reporting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Include per-worker breakdowns in the report
    pub per_worker: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            per_worker: false,
        }
    }
}

/// Parse a size string (e.g., "1G", "100M", "4k") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with('k') || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches('k'), 1024u64)
    } else if s.ends_with('m') || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches('m'), 1024 * 1024)
    } else if s.ends_with('g') || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches('g'), 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a duration string (e.g., "500ms", "2s", "1m") to seconds
pub fn parse_duration_secs(s: &str) -> Result<f64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 0.001)
    } else if s.ends_with('s') {
        (s.trim_end_matches('s'), 1.0)
    } else if s.ends_with('m') {
        (s.trim_end_matches('m'), 60.0)
    } else {
        (s.as_str(), 1.0)
    };

    let num: f64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    Ok(num * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("512").unwrap(), 512);
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("4kb").unwrap(), 4096);
        assert_eq!(parse_size("2m").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("abc").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(parse_size("99999999999999g").is_err());
        assert!(parse_size("18446744073709551615k").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("500ms").unwrap(), 0.5);
        assert_eq!(parse_duration_secs("2s").unwrap(), 2.0);
        assert_eq!(parse_duration_secs("1m").unwrap(), 60.0);
        assert_eq!(parse_duration_secs("3").unwrap(), 3.0);
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration_secs("xyz").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workload.path, ExecutionPath::Offload);
        assert_eq!(config.workload.queue_depth, 32);
        assert_eq!(config.runtime.threads, 1);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_toml_roundtrip() {
        let toml_str = r#"
            [workload]
            path = "cpu"
            kernel = "copy"
            payload_size = 4096
            queue_depth = 8

            [runtime]
            threads = 4
            iterations = 100
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.workload.path, ExecutionPath::Cpu);
        assert_eq!(config.workload.kernel, KernelKind::Copy);
        assert_eq!(config.workload.payload_size, 4096);
        assert_eq!(config.runtime.threads, 4);
        assert_eq!(config.runtime.iterations, Some(100));
        // Unspecified sections fall back to defaults
        assert_eq!(config.output.format, OutputFormat::Text);
    }
}
