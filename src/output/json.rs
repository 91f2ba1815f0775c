//! JSON output formatting
//!
//! Serializes the final report for downstream tooling: effective
//! configuration, pool geometry, per-iteration means, throughput over the
//! measured region, iteration latency percentiles, and optional per-worker
//! detail. Every duration and rate carries both a machine field and a
//! human-readable rendering.

use crate::config::Config;
use crate::stats::aggregator::StatisticsAggregator;
use crate::stats::histogram::LatencyHistogram;
use crate::stats::RunStatistics;
use crate::util::time::{calculate_rate, format_duration, format_throughput};
use crate::Result;
use serde::Serialize;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: d.as_micros() as u64,
            human: format_duration(d),
        }
    }
}

/// Throughput with bytes/sec and human-readable format
#[derive(Debug, Clone, Serialize)]
pub struct JsonThroughput {
    pub bytes_per_sec: u64,
    pub human: String,
}

impl JsonThroughput {
    pub fn new(bytes_per_sec: f64) -> Self {
        Self {
            bytes_per_sec: bytes_per_sec as u64,
            human: format_throughput(bytes_per_sec),
        }
    }
}

/// Latency statistics with percentiles
#[derive(Debug, Clone, Serialize)]
pub struct JsonLatency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99_9: Option<JsonDuration>,
}

fn extract_latency(hist: &LatencyHistogram) -> JsonLatency {
    let d = |o: Option<Duration>| o.map(JsonDuration::from_duration);
    JsonLatency {
        min: d(hist.min()),
        max: d(hist.max()),
        mean: d(hist.mean()),
        p50: d(hist.percentile(50.0)),
        p90: d(hist.percentile(90.0)),
        p95: d(hist.percentile(95.0)),
        p99: d(hist.percentile(99.0)),
        p99_9: d(hist.percentile(99.9)),
    }
}

/// Operation pool sizing as realized for this run
#[derive(Debug, Clone, Serialize)]
pub struct JsonGeometry {
    pub queue_size: usize,
    pub total_operations: usize,
    pub operations_per_thread: usize,
}

/// Effective workload configuration
#[derive(Debug, Clone, Serialize)]
pub struct JsonRunConfig {
    pub path: String,
    pub kernel: String,
    pub payload_size: usize,
    pub queue_depth: usize,
    pub threads: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<u32>,
}

/// Per-worker detail for the final report
#[derive(Debug, Clone, Serialize)]
pub struct JsonWorkerReport {
    pub worker_id: usize,
    pub completed_operations: u64,
    pub data_read: u64,
    pub data_written: u64,
    pub iterations: u64,
    pub elapsed: JsonDuration,
    pub iteration_latency: JsonLatency,
}

/// Aggregate measurements, normalized per iteration
#[derive(Debug, Clone, Serialize)]
pub struct JsonAggregate {
    pub iterations: u64,
    pub elapsed: JsonDuration,
    pub completed_operations: u64,
    pub data_read: u64,
    pub data_written: u64,
    pub operations_per_sec: u64,
    pub read_throughput: JsonThroughput,
    pub write_throughput: JsonThroughput,
    pub iteration_latency: JsonLatency,
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub config: JsonRunConfig,
    pub geometry: JsonGeometry,
    pub aggregate: JsonAggregate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<Vec<JsonWorkerReport>>,
}

/// Build the report from aggregated worker statistics
pub fn build_report(aggregator: &mut StatisticsAggregator, config: &Config) -> JsonReport {
    let worker_ids = aggregator.worker_ids();
    let stats = aggregator.aggregate().clone();

    let workers = if config.output.per_worker {
        Some(
            worker_ids
                .iter()
                .filter_map(|&id| aggregator.worker_stats(id).map(|ws| worker_report(id, ws)))
                .collect(),
        )
    } else {
        None
    };

    JsonReport {
        config: JsonRunConfig {
            path: format!("{:?}", config.workload.path).to_lowercase(),
            kernel: format!("{:?}", config.workload.kernel).to_lowercase(),
            payload_size: config.workload.payload_size,
            queue_depth: config.workload.queue_depth,
            threads: config.runtime.threads,
            node: config.workload.node,
        },
        geometry: JsonGeometry {
            queue_size: stats.queue_size,
            total_operations: stats.total_operations,
            operations_per_thread: stats.operations_per_thread,
        },
        aggregate: aggregate_report(&stats),
        workers,
    }
}

fn aggregate_report(stats: &RunStatistics) -> JsonAggregate {
    // Rates come from the cumulative totals the per-iteration means were
    // divided down from
    let total_ops = stats.completed_operations * stats.iterations;
    let total_read = stats.data_read * stats.iterations;
    let total_written = stats.data_written * stats.iterations;

    JsonAggregate {
        iterations: stats.iterations,
        elapsed: JsonDuration::from_duration(stats.elapsed),
        completed_operations: stats.completed_operations,
        data_read: stats.data_read,
        data_written: stats.data_written,
        operations_per_sec: calculate_rate(total_ops, stats.elapsed) as u64,
        read_throughput: JsonThroughput::new(calculate_rate(total_read, stats.elapsed)),
        write_throughput: JsonThroughput::new(calculate_rate(total_written, stats.elapsed)),
        iteration_latency: extract_latency(&stats.iteration_latency),
    }
}

fn worker_report(id: usize, stats: &RunStatistics) -> JsonWorkerReport {
    JsonWorkerReport {
        worker_id: id,
        completed_operations: stats.completed_operations,
        data_read: stats.data_read,
        data_written: stats.data_written,
        iterations: stats.iterations,
        elapsed: JsonDuration::from_duration(stats.elapsed),
        iteration_latency: extract_latency(&stats.iteration_latency),
    }
}

/// Print the report as pretty JSON on stdout
pub fn print_results(aggregator: &mut StatisticsAggregator, config: &Config) -> Result<()> {
    let report = build_report(aggregator, config);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
