//! Human-readable text output

use crate::config::{Config, ExecutionPath, KernelKind};
use crate::stats::aggregator::StatisticsAggregator;
use crate::stats::RunStatistics;
use crate::util::time::{calculate_rate, format_duration, format_rate, format_throughput};

/// Print run results to console
///
/// Displays the effective configuration, pool geometry, per-iteration means,
/// sustained throughput over the measured region, and the iteration latency
/// distribution. Per-worker breakdowns are appended when requested.
pub fn print_results(aggregator: &mut StatisticsAggregator, config: &Config) {
    let worker_ids = aggregator.worker_ids();
    let stats = aggregator.aggregate().clone();

    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Configuration:");
    println!("  Path:         {}", path_name(config.workload.path));
    println!("  Kernel:       {}", kernel_name(config.workload.kernel));
    println!("  Payload:      {}", format_bytes(config.workload.payload_size as u64));
    println!("  Threads:      {}", config.runtime.threads);
    if let Some(node) = config.workload.node {
        println!("  NUMA node:    {}", node);
    }
    println!();

    println!("Operation Pool:");
    println!("  Queue size:       {}", stats.queue_size);
    println!("  Total slots:      {}", stats.total_operations);
    println!("  Slots per thread: {}", stats.operations_per_thread);
    println!();

    println!("Measured Region:");
    println!("  Iterations: {}", format_number(stats.iterations));
    println!("  Elapsed:    {:.3}s (slowest worker)", stats.elapsed.as_secs_f64());
    println!();

    // Counters are per-iteration means after finalization; throughput is
    // computed over the cumulative totals they were divided down from.
    let total_ops = stats.completed_operations * stats.iterations;
    let total_read = stats.data_read * stats.iterations;
    let total_written = stats.data_written * stats.iterations;

    println!("Per Iteration (mean):");
    println!("  Completions:  {}", format_number(stats.completed_operations));
    println!("  Data read:    {}", format_bytes(stats.data_read));
    println!("  Data written: {}", format_bytes(stats.data_written));
    println!();

    println!("Throughput:");
    println!("  Operations: {} ops/s", format_rate(calculate_rate(total_ops, stats.elapsed)));
    println!("  Read:       {}", format_throughput(calculate_rate(total_read, stats.elapsed)));
    println!("  Write:      {}", format_throughput(calculate_rate(total_written, stats.elapsed)));
    println!();

    print_latency(&stats);

    if config.output.per_worker {
        println!();
        println!("Per Worker:");
        for id in worker_ids {
            if let Some(ws) = aggregator.worker_stats(id) {
                print_worker_row(id, ws);
            }
        }
    }

    println!("═══════════════════════════════════════════════════════════");
}

fn print_latency(stats: &RunStatistics) {
    println!("Iteration Latency:");
    let hist = &stats.iteration_latency;

    if hist.is_empty() {
        println!("  No latency data collected");
        return;
    }

    if let Some(min) = hist.min() {
        println!("  Min:    {}", format_duration(min));
    }
    if let Some(mean) = hist.mean() {
        println!("  Mean:   {}", format_duration(mean));
    }
    if let Some(max) = hist.max() {
        println!("  Max:    {}", format_duration(max));
    }

    println!();
    println!("  Percentiles:");
    for &p in &[50.0, 90.0, 95.0, 99.0, 99.9] {
        if let Some(val) = hist.percentile(p) {
            println!("    p{:5.2}: {}", p, format_duration(val));
        }
    }
}

fn print_worker_row(id: usize, stats: &RunStatistics) {
    println!(
        "  Worker {:>3}: {} completions/iter, {} read, {} written, {} iterations, {:.3}s",
        id,
        format_number(stats.completed_operations),
        format_bytes(stats.data_read),
        format_bytes(stats.data_written),
        stats.iterations,
        stats.elapsed.as_secs_f64(),
    );
}

fn path_name(path: ExecutionPath) -> &'static str {
    match path {
        ExecutionPath::Cpu => "cpu",
        ExecutionPath::Offload => "offload",
    }
}

fn kernel_name(kernel: KernelKind) -> &'static str {
    match kernel {
        KernelKind::Checksum => "checksum",
        KernelKind::Copy => "copy",
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let mut count = 0;

    for c in s.chars().rev() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
        count += 1;
    }

    result.chars().rev().collect()
}

/// Format bytes with appropriate units
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_print_results_smoke() {
        let mut aggregator = StatisticsAggregator::new();
        let mut stats = RunStatistics::new(4, 8, 2);
        stats.completed_operations = 10;
        stats.data_read = 40960;
        stats.data_written = 80;
        stats.elapsed = std::time::Duration::from_secs(1);
        stats.record_iteration(std::time::Duration::from_millis(2));
        stats.finalize(5);
        aggregator.add_worker(0, stats);

        // Must not panic with or without per-worker detail
        let mut config = Config::default();
        print_results(&mut aggregator, &config);
        config.output.per_worker = true;
        print_results(&mut aggregator, &config);
    }
}
