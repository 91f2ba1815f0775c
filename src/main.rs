//! accelpulse CLI entry point

use accelpulse::config::{cli::Cli, Config, ExecutionPath, OutputFormat, RuntimeConfig};
use accelpulse::operation::offload::DevicePool;
use accelpulse::output;
use accelpulse::stats::aggregator::StatisticsAggregator;
use accelpulse::timing::IterationMode;
use accelpulse::topology::Topology;
use accelpulse::worker::{PoolGeometry, Worker};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    println!("accelpulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Accelerator offload throughput benchmark");
    println!();

    let cli = Cli::parse_args();
    let config = cli.to_config().context("Failed to build configuration")?;

    accelpulse::config::validator::validate_config(&config)
        .context("Configuration validation failed")?;

    let topology = effective_topology(&config);
    let devices_visible = topology.devices_on_node(config.workload.node);

    print_configuration(&config, &topology, devices_visible);

    // Pool sizing is validated once, before any allocation or spawn
    let geometry = PoolGeometry::compute(
        config.workload.path,
        config.workload.queue_depth,
        config.runtime.threads,
        devices_visible,
    )
    .context("Operation pool sizing failed")?;

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    println!();
    println!("Starting run...");
    println!();

    let mut aggregator = run_workers(Arc::new(config.clone()), topology, geometry, devices_visible)?;

    match config.output.format {
        OutputFormat::Text => output::text::print_results(&mut aggregator, &config),
        OutputFormat::Json => output::json::print_results(&mut aggregator, &config)?,
    }

    Ok(())
}

/// Spawn one thread per worker, run them to completion, collect statistics
fn run_workers(
    config: Arc<Config>,
    topology: Topology,
    geometry: PoolGeometry,
    devices_visible: u32,
) -> Result<StatisticsAggregator> {
    let devices = match config.workload.path {
        ExecutionPath::Offload => Some(Arc::new(DevicePool::new(devices_visible as usize))),
        ExecutionPath::Cpu => None,
    };

    let mode = iteration_mode(&config.runtime);

    let mut handles = Vec::with_capacity(config.runtime.threads);
    for id in 0..config.runtime.threads {
        let worker = Worker::new(
            id,
            Arc::clone(&config),
            topology.clone(),
            geometry,
            devices.clone(),
        );

        let handle = std::thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || worker.run(mode))
            .with_context(|| format!("Failed to spawn worker {}", id))?;
        handles.push((id, handle));
    }

    let mut aggregator = StatisticsAggregator::new();
    for (id, handle) in handles {
        let stats = handle
            .join()
            .map_err(|_| anyhow::anyhow!("Worker {} panicked", id))?
            .with_context(|| format!("Worker {} failed", id))?;
        aggregator.add_worker(id, stats);
    }

    Ok(aggregator)
}

/// Discovered topology with CLI overrides applied on top
fn effective_topology(config: &Config) -> Topology {
    let mut topology = Topology::discover();

    if let Some(devices) = config.runtime.devices {
        topology = Topology::with_values(
            devices,
            topology.cpu_physical_per_cluster,
            topology.cpu_physical_per_socket,
        );
    }
    if let Some(cluster) = config.runtime.cores_per_cluster {
        topology.cpu_physical_per_cluster = cluster;
    }
    if let Some(socket) = config.runtime.cores_per_socket {
        topology.cpu_physical_per_socket = socket;
    }

    topology
}

/// How the measured loop terminates for this run
fn iteration_mode(runtime: &RuntimeConfig) -> IterationMode {
    if let Some(n) = runtime.iterations {
        IterationMode::Fixed(n)
    } else if let Some(secs) = runtime.min_time_secs {
        IterationMode::MinDuration(Duration::from_secs_f64(secs))
    } else {
        IterationMode::MinDuration(Duration::from_secs(1))
    }
}

/// Print configuration summary
fn print_configuration(config: &Config, topology: &Topology, devices_visible: u32) {
    println!("Configuration:");
    println!("  Workload:");
    println!("    Path: {:?}", config.workload.path);
    println!("    Kernel: {:?}", config.workload.kernel);
    println!("    Payload size: {} bytes", config.workload.payload_size);
    println!("    Queue depth: {}", config.workload.queue_depth);
    println!(
        "    Memory tiers: {:?} in, {:?} out",
        config.workload.input_tier, config.workload.output_tier
    );
    if let Some(node) = config.workload.node {
        println!("    NUMA node: {}", node);
    }

    println!("  Runtime:");
    println!("    Threads: {}", config.runtime.threads);
    match (config.runtime.iterations, config.runtime.min_time_secs) {
        (Some(n), _) => println!("    Iterations: {}", n),
        (None, Some(secs)) => println!("    Min time: {}s", secs),
        (None, None) => println!("    Min time: 1s (default)"),
    }

    println!("  Topology:");
    println!("    Accelerators: {} visible", devices_visible);
    println!(
        "    Cores: {} per cluster, {} per socket",
        topology.cpu_physical_per_cluster, topology.cpu_physical_per_socket
    );
}
