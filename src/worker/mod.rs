//! Worker thread implementation
//!
//! This module implements the Worker, the execution unit that drives one
//! operation pool through measured iterations. Each worker thread runs
//! independently, pinning itself near its accelerator, priming its slots,
//! busy-polling them through submit/poll/reset cycles, and recording
//! statistics that are aggregated only after the thread has finished.
//!
//! # Architecture
//!
//! The Worker orchestrates the subsystems:
//! - **PoolGeometry**: Sizes the operation pool from path, queue depth,
//!   thread count, and visible accelerators
//! - **affinity**: Computes and applies the device-local CPU placement
//! - **Operation**: Submits and polls the pool slots
//! - **TimingLoop**: Drives and times the measured iterations
//! - **RunStatistics**: Records completions and iteration latencies
//!
//! # Measured iteration
//!
//! An iteration is "observe `operations_per_thread` completions while keeping
//! the pool saturated". The first iteration submits every slot up front; from
//! then on each observed completion is counted, reset, and resubmitted in
//! place, so the device-side queue never drains inside the measured region.
//! The poll loop never sleeps or yields. A slot that reports the retired
//! status is excluded from all further polling and accounting.
//!
//! # Example
//!
//! ```no_run
//! use accelpulse::config::Config;
//! use accelpulse::timing::IterationMode;
//! use accelpulse::topology::Topology;
//! use accelpulse::worker::{PoolGeometry, Worker};
//! use std::sync::Arc;
//!
//! let config = Arc::new(Config::default());
//! let topology = Topology::with_values(2, 4, 8);
//!
//! let geometry = PoolGeometry::compute(
//!     config.workload.path,
//!     config.workload.queue_depth,
//!     config.runtime.threads,
//!     topology.devices_on_node(config.workload.node),
//! )?;
//!
//! let worker = Worker::new(0, config, topology, geometry, None);
//! let stats = worker.run(IterationMode::Fixed(100))?;
//! println!("{} completions per iteration", stats.completed_operations);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod affinity;

use crate::config::{Config, ExecutionPath, KernelKind, MemTier, TimingModeConfig};
use crate::operation::offload::{DevicePool, OffloadOperation};
use crate::operation::software::SoftwareOperation;
use crate::operation::{
    BufferRole, MemoryTier, OpParams, OpStatus, Operation, TimingMode, WorkKind,
};
use crate::stats::RunStatistics;
use crate::timing::{IterationMode, TimingLoop};
use crate::topology::Topology;
use crate::util::buffer::FillPattern;
use crate::Result;
use anyhow::Context;
use std::sync::Arc;

/// Operation pool sizing for one run
///
/// Computed once, before any slot is allocated, from the execution path and
/// the machine as seen by the run. The same geometry is shared by every
/// worker; each worker owns `operations_per_thread` of the total slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolGeometry {
    /// In-flight slots per accelerator (1 on the CPU path)
    pub queue_size: usize,

    /// Total slots across all workers
    pub total_operations: usize,

    /// Slots owned by each worker; integer-truncated division
    pub operations_per_thread: usize,
}

impl PoolGeometry {
    /// Size the pool for the given path, concurrency, and visible devices
    ///
    /// On the CPU path every worker gets exactly one slot regardless of the
    /// configured queue depth. On the offload path the pool is
    /// `queue_depth * devices` slots, split evenly (truncating) across
    /// workers.
    ///
    /// # Errors
    ///
    /// Fails when the split leaves a worker with zero slots. This is checked
    /// here, once, so no buffers are allocated and no threads are spawned for
    /// a run that cannot keep its workers busy.
    pub fn compute(
        path: ExecutionPath,
        queue_depth: usize,
        threads: usize,
        devices: u32,
    ) -> Result<Self> {
        let (queue_size, total_operations) = match path {
            ExecutionPath::Cpu => (1, threads),
            ExecutionPath::Offload => (queue_depth, queue_depth * devices as usize),
        };

        let operations_per_thread = total_operations / threads;
        if operations_per_thread < 1 {
            anyhow::bail!(
                "operation pool too small: {} slots ({} queue depth x {} devices) \
                 cannot serve {} threads",
                total_operations,
                queue_size,
                devices,
                threads
            );
        }

        Ok(Self {
            queue_size,
            total_operations,
            operations_per_thread,
        })
    }
}

/// A worker thread that executes operations and records statistics
pub struct Worker {
    id: usize,
    config: Arc<Config>,
    topology: Topology,
    geometry: PoolGeometry,

    /// Emulated accelerator pool, shared across workers on the offload path
    devices: Option<Arc<DevicePool>>,

    pool: Vec<Box<dyn Operation>>,
    retired: Vec<bool>,
    stats: RunStatistics,

    /// Affinity is applied at most once per worker lifetime
    affinity_bound: bool,
    bind_attempts: u32,

    first_iteration: bool,
    polls: u64,
}

impl Worker {
    /// Create a worker; slots are allocated later, during priming
    pub fn new(
        id: usize,
        config: Arc<Config>,
        topology: Topology,
        geometry: PoolGeometry,
        devices: Option<Arc<DevicePool>>,
    ) -> Self {
        let stats = RunStatistics::new(
            geometry.queue_size,
            geometry.total_operations,
            geometry.operations_per_thread,
        );

        Self {
            id,
            config,
            topology,
            geometry,
            devices,
            pool: Vec::new(),
            retired: Vec::new(),
            stats,
            affinity_bound: false,
            bind_attempts: 0,
            first_iteration: true,
            polls: 0,
        }
    }

    /// Create a worker over a caller-supplied pool
    ///
    /// The slots are still initialized and primed by the worker; they are not
    /// created from the configured path. The pool length must match the
    /// geometry's `operations_per_thread`.
    pub fn with_operations(
        id: usize,
        config: Arc<Config>,
        topology: Topology,
        geometry: PoolGeometry,
        operations: Vec<Box<dyn Operation>>,
    ) -> Self {
        let mut worker = Self::new(id, config, topology, geometry, None);
        worker.pool = operations;
        worker
    }

    /// Run the worker to completion, consuming it
    ///
    /// Affinity, priming, the measured loop, the teardown drain, and the
    /// finalization divide, in that order. Returns the worker's finalized
    /// statistics.
    pub fn run(mut self, mode: IterationMode) -> Result<RunStatistics> {
        self.apply_affinity();

        self.prime_pool()
            .with_context(|| format!("Worker {}: failed to prime operation pool", self.id))?;

        let mut timing = TimingLoop::new(self.id, self.config.runtime.threads, mode);
        while timing.keep_running() {
            self.sample_iteration();
            let latency = timing.end_iteration();
            self.stats.record_iteration(latency);
        }

        // Teardown drain: every slot, retired or not, is waited on before
        // any buffer can be dropped. Not part of the measured region.
        self.drain();

        let iterations = timing.iterations();
        anyhow::ensure!(iterations > 0, "no measured iterations performed");

        #[cfg(feature = "thread-stats")]
        self.print_thread_stats(iterations);

        self.stats.elapsed = timing.elapsed();
        self.stats.finalize(iterations);
        Ok(self.stats)
    }

    /// Pin this worker near its accelerator, at most once
    ///
    /// No placement exists when no accelerator is visible; a failed bind is a
    /// warning and the worker continues on default scheduling.
    fn apply_affinity(&mut self) {
        if self.affinity_bound {
            return;
        }
        self.affinity_bound = true;

        let core = affinity::placement_cpu(
            self.id,
            self.topology.total_devices,
            self.topology.cpu_physical_per_cluster,
            self.topology.cpu_physical_per_socket,
        );

        if let Some(core) = core {
            self.bind_attempts += 1;
            if let Err(e) = affinity::bind_to_core(core) {
                eprintln!(
                    "Warning: Worker {}: could not pin to core {}: {:#}",
                    self.id, core, e
                );
            }
        }
    }

    /// Allocate (if needed), initialize, and place every slot
    ///
    /// Every slot finishes init and memory placement before any slot is
    /// submitted, so the first measured iteration sees a fully settled pool.
    fn prime_pool(&mut self) -> Result<()> {
        if self.pool.is_empty() {
            self.pool = (0..self.geometry.operations_per_thread)
                .map(|_| self.create_operation())
                .collect::<Result<Vec<_>>>()?;
        }
        self.retired = vec![false; self.pool.len()];

        let workload = &self.config.workload;
        let output_tier = convert_tier(workload.output_tier);
        let input_tier = convert_tier(workload.input_tier);
        let timing = convert_timing(workload.timing);

        for (slot, op) in self.pool.iter_mut().enumerate() {
            let params = OpParams {
                kind: convert_kernel(workload.kernel),
                payload_size: workload.payload_size,
                // Distinct payloads per slot, reproducible per run
                fill: FillPattern::Random(
                    workload.seed.wrapping_add((self.id * 1000 + slot) as u64),
                ),
            };

            op.init(&params, output_tier, timing, workload.node)
                .with_context(|| format!("slot {} init failed", slot))?;
            op.mem_control(input_tier, BufferRole::Source)
                .with_context(|| format!("slot {} memory placement failed", slot))?;
        }

        Ok(())
    }

    /// Build one slot for the configured execution path
    fn create_operation(&self) -> Result<Box<dyn Operation>> {
        match self.config.workload.path {
            ExecutionPath::Cpu => Ok(Box::new(SoftwareOperation::new())),
            ExecutionPath::Offload => {
                let devices = self
                    .devices
                    .as_ref()
                    .context("offload path requires an accelerator pool")?;
                // Workers round-robin over devices, matching the placement
                // grouping in the affinity module
                let device = self.id % devices.device_count();
                Ok(Box::new(OffloadOperation::new(Arc::clone(devices), device)))
            }
        }
    }

    /// One measured iteration: `operations_per_thread` completions observed
    /// while the pool stays saturated
    fn sample_iteration(&mut self) {
        if self.first_iteration {
            for op in self.pool.iter_mut() {
                op.async_submit();
            }
            self.first_iteration = false;
        }

        let limit = self.geometry.operations_per_thread as u64;
        let mut completed = 0u64;

        // Busy poll, round robin over live slots. No sleeping, no yielding.
        while completed < limit {
            for idx in 0..self.pool.len() {
                if completed >= limit {
                    break;
                }
                if self.retired[idx] {
                    continue;
                }

                match self.pool[idx].async_poll() {
                    OpStatus::Completed => {
                        self.polls += 1;
                        completed += 1;
                        let bytes_read = self.pool[idx].get_bytes_read();
                        let bytes_written = self.pool[idx].get_bytes_written();
                        self.stats.record_completion(bytes_read, bytes_written);

                        // Back in flight immediately; the reset clears
                        // completion state only
                        self.pool[idx].light_reset();
                        self.pool[idx].async_submit();
                    }
                    OpStatus::InProgress => {
                        self.polls += 1;
                    }
                    // A retired poll is not a sample of a live slot; the
                    // diagnostic counter only tracks live polls
                    OpStatus::Retired => {
                        self.retired[idx] = true;
                    }
                }
            }
        }
    }

    /// Block until no slot is in flight
    fn drain(&mut self) {
        for op in self.pool.iter_mut() {
            op.async_wait();
        }
    }

    #[cfg(feature = "thread-stats")]
    fn print_thread_stats(&self, iterations: u64) {
        use std::sync::Mutex;
        // Serialize whole lines across workers
        static PRINT_LOCK: Mutex<()> = Mutex::new(());
        let _guard = PRINT_LOCK.lock().unwrap();

        println!(
            "Worker {:>3}: {} completions, {} polls, {} iterations, {} slots, {} retired",
            self.id,
            self.stats.completed_operations,
            self.polls,
            iterations,
            self.pool.len(),
            self.retired.iter().filter(|r| **r).count(),
        );
    }
}

fn convert_kernel(kind: KernelKind) -> WorkKind {
    match kind {
        KernelKind::Checksum => WorkKind::Checksum,
        KernelKind::Copy => WorkKind::Copy,
    }
}

fn convert_tier(tier: MemTier) -> MemoryTier {
    match tier {
        MemTier::Dram => MemoryTier::Dram,
        MemTier::Cache => MemoryTier::Cache,
    }
}

fn convert_timing(timing: TimingModeConfig) -> TimingMode {
    match timing {
        TimingModeConfig::Full => TimingMode::Full,
        TimingModeConfig::Partial => TimingMode::Partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::mock::MockOperation;

    fn test_config(path: ExecutionPath, threads: usize) -> Arc<Config> {
        let mut config = Config::default();
        config.workload.path = path;
        config.workload.payload_size = 4096;
        config.runtime.threads = threads;
        Arc::new(config)
    }

    fn mock_worker(
        geometry: PoolGeometry,
        mocks: &[MockOperation],
    ) -> Worker {
        let pool: Vec<Box<dyn Operation>> = mocks
            .iter()
            .map(|m| Box::new(m.clone()) as Box<dyn Operation>)
            .collect();
        Worker::with_operations(
            0,
            test_config(ExecutionPath::Offload, 1),
            Topology::with_values(0, 4, 8),
            geometry,
            pool,
        )
    }

    #[test]
    fn test_geometry_cpu_path() {
        // Queue depth is ignored on the CPU path
        let g = PoolGeometry::compute(ExecutionPath::Cpu, 32, 4, 0).unwrap();
        assert_eq!(g.queue_size, 1);
        assert_eq!(g.total_operations, 4);
        assert_eq!(g.operations_per_thread, 1);
    }

    #[test]
    fn test_geometry_offload_split() {
        let g = PoolGeometry::compute(ExecutionPath::Offload, 8, 4, 1).unwrap();
        assert_eq!(g.queue_size, 8);
        assert_eq!(g.total_operations, 8);
        assert_eq!(g.operations_per_thread, 2);
    }

    #[test]
    fn test_geometry_truncates() {
        // 8 slots over 3 threads: 2 each, 2 slots unused
        let g = PoolGeometry::compute(ExecutionPath::Offload, 8, 3, 1).unwrap();
        assert_eq!(g.operations_per_thread, 2);
    }

    #[test]
    fn test_geometry_too_many_threads() {
        let err = PoolGeometry::compute(ExecutionPath::Offload, 8, 16, 1).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_geometry_scales_with_devices() {
        let g = PoolGeometry::compute(ExecutionPath::Offload, 8, 16, 4).unwrap();
        assert_eq!(g.total_operations, 32);
        assert_eq!(g.operations_per_thread, 2);
    }

    #[test]
    fn test_run_counts_exactly_per_thread_completions() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 2, 1, 1).unwrap();
        let mocks = vec![MockOperation::new(4096, 8), MockOperation::new(4096, 8)];
        let worker = mock_worker(geometry, &mocks);

        let stats = worker.run(IterationMode::Fixed(1)).unwrap();

        assert_eq!(stats.completed_operations, 2);
        assert_eq!(stats.data_read, 2 * 4096);
        assert_eq!(stats.data_written, 2 * 8);
        assert_eq!(stats.iterations, 1);
    }

    #[test]
    fn test_run_normalizes_over_iterations() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 2, 1, 1).unwrap();
        let mocks = vec![MockOperation::new(100, 10), MockOperation::new(100, 10)];
        let worker = mock_worker(geometry, &mocks);

        let stats = worker.run(IterationMode::Fixed(3)).unwrap();

        // Cumulative 6 completions over 3 iterations
        assert_eq!(stats.completed_operations, 2);
        assert_eq!(stats.data_read, 200);
        assert_eq!(stats.data_written, 20);
        assert_eq!(stats.iterations, 3);
    }

    #[test]
    fn test_pool_primed_before_first_submission() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 2, 1, 1).unwrap();
        let mocks = vec![MockOperation::new(1, 1), MockOperation::new(1, 1)];
        let worker = mock_worker(geometry, &mocks);

        worker.run(IterationMode::Fixed(1)).unwrap();

        for mock in &mocks {
            assert_eq!(mock.init_calls(), 1);
            assert_eq!(mock.mem_control_calls(), 1);
            assert!(mock.submit_calls() >= 1);
        }
    }

    #[test]
    fn test_completion_resets_then_resubmits() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 2, 1, 1).unwrap();
        let mocks = vec![MockOperation::new(1, 1), MockOperation::new(1, 1)];
        let worker = mock_worker(geometry, &mocks);

        worker.run(IterationMode::Fixed(3)).unwrap();

        for mock in &mocks {
            // Priming submit plus one resubmit per observed completion
            assert_eq!(mock.submit_calls(), 4);
            assert_eq!(mock.reset_calls(), 3);
        }
    }

    #[test]
    fn test_retired_slot_is_skipped() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 2, 1, 1).unwrap();
        // Slot 0 retires when resubmitted after its first completion
        let mocks = vec![
            MockOperation::new(1, 1).with_retirement_on_submission(2),
            MockOperation::new(1, 1),
        ];
        let worker = mock_worker(geometry, &mocks);

        let stats = worker.run(IterationMode::Fixed(2)).unwrap();

        assert!(mocks[0].is_retired());
        // Polled once per iteration until the retirement is observed, never
        // again after
        assert_eq!(mocks[0].poll_calls(), 2);
        // Slot 1 carried the remaining load; totals still normalize cleanly
        assert_eq!(stats.completed_operations, 2);
    }

    #[test]
    fn test_poll_counter_excludes_retired_polls() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 2, 1, 1).unwrap();
        // Slot 0 retires when resubmitted after its first completion
        let mocks = vec![
            MockOperation::new(1, 1).with_retirement_on_submission(2),
            MockOperation::new(1, 1),
        ];
        let mut worker = mock_worker(geometry, &mocks);
        worker.prime_pool().unwrap();

        // Iteration 1: both slots complete on their first poll
        worker.sample_iteration();
        assert_eq!(worker.polls, 2);

        // Iteration 2: slot 0's retirement is observed (not counted), slot 1
        // carries both completions
        worker.sample_iteration();
        assert!(mocks[0].is_retired());
        assert_eq!(worker.polls, 4);
    }

    #[test]
    fn test_drain_covers_every_slot() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 3, 1, 1).unwrap();
        let mocks = vec![
            MockOperation::new(1, 1),
            MockOperation::new(1, 1).with_retirement_on_submission(2),
            MockOperation::new(1, 1),
        ];
        let worker = mock_worker(geometry, &mocks);

        worker.run(IterationMode::Fixed(2)).unwrap();

        for mock in &mocks {
            assert_eq!(mock.wait_calls(), 1);
        }
    }

    #[test]
    fn test_affinity_applied_at_most_once() {
        let geometry = PoolGeometry::compute(ExecutionPath::Cpu, 1, 1, 0).unwrap();
        let mut worker = Worker::new(
            0,
            test_config(ExecutionPath::Cpu, 1),
            Topology::with_values(1, 1, 1),
            geometry,
            None,
        );

        worker.apply_affinity();
        worker.apply_affinity();
        assert_eq!(worker.bind_attempts, 1);
    }

    #[test]
    fn test_no_affinity_without_devices() {
        let geometry = PoolGeometry::compute(ExecutionPath::Cpu, 1, 1, 0).unwrap();
        let mut worker = Worker::new(
            0,
            test_config(ExecutionPath::Cpu, 1),
            Topology::with_values(0, 4, 8),
            geometry,
            None,
        );

        worker.apply_affinity();
        assert_eq!(worker.bind_attempts, 0);
        assert!(worker.affinity_bound);
    }

    #[test]
    fn test_cpu_path_end_to_end() {
        let geometry = PoolGeometry::compute(ExecutionPath::Cpu, 32, 1, 0).unwrap();
        let config = test_config(ExecutionPath::Cpu, 1);
        let worker = Worker::new(0, config, Topology::with_values(0, 4, 8), geometry, None);

        let stats = worker.run(IterationMode::Fixed(2)).unwrap();

        // One slot, checksum kernel: payload in, 8-byte digest out
        assert_eq!(stats.completed_operations, 1);
        assert_eq!(stats.data_read, 4096);
        assert_eq!(stats.data_written, 8);
    }

    #[test]
    fn test_offload_path_end_to_end() {
        let devices = Arc::new(DevicePool::new(2));
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 4, 1, 2).unwrap();
        let config = test_config(ExecutionPath::Offload, 1);
        let worker = Worker::new(
            0,
            config,
            Topology::with_values(2, 4, 8),
            geometry,
            Some(devices),
        );

        let stats = worker.run(IterationMode::Fixed(2)).unwrap();

        assert_eq!(stats.completed_operations, 8);
        assert_eq!(stats.data_read, 8 * 4096);
        assert_eq!(stats.data_written, 8 * 8);
    }

    #[test]
    fn test_offload_without_device_pool_fails() {
        let geometry = PoolGeometry::compute(ExecutionPath::Offload, 4, 1, 1).unwrap();
        let config = test_config(ExecutionPath::Offload, 1);
        let worker = Worker::new(0, config, Topology::with_values(1, 4, 8), geometry, None);

        assert!(worker.run(IterationMode::Fixed(1)).is_err());
    }
}
