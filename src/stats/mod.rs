//! Run statistics
//!
//! Per-worker counters produced by the throughput sampler and normalized once
//! at the end of a run. Each worker owns its `RunStatistics` exclusively for
//! the duration of the measured region; there are no atomics and no locks on
//! the hot path. Cross-worker aggregation happens only after workers have
//! finished, via [`aggregator::StatisticsAggregator`].
//!
//! # Lifecycle
//!
//! 1. Created by the worker before the first measured iteration
//! 2. Mutated only by that worker's sampler loop (cumulative counters)
//! 3. Finalized exactly once after the drain: cumulative counters are divided
//!    by the measured iteration count, yielding mean-per-iteration values
//! 4. Handed to the reporting layer, never mutated again
//!
//! # Example
//!
//! ```
//! use accelpulse::stats::RunStatistics;
//!
//! let mut stats = RunStatistics::new(8, 16, 4);
//! stats.completed_operations = 12;
//! stats.data_read = 4096;
//! stats.data_written = 2048;
//!
//! stats.finalize(4);
//! assert_eq!(stats.completed_operations, 3);
//! assert_eq!(stats.data_read, 1024);
//! assert_eq!(stats.data_written, 512);
//! ```

pub mod aggregator;
pub mod histogram;

use histogram::LatencyHistogram;
use std::time::Duration;

/// Statistics for a single worker's run
///
/// The three cumulative counters (`completed_operations`, `data_read`,
/// `data_written`) are summed across measured iterations by the sampler and
/// divided by the iteration count in [`finalize`](Self::finalize). Integer
/// division truncates toward zero, consistently across runs.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    /// Configured in-flight slot count per accelerator/per thread
    pub queue_size: usize,

    /// Total operation slots across the measurement domain
    pub total_operations: usize,

    /// `total_operations / thread_count`, integer-truncated; always >= 1
    /// once pool geometry has been validated
    pub operations_per_thread: usize,

    /// Slots observed completing, cumulative until finalized, then mean
    /// per iteration
    pub completed_operations: u64,

    /// Bytes read by completed slots, same normalization
    pub data_read: u64,

    /// Bytes written by completed slots, same normalization
    pub data_written: u64,

    /// Measured iterations performed (set at finalization)
    pub iterations: u64,

    /// Wall time of the worker's measured region
    pub elapsed: Duration,

    /// Wall-time distribution of individual measured iterations
    pub iteration_latency: LatencyHistogram,

    finalized: bool,
}

impl RunStatistics {
    /// Create statistics for a run with the given pool geometry
    pub fn new(queue_size: usize, total_operations: usize, operations_per_thread: usize) -> Self {
        Self {
            queue_size,
            total_operations,
            operations_per_thread,
            completed_operations: 0,
            data_read: 0,
            data_written: 0,
            iterations: 0,
            elapsed: Duration::ZERO,
            iteration_latency: LatencyHistogram::new(),
            finalized: false,
        }
    }

    /// Account one completed slot
    ///
    /// Called by the sampler each time a poll observes the completed state.
    #[inline]
    pub fn record_completion(&mut self, bytes_read: u64, bytes_written: u64) {
        self.completed_operations += 1;
        self.data_read += bytes_read;
        self.data_written += bytes_written;
    }

    /// Record the wall time of one measured iteration
    ///
    /// Runs after the iteration's busy-poll loop has closed, never inside it.
    #[inline]
    pub fn record_iteration(&mut self, latency: Duration) {
        self.iteration_latency.record(latency);
    }

    /// Normalize cumulative counters into per-iteration means
    ///
    /// Divides each cumulative counter by `iterations` exactly once. Calling
    /// this a second time is a logic error.
    ///
    /// # Panics
    ///
    /// Panics if called twice or with `iterations == 0`.
    pub fn finalize(&mut self, iterations: u64) {
        assert!(!self.finalized, "RunStatistics finalized twice");
        assert!(iterations > 0, "cannot normalize over zero iterations");

        self.completed_operations /= iterations;
        self.data_read /= iterations;
        self.data_written /= iterations;
        self.iterations = iterations;
        self.finalized = true;
    }

    /// Whether the finalization divide has run
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sum another worker's finalized statistics into this record
    ///
    /// Counter fields add; geometry fields add where they describe disjoint
    /// pools (`total_operations`) and must agree where they describe shared
    /// configuration (`queue_size`, `operations_per_thread`). Iteration
    /// latency histograms merge.
    pub fn merge(&mut self, other: &RunStatistics) {
        self.total_operations += other.total_operations;
        self.completed_operations += other.completed_operations;
        self.data_read += other.data_read;
        self.data_written += other.data_written;
        self.iterations = self.iterations.max(other.iterations);
        self.elapsed = self.elapsed.max(other.elapsed);
        self.iteration_latency.merge(&other.iteration_latency);
    }
}
