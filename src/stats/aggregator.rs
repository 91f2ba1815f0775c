//! Statistics aggregation
//!
//! Merges per-worker [`RunStatistics`] into a single aggregate view while
//! preserving the per-worker records for detailed reporting. Aggregation runs
//! strictly after every worker has finished and finalized its statistics;
//! nothing here touches the measured path.
//!
//! # Example
//!
//! ```
//! use accelpulse::stats::{RunStatistics, aggregator::StatisticsAggregator};
//!
//! let mut w0 = RunStatistics::new(4, 8, 2);
//! w0.completed_operations = 8;
//! w0.finalize(4);
//!
//! let mut w1 = RunStatistics::new(4, 8, 2);
//! w1.completed_operations = 12;
//! w1.finalize(4);
//!
//! let mut aggregator = StatisticsAggregator::new();
//! aggregator.add_worker(0, w0);
//! aggregator.add_worker(1, w1);
//!
//! let aggregate = aggregator.aggregate();
//! assert_eq!(aggregate.completed_operations, 5);
//! ```

use crate::stats::RunStatistics;
use std::collections::HashMap;

/// Aggregator over per-worker run statistics
///
/// 1. Create with `new()`
/// 2. Add each worker's finalized statistics with `add_worker()`
/// 3. Read the merged view with `aggregate()` and per-worker views with
///    `worker_stats()` / `worker_ids()`
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    /// Per-worker statistics (worker_id -> stats)
    workers: HashMap<usize, RunStatistics>,

    /// Cached aggregate, invalidated when a worker is added
    aggregate_cache: Option<RunStatistics>,
}

impl StatisticsAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
            aggregate_cache: None,
        }
    }

    /// Add a worker's finalized statistics
    pub fn add_worker(&mut self, worker_id: usize, stats: RunStatistics) {
        self.workers.insert(worker_id, stats);
        self.aggregate_cache = None;
    }

    /// Number of workers recorded
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Merged statistics across all workers
    ///
    /// Counters sum across workers; geometry fields describing shared
    /// configuration (queue size, operations per thread) are taken from the
    /// first worker, since every worker runs the same configuration. The
    /// result is cached until another worker is added.
    ///
    /// # Panics
    ///
    /// Panics if no workers have been added.
    pub fn aggregate(&mut self) -> &RunStatistics {
        if self.aggregate_cache.is_none() {
            let mut ids = self.worker_ids();
            assert!(!ids.is_empty(), "no worker statistics to aggregate");
            let first = ids.remove(0);
            let mut merged = self.workers[&first].clone();
            for id in ids {
                merged.merge(&self.workers[&id]);
            }
            self.aggregate_cache = Some(merged);
        }

        self.aggregate_cache.as_ref().unwrap()
    }

    /// Statistics for one worker, if present
    pub fn worker_stats(&self, worker_id: usize) -> Option<&RunStatistics> {
        self.workers.get(&worker_id)
    }

    /// Worker IDs in ascending order, for stable iteration
    pub fn worker_ids(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.workers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized(completed: u64, read: u64, written: u64) -> RunStatistics {
        let mut stats = RunStatistics::new(4, 8, 2);
        stats.completed_operations = completed;
        stats.data_read = read;
        stats.data_written = written;
        stats.finalize(1);
        stats
    }

    #[test]
    fn test_aggregate_sums_workers() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_worker(0, finalized(2, 200, 100));
        aggregator.add_worker(1, finalized(3, 300, 150));

        let aggregate = aggregator.aggregate();
        assert_eq!(aggregate.completed_operations, 5);
        assert_eq!(aggregate.data_read, 500);
        assert_eq!(aggregate.data_written, 250);
        assert_eq!(aggregate.total_operations, 16);
    }

    #[test]
    fn test_per_worker_preserved() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_worker(3, finalized(7, 0, 0));

        assert_eq!(aggregator.num_workers(), 1);
        assert_eq!(aggregator.worker_stats(3).unwrap().completed_operations, 7);
        assert!(aggregator.worker_stats(0).is_none());
    }

    #[test]
    fn test_worker_ids_sorted() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_worker(2, finalized(1, 0, 0));
        aggregator.add_worker(0, finalized(1, 0, 0));
        aggregator.add_worker(1, finalized(1, 0, 0));

        assert_eq!(aggregator.worker_ids(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cache_invalidated_on_add() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.add_worker(0, finalized(1, 0, 0));
        assert_eq!(aggregator.aggregate().completed_operations, 1);

        aggregator.add_worker(1, finalized(4, 0, 0));
        assert_eq!(aggregator.aggregate().completed_operations, 5);
    }
}
