//! Measured-iteration driver
//!
//! Each worker owns a [`TimingLoop`] that presents the sequence of measured
//! iterations, tracks per-iteration and cumulative wall time, and reports the
//! final iteration count used to normalize counters. Two modes:
//!
//! - **Fixed**: exactly N iterations.
//! - **MinDuration**: keep iterating until cumulative measured time reaches a
//!   wall-clock floor; at least one iteration always runs. The realized count
//!   is only known at the end, the way adaptive benchmark drivers behave.
//!
//! The loop protocol is two calls per iteration:
//!
//! ```
//! use accelpulse::timing::{IterationMode, TimingLoop};
//!
//! let mut timing = TimingLoop::new(0, 1, IterationMode::Fixed(3));
//! while timing.keep_running() {
//!     // ... one measured iteration ...
//!     let elapsed = timing.end_iteration();
//!     let _ = elapsed;
//! }
//! assert_eq!(timing.iterations(), 3);
//! ```

use crate::util::time::Timestamp;
use std::time::Duration;

/// How many measured iterations a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationMode {
    /// Exactly this many iterations
    Fixed(u64),
    /// Iterate until cumulative measured time reaches this floor
    MinDuration(Duration),
}

/// Per-worker driver over measured iterations
#[derive(Debug)]
pub struct TimingLoop {
    thread_index: usize,
    threads: usize,
    mode: IterationMode,
    iterations: u64,
    total: Duration,
    iteration_start: Option<Timestamp>,
}

impl TimingLoop {
    /// Create a driver for the given worker
    pub fn new(thread_index: usize, threads: usize, mode: IterationMode) -> Self {
        Self {
            thread_index,
            threads,
            mode,
            iterations: 0,
            total: Duration::ZERO,
            iteration_start: None,
        }
    }

    /// Whether another measured iteration should run
    ///
    /// Returning `true` opens the iteration's timer; the caller must close it
    /// with [`end_iteration`](Self::end_iteration) after the measured region.
    pub fn keep_running(&mut self) -> bool {
        debug_assert!(
            self.iteration_start.is_none(),
            "previous iteration not closed"
        );

        let more = match self.mode {
            IterationMode::Fixed(n) => self.iterations < n,
            IterationMode::MinDuration(floor) => self.iterations == 0 || self.total < floor,
        };

        if more {
            self.iteration_start = Some(Timestamp::now());
        }
        more
    }

    /// Close the current iteration, returning its wall time
    ///
    /// # Panics
    ///
    /// Panics if no iteration is open.
    pub fn end_iteration(&mut self) -> Duration {
        let start = self
            .iteration_start
            .take()
            .expect("end_iteration without keep_running");
        let elapsed = start.elapsed();

        self.iterations += 1;
        self.total += elapsed;
        elapsed
    }

    /// Measured iterations completed so far (final count once the loop exits)
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Cumulative wall time of all measured iterations
    pub fn elapsed(&self) -> Duration {
        self.total
    }

    /// Logical index of the worker driving this loop
    pub fn thread_index(&self) -> usize {
        self.thread_index
    }

    /// Total worker threads in the run
    pub fn threads(&self) -> usize {
        self.threads
    }
}
