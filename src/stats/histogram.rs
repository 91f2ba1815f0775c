//! Iteration latency histogram using HdrHistogram
//!
//! Wraps the HdrHistogram library for tracking measured-iteration wall times
//! with high precision and low overhead. Samples are recorded once per
//! measured iteration, after the sampler's busy-poll loop has closed, so
//! recording cost never appears inside the measured region.
//!
//! # Example
//!
//! ```
//! use accelpulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new();
//!
//! hist.record(Duration::from_micros(100));
//! hist.record(Duration::from_micros(150));
//!
//! let p50 = hist.percentile(50.0);
//! println!("p50: {:?}", p50);
//! ```

use hdrhistogram::Histogram;
use std::time::Duration;

/// Maximum trackable latency: 1 hour in nanoseconds
const MAX_LATENCY_NANOS: u64 = 3_600_000_000_000;

/// Latency histogram wrapper
///
/// Configured to track latencies from 1 nanosecond to 1 hour with 3
/// significant digits of precision (0.1% accuracy, ~2KB per histogram,
/// O(1) record and query).
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a new latency histogram
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_LATENCY_NANOS, 3)
            .expect("Failed to create histogram with valid bounds");

        Self { histogram }
    }

    /// Record a latency sample
    ///
    /// Values outside the histogram's range are clamped to the nearest
    /// valid value rather than rejected.
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let nanos = latency.as_nanos() as u64;
        let value = nanos.clamp(1, MAX_LATENCY_NANOS);
        let _ = self.histogram.record(value);
    }

    /// Get the value at a specific percentile (0.0 - 100.0)
    ///
    /// Returns None if the histogram is empty.
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.histogram.is_empty() {
            return None;
        }

        Some(Duration::from_nanos(
            self.histogram.value_at_percentile(percentile),
        ))
    }

    /// Minimum recorded latency, or None if empty
    pub fn min(&self) -> Option<Duration> {
        if self.histogram.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.min()))
    }

    /// Maximum recorded latency, or None if empty
    pub fn max(&self) -> Option<Duration> {
        if self.histogram.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.max()))
    }

    /// Mean recorded latency, or None if empty
    pub fn mean(&self) -> Option<Duration> {
        if self.histogram.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.mean() as u64))
    }

    /// Number of recorded samples
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Whether any samples have been recorded
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Merge another histogram into this one
    ///
    /// Used when aggregating per-worker iteration latencies.
    pub fn merge(&mut self, other: &LatencyHistogram) {
        self.histogram
            .add(&other.histogram)
            .expect("histograms share identical bounds");
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
