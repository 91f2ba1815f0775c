//! accelpulse - Accelerator offload throughput benchmark
//!
//! accelpulse measures sustained throughput of asynchronous, hardware-offloadable
//! data-processing operations under controlled concurrency: a fixed worker thread
//! count, a fixed in-flight queue depth, and NUMA/accelerator-aware CPU placement.
//!
//! # Architecture
//!
//! - **Pluggable operations**: software (CPU) path and offload path behind one trait
//! - **Busy-poll sampler**: continuous-refill loop that keeps the queue saturated
//! - **Topology-aware placement**: worker threads pinned near their accelerator
//! - **Per-worker statistics**: completion and byte counters, normalized per iteration

pub mod config;
pub mod operation;
pub mod output;
pub mod stats;
pub mod timing;
pub mod topology;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use operation::Operation;
pub use stats::RunStatistics;

/// Result type used throughout accelpulse
pub type Result<T> = anyhow::Result<T>;
