//! Operation abstraction
//!
//! This module defines the capability contract every benchmarkable operation
//! variant must satisfy. An operation is one asynchronously executable
//! data-processing job (a pool "slot"): it owns its input and output buffers,
//! is submitted without blocking, and reports completion through a
//! non-blocking poll. The sampler in [`crate::worker`] drives slots through
//! their lifecycle; it never looks inside them.
//!
//! # Variants
//!
//! - **Software** ([`software::SoftwareOperation`]): runs the work kernel on
//!   the calling CPU; synchronous-equivalent, completes on the first poll.
//! - **Offload** ([`offload::OffloadOperation`]): hands the kernel to an
//!   accelerator queue (emulated by per-device executor threads) and
//!   completes asynchronously.
//! - **Mock** ([`mock::MockOperation`]): deterministic test double.
//!
//! # Slot lifecycle
//!
//! ```text
//! Idle --async_submit--> InFlight --async_poll--> Completed
//!   ^                                                |
//!   +----------------- light_reset ------------------+
//!
//! Retired: terminal, reachable from any point, skipped thereafter
//! ```
//!
//! A successfully initialized operation's `async_submit`/`async_poll` do not
//! fail; operation-specific errors surface as the `Retired` status, which the
//! sampler excludes from all further accounting.

use crate::util::buffer::FillPattern;
use crate::Result;

pub mod kernel;
pub mod mock;
pub mod offload;
pub mod software;

/// Result of a non-blocking status poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    /// Submitted and not yet finished; revisit on the next sweep
    InProgress,
    /// Finished since the last reset; byte counts are valid to read now
    Completed,
    /// Permanently out of service; never counted, never resubmitted
    Retired,
}

/// Memory tier a buffer should be placed in
///
/// Mirrors the cache-control classes accelerators distinguish: payload
/// resident in DRAM versus payload warmed into the last-level cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTier {
    /// Main memory, cold
    Dram,
    /// Warmed into the last-level cache
    Cache,
}

/// Which buffer a `mem_control` call applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Input payload
    Source,
    /// Output buffer
    Destination,
}

/// What the timed region of one operation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMode {
    /// Setup plus execution
    Full,
    /// Execution only
    Partial,
}

/// Work kernel an operation executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    /// CRC-64 digest over the payload
    Checksum,
    /// Byte-for-byte copy of the payload
    Copy,
}

/// One-time setup parameters for an operation slot
#[derive(Debug, Clone)]
pub struct OpParams {
    /// Kernel to execute per submission
    pub kind: WorkKind,
    /// Input payload size in bytes
    pub payload_size: usize,
    /// Input payload content
    pub fill: FillPattern,
}

/// Capability contract for a pool slot
///
/// # Lifecycle
///
/// 1. `init()` once, then `mem_control()` for the input buffer, both before
///    the first submission
/// 2. `async_submit()` / `async_poll()` / `light_reset()` cycles for the
///    life of the run
/// 3. `async_wait()` once per slot at teardown, guaranteeing nothing is left
///    in flight before buffers are dropped
///
/// # Thread safety
///
/// Operations must be `Send` so pools can be built on one thread and run on
/// another, but each slot is owned by exactly one worker; no `Sync` required.
pub trait Operation: Send {
    /// One-time setup: allocate buffers, record placement and timing policy
    ///
    /// `node_hint` names the NUMA node whose accelerators this slot should
    /// prefer; `None` leaves placement to the variant.
    fn init(
        &mut self,
        params: &OpParams,
        output_tier: MemoryTier,
        timing: TimingMode,
        node_hint: Option<u32>,
    ) -> Result<()>;

    /// Place a buffer in the requested memory tier
    ///
    /// Called after `init` and before the first submission. Priming must
    /// complete for every slot in a pool before any slot is submitted.
    fn mem_control(&mut self, tier: MemoryTier, role: BufferRole) -> Result<()>;

    /// Begin the operation; non-blocking
    ///
    /// Only valid on an idle (fresh or light-reset) slot.
    fn async_submit(&mut self);

    /// Check progress; non-blocking, does not transfer slot ownership
    fn async_poll(&mut self) -> OpStatus;

    /// Bytes consumed by the last completed execution
    ///
    /// Valid only immediately following a `Completed` poll result.
    fn get_bytes_read(&self) -> u64;

    /// Bytes produced by the last completed execution
    ///
    /// Valid only immediately following a `Completed` poll result.
    fn get_bytes_written(&self) -> u64;

    /// Return a completed slot to submit-ready state
    ///
    /// Cheap by contract: buffers and configuration are preserved, only
    /// completion state is cleared.
    fn light_reset(&mut self);

    /// Block until the slot is no longer in flight
    ///
    /// The only blocking call in the contract; used exclusively during the
    /// teardown drain so no buffer is dropped under an in-flight job.
    fn async_wait(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_status_equality() {
        assert_eq!(OpStatus::Completed, OpStatus::Completed);
        assert_ne!(OpStatus::Completed, OpStatus::InProgress);
        assert_ne!(OpStatus::InProgress, OpStatus::Retired);
    }

    #[test]
    fn test_op_params_clone() {
        let params = OpParams {
            kind: WorkKind::Checksum,
            payload_size: 4096,
            fill: FillPattern::Random(7),
        };
        let copy = params.clone();
        assert_eq!(copy.kind, WorkKind::Checksum);
        assert_eq!(copy.payload_size, 4096);
    }
}
