//! Software-path operation
//!
//! Runs the work kernel inline on the calling CPU. Submission records the
//! pending job; the kernel executes on the first poll after submission, which
//! then reports `Completed`. One such slot per worker is the CPU-only
//! configuration: execution is synchronous-equivalent, so overlapping several
//! in-flight slots on one thread buys nothing.

use super::kernel::run_kernel;
use super::{BufferRole, MemoryTier, OpParams, OpStatus, Operation, TimingMode};
use crate::util::buffer::make_payload;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    Submitted,
    Completed,
}

/// CPU-path operation slot
pub struct SoftwareOperation {
    params: Option<OpParams>,
    input: Vec<u8>,
    output: Vec<u8>,
    state: SlotState,
    bytes_read: u64,
    bytes_written: u64,
    #[allow(dead_code)]
    timing: TimingMode,
}

impl SoftwareOperation {
    pub fn new() -> Self {
        Self {
            params: None,
            input: Vec::new(),
            output: Vec::new(),
            state: SlotState::Idle,
            bytes_read: 0,
            bytes_written: 0,
            timing: TimingMode::Full,
        }
    }
}

impl Default for SoftwareOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for SoftwareOperation {
    fn init(
        &mut self,
        params: &OpParams,
        _output_tier: MemoryTier,
        timing: TimingMode,
        _node_hint: Option<u32>,
    ) -> Result<()> {
        if params.payload_size == 0 {
            anyhow::bail!("payload size must be greater than 0");
        }

        self.input = make_payload(params.payload_size, params.fill);
        self.output = Vec::with_capacity(params.payload_size);
        self.timing = timing;
        self.params = Some(params.clone());
        self.state = SlotState::Idle;
        Ok(())
    }

    fn mem_control(&mut self, tier: MemoryTier, role: BufferRole) -> Result<()> {
        if self.params.is_none() {
            anyhow::bail!("mem_control called before init");
        }

        // Emulate tier placement: one read sweep pre-faults the pages; the
        // cache tier gets a second sweep to leave the payload warm in LLC.
        let buf = match role {
            BufferRole::Source => &self.input,
            BufferRole::Destination => &self.output,
        };
        let sweeps = match tier {
            MemoryTier::Dram => 1,
            MemoryTier::Cache => 2,
        };
        let mut sink = 0u8;
        for _ in 0..sweeps {
            for &byte in buf.iter() {
                sink = sink.wrapping_add(byte);
            }
        }
        std::hint::black_box(sink);
        Ok(())
    }

    fn async_submit(&mut self) {
        debug_assert_eq!(self.state, SlotState::Idle, "submit on non-idle slot");
        self.state = SlotState::Submitted;
    }

    fn async_poll(&mut self) -> OpStatus {
        match self.state {
            SlotState::Submitted => {
                let params = self.params.as_ref().expect("polled before init");
                let (read, written) = run_kernel(params.kind, &self.input, &mut self.output);
                self.bytes_read = read;
                self.bytes_written = written;
                self.state = SlotState::Completed;
                OpStatus::Completed
            }
            SlotState::Completed => OpStatus::Completed,
            SlotState::Idle => OpStatus::InProgress,
        }
    }

    fn get_bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn get_bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn light_reset(&mut self) {
        self.state = SlotState::Idle;
    }

    fn async_wait(&mut self) {
        // Inline execution: anything submitted finishes here, nothing can be
        // left in flight.
        if self.state == SlotState::Submitted {
            self.async_poll();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::WorkKind;
    use crate::util::buffer::FillPattern;

    fn params(kind: WorkKind, size: usize) -> OpParams {
        OpParams {
            kind,
            payload_size: size,
            fill: FillPattern::Sequential,
        }
    }

    fn init_op(kind: WorkKind, size: usize) -> SoftwareOperation {
        let mut op = SoftwareOperation::new();
        op.init(&params(kind, size), MemoryTier::Dram, TimingMode::Full, None)
            .unwrap();
        op.mem_control(MemoryTier::Dram, BufferRole::Source).unwrap();
        op
    }

    #[test]
    fn test_completes_on_first_poll() {
        let mut op = init_op(WorkKind::Checksum, 1024);
        op.async_submit();

        assert_eq!(op.async_poll(), OpStatus::Completed);
        assert_eq!(op.get_bytes_read(), 1024);
        assert_eq!(op.get_bytes_written(), 8);
    }

    #[test]
    fn test_copy_kernel_bytes() {
        let mut op = init_op(WorkKind::Copy, 512);
        op.async_submit();

        assert_eq!(op.async_poll(), OpStatus::Completed);
        assert_eq!(op.get_bytes_read(), 512);
        assert_eq!(op.get_bytes_written(), 512);
    }

    #[test]
    fn test_reset_and_resubmit() {
        let mut op = init_op(WorkKind::Checksum, 256);

        for _ in 0..3 {
            op.async_submit();
            assert_eq!(op.async_poll(), OpStatus::Completed);
            op.light_reset();
        }
    }

    #[test]
    fn test_idle_polls_in_progress() {
        let mut op = init_op(WorkKind::Checksum, 256);
        assert_eq!(op.async_poll(), OpStatus::InProgress);
    }

    #[test]
    fn test_init_rejects_empty_payload() {
        let mut op = SoftwareOperation::new();
        let result = op.init(
            &params(WorkKind::Checksum, 0),
            MemoryTier::Dram,
            TimingMode::Full,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mem_control_requires_init() {
        let mut op = SoftwareOperation::new();
        assert!(op.mem_control(MemoryTier::Cache, BufferRole::Source).is_err());
    }

    #[test]
    fn test_wait_finishes_submitted_slot() {
        let mut op = init_op(WorkKind::Copy, 128);
        op.async_submit();
        op.async_wait();

        assert_eq!(op.async_poll(), OpStatus::Completed);
    }
}
