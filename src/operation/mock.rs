//! Mock operation for testing
//!
//! A deterministic stand-in for the software and offload variants. The mock
//! reports fixed byte counts, completes after a configurable number of polls,
//! and can be told to retire after a given number of submissions. Internal
//! state lives behind `Arc<Mutex<..>>` so a test can keep a clone of the
//! handle while the harness owns the boxed slot, then assert on call counts
//! (submission order, reset-before-resubmit, drain coverage) after the run.
//!
//! # Example
//!
//! ```
//! use accelpulse::operation::mock::MockOperation;
//! use accelpulse::operation::{Operation, OpStatus};
//!
//! let mut op = MockOperation::new(4096, 8);
//! let handle = op.clone();
//!
//! op.async_submit();
//! assert_eq!(op.async_poll(), OpStatus::Completed);
//! assert_eq!(handle.submit_calls(), 1);
//! assert_eq!(op.get_bytes_read(), 4096);
//! ```

use super::{BufferRole, MemoryTier, OpParams, OpStatus, Operation, TimingMode};
use crate::Result;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockState {
    Idle,
    InFlight,
    Completed,
    Retired,
}

#[derive(Debug)]
struct Inner {
    bytes_read: u64,
    bytes_written: u64,

    /// Polls an in-flight submission absorbs before reporting Completed
    polls_until_complete: u64,
    polls_remaining: u64,

    /// Retire instead of accepting the Nth submission (1-based), if set
    retire_on_submission: Option<u64>,

    state: MockState,

    // Call counters for test assertions
    init_calls: u64,
    mem_control_calls: u64,
    submit_calls: u64,
    poll_calls: u64,
    reset_calls: u64,
    wait_calls: u64,
}

/// Configurable test double for the Operation contract
#[derive(Debug, Clone)]
pub struct MockOperation {
    inner: Arc<Mutex<Inner>>,
}

impl MockOperation {
    /// Create a mock that completes on the first poll after each submission
    pub fn new(bytes_read: u64, bytes_written: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                bytes_read,
                bytes_written,
                polls_until_complete: 0,
                polls_remaining: 0,
                retire_on_submission: None,
                state: MockState::Idle,
                init_calls: 0,
                mem_control_calls: 0,
                submit_calls: 0,
                poll_calls: 0,
                reset_calls: 0,
                wait_calls: 0,
            })),
        }
    }

    /// Absorb `polls` in-progress polls before each completion
    pub fn with_completion_after_polls(self, polls: u64) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.polls_until_complete = polls;
        }
        self
    }

    /// Retire instead of accepting submission number `n` (1-based)
    pub fn with_retirement_on_submission(self, n: u64) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.retire_on_submission = Some(n);
        }
        self
    }

    /// Whether the slot has reached the retired state
    pub fn is_retired(&self) -> bool {
        self.inner.lock().unwrap().state == MockState::Retired
    }

    pub fn init_calls(&self) -> u64 {
        self.inner.lock().unwrap().init_calls
    }

    pub fn mem_control_calls(&self) -> u64 {
        self.inner.lock().unwrap().mem_control_calls
    }

    pub fn submit_calls(&self) -> u64 {
        self.inner.lock().unwrap().submit_calls
    }

    pub fn poll_calls(&self) -> u64 {
        self.inner.lock().unwrap().poll_calls
    }

    pub fn reset_calls(&self) -> u64 {
        self.inner.lock().unwrap().reset_calls
    }

    pub fn wait_calls(&self) -> u64 {
        self.inner.lock().unwrap().wait_calls
    }
}

impl Operation for MockOperation {
    fn init(
        &mut self,
        _params: &OpParams,
        _output_tier: MemoryTier,
        _timing: TimingMode,
        _node_hint: Option<u32>,
    ) -> Result<()> {
        self.inner.lock().unwrap().init_calls += 1;
        Ok(())
    }

    fn mem_control(&mut self, _tier: MemoryTier, _role: BufferRole) -> Result<()> {
        self.inner.lock().unwrap().mem_control_calls += 1;
        Ok(())
    }

    fn async_submit(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == MockState::Retired {
            return;
        }
        inner.submit_calls += 1;

        if let Some(n) = inner.retire_on_submission {
            if inner.submit_calls >= n {
                inner.state = MockState::Retired;
                return;
            }
        }

        inner.polls_remaining = inner.polls_until_complete;
        inner.state = MockState::InFlight;
    }

    fn async_poll(&mut self) -> OpStatus {
        let mut inner = self.inner.lock().unwrap();
        inner.poll_calls += 1;
        match inner.state {
            MockState::InFlight => {
                if inner.polls_remaining == 0 {
                    inner.state = MockState::Completed;
                    OpStatus::Completed
                } else {
                    inner.polls_remaining -= 1;
                    OpStatus::InProgress
                }
            }
            MockState::Completed => OpStatus::Completed,
            MockState::Retired => OpStatus::Retired,
            MockState::Idle => OpStatus::InProgress,
        }
    }

    fn get_bytes_read(&self) -> u64 {
        self.inner.lock().unwrap().bytes_read
    }

    fn get_bytes_written(&self) -> u64 {
        self.inner.lock().unwrap().bytes_written
    }

    fn light_reset(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.reset_calls += 1;
        if inner.state != MockState::Retired {
            inner.state = MockState::Idle;
        }
    }

    fn async_wait(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.wait_calls += 1;
        // Nothing runs in the background; an in-flight submission is simply
        // declared finished.
        if inner.state == MockState::InFlight {
            inner.state = MockState::Completed;
        }
    }
}
