//! Offload-path operation
//!
//! Emulates a hardware accelerator with one executor thread per device. Each
//! slot's submission is a message on the device's queue; the executor runs
//! the work kernel and flips the slot's shared state to completed. Polling
//! reads that state without blocking, so the sampler sees the same regime a
//! real offload engine presents: submit returns immediately, completion
//! arrives on its own schedule, and multiple slots overlap in flight.
//!
//! A real accelerator backend would replace the executor threads with driver
//! calls behind the same [`Operation`] impl; the harness never knows the
//! difference.

use super::kernel::run_kernel;
use super::{BufferRole, MemoryTier, OpParams, OpStatus, Operation, TimingMode, WorkKind};
use crate::util::buffer::make_payload;
use crate::Result;
use crossbeam::channel::{unbounded, Sender};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

const STATE_IDLE: u8 = 0;
const STATE_IN_FLIGHT: u8 = 1;
const STATE_COMPLETED: u8 = 2;
const STATE_RETIRED: u8 = 3;

/// Completion state shared between a slot and its device executor
#[derive(Debug)]
struct SlotShared {
    state: AtomicU8,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

impl SlotShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_IDLE),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }
}

/// One queued execution
struct Job {
    kind: WorkKind,
    input: Arc<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
    slot: Arc<SlotShared>,
}

/// Emulated accelerator devices
///
/// Spawns one executor thread per device at startup; shared by every worker
/// whose slots target the offload path. Dropping the pool closes the queues
/// and joins the executors.
pub struct DevicePool {
    queues: Vec<Sender<Job>>,
    executors: Vec<JoinHandle<()>>,
}

impl DevicePool {
    /// Spawn `devices` executor threads
    pub fn new(devices: usize) -> Self {
        let mut queues = Vec::with_capacity(devices);
        let mut executors = Vec::with_capacity(devices);

        for device in 0..devices {
            let (tx, rx) = unbounded::<Job>();
            let handle = std::thread::Builder::new()
                .name(format!("accel-dev-{}", device))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let mut output = job.output.lock().unwrap();
                        let (read, written) = run_kernel(job.kind, &job.input, &mut output);
                        drop(output);

                        job.slot.bytes_read.store(read, Ordering::Relaxed);
                        job.slot.bytes_written.store(written, Ordering::Relaxed);
                        job.slot.state.store(STATE_COMPLETED, Ordering::Release);
                    }
                })
                .expect("failed to spawn device executor thread");

            queues.push(tx);
            executors.push(handle);
        }

        Self { queues, executors }
    }

    /// Number of emulated devices
    pub fn device_count(&self) -> usize {
        self.queues.len()
    }

    fn queue(&self, device: usize) -> &Sender<Job> {
        &self.queues[device % self.queues.len()]
    }
}

impl Drop for DevicePool {
    fn drop(&mut self) {
        // Closing the channels ends the executor loops
        self.queues.clear();
        for handle in self.executors.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Offload-path operation slot bound to one device queue
pub struct OffloadOperation {
    pool: Arc<DevicePool>,
    device: usize,
    kind: WorkKind,
    input: Arc<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
    slot: Arc<SlotShared>,
    initialized: bool,
}

impl OffloadOperation {
    /// Create a slot targeting the given device of the pool
    pub fn new(pool: Arc<DevicePool>, device: usize) -> Self {
        Self {
            pool,
            device,
            kind: WorkKind::Checksum,
            input: Arc::new(Vec::new()),
            output: Arc::new(Mutex::new(Vec::new())),
            slot: Arc::new(SlotShared::new()),
            initialized: false,
        }
    }
}

impl Operation for OffloadOperation {
    fn init(
        &mut self,
        params: &OpParams,
        _output_tier: MemoryTier,
        _timing: TimingMode,
        node_hint: Option<u32>,
    ) -> Result<()> {
        if params.payload_size == 0 {
            anyhow::bail!("payload size must be greater than 0");
        }
        if self.pool.device_count() == 0 {
            anyhow::bail!("offload path requires at least one accelerator device");
        }

        // The node hint folds into device selection: stay on the queue group
        // the worker's placement already chose, offset by node.
        if let Some(node) = node_hint {
            self.device = (self.device + node as usize) % self.pool.device_count();
        }

        self.kind = params.kind;
        self.input = Arc::new(make_payload(params.payload_size, params.fill));
        self.output = Arc::new(Mutex::new(Vec::with_capacity(params.payload_size)));
        self.slot = Arc::new(SlotShared::new());
        self.initialized = true;
        Ok(())
    }

    fn mem_control(&mut self, tier: MemoryTier, role: BufferRole) -> Result<()> {
        if !self.initialized {
            anyhow::bail!("mem_control called before init");
        }

        // Same tier emulation as the software path: sweep to pre-fault, twice
        // to warm the cache tier.
        let sweeps = match tier {
            MemoryTier::Dram => 1,
            MemoryTier::Cache => 2,
        };
        let mut sink = 0u8;
        match role {
            BufferRole::Source => {
                for _ in 0..sweeps {
                    for &byte in self.input.iter() {
                        sink = sink.wrapping_add(byte);
                    }
                }
            }
            BufferRole::Destination => {
                let output = self.output.lock().unwrap();
                for _ in 0..sweeps {
                    for &byte in output.iter() {
                        sink = sink.wrapping_add(byte);
                    }
                }
            }
        }
        std::hint::black_box(sink);
        Ok(())
    }

    fn async_submit(&mut self) {
        self.slot.state.store(STATE_IN_FLIGHT, Ordering::Release);

        let job = Job {
            kind: self.kind,
            input: Arc::clone(&self.input),
            output: Arc::clone(&self.output),
            slot: Arc::clone(&self.slot),
        };

        // A dead executor means the device is gone for good: retire the slot
        // so the sampler stops touching it.
        if self.pool.queue(self.device).send(job).is_err() {
            self.slot.state.store(STATE_RETIRED, Ordering::Release);
        }
    }

    fn async_poll(&mut self) -> OpStatus {
        match self.slot.state.load(Ordering::Acquire) {
            STATE_COMPLETED => OpStatus::Completed,
            STATE_RETIRED => OpStatus::Retired,
            _ => OpStatus::InProgress,
        }
    }

    fn get_bytes_read(&self) -> u64 {
        self.slot.bytes_read.load(Ordering::Relaxed)
    }

    fn get_bytes_written(&self) -> u64 {
        self.slot.bytes_written.load(Ordering::Relaxed)
    }

    fn light_reset(&mut self) {
        self.slot.state.store(STATE_IDLE, Ordering::Release);
    }

    fn async_wait(&mut self) {
        while self.slot.state.load(Ordering::Acquire) == STATE_IN_FLIGHT {
            std::thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::buffer::FillPattern;
    use std::time::{Duration, Instant};

    fn params(size: usize) -> OpParams {
        OpParams {
            kind: WorkKind::Checksum,
            payload_size: size,
            fill: FillPattern::Sequential,
        }
    }

    fn poll_until_terminal(op: &mut OffloadOperation) -> OpStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match op.async_poll() {
                OpStatus::InProgress => {
                    assert!(Instant::now() < deadline, "operation never completed");
                    std::thread::yield_now();
                }
                status => return status,
            }
        }
    }

    #[test]
    fn test_submit_poll_complete() {
        let pool = Arc::new(DevicePool::new(1));
        let mut op = OffloadOperation::new(Arc::clone(&pool), 0);
        op.init(&params(2048), MemoryTier::Dram, TimingMode::Full, None)
            .unwrap();
        op.mem_control(MemoryTier::Dram, BufferRole::Source).unwrap();

        op.async_submit();
        assert_eq!(poll_until_terminal(&mut op), OpStatus::Completed);
        assert_eq!(op.get_bytes_read(), 2048);
        assert_eq!(op.get_bytes_written(), 8);
    }

    #[test]
    fn test_reset_resubmit_cycle() {
        let pool = Arc::new(DevicePool::new(2));
        let mut op = OffloadOperation::new(Arc::clone(&pool), 1);
        op.init(&params(512), MemoryTier::Cache, TimingMode::Partial, None)
            .unwrap();
        op.mem_control(MemoryTier::Cache, BufferRole::Source).unwrap();

        for _ in 0..5 {
            op.async_submit();
            assert_eq!(poll_until_terminal(&mut op), OpStatus::Completed);
            op.light_reset();
            assert_eq!(op.async_poll(), OpStatus::InProgress);
        }
    }

    #[test]
    fn test_wait_drains_in_flight() {
        let pool = Arc::new(DevicePool::new(1));
        let mut op = OffloadOperation::new(Arc::clone(&pool), 0);
        op.init(&params(65536), MemoryTier::Dram, TimingMode::Full, None)
            .unwrap();

        op.async_submit();
        op.async_wait();

        // After the blocking wait the slot must be terminal
        assert_ne!(op.async_poll(), OpStatus::InProgress);
    }

    #[test]
    fn test_many_slots_one_device() {
        let pool = Arc::new(DevicePool::new(1));
        let mut ops: Vec<OffloadOperation> = (0..8)
            .map(|_| {
                let mut op = OffloadOperation::new(Arc::clone(&pool), 0);
                op.init(&params(256), MemoryTier::Dram, TimingMode::Full, None)
                    .unwrap();
                op
            })
            .collect();

        for op in &mut ops {
            op.async_submit();
        }
        for op in &mut ops {
            assert_eq!(poll_until_terminal(op), OpStatus::Completed);
        }
    }

    #[test]
    fn test_node_hint_wraps_device_selection() {
        let pool = Arc::new(DevicePool::new(2));
        let mut op = OffloadOperation::new(Arc::clone(&pool), 1);
        op.init(&params(64), MemoryTier::Dram, TimingMode::Full, Some(1))
            .unwrap();

        assert_eq!(op.device, 0);
    }

    #[test]
    fn test_init_rejects_empty_payload() {
        let pool = Arc::new(DevicePool::new(1));
        let mut op = OffloadOperation::new(pool, 0);
        assert!(op
            .init(&params(0), MemoryTier::Dram, TimingMode::Full, None)
            .is_err());
    }
}
