//! CPU affinity placement and binding
//!
//! Worker threads are pinned to cores chosen from accelerator topology:
//! threads are grouped by device affinity first (round-robin over devices),
//! then spread across the cores of the cluster serving that device, wrapped
//! to stay within one socket. This keeps a worker's cross-device memory
//! traffic local to the NUMA domain its accelerator lives in.
//!
//! Binding is a performance optimization, never a correctness requirement:
//! when the OS call fails the caller logs a warning and continues on default
//! scheduling, and when no accelerator is visible no binding happens at all.
//!
//! # Platform Support
//!
//! CPU affinity is applied on Linux via `sched_setaffinity`. On other
//! platforms the bind call reports an error, which callers treat as the
//! non-fatal fallback case.

use crate::Result;
use anyhow::Context;

/// Compute the target CPU core for a worker thread
///
/// Placement formula:
///
/// ```text
/// cpu = ((thread_index mod devices) * cores_per_cluster
///        + thread_index div devices) mod cores_per_socket
/// ```
///
/// Returns `None` when no accelerator is visible (`devices == 0`): CPU-only
/// measurement gains nothing from device-locality pinning and should not
/// constrain the OS scheduler. A zero `cores_per_socket` also yields `None`
/// rather than a division by zero.
///
/// # Example
///
/// ```
/// use accelpulse::worker::affinity::placement_cpu;
///
/// // Two devices, 4-core clusters, 8-core socket, thread 5
/// assert_eq!(placement_cpu(5, 2, 4, 8), Some(6));
/// // No devices: no pinning
/// assert_eq!(placement_cpu(5, 0, 4, 8), None);
/// ```
pub fn placement_cpu(
    thread_index: usize,
    devices: u32,
    cores_per_cluster: u32,
    cores_per_socket: u32,
) -> Option<usize> {
    if devices == 0 || cores_per_socket == 0 {
        return None;
    }

    let devices = devices as usize;
    let cluster = cores_per_cluster as usize;
    let socket = cores_per_socket as usize;

    Some(((thread_index % devices) * cluster + thread_index / devices) % socket)
}

/// Pin the current OS thread to exactly one CPU core
///
/// # Errors
///
/// Returns an error if the core ID is out of range or the syscall fails.
/// Callers treat failure as a warning, not a fatal condition.
#[cfg(target_os = "linux")]
pub fn bind_to_core(core: usize) -> Result<()> {
    use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
    use std::mem;

    if core >= 1024 {
        anyhow::bail!("CPU core ID {} is too large (max 1023)", core);
    }

    unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);
        CPU_SET(core, &mut cpu_set);

        // pid 0 = current thread
        let result = sched_setaffinity(0, mem::size_of::<cpu_set_t>(), &cpu_set);

        if result != 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!("Failed to pin thread to core {}", core));
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn bind_to_core(_core: usize) -> Result<()> {
    anyhow::bail!("CPU affinity is only supported on Linux")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_two_devices_thread_five() {
        // ((5 mod 2) * 4 + 5 div 2) mod 8 = (4 + 2) mod 8 = 6
        assert_eq!(placement_cpu(5, 2, 4, 8), Some(6));
    }

    #[test]
    fn test_placement_round_robin_over_devices() {
        // Threads 0..4 with 2 devices and 4-core clusters alternate clusters
        assert_eq!(placement_cpu(0, 2, 4, 8), Some(0));
        assert_eq!(placement_cpu(1, 2, 4, 8), Some(4));
        assert_eq!(placement_cpu(2, 2, 4, 8), Some(1));
        assert_eq!(placement_cpu(3, 2, 4, 8), Some(5));
    }

    #[test]
    fn test_placement_wraps_within_socket() {
        assert_eq!(placement_cpu(16, 2, 4, 8), Some(0));
    }

    #[test]
    fn test_placement_no_devices() {
        assert_eq!(placement_cpu(0, 0, 4, 8), None);
        assert_eq!(placement_cpu(7, 0, 4, 8), None);
    }

    #[test]
    fn test_placement_zero_socket() {
        assert_eq!(placement_cpu(0, 2, 4, 0), None);
    }

    #[test]
    fn test_bind_to_core_rejects_huge_core() {
        assert!(bind_to_core(9999).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_bind_to_core_zero() {
        // Core 0 exists on any machine this test runs on
        assert!(bind_to_core(0).is_ok());
    }
}
