//! Accelerator and CPU topology discovery
//!
//! The placement and pool-sizing logic needs four facts about the machine:
//! how many accelerator devices are visible, how many physical cores share a
//! cluster, how many physical cores share a socket, and how many accelerator
//! instances each NUMA node can see. This module discovers them from sysfs
//! on Linux and accepts explicit overrides everywhere, so runs on machines
//! without accelerators (or on other platforms) can still exercise the
//! offload path against emulated devices.
//!
//! # Platform Support
//!
//! Accelerator discovery reads `/sys/bus/dsa/devices` (Intel DSA/IAA device
//! class). CPU topology reads `/sys/devices/system/cpu/cpu*/topology`. On
//! non-Linux platforms, discovery returns a CPU-only topology and relies on
//! overrides for offload runs.

use std::path::Path;

/// Machine topology as seen by the harness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Accelerator devices visible system-wide
    pub total_devices: u32,
    /// Physical cores per cluster
    pub cpu_physical_per_cluster: u32,
    /// Physical cores per socket
    pub cpu_physical_per_socket: u32,
    /// Accelerator instances visible per NUMA node (index = node id)
    pub devices_per_node: Vec<u32>,
}

impl Topology {
    /// Discover the running machine's topology
    pub fn discover() -> Self {
        let (cores_per_socket, cores_per_cluster) = discover_cpu_layout();
        let devices_per_node = discover_accel_devices();
        let total_devices = devices_per_node.iter().sum();

        Self {
            total_devices,
            cpu_physical_per_cluster: cores_per_cluster,
            cpu_physical_per_socket: cores_per_socket,
            devices_per_node,
        }
    }

    /// Build a topology from explicit values (tests, CLI overrides)
    pub fn with_values(
        total_devices: u32,
        cpu_physical_per_cluster: u32,
        cpu_physical_per_socket: u32,
    ) -> Self {
        Self {
            total_devices,
            cpu_physical_per_cluster,
            cpu_physical_per_socket,
            // Without per-node detail, attribute everything to node 0
            devices_per_node: vec![total_devices],
        }
    }

    /// Accelerator instances visible from the given NUMA node
    ///
    /// With no node hint, or a hint outside the known node range, the
    /// system-wide device count applies.
    pub fn devices_on_node(&self, node: Option<u32>) -> u32 {
        match node {
            Some(n) if (n as usize) < self.devices_per_node.len() => {
                self.devices_per_node[n as usize]
            }
            _ => self.total_devices,
        }
    }
}

/// Count accelerator instances per NUMA node via the DSA device class
#[cfg(target_os = "linux")]
fn discover_accel_devices() -> Vec<u32> {
    let mut per_node: Vec<u32> = Vec::new();

    let entries = match std::fs::read_dir("/sys/bus/dsa/devices") {
        Ok(entries) => entries,
        Err(_) => return per_node,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Device nodes are named dsa<N>/iax<N>; work queues (wq*) and
        // engines are children, not devices.
        if !name.starts_with("dsa") && !name.starts_with("iax") {
            continue;
        }

        let node = read_sysfs_u32(&entry.path().join("numa_node")).unwrap_or(0);
        let idx = node as usize;
        if per_node.len() <= idx {
            per_node.resize(idx + 1, 0);
        }
        per_node[idx] += 1;
    }

    per_node
}

#[cfg(not(target_os = "linux"))]
fn discover_accel_devices() -> Vec<u32> {
    Vec::new()
}

/// (physical cores per socket, physical cores per cluster)
#[cfg(target_os = "linux")]
fn discover_cpu_layout() -> (u32, u32) {
    use std::collections::HashSet;

    let mut socket0_cores: HashSet<u32> = HashSet::new();
    let mut cluster_of_core: std::collections::HashMap<u32, u32> =
        std::collections::HashMap::new();

    let entries = match std::fs::read_dir("/sys/devices/system/cpu") {
        Ok(entries) => entries,
        Err(_) => return fallback_cpu_layout(),
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("cpu") || !name[3..].chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let topo = entry.path().join("topology");
        let package = read_sysfs_u32(&topo.join("physical_package_id"));
        let core = read_sysfs_u32(&topo.join("core_id"));

        if let (Some(0), Some(core)) = (package, core) {
            socket0_cores.insert(core);
            if let Some(cluster) = read_sysfs_u32(&topo.join("cluster_id")) {
                cluster_of_core.insert(core, cluster);
            }
        }
    }

    if socket0_cores.is_empty() {
        return fallback_cpu_layout();
    }

    let cores_per_socket = socket0_cores.len() as u32;

    // Cores per cluster: size of the largest cluster on socket 0. Kernels
    // without cluster reporting collapse to one cluster per socket.
    let cores_per_cluster = if cluster_of_core.is_empty() {
        cores_per_socket
    } else {
        let mut counts: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
        for cluster in cluster_of_core.values() {
            *counts.entry(*cluster).or_insert(0) += 1;
        }
        counts.values().copied().max().unwrap_or(cores_per_socket)
    };

    (cores_per_socket, cores_per_cluster)
}

#[cfg(not(target_os = "linux"))]
fn discover_cpu_layout() -> (u32, u32) {
    fallback_cpu_layout()
}

fn fallback_cpu_layout() -> (u32, u32) {
    let physical = num_cpus::get_physical().max(1) as u32;
    (physical, physical)
}

fn read_sysfs_u32(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_values() {
        let topo = Topology::with_values(4, 8, 32);
        assert_eq!(topo.total_devices, 4);
        assert_eq!(topo.cpu_physical_per_cluster, 8);
        assert_eq!(topo.cpu_physical_per_socket, 32);
        assert_eq!(topo.devices_per_node, vec![4]);
    }

    #[test]
    fn test_devices_on_node() {
        let mut topo = Topology::with_values(6, 4, 16);
        topo.devices_per_node = vec![4, 2];

        assert_eq!(topo.devices_on_node(Some(0)), 4);
        assert_eq!(topo.devices_on_node(Some(1)), 2);
        // Unknown node falls back to the system-wide count
        assert_eq!(topo.devices_on_node(Some(5)), 6);
        assert_eq!(topo.devices_on_node(None), 6);
    }

    #[test]
    fn test_discover_is_sane() {
        let topo = Topology::discover();
        assert!(topo.cpu_physical_per_socket >= 1);
        assert!(topo.cpu_physical_per_cluster >= 1);
        assert!(topo.cpu_physical_per_cluster <= topo.cpu_physical_per_socket);
    }

    #[test]
    fn test_fallback_layout_nonzero() {
        let (socket, cluster) = fallback_cpu_layout();
        assert!(socket >= 1);
        assert_eq!(socket, cluster);
    }
}
