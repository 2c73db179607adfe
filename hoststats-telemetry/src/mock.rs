//! In-memory host statistics for tests and development.

use std::collections::BTreeMap;

use crate::disk::DiskUsage;
use crate::error::{Result, TelemetryError};
use crate::memory::VirtualMemory;
use crate::network::NetIoCounters;
use crate::HostStats;

/// Host statistics provider returning canned values.
///
/// Disk paths that were not registered with [`MockHost::with_disk`] behave
/// like missing mounts.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    per_core: Vec<f64>,
    combined: f64,
    memory: VirtualMemory,
    disks: BTreeMap<String, DiskUsage>,
    partitions: Vec<String>,
    nics: BTreeMap<String, NetIoCounters>,
    fail_cpu: bool,
    fail_memory: bool,
    fail_network: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            per_core: vec![0.0],
            ..Self::default()
        }
    }

    pub fn with_cpu(mut self, per_core: Vec<f64>, combined: f64) -> Self {
        self.per_core = per_core;
        self.combined = combined;
        self
    }

    pub fn with_memory(mut self, memory: VirtualMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_disk(mut self, mount: &str, usage: DiskUsage) -> Self {
        self.disks.insert(mount.to_string(), usage);
        self
    }

    pub fn with_partitions(mut self, mounts: &[&str]) -> Self {
        self.partitions = mounts.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_nic(mut self, name: &str, counters: NetIoCounters) -> Self {
        self.nics.insert(name.to_string(), counters);
        self
    }

    pub fn failing_cpu(mut self) -> Self {
        self.fail_cpu = true;
        self
    }

    pub fn failing_memory(mut self) -> Self {
        self.fail_memory = true;
        self
    }

    pub fn failing_network(mut self) -> Self {
        self.fail_network = true;
        self
    }
}

impl HostStats for MockHost {
    fn cpu_percent(&mut self, per_core: bool) -> Result<Vec<f64>> {
        if self.fail_cpu {
            return Err(TelemetryError::Unavailable("cpu usage"));
        }
        if per_core {
            Ok(self.per_core.clone())
        } else {
            Ok(vec![self.combined])
        }
    }

    fn virtual_memory(&mut self) -> Result<VirtualMemory> {
        if self.fail_memory {
            return Err(TelemetryError::Unavailable("total memory"));
        }
        Ok(self.memory)
    }

    fn disk_usage(&mut self, path: &str) -> Result<DiskUsage> {
        self.disks
            .get(path)
            .copied()
            .ok_or_else(|| TelemetryError::MountNotFound(path.to_string()))
    }

    fn disk_partitions(&mut self) -> Result<Vec<String>> {
        Ok(self.partitions.clone())
    }

    fn net_io_counters(&mut self) -> Result<BTreeMap<String, NetIoCounters>> {
        if self.fail_network {
            return Err(TelemetryError::Unavailable("network counters"));
        }
        Ok(self.nics.clone())
    }
}
