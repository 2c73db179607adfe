//! # hoststats Telemetry
//!
//! Host telemetry sampling for the hoststats agent.
//! Builds the CPU, memory, disk and network sections of a sample record from
//! a [`HostStats`] provider, and averages disk usage from a cAdvisor rolling
//! window when one is available.
//!
//! ## Providers
//!
//! - [`ProcfsHost`] reads a (possibly relocated) Linux proc filesystem, which
//!   is how a containerized agent observes the host.
//! - [`SysinfoHost`] reads the live OS through `sysinfo` on any platform.
//! - [`MockHost`] returns canned values for tests.

pub mod aggregate;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod mock;
pub mod network;
pub mod procfs;
pub mod record;
pub mod sysinfo_host;
pub mod units;

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub use disk::{DiskEntry, DiskPaths, DiskUsage};
pub use error::{Result, TelemetryError};
pub use memory::VirtualMemory;
pub use mock::MockHost;
pub use network::NetIoCounters;
pub use procfs::ProcfsHost;
pub use record::SampleRecord;
pub use sysinfo_host::SysinfoHost;
pub use units::{to_gb, Unit};

/// Source of operating system statistics.
///
/// CPU usage is a delta since the previous call, hence `&mut self`.
pub trait HostStats: Send {
    /// Utilization percentages: one per logical core, or a single combined value.
    fn cpu_percent(&mut self, per_core: bool) -> Result<Vec<f64>>;

    /// Virtual memory figures in bytes.
    fn virtual_memory(&mut self) -> Result<VirtualMemory>;

    /// Filesystem usage of `path`; [`TelemetryError::MountNotFound`] if it does not exist.
    fn disk_usage(&mut self, path: &str) -> Result<DiskUsage> {
        disk::disk_usage(Path::new(path))
    }

    /// Mount points of the mounted physical partitions.
    fn disk_partitions(&mut self) -> Result<Vec<String>> {
        Ok(disk::physical_partitions())
    }

    /// Cumulative counters keyed by interface name.
    fn net_io_counters(&mut self) -> Result<BTreeMap<String, NetIoCounters>>;
}

/// Pick the provider for `procpath`.
///
/// A proc filesystem mounted at `procpath` is read directly; otherwise the
/// live OS is sampled through `sysinfo`.
pub fn detect_host(procpath: &Path) -> Box<dyn HostStats> {
    if procfs::is_procfs_root(procpath) {
        match ProcfsHost::new(procpath) {
            Ok(host) => {
                info!(procpath = %procpath.display(), "Reading host statistics from proc path");
                return Box::new(host);
            }
            Err(e) => {
                warn!(procpath = %procpath.display(), error = %e, "Proc path unusable, falling back to live OS");
            }
        }
    } else {
        info!(procpath = %procpath.display(), "Proc path not mounted, sampling the live OS");
    }

    Box::new(SysinfoHost::new())
}
