//! Portable host statistics backed by `sysinfo`.

use std::collections::BTreeMap;
use sysinfo::{Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::memory::VirtualMemory;
use crate::network::NetIoCounters;
use crate::units::{percent_of, round_to};
use crate::HostStats;

/// Host statistics from the live OS through `sysinfo`.
///
/// Drop counters are not exposed by `sysinfo` and are reported as zero.
pub struct SysinfoHost {
    system: System,
    networks: Networks,
}

impl SysinfoHost {
    /// Create the provider and take the CPU usage baseline.
    ///
    /// CPU usage needs two refreshes to compute a delta, so this blocks for
    /// [`MINIMUM_CPU_UPDATE_INTERVAL`].
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();

        debug!(cores = system.cpus().len(), "sysinfo provider initialized");

        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats for SysinfoHost {
    fn cpu_percent(&mut self, per_core: bool) -> Result<Vec<f64>> {
        self.system.refresh_cpu_usage();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(TelemetryError::Unavailable("cpu usage"));
        }

        if per_core {
            Ok(cpus
                .iter()
                .map(|cpu| round_to(cpu.cpu_usage() as f64, 1))
                .collect())
        } else {
            Ok(vec![round_to(self.system.global_cpu_usage() as f64, 1)])
        }
    }

    fn virtual_memory(&mut self) -> Result<VirtualMemory> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(TelemetryError::Unavailable("total memory"));
        }
        let available = self.system.available_memory();

        Ok(VirtualMemory {
            total,
            available,
            used: self.system.used_memory(),
            free: self.system.free_memory(),
            percent: percent_of(total.saturating_sub(available) as f64, total as f64, 1),
        })
    }

    fn net_io_counters(&mut self) -> Result<BTreeMap<String, NetIoCounters>> {
        self.networks.refresh();

        Ok(self
            .networks
            .list()
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    NetIoCounters {
                        bytes_sent: data.total_transmitted(),
                        bytes_recv: data.total_received(),
                        packets_sent: data.total_packets_transmitted(),
                        packets_recv: data.total_packets_received(),
                        errin: data.total_errors_on_received(),
                        errout: data.total_errors_on_transmitted(),
                        dropin: 0,
                        dropout: 0,
                    },
                )
            })
            .collect())
    }
}
