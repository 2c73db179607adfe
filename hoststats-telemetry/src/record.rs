//! The per-cycle sample record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cpu::CpuSection;
use crate::disk::DiskEntry;
use crate::memory::MemorySection;
use crate::network::NetworkSection;

/// Status of a section or mount that was sampled successfully.
pub const STATUS_OK: &str = "OK";

/// Status of a direct-strategy mount whose path does not exist.
pub const STATUS_MOUNT_MISSING: &str = "Provided mount path does not exist ...";

/// Status of a cAdvisor device no sample in the window refers to.
pub const STATUS_NO_SAMPLES: &str = "No samples found for device ...";

/// One cycle's worth of host statistics.
///
/// Only the sections enabled in the configuration are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<BTreeMap<String, DiskEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSection>,
}

impl SampleRecord {
    /// Names of the sections present, in emission order.
    pub fn sections(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.cpu.is_some() {
            names.push("cpu");
        }
        if self.memory.is_some() {
            names.push("memory");
        }
        if self.disk.is_some() {
            names.push("disk");
        }
        if self.network.is_some() {
            names.push("network");
        }
        names
    }
}
