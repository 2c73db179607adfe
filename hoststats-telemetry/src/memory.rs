//! Memory utilization section.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::STATUS_OK;
use crate::units::Unit;
use crate::HostStats;

/// Virtual memory figures in bytes as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    /// Percentage of memory in use, already rounded by the provider
    pub percent: f64,
}

/// Memory section of a sample record.
///
/// Platform specific fields (buffers, cached, shared) are not reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySection {
    pub total: f64,
    pub available: f64,
    pub percent: f64,
    pub used: f64,
    pub free: f64,
    pub status: String,
}

impl MemorySection {
    /// Build the section from raw provider figures in the requested unit.
    pub fn from_virtual_memory(memory: &VirtualMemory, unit: Unit) -> Self {
        Self {
            total: unit.convert(memory.total as f64),
            available: unit.convert(memory.available as f64),
            percent: memory.percent,
            used: unit.convert(memory.used as f64),
            free: unit.convert(memory.free as f64),
            status: STATUS_OK.to_string(),
        }
    }
}

/// Sample memory utilization. Provider failures propagate to the caller.
pub fn collect_memory_section(host: &mut dyn HostStats, unit: Unit) -> Result<MemorySection> {
    let memory = host.virtual_memory()?;
    Ok(MemorySection::from_virtual_memory(&memory, unit))
}
