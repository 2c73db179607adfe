//! CPU utilization section.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::STATUS_OK;
use crate::HostStats;

/// CPU section of a sample record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSection {
    /// One entry per logical core, or a single entry for the combined figure
    pub utilization_pct: Vec<f64>,
    pub status: String,
}

/// Sample CPU utilization.
///
/// The combined figure is still reported as a one-element list so consumers
/// always parse a sequence. Provider failures propagate to the caller.
pub fn collect_cpu_section(host: &mut dyn HostStats, per_core: bool) -> Result<CpuSection> {
    let utilization_pct = host.cpu_percent(per_core)?;

    Ok(CpuSection {
        utilization_pct,
        status: STATUS_OK.to_string(),
    })
}
