//! Network interface counters section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

use crate::error::Result;
use crate::record::STATUS_OK;
use crate::HostStats;

/// Key used for the aggregate entry when per-interface reporting is off.
pub const ALL_NIC_KEY: &str = "allnic";

/// Cumulative I/O counters for one interface (or the sum of all of them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetIoCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    /// Receive errors
    pub errin: u64,
    /// Transmit errors
    pub errout: u64,
    /// Dropped incoming packets
    pub dropin: u64,
    /// Dropped outgoing packets
    pub dropout: u64,
}

impl AddAssign for NetIoCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.bytes_sent = self.bytes_sent.saturating_add(rhs.bytes_sent);
        self.bytes_recv = self.bytes_recv.saturating_add(rhs.bytes_recv);
        self.packets_sent = self.packets_sent.saturating_add(rhs.packets_sent);
        self.packets_recv = self.packets_recv.saturating_add(rhs.packets_recv);
        self.errin = self.errin.saturating_add(rhs.errin);
        self.errout = self.errout.saturating_add(rhs.errout);
        self.dropin = self.dropin.saturating_add(rhs.dropin);
        self.dropout = self.dropout.saturating_add(rhs.dropout);
    }
}

/// Network section of a sample record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    pub interfaces: BTreeMap<String, NetIoCounters>,
    pub status: String,
}

/// Shape per-interface counters into the reported mapping.
///
/// With `per_nic` the mapping is keyed by interface name; otherwise every
/// interface is summed into a single [`ALL_NIC_KEY`] entry.
pub fn normalize_interfaces(
    counters: BTreeMap<String, NetIoCounters>,
    per_nic: bool,
) -> BTreeMap<String, NetIoCounters> {
    if per_nic {
        return counters;
    }

    let mut total = NetIoCounters::default();
    for nic in counters.into_values() {
        total += nic;
    }

    BTreeMap::from([(ALL_NIC_KEY.to_string(), total)])
}

/// Sample network counters. Provider failures propagate to the caller.
pub fn collect_network_section(host: &mut dyn HostStats, per_nic: bool) -> Result<NetworkSection> {
    let counters = host.net_io_counters()?;

    Ok(NetworkSection {
        interfaces: normalize_interfaces(counters, per_nic),
        status: STATUS_OK.to_string(),
    })
}
