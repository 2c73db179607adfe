//! cAdvisor response types and rolling-window filesystem averaging.
//!
//! cAdvisor keeps roughly the last 60 seconds of per-second samples. Each
//! sample lists every tracked filesystem device; averaging a device walks all
//! samples and divides by the number of samples that actually mention it, so
//! a short window right after the sidecar starts is still usable.

use serde::{Deserialize, Serialize};

/// `GET /api/{version}/machine` (only the fields we read).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineInfo {
    #[serde(default)]
    pub filesystems: Vec<MachineFilesystem>,
}

impl MachineInfo {
    /// Device names of every filesystem the sidecar tracks.
    pub fn devices(&self) -> Vec<String> {
        self.filesystems.iter().map(|fs| fs.device.clone()).collect()
    }
}

/// A filesystem entry of the machine endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineFilesystem {
    pub device: String,
}

/// `GET /api/{version}/containers` (only the fields we read).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(default)]
    pub stats: Vec<ContainerStats>,
}

/// One per-second sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub filesystem: Vec<FilesystemStats>,
}

/// Usage of one device within a sample, in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesystemStats {
    pub device: String,
    #[serde(default)]
    pub capacity: u64,
    #[serde(default)]
    pub usage: u64,
    #[serde(default)]
    pub available: u64,
}

/// Arithmetic means over the observed samples of one device, in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsAverage {
    pub total: f64,
    pub used: f64,
    pub free: f64,
    pub samples: usize,
}

/// Average capacity, usage and availability of `device` across `stats`.
///
/// Returns `None` when no sample references the device.
pub fn average_filesystem(stats: &[ContainerStats], device: &str) -> Option<FsAverage> {
    let mut capacity = 0f64;
    let mut usage = 0f64;
    let mut available = 0f64;
    let mut samples = 0usize;

    for fs in stats
        .iter()
        .flat_map(|sample| sample.filesystem.iter())
        .filter(|fs| fs.device == device)
    {
        capacity += fs.capacity as f64;
        usage += fs.usage as f64;
        available += fs.available as f64;
        samples += 1;
    }

    if samples == 0 {
        return None;
    }

    let n = samples as f64;
    Some(FsAverage {
        total: capacity / n,
        used: usage / n,
        free: available / n,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(entries: &[(&str, u64, u64, u64)]) -> ContainerStats {
        ContainerStats {
            filesystem: entries
                .iter()
                .map(|(device, capacity, usage, available)| FilesystemStats {
                    device: device.to_string(),
                    capacity: *capacity,
                    usage: *usage,
                    available: *available,
                })
                .collect(),
        }
    }

    #[test]
    fn test_average_two_samples() {
        let stats = vec![
            sample(&[("/dev/sda1", 1000, 400, 600)]),
            sample(&[("/dev/sda1", 1000, 600, 400)]),
        ];

        let avg = average_filesystem(&stats, "/dev/sda1").unwrap();
        assert_eq!(avg.total, 1000.0);
        assert_eq!(avg.used, 500.0);
        assert_eq!(avg.free, 500.0);
        assert_eq!(avg.samples, 2);
    }

    #[test]
    fn test_average_divides_by_observed_samples_only() {
        let stats = vec![
            sample(&[("/dev/sda1", 900, 300, 600), ("/dev/sdb1", 10, 1, 9)]),
            sample(&[("/dev/sdb1", 10, 3, 7)]),
            sample(&[("/dev/sdb1", 10, 5, 5)]),
        ];

        let sda = average_filesystem(&stats, "/dev/sda1").unwrap();
        assert_eq!(sda.samples, 1);
        assert_eq!(sda.used, 300.0);

        let sdb = average_filesystem(&stats, "/dev/sdb1").unwrap();
        assert_eq!(sdb.samples, 3);
        assert_eq!(sdb.used, 3.0);
        assert_eq!(sdb.free, 7.0);
    }

    #[test]
    fn test_unknown_device_has_no_average() {
        let stats = vec![sample(&[("/dev/sda1", 1000, 400, 600)])];
        assert!(average_filesystem(&stats, "/dev/nvme0n1").is_none());
        assert!(average_filesystem(&[], "/dev/sda1").is_none());
    }

    #[test]
    fn test_deserialize_cadvisor_payloads() {
        let machine: MachineInfo = serde_json::from_str(
            r#"{"num_cores": 4, "filesystems": [{"device": "/dev/sda1", "capacity": 1000, "type": "vfs"}]}"#,
        )
        .unwrap();
        assert_eq!(machine.devices(), vec!["/dev/sda1".to_string()]);

        let containers: ContainerInfo = serde_json::from_str(
            r#"{"name": "/", "stats": [
                {"timestamp": "2024-01-01T00:00:00Z", "filesystem": [
                    {"device": "/dev/sda1", "capacity": 1000, "usage": 400, "available": 600, "reads_completed": 7}
                ]},
                {"timestamp": "2024-01-01T00:00:01Z"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(containers.stats.len(), 2);
        assert!(containers.stats[1].filesystem.is_empty());
        assert_eq!(containers.stats[0].filesystem[0].usage, 400);
    }
}
