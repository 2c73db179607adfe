//! Disk usage section.
//!
//! Usage is sourced either directly from the OS (`statvfs` on each mount
//! path) or from a cAdvisor rolling window averaged per device. Each mount is
//! handled on its own: a failure on one mount only changes that entry's
//! status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use sysinfo::Disks;
use tracing::debug;

use crate::aggregate::{average_filesystem, ContainerStats, FsAverage};
use crate::error::{Result, TelemetryError};
use crate::record::{STATUS_MOUNT_MISSING, STATUS_NO_SAMPLES, STATUS_OK};
use crate::units::{percent_of, Unit};
use crate::HostStats;

/// Filesystem usage of one path in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// Used share of the space available to unprivileged users, 1 decimal
    pub percent: f64,
}

/// Which mounts (or cAdvisor devices) to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskPaths {
    /// `all` / `default`: discover the targets
    Auto,
    /// Explicit comma separated list
    Explicit(Vec<String>),
}

impl DiskPaths {
    /// Parse the `diskpaths` option.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("default")
        {
            return DiskPaths::Auto;
        }

        let paths: Vec<String> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        if paths.is_empty() {
            DiskPaths::Auto
        } else {
            DiskPaths::Explicit(paths)
        }
    }
}

/// One mount (or device) entry of the disk section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub status: String,
}

impl DiskEntry {
    /// Entry for a successful direct query.
    pub fn from_usage(usage: &DiskUsage, unit: Unit) -> Self {
        Self {
            total: Some(unit.convert(usage.total as f64)),
            used: Some(unit.convert(usage.used as f64)),
            free: Some(unit.convert(usage.free as f64)),
            percent: Some(usage.percent),
            status: STATUS_OK.to_string(),
        }
    }

    /// Entry carrying only a failure status.
    pub fn failed(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    /// Entry for a cAdvisor averaged device.
    ///
    /// The percentage is the ratio of the unrounded means, so it is the same
    /// whichever unit the amounts are reported in. A device without samples
    /// reports zeroes.
    pub fn from_average(average: Option<FsAverage>, unit: Unit) -> Self {
        match average {
            Some(avg) => Self {
                total: Some(unit.convert(avg.total)),
                used: Some(unit.convert(avg.used)),
                free: Some(unit.convert(avg.free)),
                percent: Some(percent_of(avg.used, avg.total, 2)),
                status: STATUS_OK.to_string(),
            },
            None => Self {
                total: Some(0.0),
                used: Some(0.0),
                free: Some(0.0),
                percent: Some(0.0),
                status: STATUS_NO_SAMPLES.to_string(),
            },
        }
    }
}

/// Query filesystem usage of `path` with `statvfs`.
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
pub fn disk_usage(path: &Path) -> Result<DiskUsage> {
    use nix::errno::Errno;
    use nix::sys::statvfs::statvfs;

    let stat = statvfs(path).map_err(|errno| match errno {
        Errno::ENOENT | Errno::ENOTDIR => TelemetryError::MountNotFound(path.display().to_string()),
        other => TelemetryError::DiskQuery {
            path: path.display().to_string(),
            reason: other.desc().to_string(),
        },
    })?;

    let frsize = stat.fragment_size() as u64;
    let total = stat.blocks() as u64 * frsize;
    let used = (stat.blocks() as u64).saturating_sub(stat.blocks_free() as u64) * frsize;
    let free = stat.blocks_available() as u64 * frsize;

    Ok(DiskUsage {
        total,
        used,
        free,
        percent: percent_of(used as f64, (used + free) as f64, 1),
    })
}

/// Query filesystem usage of `path` from the disk containing it.
#[cfg(not(unix))]
pub fn disk_usage(path: &Path) -> Result<DiskUsage> {
    if !path.exists() {
        return Err(TelemetryError::MountNotFound(path.display().to_string()));
    }

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .ok_or_else(|| TelemetryError::DiskQuery {
            path: path.display().to_string(),
            reason: "no disk contains this path".to_string(),
        })?;

    let total = disk.total_space();
    let free = disk.available_space();
    let used = total.saturating_sub(free);

    Ok(DiskUsage {
        total,
        used,
        free,
        percent: percent_of(used as f64, total as f64, 1),
    })
}

/// Mount points of the mounted physical partitions, in discovery order.
pub fn physical_partitions() -> Vec<String> {
    let disks = Disks::new_with_refreshed_list();
    let mut mounts: Vec<String> = Vec::new();

    for disk in disks.list() {
        let mount = disk.mount_point().to_string_lossy().to_string();
        if !mounts.contains(&mount) {
            mounts.push(mount);
        }
    }

    mounts
}

/// Mounts to query with the direct strategy.
///
/// Explicit paths win; otherwise every physical partition is discovered.
pub fn resolve_direct_mounts(host: &mut dyn HostStats, paths: &DiskPaths) -> Result<Vec<String>> {
    match paths {
        DiskPaths::Explicit(paths) => Ok(paths.clone()),
        DiskPaths::Auto => host.disk_partitions(),
    }
}

/// Targets when a cAdvisor sidecar is configured.
///
/// Explicit paths win, then the devices the sidecar reports (when it answered
/// this cycle), then the root mount alone.
pub fn resolve_sidecar_targets(paths: &DiskPaths, reported: Option<&[String]>) -> Vec<String> {
    if let DiskPaths::Explicit(paths) = paths {
        return paths.clone();
    }

    match reported {
        Some(devices) if !devices.is_empty() => devices.to_vec(),
        _ => vec!["/".to_string()],
    }
}

/// Build the disk section by querying each mount directly.
pub fn collect_direct(
    host: &mut dyn HostStats,
    mounts: &[String],
    unit: Unit,
) -> BTreeMap<String, DiskEntry> {
    let mut section = BTreeMap::new();

    for mount in mounts {
        let entry = match host.disk_usage(mount) {
            Ok(usage) => DiskEntry::from_usage(&usage, unit),
            Err(TelemetryError::MountNotFound(_)) => {
                debug!(mount = %mount, "Mount path does not exist");
                DiskEntry::failed(STATUS_MOUNT_MISSING)
            }
            Err(e) => {
                debug!(mount = %mount, error = %e, "Disk usage query failed");
                DiskEntry::failed(format!("Failed to query mount path: {e}"))
            }
        };
        section.insert(mount.clone(), entry);
    }

    section
}

/// Build the disk section from the cAdvisor rolling window.
pub fn collect_averaged(
    stats: &[ContainerStats],
    devices: &[String],
    unit: Unit,
) -> BTreeMap<String, DiskEntry> {
    devices
        .iter()
        .map(|device| {
            let average = average_filesystem(stats, device);
            if average.is_none() {
                debug!(device = %device, "No cAdvisor samples for device");
            }
            (device.clone(), DiskEntry::from_average(average, unit))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FilesystemStats;
    use crate::mock::MockHost;

    #[test]
    fn test_parse_disk_paths() {
        assert_eq!(DiskPaths::parse("all"), DiskPaths::Auto);
        assert_eq!(DiskPaths::parse("default"), DiskPaths::Auto);
        assert_eq!(DiskPaths::parse(""), DiskPaths::Auto);
        assert_eq!(DiskPaths::parse(" , "), DiskPaths::Auto);
        assert_eq!(
            DiskPaths::parse("/, /mnt ,/data"),
            DiskPaths::Explicit(vec!["/".into(), "/mnt".into(), "/data".into()])
        );
    }

    #[test]
    fn test_direct_partial_failure() {
        let mut host = MockHost::new().with_disk(
            "/",
            DiskUsage {
                total: 100_000_000_000,
                used: 50_000_000_000,
                free: 50_000_000_000,
                percent: 50.0,
            },
        );
        let mounts = vec!["/".to_string(), "/mnt".to_string()];

        let section = collect_direct(&mut host, &mounts, Unit::Gigabytes);

        let root = &section["/"];
        assert_eq!(root.total, Some(100.0));
        assert_eq!(root.used, Some(50.0));
        assert_eq!(root.free, Some(50.0));
        assert_eq!(root.percent, Some(50.0));
        assert_eq!(root.status, "OK");

        let mnt = &section["/mnt"];
        assert_eq!(mnt.status, STATUS_MOUNT_MISSING);
        assert!(mnt.total.is_none() && mnt.used.is_none() && mnt.free.is_none());
    }

    #[test]
    fn test_failed_entry_serializes_status_only() {
        let json = serde_json::to_value(DiskEntry::failed(STATUS_MOUNT_MISSING)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": STATUS_MOUNT_MISSING }));
    }

    #[test]
    fn test_auto_mounts_come_from_partitions() {
        let mut host = MockHost::new().with_partitions(&["/", "/boot"]);
        let mounts = resolve_direct_mounts(&mut host, &DiskPaths::Auto).unwrap();
        assert_eq!(mounts, vec!["/".to_string(), "/boot".to_string()]);

        let explicit = DiskPaths::Explicit(vec!["/data".into()]);
        assert_eq!(resolve_direct_mounts(&mut host, &explicit).unwrap(), vec!["/data".to_string()]);
    }

    #[test]
    fn test_sidecar_target_precedence() {
        let reported = vec!["/dev/sda1".to_string(), "/dev/sdb1".to_string()];
        let explicit = DiskPaths::Explicit(vec!["/dev/sdb1".into()]);

        assert_eq!(resolve_sidecar_targets(&explicit, Some(&reported)), vec!["/dev/sdb1".to_string()]);
        assert_eq!(resolve_sidecar_targets(&DiskPaths::Auto, Some(&reported)), reported);
        assert_eq!(resolve_sidecar_targets(&DiskPaths::Auto, None), vec!["/".to_string()]);
        assert_eq!(resolve_sidecar_targets(&DiskPaths::Auto, Some(&[])), vec!["/".to_string()]);
    }

    #[test]
    fn test_averaged_section() {
        let stats: Vec<ContainerStats> = [(400, 600), (600, 400)]
            .iter()
            .map(|(usage, available)| ContainerStats {
                filesystem: vec![FilesystemStats {
                    device: "/dev/sda1".into(),
                    capacity: 1000,
                    usage: *usage,
                    available: *available,
                }],
            })
            .collect();
        let devices = vec!["/dev/sda1".to_string(), "/dev/sdz9".to_string()];

        let section = collect_averaged(&stats, &devices, Unit::Bytes);

        let sda = &section["/dev/sda1"];
        assert_eq!(sda.total, Some(1000.0));
        assert_eq!(sda.used, Some(500.0));
        assert_eq!(sda.free, Some(500.0));
        assert_eq!(sda.percent, Some(50.0));
        assert_eq!(sda.status, "OK");

        let missing = &section["/dev/sdz9"];
        assert_eq!(missing.status, STATUS_NO_SAMPLES);
        assert_eq!(missing.total, Some(0.0));
        assert_eq!(missing.percent, Some(0.0));
    }

    #[test]
    fn test_averaged_percent_independent_of_unit() {
        let avg = FsAverage {
            total: 250_000_000_000.0,
            used: 83_333_333_333.0,
            free: 166_666_666_667.0,
            samples: 60,
        };
        let in_gb = DiskEntry::from_average(Some(avg), Unit::Gigabytes);
        let in_bytes = DiskEntry::from_average(Some(avg), Unit::Bytes);
        assert_eq!(in_gb.percent, in_bytes.percent);
        assert_eq!(in_gb.percent, Some(33.33));
        assert_eq!(in_gb.total, Some(250.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_statvfs_on_existing_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let usage = disk_usage(dir.path()).unwrap();
        assert!(usage.total > 0);
        assert!(usage.used <= usage.total);
        assert!((0.0..=100.0).contains(&usage.percent));

        let missing = dir.path().join("does-not-exist");
        assert!(matches!(disk_usage(&missing), Err(TelemetryError::MountNotFound(_))));
    }
}
