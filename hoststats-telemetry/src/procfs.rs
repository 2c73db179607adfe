//! Linux proc filesystem reader rooted at a configurable path.
//!
//! Inside a container the host's `/proc` is typically bind mounted at another
//! path (`/proc_host` by default), so CPU, memory and network counters are
//! read from `<root>/stat`, `<root>/meminfo` and `<root>/net/dev` instead of
//! the container's own view. Partitions come from `<root>/self/mounts`,
//! filtered by the physical filesystem types listed in `<root>/filesystems`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::memory::VirtualMemory;
use crate::network::NetIoCounters;
use crate::units::{percent_of, round_to};
use crate::HostStats;

/// Jiffy counters of one `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Guest time is already accounted in user/nice and is not added again.
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    fn busy(&self) -> u64 {
        self.total() - self.idle - self.iowait
    }
}

/// Aggregate and per-core counters from one read of `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub total: CpuTimes,
    pub per_core: Vec<CpuTimes>,
}

/// Busy percentage between two readings, rounded to 1 decimal.
pub fn busy_percent(previous: &CpuTimes, current: &CpuTimes) -> f64 {
    let total_delta = current.total().saturating_sub(previous.total());
    if total_delta == 0 {
        return 0.0;
    }
    let busy_delta = current.busy().saturating_sub(previous.busy());
    round_to(busy_delta as f64 / total_delta as f64 * 100.0, 1).clamp(0.0, 100.0)
}

fn parse_cpu_line(label: &str, fields: &[&str]) -> Result<CpuTimes> {
    if fields.len() < 4 {
        return Err(TelemetryError::ProcParse {
            file: "stat",
            reason: format!("{label} has {} fields, expected at least 4", fields.len()),
        });
    }

    let mut values = [0u64; 8];
    for (slot, raw) in values.iter_mut().zip(fields) {
        *slot = raw.parse().map_err(|_| TelemetryError::ProcParse {
            file: "stat",
            reason: format!("{label} has non-numeric field '{raw}'"),
        })?;
    }

    Ok(CpuTimes {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
        steal: values[7],
    })
}

/// Parse the `cpu` lines of `/proc/stat`.
pub fn parse_stat(content: &str) -> Result<CpuSnapshot> {
    let mut total = None;
    let mut per_core = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        if !label.starts_with("cpu") {
            continue;
        }
        let fields: Vec<&str> = parts.collect();
        let times = parse_cpu_line(label, &fields)?;

        if label == "cpu" {
            total = Some(times);
        } else {
            per_core.push(times);
        }
    }

    let total = total.ok_or_else(|| TelemetryError::ProcParse {
        file: "stat",
        reason: "missing aggregate cpu line".to_string(),
    })?;

    Ok(CpuSnapshot { total, per_core })
}

/// Parse `/proc/meminfo` into byte figures.
///
/// `used` is `total - free - buffers - cached` (cached including reclaimable
/// slab), falling back to `total - free` if that goes negative.
pub fn parse_meminfo(content: &str) -> Result<VirtualMemory> {
    let mut fields: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        let bytes = match parts.next() {
            Some("kB") => value * 1024,
            _ => value,
        };
        fields.insert(key.trim(), bytes);
    }

    let get = |key: &'static str| -> Result<u64> {
        fields.get(key).copied().ok_or_else(|| TelemetryError::ProcParse {
            file: "meminfo",
            reason: format!("missing {key}"),
        })
    };

    let total = get("MemTotal")?;
    let free = get("MemFree")?;
    let buffers = fields.get("Buffers").copied().unwrap_or(0);
    let cached = fields.get("Cached").copied().unwrap_or(0)
        + fields.get("SReclaimable").copied().unwrap_or(0);
    let available = fields
        .get("MemAvailable")
        .copied()
        .unwrap_or(free + buffers + cached)
        .min(total);

    let used = match total.checked_sub(free + buffers + cached) {
        Some(used) => used,
        None => total.saturating_sub(free),
    };

    Ok(VirtualMemory {
        total,
        available,
        used,
        free,
        percent: percent_of(total.saturating_sub(available) as f64, total as f64, 1),
    })
}

/// Parse `/proc/net/dev` into per-interface counters.
pub fn parse_net_dev(content: &str) -> Result<BTreeMap<String, NetIoCounters>> {
    let mut interfaces = BTreeMap::new();

    // First two lines are the column headers.
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<u64> = rest
            .split_whitespace()
            .map(|v| v.parse::<u64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| TelemetryError::ProcParse {
                file: "net/dev",
                reason: format!("{}: {e}", name.trim()),
            })?;
        if values.len() < 16 {
            return Err(TelemetryError::ProcParse {
                file: "net/dev",
                reason: format!("{} has {} columns, expected 16", name.trim(), values.len()),
            });
        }

        interfaces.insert(
            name.trim().to_string(),
            NetIoCounters {
                bytes_recv: values[0],
                packets_recv: values[1],
                errin: values[2],
                dropin: values[3],
                bytes_sent: values[8],
                packets_sent: values[9],
                errout: values[10],
                dropout: values[11],
            },
        );
    }

    Ok(interfaces)
}

/// Filesystem types backed by a block device, from `/proc/filesystems`.
///
/// Lines marked `nodev` are virtual filesystems, except `zfs` which is
/// flagged `nodev` but holds real data.
pub fn parse_filesystems(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            match line.strip_prefix("nodev") {
                Some(rest) if rest.trim() == "zfs" => Some("zfs".to_string()),
                Some(_) => None,
                None if line.is_empty() => None,
                None => Some(line.to_string()),
            }
        })
        .collect()
}

/// Undo the octal escapes the kernel applies to whitespace in mount paths.
fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

/// Mount points of `/proc/<pid>/mounts` whose type is in `physical`, in
/// file order and without duplicates.
pub fn parse_mounts(content: &str, physical: &HashSet<String>) -> Vec<String> {
    let mut mounts: Vec<String> = Vec::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(device), Some(mount), Some(fstype)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if device == "none" || !physical.contains(fstype) {
            continue;
        }

        let mount = unescape_mount_path(mount);
        if !mounts.contains(&mount) {
            mounts.push(mount);
        }
    }

    mounts
}

/// Whether `root` looks like a mounted proc filesystem.
pub fn is_procfs_root(root: &Path) -> bool {
    root.join("stat").is_file()
}

/// Host statistics read from a proc filesystem mounted at `root`.
pub struct ProcfsHost {
    root: PathBuf,
    previous: CpuSnapshot,
}

impl ProcfsHost {
    /// Open the proc filesystem at `root` and take the CPU baseline.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let previous = parse_stat(&read_proc_file(&root, "stat")?)?;
        debug!(root = %root.display(), cores = previous.per_core.len(), "Proc reader initialized");
        Ok(Self { root, previous })
    }

    /// Root of the proc filesystem being read.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn read_proc_file(root: &Path, relative: &str) -> Result<String> {
    let path = root.join(relative);
    fs::read_to_string(&path).map_err(|source| TelemetryError::ProcRead { path, source })
}

impl HostStats for ProcfsHost {
    fn cpu_percent(&mut self, per_core: bool) -> Result<Vec<f64>> {
        let current = parse_stat(&read_proc_file(&self.root, "stat")?)?;

        let percentages = if per_core {
            current
                .per_core
                .iter()
                .enumerate()
                .map(|(i, now)| {
                    let before = self.previous.per_core.get(i).copied().unwrap_or_default();
                    busy_percent(&before, now)
                })
                .collect()
        } else {
            vec![busy_percent(&self.previous.total, &current.total)]
        };

        self.previous = current;
        Ok(percentages)
    }

    fn virtual_memory(&mut self) -> Result<VirtualMemory> {
        parse_meminfo(&read_proc_file(&self.root, "meminfo")?)
    }

    fn disk_partitions(&mut self) -> Result<Vec<String>> {
        let physical = parse_filesystems(&read_proc_file(&self.root, "filesystems")?);
        let mounts = if self.root.join("self/mounts").is_file() {
            read_proc_file(&self.root, "self/mounts")?
        } else {
            read_proc_file(&self.root, "mounts")?
        };
        Ok(parse_mounts(&mounts, &physical))
    }

    fn net_io_counters(&mut self) -> Result<BTreeMap<String, NetIoCounters>> {
        parse_net_dev(&read_proc_file(&self.root, "net/dev")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_BEFORE: &str = "\
cpu  100 0 100 800 0 0 0 0 0 0
cpu0 50 0 50 400 0 0 0 0 0 0
cpu1 50 0 50 400 0 0 0 0 0 0
intr 12345 0 0
ctxt 999
";

    const STAT_AFTER: &str = "\
cpu  150 0 150 900 0 0 0 0 0 0
cpu0 100 0 100 400 0 0 0 0 0 0
cpu1 50 0 50 500 0 0 0 0 0 0
intr 12400 0 0
ctxt 1200
";

    const MEMINFO: &str = "\
MemTotal:       16000000 kB
MemFree:         4000000 kB
MemAvailable:   10000000 kB
Buffers:          500000 kB
Cached:          3000000 kB
SwapCached:            0 kB
SReclaimable:     500000 kB
";

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0
  eth0: 5000000    4000    2    7    0     0          0        12  2000000    3000    1    3    0     0       0          0
";

    const FILESYSTEMS: &str = "\
nodev\tsysfs
nodev\ttmpfs
nodev\tproc
\text4
\txfs
nodev\toverlay
nodev\tzfs
";

    const MOUNTS: &str = "\
overlay / overlay rw,relatime 0 0
proc /proc proc rw,nosuid 0 0
/dev/sda1 /host ext4 rw,relatime 0 0
/dev/sdb1 /srv/my\\040data xfs rw 0 0
tank /tank zfs rw 0 0
/dev/sda1 /host ext4 rw,relatime 0 0
tmpfs /run tmpfs rw 0 0
";

    #[test]
    fn test_parse_filesystems_keeps_physical_types() {
        let physical = parse_filesystems(FILESYSTEMS);
        let mut types: Vec<_> = physical.iter().map(String::as_str).collect();
        types.sort_unstable();
        assert_eq!(types, vec!["ext4", "xfs", "zfs"]);
    }

    #[test]
    fn test_parse_mounts_filters_virtual_filesystems() {
        let physical = parse_filesystems(FILESYSTEMS);
        assert_eq!(
            parse_mounts(MOUNTS, &physical),
            vec!["/host", "/srv/my data", "/tank"]
        );
    }

    #[test]
    fn test_procfs_host_partitions_come_from_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stat"), STAT_BEFORE).unwrap();
        fs::write(dir.path().join("filesystems"), FILESYSTEMS).unwrap();
        fs::create_dir(dir.path().join("self")).unwrap();
        fs::write(
            dir.path().join("self/mounts"),
            "/dev/sda9 /host-data ext4 rw 0 0\nproc /proc proc rw 0 0\n",
        )
        .unwrap();

        let mut host = ProcfsHost::new(dir.path()).unwrap();
        assert_eq!(host.disk_partitions().unwrap(), vec!["/host-data"]);
    }

    #[test]
    fn test_procfs_host_partitions_fall_back_to_root_mounts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stat"), STAT_BEFORE).unwrap();
        fs::write(dir.path().join("filesystems"), FILESYSTEMS).unwrap();
        fs::write(dir.path().join("mounts"), "/dev/sdc1 /backup xfs rw 0 0\n").unwrap();

        let mut host = ProcfsHost::new(dir.path()).unwrap();
        assert_eq!(host.disk_partitions().unwrap(), vec!["/backup"]);
    }

    #[test]
    fn test_parse_stat() {
        let snapshot = parse_stat(STAT_BEFORE).unwrap();
        assert_eq!(snapshot.per_core.len(), 2);
        assert_eq!(snapshot.total.user, 100);
        assert_eq!(snapshot.total.idle, 800);
    }

    #[test]
    fn test_parse_stat_requires_aggregate_line() {
        assert!(parse_stat("cpu0 1 2 3 4\n").is_err());
        assert!(parse_stat("cpu 1 2 x 4\n").is_err());
    }

    #[test]
    fn test_busy_percent_between_snapshots() {
        let before = parse_stat(STAT_BEFORE).unwrap();
        let after = parse_stat(STAT_AFTER).unwrap();

        // 100 busy jiffies out of 200
        assert_eq!(busy_percent(&before.total, &after.total), 50.0);
        assert_eq!(busy_percent(&before.per_core[0], &after.per_core[0]), 100.0);
        assert_eq!(busy_percent(&before.per_core[1], &after.per_core[1]), 0.0);
        assert_eq!(busy_percent(&after.total, &after.total), 0.0);
    }

    #[test]
    fn test_parse_meminfo() {
        let memory = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(memory.total, 16_000_000 * 1024);
        assert_eq!(memory.free, 4_000_000 * 1024);
        assert_eq!(memory.available, 10_000_000 * 1024);
        // 16G - 4G free - 0.5G buffers - 3.5G cached
        assert_eq!(memory.used, 8_000_000 * 1024);
        assert_eq!(memory.percent, 37.5);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 10 kB\n").is_err());
    }

    #[test]
    fn test_parse_net_dev() {
        let interfaces = parse_net_dev(NET_DEV).unwrap();
        assert_eq!(interfaces.len(), 2);

        let eth0 = &interfaces["eth0"];
        assert_eq!(eth0.bytes_recv, 5_000_000);
        assert_eq!(eth0.packets_recv, 4000);
        assert_eq!(eth0.errin, 2);
        assert_eq!(eth0.dropin, 7);
        assert_eq!(eth0.bytes_sent, 2_000_000);
        assert_eq!(eth0.packets_sent, 3000);
        assert_eq!(eth0.errout, 1);
        assert_eq!(eth0.dropout, 3);
    }

    #[test]
    fn test_procfs_host_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stat"), STAT_BEFORE).unwrap();
        fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();
        fs::create_dir(dir.path().join("net")).unwrap();
        fs::write(dir.path().join("net/dev"), NET_DEV).unwrap();

        assert!(is_procfs_root(dir.path()));
        let mut host = ProcfsHost::new(dir.path()).unwrap();

        fs::write(dir.path().join("stat"), STAT_AFTER).unwrap();
        assert_eq!(host.cpu_percent(true).unwrap(), vec![100.0, 0.0]);

        assert_eq!(host.virtual_memory().unwrap().percent, 37.5);
        assert_eq!(host.net_io_counters().unwrap().len(), 2);
    }

    #[test]
    fn test_procfs_host_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_procfs_root(dir.path()));
        assert!(matches!(
            ProcfsHost::new(dir.path().join("nope")),
            Err(TelemetryError::ProcRead { .. })
        ));
    }
}
