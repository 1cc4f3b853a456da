//! Readers for the Linux counters sysinfo does not expose
//!
//! Parsing is kept separate from file access so it can be tested on any host.

use anyhow::{Context, Result};

use crate::{DiskIoStats, percentage};

/// Bytes per sector as reported by `/proc/diskstats`
const SECTOR_SIZE: u64 = 512;

/// Cumulative CPU time per mode, in clock ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
}

/// Share of each CPU mode, in percent of the total
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuModeShares {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.nice)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
    }

    /// Time spent in each mode between `earlier` and `self`
    pub fn since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            nice: self.nice.saturating_sub(earlier.nice),
            system: self.system.saturating_sub(earlier.system),
            idle: self.idle.saturating_sub(earlier.idle),
            iowait: self.iowait.saturating_sub(earlier.iowait),
            irq: self.irq.saturating_sub(earlier.irq),
            softirq: self.softirq.saturating_sub(earlier.softirq),
        }
    }

    /// `mode / total * 100` for every mode; all zero when no time elapsed
    pub fn shares(&self) -> CpuModeShares {
        let total = self.total() as f64;
        CpuModeShares {
            user: percentage(self.user as f64, total),
            nice: percentage(self.nice as f64, total),
            system: percentage(self.system as f64, total),
            idle: percentage(self.idle as f64, total),
            iowait: percentage(self.iowait as f64, total),
            irq: percentage(self.irq as f64, total),
            softirq: percentage(self.softirq as f64, total),
        }
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`
pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .context("no aggregate cpu line in /proc/stat")?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .map(|field| field.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .context("malformed cpu line in /proc/stat")?;

    if fields.len() < 4 {
        anyhow::bail!("cpu line in /proc/stat has only {} fields", fields.len());
    }

    let field = |index: usize| fields.get(index).copied().unwrap_or_default();

    Ok(CpuTimes {
        user: field(0),
        nice: field(1),
        system: field(2),
        idle: field(3),
        iowait: field(4),
        irq: field(5),
        softirq: field(6),
    })
}

/// Sum the counters of `/proc/diskstats` over devices accepted by `is_physical`
pub fn parse_diskstats(diskstats: &str, is_physical: impl Fn(&str) -> bool) -> DiskIoStats {
    let mut total = DiskIoStats::default();

    for line in diskstats.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 || !is_physical(fields[2]) {
            continue;
        }

        let counter = |index: usize| fields[index].parse::<u64>().unwrap_or_default();

        total.read_ops += counter(3);
        total.read_bytes += counter(5) * SECTOR_SIZE;
        total.read_time += counter(6);
        total.write_ops += counter(7);
        total.write_bytes += counter(9) * SECTOR_SIZE;
        total.write_time += counter(10);
        total.io_time += counter(12);
    }

    total
}

#[cfg(target_os = "linux")]
pub fn read_cpu_times() -> Result<Option<CpuTimes>> {
    let stat = std::fs::read_to_string("/proc/stat").context("failed to read /proc/stat")?;
    parse_cpu_times(&stat).map(Some)
}

#[cfg(not(target_os = "linux"))]
pub fn read_cpu_times() -> Result<Option<CpuTimes>> {
    Ok(None)
}

/// Whole physical block devices have a `device` link under `/sys/block`
#[cfg(target_os = "linux")]
fn is_physical_device(name: &str) -> bool {
    std::path::Path::new("/sys/block")
        .join(name.replace('/', "!"))
        .join("device")
        .exists()
}

#[cfg(target_os = "linux")]
pub fn read_disk_io() -> Result<Option<DiskIoStats>> {
    let diskstats =
        std::fs::read_to_string("/proc/diskstats").context("failed to read /proc/diskstats")?;
    Ok(Some(parse_diskstats(&diskstats, is_physical_device)))
}

#[cfg(not(target_os = "linux"))]
pub fn read_disk_io() -> Result<Option<DiskIoStats>> {
    Ok(None)
}

/// Dropped packets (received, sent) for an interface
#[cfg(target_os = "linux")]
pub fn read_interface_drops(interface: &str) -> (u64, u64) {
    let read = |counter: &str| {
        std::fs::read_to_string(format!("/sys/class/net/{interface}/statistics/{counter}"))
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or_default()
    };
    (read("rx_dropped"), read("tx_dropped"))
}

#[cfg(not(target_os = "linux"))]
pub fn read_interface_drops(_interface: &str) -> (u64, u64) {
    (0, 0)
}
