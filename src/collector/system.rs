//! Host-wide sub-collections
//!
//! Every function here is synchronous and meant to run on the blocking pool.
//! The CPU sampler is split in two halves so the sampling window can be
//! awaited on the async side.

use anyhow::Result;
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, ProcessRefreshKind, RefreshKind, System,
};
use tracing::{trace, warn};

use super::procfs::{self, CpuTimes};
use crate::{
    CpuMetrics, DiskIoStats, DiskMetrics, LoadMetrics, MemoryMetrics, NetworkInterface,
    NetworkMetrics, PartitionMetrics, clamp_percent, percentage,
};

/// Filesystems that never back a real partition
const VIRTUAL_FILESYSTEMS: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "overlay",
    "proc",
    "pstore",
    "ramfs",
    "securityfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

pub fn is_virtual_filesystem(filesystem: &str) -> bool {
    VIRTUAL_FILESYSTEMS.contains(&filesystem.to_ascii_lowercase().as_str())
}

/// Interfaces whose name starts with `lo` are loopback
pub fn is_loopback(interface: &str) -> bool {
    interface.starts_with("lo")
}

/// First half of a CPU sample
pub struct CpuSampler {
    system: System,
    times: Option<CpuTimes>,
}

impl CpuSampler {
    pub fn start() -> Result<Self> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
        );
        let times = procfs::read_cpu_times()?;
        Ok(Self { system, times })
    }

    /// Second half, to be called once the sampling window has elapsed
    pub fn finish(mut self) -> Result<CpuMetrics> {
        self.system.refresh_cpu_usage();
        let cores = self.system.cpus().len();
        if cores == 0 {
            anyhow::bail!("no cpus reported by the operating system");
        }

        let shares = match (self.times, procfs::read_cpu_times()?) {
            (Some(before), Some(after)) => after.since(&before).shares(),
            _ => Default::default(),
        };

        Ok(CpuMetrics {
            usage: clamp_percent(f64::from(self.system.global_cpu_usage())),
            user_mode: shares.user,
            system_mode: shares.system,
            idle: shares.idle,
            iowait: shares.iowait,
            nice: shares.nice,
            irq: shares.irq,
            softirq: shares.softirq,
            cores,
        })
    }
}

pub fn sample_memory() -> Result<MemoryMetrics> {
    let system = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
    );

    let total = system.total_memory();
    if total == 0 {
        anyhow::bail!("total memory reported as zero");
    }
    let used = system.used_memory();

    Ok(MemoryMetrics {
        total,
        used,
        available: system.available_memory(),
        free: system.free_memory(),
        usage: percentage(used as f64, total as f64),
        swap_total: system.total_swap(),
        swap_used: system.used_swap(),
        swap_free: system.free_swap(),
    })
}

pub fn sample_disks() -> Result<DiskMetrics> {
    let disks = Disks::new_with_refreshed_list();

    let mut partitions = Vec::new();
    for disk in disks.list() {
        let filesystem = disk.file_system().to_string_lossy().into_owned();
        let mountpoint = disk.mount_point().to_string_lossy().into_owned();

        if is_virtual_filesystem(&filesystem) {
            continue;
        }

        let total = disk.total_space();
        if total == 0 {
            trace!("skipping unreadable mount point {mountpoint}");
            continue;
        }
        let available = disk.available_space().min(total);
        let used = total - available;

        partitions.push(PartitionMetrics {
            device: disk.name().to_string_lossy().into_owned(),
            mountpoint,
            filesystem,
            total,
            used,
            available,
            usage: percentage(used as f64, total as f64),
        });
    }

    let io_stats = match procfs::read_disk_io() {
        Ok(Some(stats)) => stats,
        Ok(None) => disks.list().iter().fold(DiskIoStats::default(), |acc, disk| {
            let usage = disk.usage();
            DiskIoStats {
                read_bytes: acc.read_bytes + usage.total_read_bytes,
                write_bytes: acc.write_bytes + usage.total_written_bytes,
                ..acc
            }
        }),
        Err(e) => {
            warn!("disk I/O counters unavailable: {e:#}");
            DiskIoStats::default()
        }
    };

    Ok(DiskMetrics {
        partitions,
        io_stats,
    })
}

pub fn sample_network() -> Result<NetworkMetrics> {
    let networks = Networks::new_with_refreshed_list();

    let mut interfaces: Vec<NetworkInterface> = networks
        .iter()
        .filter(|(name, _)| !is_loopback(name))
        .map(|(name, data)| {
            let (dropped_recv, dropped_sent) = procfs::read_interface_drops(name);
            NetworkInterface {
                name: name.clone(),
                bytes_recv: data.total_received(),
                bytes_sent: data.total_transmitted(),
                packets_recv: data.total_packets_received(),
                packets_sent: data.total_packets_transmitted(),
                errors_recv: data.total_errors_on_received(),
                errors_sent: data.total_errors_on_transmitted(),
                dropped_recv,
                dropped_sent,
            }
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(NetworkMetrics { interfaces })
}

pub fn sample_load() -> Result<LoadMetrics> {
    let load = System::load_average();
    let valid = |value: f64| value.is_finite() && value >= 0.0;
    if !(valid(load.one) && valid(load.five) && valid(load.fifteen)) {
        anyhow::bail!("invalid load average reported: {load:?}");
    }

    Ok(LoadMetrics {
        load1: load.one,
        load5: load.five,
        load15: load.fifteen,
    })
}

/// Process count and uptime in seconds
pub fn sample_system_info() -> Result<(usize, u64)> {
    let system = System::new_with_specifics(
        RefreshKind::nothing().with_processes(ProcessRefreshKind::nothing()),
    );

    let processes = system
        .processes()
        .values()
        .filter(|process| process.thread_kind().is_none())
        .count();
    let uptime = System::uptime();

    if processes == 0 {
        anyhow::bail!("process table is empty");
    }

    Ok((processes, uptime))
}
