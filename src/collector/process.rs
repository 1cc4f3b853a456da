//! On-demand process listing

use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Process, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

use crate::{ProcessSnapshot, clamp_percent, percentage};

fn process_refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_cpu()
        .with_memory()
        .with_tasks()
}

/// First half of a process sample: CPU usage needs two refreshes
pub fn start_sample() -> System {
    let mut system = System::new_with_specifics(
        RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing())
            .with_memory(MemoryRefreshKind::nothing().with_ram()),
    );
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, process_refresh_kind());
    system
}

/// Second half, resolving at most `limit` processes in ascending pid order
pub fn finish_sample(mut system: System, limit: usize) -> Vec<ProcessSnapshot> {
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, process_refresh_kind());

    let cores = system.cpus().len().max(1);
    let total_memory = system.total_memory();

    let mut processes: Vec<&Process> = system
        .processes()
        .values()
        .filter(|process| process.thread_kind().is_none())
        .collect();
    processes.sort_by_key(|process| process.pid());

    processes
        .into_iter()
        .filter_map(|process| snapshot(process, cores, total_memory))
        .take(limit)
        .collect()
}

/// `None` for a process that exited between the two refreshes
fn snapshot(process: &Process, cores: usize, total_memory: u64) -> Option<ProcessSnapshot> {
    if !process.exists() {
        return None;
    }

    Some(ProcessSnapshot {
        pid: process.pid().as_u32(),
        name: process.name().to_string_lossy().into_owned(),
        status: process.status().to_string().to_lowercase(),
        cpu_percent: clamp_percent(f64::from(process.cpu_usage()) / cores as f64),
        memory_rss: process.memory(),
        memory_vms: process.virtual_memory(),
        memory_percent: percentage(process.memory() as f64, total_memory as f64),
        open_files: process.open_files().unwrap_or_default(),
        threads: process.tasks().map_or(1, |tasks| tasks.len().max(1)),
        create_time: process.start_time(),
    })
}
