//! OS service run-state queries
//!
//! systemd hosts are queried with `systemctl show`, Windows hosts with
//! `sc queryex`. Everything else reports [`ServiceStatus::Unknown`].

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::trace;

use crate::{ServiceRunState, ServiceStatus};

const SYSTEMCTL_PROPERTIES: &str =
    "--property=ActiveState,SubState,MainPID,ExecMainStartTimestamp,UnitFileState";

/// Reject names that the service manager would read as options or several words
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('-')
        || name.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        anyhow::bail!("invalid service name {name:?}");
    }
    Ok(())
}

pub async fn query(name: &str) -> Result<ServiceRunState> {
    validate_service_name(name)?;

    if cfg!(target_os = "linux") {
        query_systemd(name).await
    } else if cfg!(windows) {
        query_windows(name).await
    } else {
        trace!("no service manager support on this platform");
        Ok(ServiceRunState::unknown(name))
    }
}

async fn query_systemd(name: &str) -> Result<ServiceRunState> {
    let output = tokio::process::Command::new("systemctl")
        .args(["show", name, SYSTEMCTL_PROPERTIES])
        .output()
        .await
        .context("failed to run systemctl")?;

    if !output.status.success() {
        anyhow::bail!(
            "systemctl exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_systemctl_show(name, &stdout, Utc::now()))
}

async fn query_windows(name: &str) -> Result<ServiceRunState> {
    let output = tokio::process::Command::new("sc")
        .args(["queryex", name])
        .output()
        .await
        .context("failed to run sc")?;

    if !output.status.success() {
        anyhow::bail!("sc exited with {}", output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_sc_query(name, &stdout))
}

/// Parse `key=value` lines printed by `systemctl show`
pub fn parse_systemctl_show(name: &str, output: &str, now: DateTime<Utc>) -> ServiceRunState {
    let mut state = ServiceRunState::unknown(name);

    for line in output.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "ActiveState" => {
                state.status = match value {
                    "active" | "reloading" => ServiceStatus::Running,
                    "inactive" => ServiceStatus::Stopped,
                    "failed" => ServiceStatus::Failed,
                    _ => ServiceStatus::Unknown,
                }
            }
            "MainPID" => state.pid = value.parse::<u32>().ok().filter(|pid| *pid != 0),
            "ExecMainStartTimestamp" => state.last_started = parse_systemd_timestamp(value),
            "UnitFileState" => state.enabled = value.starts_with("enabled"),
            _ => {}
        }
    }

    if state.status == ServiceStatus::Running {
        state.uptime = state
            .last_started
            .map(|started| (now - started).num_seconds().max(0) as u64)
            .unwrap_or_default();
    }

    state
}

/// `Mon 2024-01-15 10:30:00 UTC`; empty or `n/a` when the unit never ran
pub fn parse_systemd_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let mut parts = value.split_whitespace();
    let _weekday = parts.next()?;
    let date = parts.next()?;
    let time = parts.next()?;
    let zone = parts.next();

    let naive = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").ok()?;

    match zone {
        Some("UTC") | Some("GMT") | None => Some(Utc.from_utc_datetime(&naive)),
        Some(_) => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc)),
    }
}

/// Parse the output of `sc queryex`
pub fn parse_sc_query(name: &str, output: &str) -> ServiceRunState {
    let mut state = ServiceRunState::unknown(name);
    state.status = ServiceStatus::Stopped;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        match key.trim() {
            "STATE" => {
                state.status = if value.contains("RUNNING") {
                    ServiceStatus::Running
                } else {
                    ServiceStatus::Stopped
                }
            }
            "PID" => state.pid = value.trim().parse::<u32>().ok().filter(|pid| *pid != 0),
            _ => {}
        }
    }

    state
}
