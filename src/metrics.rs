//! Point-in-time host metrics, sampled fresh on every request.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sysinfo::{Disks, Networks, System};

/// CPU usage is a delta between two refreshes; this is the window between
/// them.
const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub hostname: String,
    pub time: String,
    pub cpu_percent: f32,
    pub load: LoadAverages,
    pub memory: MemoryUsage,
    pub uptime_seconds: u64,
    pub disks: Vec<DiskUsage>,
    pub network: NetworkTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadAverages {
    #[serde(rename = "1")]
    pub one: f64,
    #[serde(rename = "5")]
    pub five: f64,
    #[serde(rename = "15")]
    pub fifteen: f64,
}

/// All sizes in bytes.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskUsage {
    pub mount: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Totals since boot, summed over all interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Samples CPU over a short window, then reads everything else once.
pub async fn capture() -> MetricsSnapshot {
    let mut sys = System::new_all();
    sys.refresh_all();
    tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
    sys.refresh_cpu_usage();
    let cpu_percent = sys.global_cpu_info().cpu_usage();

    let load = System::load_average();

    let total = sys.total_memory();
    let available = sys.available_memory();
    let mem_percent = if total > 0 {
        (total - available) as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    // Squashfs snap mounts are read-only and always report 100% full.
    let disks = Disks::new_with_refreshed_list()
        .list()
        .iter()
        .filter(|disk| !disk.mount_point().starts_with("/snap"))
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            DiskUsage {
                mount: disk.mount_point().display().to_string(),
                total,
                used,
                free,
                percent: if total > 0 {
                    used as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    let networks = Networks::new_with_refreshed_list();
    let mut bytes_sent = 0u64;
    let mut bytes_recv = 0u64;
    for (_name, data) in &networks {
        bytes_sent += data.total_transmitted();
        bytes_recv += data.total_received();
    }

    MetricsSnapshot {
        hostname: gethostname::gethostname().to_string_lossy().into_owned(),
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        cpu_percent,
        load: LoadAverages {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        },
        memory: MemoryUsage {
            total,
            available,
            used: sys.used_memory(),
            percent: mem_percent,
        },
        uptime_seconds: System::uptime(),
        disks,
        network: NetworkTotals {
            bytes_sent,
            bytes_recv,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_reports_sane_values() {
        let snap = capture().await;
        assert!(!snap.hostname.is_empty());
        assert!(snap.memory.total > 0);
        assert!((0.0..=100.0).contains(&snap.memory.percent));
        assert!(snap.cpu_percent >= 0.0);
        assert!(snap.time.ends_with('Z'));
    }

    #[tokio::test]
    async fn load_keys_serialize_as_interval_names() {
        let snap = capture().await;
        let value = serde_json::to_value(&snap.load).unwrap();
        assert!(value.get("1").is_some());
        assert!(value.get("5").is_some());
        assert!(value.get("15").is_some());
    }
}
