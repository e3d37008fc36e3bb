//! Prometheus text exposition for the process and host.

use std::fmt::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use sysinfo::{Disks, System};

/// Counts every request the process has served.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

/// Host memory and disk gauges, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub memory_available: u64,
    pub memory_used: u64,
    pub disk_free: u64,
}

impl HostStats {
    /// Sample the host. Blocking; call it off the async workers.
    pub fn collect() -> Self {
        let mut system = System::new();
        system.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()));

        Self {
            memory_available: system.available_memory(),
            memory_used: system.used_memory(),
            disk_free: root.map(|d| d.available_space()).unwrap_or(0),
        }
    }
}

/// Render the metrics body.
pub fn render(stats: &HostStats, total_requests: u64) -> String {
    let mut out = String::new();
    let metrics: [(&str, &str, &str, u64); 5] = [
        (
            "memory_available_bytes",
            "Available memory",
            "gauge",
            stats.memory_available,
        ),
        ("memory_used_bytes", "Used memory", "gauge", stats.memory_used),
        ("disk_free_bytes", "Free disk space", "gauge", stats.disk_free),
        (
            "http_requests_total",
            "HTTP requests served",
            "counter",
            total_requests,
        ),
        ("application_working", "Application status", "gauge", 1),
    ];

    for (name, help, kind, value) in metrics {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} {kind}");
        let _ = writeln!(out, "{name} {value}");
    }
    out
}
