//! Observability - request counting and host gauges for the metrics endpoint.

pub mod metrics;

pub use metrics::{HostStats, RequestMetrics};
