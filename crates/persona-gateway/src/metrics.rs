//! Prometheus-compatible metrics endpoint for the capability gateway.
//!
//! Tracks request counts, filesystem and telemetry traffic, and adapter failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global metrics registry.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Total HTTP requests served.
    pub http_requests_total: AtomicU64,
    /// Total HTTP errors (4xx + 5xx).
    pub http_errors_total: AtomicU64,
    /// Total `readFile` requests.
    pub fs_reads_total: AtomicU64,
    /// Total `writeFile` requests.
    pub fs_writes_total: AtomicU64,
    /// Total telemetry snapshots taken.
    pub telemetry_samples_total: AtomicU64,
    /// Total adapter calls that returned an error.
    pub adapter_failures_total: AtomicU64,
    /// Server start time for uptime calculation.
    pub started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                http_requests_total: AtomicU64::new(0),
                http_errors_total: AtomicU64::new(0),
                fs_reads_total: AtomicU64::new(0),
                fs_writes_total: AtomicU64::new(0),
                telemetry_samples_total: AtomicU64::new(0),
                adapter_failures_total: AtomicU64::new(0),
                started_at: Instant::now(),
            }),
        }
    }

    pub fn inc_http_requests(&self) {
        self.inner
            .http_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_http_errors(&self) {
        self.inner.http_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fs_reads(&self) {
        self.inner.fs_reads_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fs_writes(&self) {
        self.inner.fs_writes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_telemetry_samples(&self) {
        self.inner
            .telemetry_samples_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_adapter_failures(&self) {
        self.inner
            .adapter_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }

    /// Render metrics in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let m = &self.inner;

        format!(
            r#"# HELP persona_uptime_seconds Time since the gateway started.
# TYPE persona_uptime_seconds gauge
persona_uptime_seconds {}

# HELP persona_http_requests_total Total HTTP requests served.
# TYPE persona_http_requests_total counter
persona_http_requests_total {}

# HELP persona_http_errors_total Total HTTP errors (4xx/5xx).
# TYPE persona_http_errors_total counter
persona_http_errors_total {}

# HELP persona_fs_reads_total Total readFile requests.
# TYPE persona_fs_reads_total counter
persona_fs_reads_total {}

# HELP persona_fs_writes_total Total writeFile requests.
# TYPE persona_fs_writes_total counter
persona_fs_writes_total {}

# HELP persona_telemetry_samples_total Total telemetry snapshots taken.
# TYPE persona_telemetry_samples_total counter
persona_telemetry_samples_total {}

# HELP persona_adapter_failures_total Total host adapter calls that failed.
# TYPE persona_adapter_failures_total counter
persona_adapter_failures_total {}
"#,
            self.uptime_secs(),
            m.http_requests_total.load(Ordering::Relaxed),
            m.http_errors_total.load(Ordering::Relaxed),
            m.fs_reads_total.load(Ordering::Relaxed),
            m.fs_writes_total.load(Ordering::Relaxed),
            m.telemetry_samples_total.load(Ordering::Relaxed),
            m.adapter_failures_total.load(Ordering::Relaxed),
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counter_increments() {
        let m = Metrics::new();
        m.inc_http_requests();
        m.inc_http_requests();
        m.inc_fs_reads();
        let output = m.render_prometheus();
        assert!(output.contains("persona_http_requests_total 2"));
        assert!(output.contains("persona_fs_reads_total 1"));
        assert!(output.contains("persona_fs_writes_total 0"));
    }

    #[test]
    fn test_metrics_failures() {
        let m = Metrics::new();
        m.inc_http_errors();
        m.inc_adapter_failures();
        m.inc_adapter_failures();
        let output = m.render_prometheus();
        assert!(output.contains("persona_http_errors_total 1"));
        assert!(output.contains("persona_adapter_failures_total 2"));
    }

    #[test]
    fn test_metrics_prometheus_format() {
        let m = Metrics::new();
        let output = m.render_prometheus();
        assert!(output.contains("# HELP persona_uptime_seconds"));
        assert!(output.contains("# TYPE persona_uptime_seconds gauge"));
        assert!(output.contains("# TYPE persona_telemetry_samples_total counter"));
    }
}
