//! Operational metrics for the ingest/search/pack pipeline.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Latency percentile summary over a batch of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

fn percentile(sorted: &[Duration], pct: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64 - 1.0) * pct).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Computes min/max/mean/p50/p95/p99 over a slice of latency samples.
pub fn compute_latency_percentiles(samples: &[Duration]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted = samples.to_vec();
    sorted.sort();

    let total: Duration = sorted.iter().sum();
    let mean = total / sorted.len() as u32;

    LatencyStats {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        p50: percentile(&sorted, 0.50),
        p95: percentile(&sorted, 0.95),
        p99: percentile(&sorted, 0.99),
    }
}

/// Process-wide atomic counters, cheap to update from any async task.
#[derive(Debug, Default)]
pub struct OperationalMetrics {
    pub ingest_total: AtomicU64,
    pub ingest_errors: AtomicU64,
    pub search_total: AtomicU64,
    pub search_errors: AtomicU64,
    pub pack_total: AtomicU64,
    pub pack_infeasible: AtomicU64,
    pub synthesis_degraded: AtomicU64,
    pub items_stored: AtomicU64,
}

impl OperationalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn inc_ingest(&self) {
        self.ingest_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ingest_error(&self) {
        self.ingest_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_search(&self) {
        self.search_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_search_error(&self) {
        self.search_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pack(&self) {
        self.pack_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pack_infeasible(&self) {
        self.pack_infeasible.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_synthesis_degraded(&self) {
        self.synthesis_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_items_stored(&self, count: u64) {
        self.items_stored.store(count, Ordering::Relaxed);
    }

    /// Renders all counters in Prometheus text exposition format.
    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();
        let counters: &[(&str, &str, &AtomicU64)] = &[
            ("manifest_ingest_total", "Total ingest requests", &self.ingest_total),
            ("manifest_ingest_errors", "Ingest requests that failed", &self.ingest_errors),
            ("manifest_search_total", "Total search requests", &self.search_total),
            ("manifest_search_errors", "Search requests that failed", &self.search_errors),
            ("manifest_pack_total", "Total pack requests", &self.pack_total),
            ("manifest_pack_infeasible", "Pack requests resolved as infeasible", &self.pack_infeasible),
            ("manifest_synthesis_degraded", "Search/pack responses that degraded to raw results", &self.synthesis_degraded),
            ("manifest_items_stored", "Items currently stored", &self.items_stored),
        ];
        for (name, help, counter) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {}", counter.load(Ordering::Relaxed));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_latency_percentiles_empty() {
        let stats = compute_latency_percentiles(&[]);
        assert_eq!(stats, LatencyStats::default());
    }

    #[test]
    fn test_compute_latency_percentiles_basic() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        let stats = compute_latency_percentiles(&samples);
        assert_eq!(stats.min, Duration::from_millis(1));
        assert_eq!(stats.max, Duration::from_millis(100));
        assert_eq!(stats.p50, Duration::from_millis(50));
    }

    #[test]
    fn test_operational_metrics_counters() {
        let metrics = OperationalMetrics::shared();
        metrics.inc_ingest();
        metrics.inc_ingest();
        metrics.inc_ingest_error();
        assert_eq!(metrics.ingest_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.ingest_errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_export_prometheus_contains_help_and_type() {
        let metrics = OperationalMetrics::new();
        metrics.inc_search();
        let text = metrics.export_prometheus();
        assert!(text.contains("# HELP manifest_search_total"));
        assert!(text.contains("# TYPE manifest_search_total counter"));
        assert!(text.contains("manifest_search_total 1"));
    }
}
