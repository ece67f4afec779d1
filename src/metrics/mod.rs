//! Metrics for the view proof service
//!
//! In-process counters, gauges and latency histograms, exported as JSON or
//! Prometheus text at `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

/// Process-wide metrics registry
pub struct MetricsRegistry {
    counters: DashMap<String, AtomicU64>,
    gauges: DashMap<String, AtomicU64>,
    histograms: DashMap<String, Arc<Histogram>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            gauges: DashMap::new(),
            histograms: DashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter
    pub fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1);
    }

    /// Add to a counter
    pub fn add_counter(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    pub fn set_gauge(&self, name: &str, value: u64) {
        self.gauges
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .store(value, Ordering::Relaxed);
    }

    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_gauge(&self, name: &str) -> u64 {
        self.gauges
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Record a histogram observation
    pub fn observe_histogram(&self, name: &str, value: f64) {
        let histogram = self
            .histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::default()))
            .clone();
        histogram.observe(value);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// All metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        let counters: serde_json::Map<String, serde_json::Value> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed).into()))
            .collect();

        let gauges: serde_json::Map<String, serde_json::Value> = self
            .gauges
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed).into()))
            .collect();

        let histograms: serde_json::Map<String, serde_json::Value> = self
            .histograms
            .iter()
            .map(|e| (e.key().clone(), e.value().to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": counters,
            "gauges": gauges,
            "histograms": histograms,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP view_proof_uptime_seconds Time since service start\n");
        output.push_str("# TYPE view_proof_uptime_seconds gauge\n");
        output.push_str(&format!(
            "view_proof_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        let mut counters: Vec<(String, u64)> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
            .collect();
        counters.sort();
        for (name, value) in counters {
            let prometheus_name = prometheus_name(&name);
            output.push_str(&format!("# TYPE {} counter\n", prometheus_name));
            output.push_str(&format!("{} {}\n", prometheus_name, value));
        }

        let mut gauges: Vec<(String, u64)> = self
            .gauges
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
            .collect();
        gauges.sort();
        for (name, value) in gauges {
            let prometheus_name = prometheus_name(&name);
            output.push_str(&format!("# TYPE {} gauge\n", prometheus_name));
            output.push_str(&format!("{} {}\n", prometheus_name, value));
        }

        for entry in self.histograms.iter() {
            output.push_str(&entry.value().to_prometheus(entry.key()));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prometheus_name(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Fixed-bucket histogram
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    /// Sum of observations in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        let micros = (value.max(0.0) * 1_000_000.0) as u64;
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|bucket| value <= *bucket) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    fn sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    pub fn to_json(&self) -> serde_json::Value {
        let bucket_counts: Vec<u64> = self
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();

        serde_json::json!({
            "buckets": self.buckets,
            "counts": bucket_counts,
            "sum": self.sum(),
            "count": self.count.load(Ordering::Relaxed),
        })
    }

    pub fn to_prometheus(&self, name: &str) -> String {
        let prometheus_name = prometheus_name(name);
        let mut output = format!("# TYPE {} histogram\n", prometheus_name);

        let mut cumulative = 0u64;
        for (bucket, count) in self.buckets.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                prometheus_name, bucket, cumulative
            ));
        }

        let count = self.count.load(Ordering::Relaxed);
        output.push_str(&format!(
            "{}_bucket{{le=\"+Inf\"}} {}\n",
            prometheus_name, count
        ));
        output.push_str(&format!("{}_sum {}\n", prometheus_name, self.sum()));
        output.push_str(&format!("{}_count {}\n", prometheus_name, count));

        output
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Latency buckets in seconds; proof generation talks to remote
        // witnesses, so the tail runs to a minute.
        Self::new(vec![
            0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0,
        ])
    }
}

/// Predefined metric names
pub mod metric_names {
    // Views
    pub const VIEWS_RECORDED: &str = "view_proof.views.recorded";
    pub const VIEWS_DUPLICATE: &str = "view_proof.views.duplicate";

    // Proof generation outcomes
    pub const PROOFS_ZK_SUCCESS: &str = "view_proof.proofs.zk_success";
    pub const PROOFS_ZK_FAILURE: &str = "view_proof.proofs.zk_failure";
    pub const PROOFS_SIMPLE_VERIFICATION: &str = "view_proof.proofs.simple_verification";
    pub const PROOFS_ALREADY_EXISTS: &str = "view_proof.proofs.already_exists";
    pub const PROOFS_FAILED: &str = "view_proof.proofs.failed";

    // Reconciliation
    pub const RECONCILE_CREATED: &str = "view_proof.reconcile.created";
    pub const RECONCILE_FAILED: &str = "view_proof.reconcile.failed";
    pub const RECONCILE_TRACKED_ASSETS: &str = "view_proof.reconcile.tracked_assets";

    // Latency histograms
    pub const GENERATE_LATENCY: &str = "view_proof.proofs.generate.latency_seconds";
}

/// Time an async operation into a histogram
pub async fn timed<F, T>(metrics: &MetricsRegistry, metric_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f.await;
    metrics.observe_histogram(metric_name, start.elapsed().as_secs_f64());
    result
}
