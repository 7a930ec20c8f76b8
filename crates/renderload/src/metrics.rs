//! Per-group request metrics

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hdrhistogram::Histogram;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Highest latency the histogram tracks: 60s, in microseconds
const MAX_LATENCY_US: u64 = 60_000_000;

fn latency_histogram() -> Histogram<u64> {
    // 1µs to 60s, 3 significant digits; bounds are static and valid
    Histogram::new_with_bounds(1, MAX_LATENCY_US, 3).expect("valid histogram bounds")
}

/// Request metrics of one query group, updated concurrently by its workers
#[derive(Debug)]
pub struct LoadMetrics {
    /// Total requests recorded
    pub total_requests: AtomicU64,

    /// Requests answered with a 2xx status
    pub successful_requests: AtomicU64,

    /// Requests with a non-2xx status or a transport error
    pub failed_requests: AtomicU64,

    /// Total response body bytes received
    pub bytes_received: AtomicU64,

    /// Latency histogram (microseconds)
    pub latency_histogram: RwLock<Histogram<u64>>,

    /// Response counts by HTTP status
    pub status_counts: RwLock<BTreeMap<u16, u64>>,

    /// Failure counts by label
    pub error_counts: RwLock<BTreeMap<String, u64>>,
}

impl Default for LoadMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            latency_histogram: RwLock::new(latency_histogram()),
            status_counts: RwLock::new(BTreeMap::new()),
            error_counts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record a 2xx response
    pub fn record_success(&self, status: u16, latency_us: u64, bytes_received: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes_received, Ordering::Relaxed);

        *self.status_counts.write().entry(status).or_insert(0) += 1;
        self.record_latency(latency_us);
    }

    /// Record a failed request; `status` is `None` for transport errors
    pub fn record_failure(&self, status: Option<u16>, error_type: &str, latency_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);

        if let Some(status) = status {
            *self.status_counts.write().entry(status).or_insert(0) += 1;
        }
        *self
            .error_counts
            .write()
            .entry(error_type.to_string())
            .or_insert(0) += 1;

        self.record_latency(latency_us);
    }

    fn record_latency(&self, latency_us: u64) {
        let latency_us = latency_us.clamp(1, MAX_LATENCY_US);
        if let Err(e) = self.latency_histogram.write().record(latency_us) {
            warn!("Failed to record latency: {}", e);
        }
    }

    /// Add every counter and sample of `other` into `self`
    pub fn merge(&self, other: &LoadMetrics) {
        for (mine, theirs) in [
            (&self.total_requests, &other.total_requests),
            (&self.successful_requests, &other.successful_requests),
            (&self.failed_requests, &other.failed_requests),
            (&self.bytes_received, &other.bytes_received),
        ] {
            mine.fetch_add(theirs.load(Ordering::Relaxed), Ordering::Relaxed);
        }

        if let Err(e) = self
            .latency_histogram
            .write()
            .add(&*other.latency_histogram.read())
        {
            warn!("Failed to merge latency histogram: {}", e);
        }

        let mut statuses = self.status_counts.write();
        for (status, count) in other.status_counts.read().iter() {
            *statuses.entry(*status).or_insert(0) += count;
        }

        let mut errors = self.error_counts.write();
        for (error_type, count) in other.error_counts.read().iter() {
            *errors.entry(error_type.clone()).or_insert(0) += count;
        }
    }

    /// Summary statistics over `elapsed`
    pub fn summary(&self, name: &str, elapsed: Duration) -> MetricsSummary {
        let hist = self.latency_histogram.read();
        let duration = elapsed.as_secs_f64();

        let total = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);

        let (min, max, mean) = if hist.len() == 0 {
            (0, 0, 0)
        } else {
            (hist.min(), hist.max(), hist.mean() as u64)
        };

        MetricsSummary {
            name: name.to_string(),
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            success_rate: if total > 0 {
                (successful as f64 / total as f64) * 100.0
            } else {
                0.0
            },
            avg_rps: if duration > 0.0 {
                total as f64 / duration
            } else {
                0.0
            },
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            latency_p50_us: hist.value_at_quantile(0.50),
            latency_p90_us: hist.value_at_quantile(0.90),
            latency_p99_us: hist.value_at_quantile(0.99),
            latency_p999_us: hist.value_at_quantile(0.999),
            latency_max_us: max,
            latency_min_us: min,
            latency_mean_us: mean,
            duration_secs: duration,
            status_counts: self.status_counts.read().clone(),
            error_counts: self.error_counts.read().clone(),
        }
    }
}

/// Metrics summary of one group, or of the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub name: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub avg_rps: f64,
    pub bytes_received: u64,
    pub latency_p50_us: u64,
    pub latency_p90_us: u64,
    pub latency_p99_us: u64,
    pub latency_p999_us: u64,
    pub latency_max_us: u64,
    pub latency_min_us: u64,
    pub latency_mean_us: u64,
    pub duration_secs: f64,
    pub status_counts: BTreeMap<u16, u64>,
    pub error_counts: BTreeMap<String, u64>,
}

/// Result of a run: one summary per group, in plan order, plus the aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub overall: MetricsSummary,
    pub groups: IndexMap<String, MetricsSummary>,
}

impl RunMetrics {
    /// Name of the aggregate summary
    pub const OVERALL: &'static str = "Overall";

    /// Summarize every group and their aggregate
    pub fn collect<'a, I>(groups: I, elapsed: Duration) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a LoadMetrics)>,
    {
        let aggregate = LoadMetrics::new();
        let mut summaries = IndexMap::new();

        for (name, metrics) in groups {
            aggregate.merge(metrics);
            summaries.insert(name.to_string(), metrics.summary(name, elapsed));
        }

        Self {
            overall: aggregate.summary(Self::OVERALL, elapsed),
            groups: summaries,
        }
    }

    pub fn group(&self, name: &str) -> Option<&MetricsSummary> {
        self.groups.get(name)
    }
}
