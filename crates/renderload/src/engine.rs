//! Load execution engine
//!
//! Drives every query group of a `RunPlan` against the render backend: one
//! tokio task per worker, each drawing queries from its group's generator
//! until the run deadline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use renderload_core::{CyclicQueryGenerator, Query, RunPlan};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::{LoadMetrics, RunMetrics};
use crate::stats::{send_stat, QueryStat, StatSender, StatWriter};

/// Executes a run plan and reports per-group metrics
#[async_trait]
pub trait LoadEngine: Send + Sync {
    /// Run every group of `plan` for `plan.duration`
    async fn run(&self, plan: &RunPlan) -> Result<RunMetrics>;
}

/// Engine settings that are not part of the plan
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-request timeout
    pub request_timeout: Duration,

    /// Idle connections kept per host
    pub max_idle_per_host: usize,

    /// Optional CSV file receiving one row per request
    pub stat_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_idle_per_host: 64,
            stat_file: None,
        }
    }
}

/// `LoadEngine` issuing real HTTP requests with reqwest
pub struct HttpEngine {
    client: reqwest::Client,
    stat_file: Option<PathBuf>,
}

impl HttpEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()?;

        Ok(Self {
            client,
            stat_file: config.stat_file,
        })
    }
}

#[async_trait]
impl LoadEngine for HttpEngine {
    async fn run(&self, plan: &RunPlan) -> Result<RunMetrics> {
        info!(
            "Starting render load against {} for {:?} with {} workers",
            plan.base_url,
            plan.duration,
            plan.total_concurrency()
        );

        let (stat_writer, stat_tx) = match &self.stat_file {
            Some(path) => {
                let (writer, tx) = StatWriter::spawn(path)?;
                (Some(writer), Some(tx))
            }
            None => (None, None),
        };

        let group_metrics: Vec<Arc<LoadMetrics>> = plan
            .groups
            .iter()
            .map(|_| Arc::new(LoadMetrics::new()))
            .collect();

        let base_url: Arc<str> = Arc::from(plan.base_url.trim_end_matches('/'));
        let start = Instant::now();
        let deadline = start + plan.duration;

        let mut workers = FuturesUnordered::new();
        for (group, metrics) in plan.groups.iter().zip(&group_metrics) {
            if group.is_inert() {
                info!("Group '{}' has no workers", group.name);
                continue;
            }

            info!(
                "Group '{}': {} workers, window {}s, delay {:?}",
                group.name,
                group.concurrency,
                group.window_secs(),
                group.delay
            );

            let group_name: Arc<str> = Arc::from(group.name.as_str());
            for id in 0..group.concurrency {
                let worker = Worker {
                    id,
                    group: group_name.clone(),
                    client: self.client.clone(),
                    base_url: base_url.clone(),
                    generator: group.generator().clone(),
                    delay: group.delay,
                    deadline,
                    metrics: metrics.clone(),
                    stats: stat_tx.clone(),
                };
                workers.push(tokio::spawn(worker.run()));
            }
        }

        // writer finishes once the last worker drops its sender
        drop(stat_tx);

        while let Some(joined) = workers.next().await {
            joined?;
        }
        let elapsed = start.elapsed();

        if let Some(writer) = stat_writer {
            writer.finish().await?;
        }

        info!("Render load complete after {:?}", elapsed);
        Ok(RunMetrics::collect(
            plan.groups
                .iter()
                .zip(&group_metrics)
                .map(|(group, metrics)| (group.name.as_str(), &**metrics)),
            elapsed,
        ))
    }
}

/// Outcome of one request
enum Outcome {
    Response { status: u16, bytes: u64 },
    Transport { kind: &'static str, message: String },
}

fn classify(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else {
        "request"
    }
}

/// One simulated client of a query group
struct Worker {
    id: usize,
    group: Arc<str>,
    client: reqwest::Client,
    base_url: Arc<str>,
    generator: Arc<CyclicQueryGenerator>,
    delay: Duration,
    deadline: Instant,
    metrics: Arc<LoadMetrics>,
    stats: Option<StatSender>,
}

impl Worker {
    async fn run(self) {
        debug!("Worker {} of '{}' started", self.id, self.group);
        let mut sent = 0u64;

        while Instant::now() < self.deadline {
            let query = self.generator.next_query();
            let url = query.absolute_url(&self.base_url);

            let started = Instant::now();
            let outcome = tokio::select! {
                outcome = self.execute(&url) => outcome,
                // in-flight requests are abandoned at the deadline
                _ = sleep_until(self.deadline) => break,
            };
            let latency_us = started.elapsed().as_micros() as u64;

            self.record(&query, url, outcome, latency_us).await;
            sent += 1;

            if !self.delay.is_zero() {
                sleep_until((Instant::now() + self.delay).min(self.deadline)).await;
            }
        }

        debug!("Worker {} of '{}' done after {} requests", self.id, self.group, sent);
    }

    async fn execute(&self, url: &str) -> Outcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return Outcome::Transport {
                    kind: classify(&e),
                    message: e.to_string(),
                }
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => Outcome::Response {
                status,
                bytes: body.len() as u64,
            },
            Err(e) => Outcome::Transport {
                kind: classify(&e),
                message: e.to_string(),
            },
        }
    }

    async fn record(&self, query: &Query, url: String, outcome: Outcome, latency_us: u64) {
        let (status, error) = match outcome {
            Outcome::Response { status, bytes } if (200..300).contains(&status) => {
                self.metrics.record_success(status, latency_us, bytes);
                (Some(status), None)
            }
            Outcome::Response { status, .. } => {
                let label = format!("http_{status}");
                self.metrics.record_failure(Some(status), &label, latency_us);
                (Some(status), Some(label))
            }
            Outcome::Transport { kind, message } => {
                debug!("Request to {} failed: {}", url, message);
                self.metrics.record_failure(None, kind, latency_us);
                (None, Some(kind.to_string()))
            }
        };

        if let Some(tx) = &self.stats {
            send_stat(
                tx,
                QueryStat {
                    timestamp: chrono::Utc::now(),
                    group: self.group.to_string(),
                    method: query.method.as_str(),
                    url,
                    status,
                    latency_us,
                    error,
                },
            )
            .await;
        }
    }
}
