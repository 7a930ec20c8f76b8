//! # renderload
//!
//! Synthetic read load for Graphite-style `/render` backends.
//!
//! ## Features
//!
//! - **Query Groups**: concurrent client cohorts, each with its own time window
//! - **Round-Robin Targets**: lock-free cyclic generator per group
//! - **Randomized Windows**: `until` offset drawn within the last day
//! - **HDR Histograms**: per-group and overall latency distribution
//! - **Exports**: JSON summary and per-query CSV statistics
//!
//! ## Usage
//!
//! ```bash
//! # Default buckets (1 hour .. 1 year) against a local backend
//! renderload --targets targets.csv --base http://127.0.0.1:8889 --duration 1m
//!
//! # Day-count windows, more 1-day clients, JSON export
//! renderload --targets targets.csv --preset days --users "1 Day=20" --json-file out.json
//! ```

pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;
pub mod stats;

pub use engine::{EngineConfig, HttpEngine, LoadEngine};
pub use error::{EngineError, Result};
pub use metrics::{LoadMetrics, MetricsSummary, RunMetrics};
pub use stats::{QueryStat, StatWriter};
