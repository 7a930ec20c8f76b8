//! # renderload CLI
//!
//! Command-line interface for running render load against a Graphite-style backend.
//!
//! ## Usage
//!
//! ```bash
//! # Default run: five bucket groups, 100ms delay, one minute
//! renderload --targets test.csv --base http://127.0.0.1:8889
//!
//! # Configuration file with CLI overrides
//! renderload --config load.toml --duration 10m --users "1 Year=2"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use renderload::{EngineConfig, HttpEngine, LoadEngine};
use renderload_core::{
    parse_concurrency_override, Preset, RenderFormat, RunConfig, RunPlan, TargetCatalog,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "renderload")]
#[command(version)]
#[command(about = "Synthetic read load for Graphite-style render APIs", long_about = None)]
struct Cli {
    /// CSV file with one column (the target) and a header row
    #[arg(long, default_value = "test.csv")]
    targets: PathBuf,

    /// Base URL of the render backend
    #[arg(long)]
    base: Option<String>,

    /// CSV file receiving one row per query
    #[arg(long)]
    stat_file: Option<PathBuf>,

    /// JSON file receiving the aggregated statistics
    #[arg(long)]
    json_file: Option<PathBuf>,

    /// Delay between requests of one worker (e.g. 100ms)
    #[arg(long, value_parser = humantime::parse_duration)]
    delay: Option<Duration>,

    /// Run duration (e.g. 1m, 1h30m)
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Per-request timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Render output format
    #[arg(long, value_parser = parse_format)]
    format: Option<RenderFormat>,

    /// Seed for reproducible time windows
    #[arg(long)]
    seed: Option<u64>,

    /// Window table: buckets (1 Hour .. 1 Year) or days (1 Day .. 365 Days)
    #[arg(long, value_parser = parse_preset)]
    preset: Option<Preset>,

    /// TOML configuration file; CLI options override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Concurrency of one group, as NAME=N (repeatable)
    #[arg(short, long = "users", value_parser = parse_users)]
    users: Vec<(String, usize)>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn parse_format(s: &str) -> Result<RenderFormat, String> {
    s.parse().map_err(|e: renderload_core::RenderLoadError| e.to_string())
}

fn parse_preset(s: &str) -> Result<Preset, String> {
    s.parse().map_err(|e: renderload_core::RenderLoadError| e.to_string())
}

fn parse_users(s: &str) -> Result<(String, usize), String> {
    parse_concurrency_override(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Merge the configuration file, the preset and CLI overrides
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("load configuration {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(preset) = self.preset {
            config.groups = preset.windows();
        }
        if let Some(base) = &self.base {
            config.base_url = base.clone();
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(delay) = self.delay {
            config.delay = delay;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        for (name, concurrency) in &self.users {
            config
                .set_concurrency(name, *concurrency)
                .with_context(|| format!("apply --users {name}={concurrency}"))?;
        }

        config.validate().context("validate configuration")?;
        Ok(config)
    }
}

/// Assemble the run plan, naming the targets file when it is the cause
fn build_plan(
    config: &RunConfig,
    catalog: &TargetCatalog,
    targets: &Path,
) -> anyhow::Result<RunPlan> {
    RunPlan::from_config(config, catalog).map_err(|e| {
        let context = if e.is_catalog_error() {
            format!("no usable targets in {}", targets.display())
        } else {
            "assemble run plan".to_string()
        };
        anyhow::Error::new(e).context(context)
    })
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    info!("renderload v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.run_config()?;

    let catalog = TargetCatalog::from_path(&cli.targets)
        .with_context(|| format!("load targets from {}", cli.targets.display()))?;
    let plan = build_plan(&config, &catalog, &cli.targets)?;

    let engine = HttpEngine::new(EngineConfig {
        request_timeout: config.request_timeout,
        max_idle_per_host: plan.total_concurrency().max(1),
        stat_file: cli.stat_file.clone(),
    })
    .context("create load engine")?;

    let metrics = engine.run(&plan).await.context("execute run")?;
    metrics.print_report().context("print report")?;

    if let Some(path) = &cli.json_file {
        metrics.write_json(path).context("export JSON results")?;
    }

    Ok(())
}
