//! Run configuration: window presets, TOML file loading and overrides

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RenderLoadError, Result};
use crate::query::RenderFormat;

const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;

/// One query group's time window profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Group name, unique within a run
    pub name: String,

    /// Distance between `from` and `until`, in seconds
    pub window_secs: u64,

    /// Number of concurrent workers (0 keeps the group inert)
    #[serde(default)]
    pub concurrency: usize,
}

impl WindowSpec {
    pub fn new(name: impl Into<String>, window_secs: u64, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            window_secs,
            concurrency,
        }
    }
}

/// Built-in window tables
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Coarse buckets: hour, day, week, quarter, year
    #[default]
    Buckets,
    /// Explicit day counts: 1, 7, 30, 90 and 365 days
    Days,
}

impl Preset {
    pub fn windows(&self) -> Vec<WindowSpec> {
        match self {
            Self::Buckets => vec![
                WindowSpec::new("1 Hour", HOUR, 10),
                WindowSpec::new("1 Day", DAY, 2),
                WindowSpec::new("1 Week", 7 * DAY, 2),
                WindowSpec::new("3 Month", 90 * DAY, 1),
                WindowSpec::new("1 Year", 365 * DAY, 0),
            ],
            Self::Days => vec![
                WindowSpec::new("1 Day", DAY, 10),
                WindowSpec::new("7 Days", 7 * DAY, 2),
                WindowSpec::new("30 Days", 30 * DAY, 2),
                WindowSpec::new("90 Days", 90 * DAY, 1),
                WindowSpec::new("365 Days", 365 * DAY, 0),
            ],
        }
    }
}

impl FromStr for Preset {
    type Err = RenderLoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buckets" => Ok(Self::Buckets),
            "days" => Ok(Self::Days),
            other => Err(RenderLoadError::InvalidConfig(format!(
                "unknown preset: {other}"
            ))),
        }
    }
}

/// Complete run configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Base URL of the render backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overall run duration, e.g. `"1m"` or `"1h30m"`
    #[serde(default = "default_duration", with = "humantime_serde")]
    pub duration: Duration,

    /// Delay between two requests of the same worker, e.g. `"100ms"`
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Render output format
    #[serde(default)]
    pub format: RenderFormat,

    /// Seed for reproducible time offsets
    #[serde(default)]
    pub seed: Option<u64>,

    /// Query groups, in report order
    #[serde(default = "default_groups")]
    pub groups: Vec<WindowSpec>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8889".to_string()
}

fn default_duration() -> Duration {
    Duration::from_secs(60)
}

fn default_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_groups() -> Vec<WindowSpec> {
    Preset::default().windows()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            duration: default_duration(),
            delay: default_delay(),
            request_timeout: default_request_timeout(),
            format: RenderFormat::default(),
            seed: None,
            groups: default_groups(),
        }
    }
}

impl RunConfig {
    /// Default configuration using the windows of `preset`
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            groups: preset.windows(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| RenderLoadError::ConfigIo {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Set the concurrency of the group called `name`
    pub fn set_concurrency(&mut self, name: &str, concurrency: usize) -> Result<()> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| RenderLoadError::UnknownGroup(name.to_string()))?;
        group.concurrency = concurrency;
        Ok(())
    }

    /// Check values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(RenderLoadError::InvalidConfig(
                "base_url must not be empty".to_string(),
            ));
        }

        if self.duration.is_zero() {
            return Err(RenderLoadError::InvalidConfig(
                "duration must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(RenderLoadError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(RenderLoadError::DuplicateGroup(group.name.clone()));
            }
        }

        Ok(())
    }
}

/// Parse a `NAME=N` concurrency override
pub fn parse_concurrency_override(s: &str) -> Result<(String, usize)> {
    let (name, value) = s.rsplit_once('=').ok_or_else(|| {
        RenderLoadError::InvalidConfig(format!("expected NAME=N, got: {s}"))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RenderLoadError::InvalidConfig(format!(
            "missing group name in: {s}"
        )));
    }

    let concurrency = value.trim().parse::<usize>().map_err(|e| {
        RenderLoadError::InvalidConfig(format!("invalid concurrency in {s}: {e}"))
    })?;

    Ok((name.to_string(), concurrency))
}
