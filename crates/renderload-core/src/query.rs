//! Render queries produced by the generator

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::RenderLoadError;

/// Path of the Graphite render endpoint
pub const RENDER_PATH: &str = "/render/";

/// Output format requested from the render endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFormat {
    #[default]
    Protobuf,
    CarbonapiV3Pb,
    Pickle,
    Json,
    Csv,
}

impl RenderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protobuf => "protobuf",
            Self::CarbonapiV3Pb => "carbonapi_v3_pb",
            Self::Pickle => "pickle",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = RenderLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "protobuf" => Ok(Self::Protobuf),
            "carbonapi_v3_pb" => Ok(Self::CarbonapiV3Pb),
            "pickle" => Ok(Self::Pickle),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(RenderLoadError::InvalidConfig(format!(
                "unknown render format: {other}"
            ))),
        }
    }
}

/// HTTP method of a query. Render load is read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryMethod {
    #[default]
    Get,
}

impl QueryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
        }
    }
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single render request, relative to the run's base URL.
///
/// `from_secs` and `until_secs` are offsets into the past ("now minus N
/// seconds"); `from_secs - until_secs` is always the generator's window span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub method: QueryMethod,
    pub url: String,
    pub from_secs: u64,
    pub until_secs: u64,
}

impl Query {
    /// Build a render query for `target` over `[now - from, now - until]`
    pub fn render(format: RenderFormat, target: &str, from_secs: u64, until_secs: u64) -> Self {
        let target: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        let url = format!(
            "{RENDER_PATH}?format={format}&target={target}&from=now-{from_secs}s&until=now-{until_secs}s"
        );

        Self {
            method: QueryMethod::Get,
            url,
            from_secs,
            until_secs,
        }
    }

    /// Absolute URL against `base_url` (a trailing slash on the base is ignored)
    pub fn absolute_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_url() {
        let q = Query::render(RenderFormat::Protobuf, "a.metric", 3700, 100);

        assert_eq!(q.method, QueryMethod::Get);
        assert_eq!(
            q.url,
            "/render/?format=protobuf&target=a.metric&from=now-3700s&until=now-100s"
        );
    }

    #[test]
    fn test_target_is_encoded() {
        let q = Query::render(RenderFormat::Json, "sumSeries(a.*,b#c) & d", 60, 0);

        assert!(q.url.contains("format=json"));
        assert!(q.url.contains("target=sumSeries%28a.*%2Cb%23c%29+%26+d&"));
        assert!(q.url.ends_with("&from=now-60s&until=now-0s"));
    }

    #[test]
    fn test_absolute_url() {
        let q = Query::render(RenderFormat::Protobuf, "a", 10, 5);

        assert_eq!(
            q.absolute_url("http://127.0.0.1:8889/"),
            "http://127.0.0.1:8889/render/?format=protobuf&target=a&from=now-10s&until=now-5s"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<RenderFormat>().unwrap(), RenderFormat::Json);
        assert_eq!(
            "carbonapi_v3_pb".parse::<RenderFormat>().unwrap(),
            RenderFormat::CarbonapiV3Pb
        );
        assert!("xml".parse::<RenderFormat>().is_err());
        assert_eq!(RenderFormat::default().to_string(), "protobuf");
    }
}
