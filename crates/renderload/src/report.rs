//! Result reporting: console summary and JSON export

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{EngineError, Result};
use crate::metrics::{MetricsSummary, RunMetrics};

impl MetricsSummary {
    /// Write a formatted block for this summary
    pub fn write_report<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "\n╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(out, "║ {:<60} ║", truncate(&self.name.to_uppercase(), 60))?;
        writeln!(out, "╠══════════════════════════════════════════════════════════════╣")?;
        writeln!(out, "║ Duration:          {:>10.2} seconds                        ║", self.duration_secs)?;
        writeln!(out, "║ Total Requests:    {:>10}                                 ║", self.total_requests)?;
        writeln!(out, "║ Successful:        {:>10}                                 ║", self.successful_requests)?;
        writeln!(out, "║ Failed:            {:>10}                                 ║", self.failed_requests)?;
        writeln!(out, "║ Success Rate:      {:>10.2}%                               ║", self.success_rate)?;
        writeln!(out, "║ Avg RPS:           {:>10.2}                                ║", self.avg_rps)?;

        if self.total_requests > 0 {
            writeln!(out, "╠══════════════════════════════════════════════════════════════╣")?;
            writeln!(out, "║ LATENCY (microseconds)                                       ║")?;
            writeln!(out, "║   p50:             {:>10}                                 ║", self.latency_p50_us)?;
            writeln!(out, "║   p90:             {:>10}                                 ║", self.latency_p90_us)?;
            writeln!(out, "║   p99:             {:>10}                                 ║", self.latency_p99_us)?;
            writeln!(out, "║   p99.9:           {:>10}                                 ║", self.latency_p999_us)?;
            writeln!(out, "║   min:             {:>10}                                 ║", self.latency_min_us)?;
            writeln!(out, "║   max:             {:>10}                                 ║", self.latency_max_us)?;
            writeln!(out, "║   mean:            {:>10}                                 ║", self.latency_mean_us)?;
            writeln!(out, "╠══════════════════════════════════════════════════════════════╣")?;
            writeln!(out, "║ Bytes Received:    {:>10}                                 ║", self.bytes_received)?;
        }

        if !self.status_counts.is_empty() {
            writeln!(out, "╠══════════════════════════════════════════════════════════════╣")?;
            writeln!(out, "║ STATUS CODES                                                 ║")?;
            for (status, count) in &self.status_counts {
                writeln!(out, "║   {:<20}: {:>10}                         ║", status, count)?;
            }
        }

        if !self.error_counts.is_empty() {
            writeln!(out, "╠══════════════════════════════════════════════════════════════╣")?;
            writeln!(out, "║ ERRORS                                                       ║")?;
            for (error_type, count) in &self.error_counts {
                writeln!(out, "║   {:<20}: {:>10}                         ║", truncate(error_type, 20), count)?;
            }
        }

        writeln!(out, "╚══════════════════════════════════════════════════════════════╝")
    }
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

impl RunMetrics {
    /// Print every group in plan order, then the overall summary
    pub fn print_report(&self) -> std::io::Result<()> {
        self.write_report(&mut std::io::stdout().lock())
    }

    /// Write every group in plan order, then the overall summary
    pub fn write_report<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for summary in self.groups.values() {
            summary.write_report(out)?;
        }
        self.overall.write_report(out)?;
        writeln!(out)
    }

    /// Export the overall and per-group summaries as pretty JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| EngineError::Export {
            path: path.display().to_string(),
            source,
        })?;

        info!("Results saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LoadMetrics;
    use std::time::Duration;

    fn run_metrics() -> RunMetrics {
        let hour = LoadMetrics::new();
        hour.record_success(200, 1_500, 64);
        hour.record_failure(Some(502), "http_502", 900);
        let year = LoadMetrics::new();

        RunMetrics::collect([("1 Hour", &hour), ("1 Year", &year)], Duration::from_secs(1))
    }

    #[test]
    fn test_report_contents() {
        let metrics = run_metrics();
        let mut out = Vec::new();
        metrics.group("1 Hour").unwrap().write_report(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 HOUR"));
        assert!(text.contains("LATENCY"));
        assert!(text.contains("STATUS CODES"));
        assert!(text.contains("http_502"));
    }

    #[test]
    fn test_idle_group_report() {
        let metrics = run_metrics();
        let mut out = Vec::new();
        metrics.group("1 Year").unwrap().write_report(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 YEAR"));
        assert!(!text.contains("LATENCY"));
        assert!(!text.contains("ERRORS"));
    }

    #[test]
    fn test_run_report_order() {
        let mut out = Vec::new();
        run_metrics().write_report(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let hour = text.find("1 HOUR").unwrap();
        let year = text.find("1 YEAR").unwrap();
        let overall = text.find("OVERALL").unwrap();
        assert!(hour < year && year < overall);
    }

    #[test]
    fn test_report_write_failure_propagates() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = run_metrics().write_report(&mut Closed).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_json_export() {
        let metrics = run_metrics();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        metrics.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["overall"]["total_requests"], 2);
        assert_eq!(value["groups"]["1 Hour"]["failed_requests"], 1);
        assert_eq!(value["groups"]["1 Year"]["total_requests"], 0);
        assert_eq!(value["groups"]["1 Hour"]["status_counts"]["502"], 1);

        let restored: RunMetrics = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let names: Vec<&str> = restored.groups.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["1 Hour", "1 Year"]);
    }

    #[test]
    fn test_export_to_missing_dir_fails() {
        let err = run_metrics().write_json("/nonexistent/dir/report.json").unwrap_err();
        assert!(matches!(err, EngineError::Export { .. }));
    }
}
