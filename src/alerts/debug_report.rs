use crate::config::RunMetadata;
use crate::error::ReportError;
use crate::events::Timestamp;
use crate::report::Report;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Diagnostic artifact written when a run failed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport<'a> {
    pub timestamp: Timestamp,
    pub environment: &'a str,
    pub branch: &'a str,
    pub commit: &'a str,
    pub summary: &'a Report,
    pub has_failures: bool,
    pub error_count: usize,
}

impl<'a> DebugReport<'a> {
    pub fn new(report: &'a Report, metadata: &'a RunMetadata) -> Self {
        Self {
            timestamp: metadata.timestamp,
            environment: &metadata.environment,
            branch: &metadata.branch,
            commit: &metadata.commit,
            summary: report,
            has_failures: !report.passed(),
            error_count: report.errors.len(),
        }
    }

    /// File name for this artifact, unique per millisecond
    pub fn file_name(&self) -> String {
        format!("k6-debug-report-{}.json", self.timestamp.timestamp_millis())
    }

    /// Write the artifact into `dir` and return its path
    ///
    /// # Errors
    ///
    /// Returns `ReportError::IoError` if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        info!("Debug report saved to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MetricAggregator;
    use crate::events::MetricEvent;
    use crate::report::ReportAssembler;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn failing_report() -> Report {
        let mut aggregator = MetricAggregator::new();
        aggregator.add_event(&MetricEvent::Sample {
            name: "http_req_duration".to_string(),
            timestamp: None,
            value: Some(800.0),
            tags: BTreeMap::new(),
        });
        ReportAssembler::default().assemble(aggregator.finish())
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap(),
            environment: "CI".to_string(),
            branch: "refs/heads/feature".to_string(),
            commit: "deadbeef".to_string(),
        }
    }

    #[test]
    fn test_file_name_uses_millis() {
        let report = failing_report();
        let metadata = metadata();
        let debug = DebugReport::new(&report, &metadata);
        assert_eq!(debug.file_name(), "k6-debug-report-1715256000000.json");
    }

    #[test]
    fn test_write_debug_report() {
        let dir = TempDir::new().unwrap();
        let report = failing_report();
        let metadata = metadata();

        let path = DebugReport::new(&report, &metadata)
            .write_to(dir.path())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["environment"], "CI");
        assert_eq!(json["branch"], "refs/heads/feature");
        assert_eq!(json["commit"], "deadbeef");
        assert_eq!(json["hasFailures"], true);
        assert_eq!(json["errorCount"], 1);
        assert_eq!(json["summary"]["errors"][0]["type"], "PERFORMANCE");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let report = failing_report();
        let metadata = metadata();
        let result = DebugReport::new(&report, &metadata).write_to(Path::new("/nonexistent/dir"));
        assert!(matches!(result, Err(ReportError::IoError(_))));
    }
}
