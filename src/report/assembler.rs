//! Report assembly
//!
//! The [`Report`] is the single artifact produced by a run: it is printed,
//! persisted as JSON, and later read back by the `notify` command. Its field
//! order and JSON keys are a compatibility contract with downstream CI steps.

use crate::aggregator::{Aggregation, ChecksView, PerformanceView, StatisticalSummary};
use crate::events::Timestamp;
use crate::report::recommendations::{recommend, Recommendation};
use crate::thresholds::{ThresholdEvaluator, ThresholdTable, Violation};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Outcome of one load-test run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// When the report was assembled
    pub timestamp: Timestamp,
    /// Limits the run was judged against
    #[serde(default)]
    pub thresholds: ThresholdTable,
    /// Summary per metric, keyed by metric name
    #[serde(default)]
    pub metrics: BTreeMap<String, StatisticalSummary>,
    /// Response time, error rate and request rate snapshot
    pub performance: PerformanceView,
    /// Check pass rate, absent when the run recorded no checks
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_object_as_none"
    )]
    pub checks: Option<ChecksView>,
    /// Threshold violations in rule-evaluation order
    pub errors: Vec<Violation>,
    /// Remediation advice, one per violated category
    pub recommendations: Vec<Recommendation>,
}

/// Older reports write an empty object when no checks were recorded
fn empty_object_as_none<'de, D>(deserializer: D) -> Result<Option<ChecksView>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Report {
    /// Whether every threshold was met
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Process exit code for this report: 0 on success, 1 on any violation
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Builds reports from aggregated runs
///
/// Performs no I/O; the only outside input is the timestamp.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    thresholds: ThresholdTable,
    evaluator: ThresholdEvaluator,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::new(ThresholdTable::default())
    }
}

impl ReportAssembler {
    /// Create an assembler judging runs against the given thresholds
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self {
            evaluator: ThresholdEvaluator::new(&thresholds),
            thresholds,
        }
    }

    /// Assemble a report stamped with the current time
    pub fn assemble(&self, aggregation: Aggregation) -> Report {
        self.assemble_at(aggregation, Utc::now())
    }

    /// Assemble a report stamped with the given time
    pub fn assemble_at(&self, aggregation: Aggregation, timestamp: Timestamp) -> Report {
        info!("Generating performance summary...");

        let errors = self
            .evaluator
            .evaluate(&aggregation.performance, aggregation.checks.as_ref());

        info!("Generating recommendations...");
        let recommendations = recommend(&errors);

        Report {
            timestamp,
            thresholds: self.thresholds,
            metrics: aggregation.summaries,
            performance: aggregation.performance,
            checks: aggregation.checks,
            errors,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MetricAggregator;
    use crate::events::{Category, MetricEvent};
    use chrono::TimeZone;

    fn aggregation(samples: &[(&str, f64)]) -> Aggregation {
        let mut aggregator = MetricAggregator::new();
        for (name, value) in samples {
            aggregator.add_event(&MetricEvent::Sample {
                name: name.to_string(),
                timestamp: None,
                value: Some(*value),
                tags: BTreeMap::new(),
            });
        }
        aggregator.finish()
    }

    fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_passing_report() {
        let report = ReportAssembler::default().assemble_at(
            aggregation(&[("http_req_duration", 120.0), ("checks", 1.0)]),
            fixed_time(),
        );

        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.recommendations, vec![Recommendation::success()]);
        assert_eq!(report.timestamp, fixed_time());
    }

    #[test]
    fn test_failing_report() {
        let report = ReportAssembler::default().assemble_at(
            aggregation(&[("http_req_duration", 700.0), ("http_req_failed", 1.0)]),
            fixed_time(),
        );

        assert!(!report.passed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].category, Category::Performance);
        assert_eq!(report.errors[1].category, Category::Reliability);
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn test_report_field_order() {
        let report = ReportAssembler::default().assemble_at(
            aggregation(&[("http_req_duration", 120.0), ("checks", 1.0)]),
            fixed_time(),
        );
        let json = serde_json::to_string(&report).unwrap();

        let positions: Vec<usize> = [
            "\"timestamp\"",
            "\"thresholds\"",
            "\"metrics\"",
            "\"performance\"",
            "\"checks\"",
            "\"errors\"",
            "\"recommendations\"",
        ]
        .iter()
        .map(|key| json.find(key).unwrap())
        .collect();

        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_serialization_is_stable() {
        let assembler = ReportAssembler::default();
        let samples = [
            ("http_reqs", 1.0),
            ("http_req_duration", 88.0),
            ("vus", 10.0),
            ("checks", 0.0),
        ];
        let first = serde_json::to_string(&assembler.assemble_at(aggregation(&samples), fixed_time()))
            .unwrap();
        let second =
            serde_json::to_string(&assembler.assemble_at(aggregation(&samples), fixed_time()))
                .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_round_trip_through_json() {
        let report = ReportAssembler::default().assemble_at(
            aggregation(&[("http_req_duration", 700.0), ("checks", 0.5)]),
            fixed_time(),
        );
        let json = serde_json::to_string_pretty(&report).unwrap();
        let restored: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, report);
    }

    #[test]
    fn test_empty_checks_object_reads_as_absent() {
        let json = r#"{
            "timestamp": "2024-05-09T12:00:00.000Z",
            "thresholds": {"http_req_duration_p95": 250, "http_req_duration_p95_authenticated": 300,
                           "http_req_failed_rate": 0.1, "checks_rate": 0.9, "http_reqs_rate": 1},
            "metrics": {},
            "performance": {},
            "checks": {},
            "errors": [],
            "recommendations": [{"type": "SUCCESS", "message": "All performance thresholds met! 🎉"}]
        }"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert!(report.checks.is_none());
        assert!(report.passed());
    }
}
