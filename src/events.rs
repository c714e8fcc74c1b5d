//! Core event types for k6 result processing
//!
//! This module defines the data structures shared by the stream parser, the
//! aggregator and the threshold evaluator: parsed metric events, metric kinds,
//! and the violation categories used throughout the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// A single record from the k6 JSON output
///
/// k6 writes one JSON object per line. `Metric` lines declare a metric and
/// `Point` lines carry one observation for it.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// Declaration of a metric, emitted once before its first sample
    Definition {
        /// Metric name (e.g. `http_req_duration`)
        name: String,
        /// k6 metric kind
        kind: MetricKind,
        /// Threshold expressions declared in the load script (e.g. `p(95)<500`)
        declared_thresholds: Vec<String>,
        /// Names of sub-metrics derived from this metric
        sub_metrics: Vec<String>,
    },
    /// One timestamped observation for a metric
    Sample {
        /// Metric name the sample belongs to
        name: String,
        /// When the observation was taken, if k6 reported it
        timestamp: Option<Timestamp>,
        /// Observed value; `None` when k6 wrote `null` or omitted it
        value: Option<f64>,
        /// Tags attached to the observation (method, status, group, ...)
        tags: BTreeMap<String, String>,
    },
}

impl MetricEvent {
    /// Name of the metric this event refers to
    pub fn name(&self) -> &str {
        match self {
            MetricEvent::Definition { name, .. } => name,
            MetricEvent::Sample { name, .. } => name,
        }
    }
}

/// Metric kinds understood by k6
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Cumulative count (e.g. `http_reqs`)
    Counter,
    /// Last-value gauge (e.g. `vus`)
    Gauge,
    /// Fraction of non-zero values (e.g. `http_req_failed`, `checks`)
    Rate,
    /// Distribution of values (e.g. `http_req_duration`)
    Trend,
    /// Any kind this crate does not know about, kept verbatim
    Other(String),
}

impl MetricKind {
    /// Parse a k6 metric kind, preserving unknown kinds
    pub fn parse(kind: &str) -> Self {
        match kind.to_lowercase().as_str() {
            "counter" => MetricKind::Counter,
            "gauge" => MetricKind::Gauge,
            "rate" => MetricKind::Rate,
            "trend" => MetricKind::Trend,
            _ => MetricKind::Other(kind.to_string()),
        }
    }
}

/// Category of a threshold violation
///
/// The declaration order is the fixed rule-evaluation order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Response times are too slow
    Performance,
    /// Too many requests failed
    Reliability,
    /// Too many k6 checks failed
    Functionality,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Performance => "PERFORMANCE",
            Category::Reliability => "RELIABILITY",
            Category::Functionality => "FUNCTIONALITY",
        };
        f.write_str(label)
    }
}
