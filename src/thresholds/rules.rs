//! Threshold table and rule definitions
//!
//! The [`ThresholdTable`] is the versioned configuration value holding every
//! limit a run is judged against. It is turned into an ordered list of
//! [`ThresholdRule`]s, one per enforced limit, which the evaluator applies.

use crate::aggregator::metric_aggregator::round3;
use crate::aggregator::{ChecksView, PerformanceView};
use crate::error::ConfigError;
use crate::events::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Limits a load-test run must satisfy
///
/// Field names double as the JSON keys under `thresholds` in the report, so
/// renaming one breaks downstream consumers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdTable {
    /// Maximum p95 response time in milliseconds
    pub http_req_duration_p95: f64,
    /// Maximum p95 response time for authenticated requests in milliseconds
    pub http_req_duration_p95_authenticated: f64,
    /// Maximum fraction of failed requests
    pub http_req_failed_rate: f64,
    /// Minimum fraction of passed checks
    pub checks_rate: f64,
    /// Minimum requests per second
    pub http_reqs_rate: f64,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            http_req_duration_p95: 250.0,
            http_req_duration_p95_authenticated: 300.0,
            http_req_failed_rate: 0.1,
            checks_rate: 0.9,
            http_reqs_rate: 1.0,
        }
    }
}

impl ThresholdTable {
    /// The enforced rules, in evaluation order
    ///
    /// Performance comes first, then reliability, then functionality. The
    /// authenticated response time and request rate limits are reported but
    /// not enforced: nothing in the k6 event stream identifies authenticated
    /// requests, and `http_reqs` samples are counts rather than a rate.
    pub fn rules(&self) -> Vec<ThresholdRule> {
        vec![
            ThresholdRule {
                metric_key: MetricKey::ResponseTimeP95,
                comparator: Comparator::AtMost,
                limit: self.http_req_duration_p95,
                label: "Response time p95".to_string(),
            },
            ThresholdRule {
                metric_key: MetricKey::ErrorRate,
                comparator: Comparator::AtMost,
                limit: self.http_req_failed_rate,
                label: "Error rate".to_string(),
            },
            ThresholdRule {
                metric_key: MetricKey::CheckPassRate,
                comparator: Comparator::AtLeast,
                limit: self.checks_rate,
                label: "Check pass rate".to_string(),
            },
        ]
    }

    /// Validate that every limit is usable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for negative or non-finite
    /// limits and for rates outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("http_req_duration_p95", self.http_req_duration_p95),
            (
                "http_req_duration_p95_authenticated",
                self.http_req_duration_p95_authenticated,
            ),
            ("http_req_failed_rate", self.http_req_failed_rate),
            ("checks_rate", self.checks_rate),
            ("http_reqs_rate", self.http_reqs_rate),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "threshold '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("http_req_failed_rate", self.http_req_failed_rate),
            ("checks_rate", self.checks_rate),
        ] {
            if value > 1.0 {
                return Err(ConfigError::ValidationError(format!(
                    "threshold '{}' is a rate and must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Comparison a value must satisfy to pass a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `actual <= limit`
    AtMost,
    /// `actual < limit`
    Below,
    /// `actual >= limit`
    AtLeast,
    /// `actual > limit`
    Above,
}

impl Comparator {
    /// Whether `actual` satisfies the comparison against `limit`
    pub fn passes(self, actual: f64, limit: f64) -> bool {
        match self {
            Comparator::AtMost => actual <= limit,
            Comparator::Below => actual < limit,
            Comparator::AtLeast => actual >= limit,
            Comparator::Above => actual > limit,
        }
    }

    /// Verb describing a failed comparison
    fn failure_verb(self) -> &'static str {
        match self {
            Comparator::AtMost | Comparator::Below => "exceeds",
            Comparator::AtLeast | Comparator::Above => "below",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::AtMost => "<=",
            Comparator::Below => "<",
            Comparator::AtLeast => ">=",
            Comparator::Above => ">",
        };
        f.write_str(symbol)
    }
}

/// Value a rule is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKey {
    /// p95 of `http_req_duration`
    ResponseTimeP95,
    /// Mean of `http_req_failed`
    ErrorRate,
    /// Mean of `checks`
    CheckPassRate,
}

impl MetricKey {
    /// Identifier reported in violations
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::ResponseTimeP95 => "http_req_duration_p95",
            MetricKey::ErrorRate => "http_req_failed_rate",
            MetricKey::CheckPassRate => "checks_rate",
        }
    }

    /// Category of a violation of this key
    pub fn category(self) -> Category {
        match self {
            MetricKey::ResponseTimeP95 => Category::Performance,
            MetricKey::ErrorRate => Category::Reliability,
            MetricKey::CheckPassRate => Category::Functionality,
        }
    }

    /// Look up the value in the run's views
    ///
    /// Returns `None` when the run recorded no data for the metric.
    pub fn resolve(self, performance: &PerformanceView, checks: Option<&ChecksView>) -> Option<f64> {
        match self {
            MetricKey::ResponseTimeP95 => performance.response_time.map(|rt| rt.p95),
            MetricKey::ErrorRate => performance.error_rate.map(|er| er.rate),
            MetricKey::CheckPassRate => checks.map(|c| c.rate),
        }
    }

    /// Render a value in this key's unit
    pub fn format_value(self, value: f64) -> String {
        match self {
            MetricKey::ResponseTimeP95 => format!("{}ms", round3(value)),
            MetricKey::ErrorRate | MetricKey::CheckPassRate => {
                format!("{:.2}%", round3(value) * 100.0)
            }
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single limit applied to one value of the run
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    /// Value the rule applies to
    pub metric_key: MetricKey,
    /// Comparison the value must satisfy
    pub comparator: Comparator,
    /// Limit compared against
    pub limit: f64,
    /// Human-readable name used in messages
    pub label: String,
}

impl ThresholdRule {
    /// Category of a violation of this rule
    pub fn category(&self) -> Category {
        self.metric_key.category()
    }

    /// Whether `actual` satisfies this rule
    pub fn passes(&self, actual: f64) -> bool {
        self.comparator.passes(actual, self.limit)
    }

    /// Sentence describing a failure of this rule
    pub fn failure_message(&self, actual: f64) -> String {
        format!(
            "{} ({}) {} threshold ({})",
            self.label,
            self.metric_key.format_value(actual),
            self.comparator.failure_verb(),
            self.metric_key.format_value(self.limit)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = ThresholdTable::default();
        assert_eq!(table.http_req_duration_p95, 250.0);
        assert_eq!(table.http_req_duration_p95_authenticated, 300.0);
        assert_eq!(table.http_req_failed_rate, 0.1);
        assert_eq!(table.checks_rate, 0.9);
        assert_eq!(table.http_reqs_rate, 1.0);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_table_serializes_with_report_keys() {
        let json = serde_json::to_value(ThresholdTable::default()).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "checks_rate",
                "http_req_duration_p95",
                "http_req_duration_p95_authenticated",
                "http_req_failed_rate",
                "http_reqs_rate",
            ]
        );
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let table: ThresholdTable = toml::from_str("http_req_duration_p95 = 500.0").unwrap();
        assert_eq!(table.http_req_duration_p95, 500.0);
        assert_eq!(table.checks_rate, 0.9);
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let negative = ThresholdTable {
            http_req_duration_p95: -1.0,
            ..ThresholdTable::default()
        };
        assert!(negative.validate().is_err());

        let not_a_number = ThresholdTable {
            http_reqs_rate: f64::NAN,
            ..ThresholdTable::default()
        };
        assert!(not_a_number.validate().is_err());

        let rate_above_one = ThresholdTable {
            checks_rate: 1.5,
            ..ThresholdTable::default()
        };
        assert!(rate_above_one.validate().is_err());
    }

    #[test]
    fn test_rules_order() {
        let categories: Vec<Category> = ThresholdTable::default()
            .rules()
            .iter()
            .map(ThresholdRule::category)
            .collect();
        assert_eq!(
            categories,
            vec![
                Category::Performance,
                Category::Reliability,
                Category::Functionality
            ]
        );
    }

    #[test]
    fn test_comparators() {
        assert!(Comparator::AtMost.passes(250.0, 250.0));
        assert!(!Comparator::AtMost.passes(250.1, 250.0));
        assert!(!Comparator::Below.passes(250.0, 250.0));
        assert!(Comparator::AtLeast.passes(0.9, 0.9));
        assert!(!Comparator::AtLeast.passes(0.89, 0.9));
        assert!(!Comparator::Above.passes(0.9, 0.9));
        assert_eq!(Comparator::AtMost.to_string(), "<=");
        assert_eq!(Comparator::Above.to_string(), ">");
    }

    #[test]
    fn test_failure_messages() {
        let rules = ThresholdTable::default().rules();
        assert_eq!(
            rules[0].failure_message(900.0),
            "Response time p95 (900ms) exceeds threshold (250ms)"
        );
        assert_eq!(
            rules[1].failure_message(0.125),
            "Error rate (12.50%) exceeds threshold (10.00%)"
        );
        assert_eq!(
            rules[2].failure_message(0.85),
            "Check pass rate (85.00%) below threshold (90.00%)"
        );
    }

    #[test]
    fn test_response_time_message_is_rounded() {
        let rules = ThresholdTable::default().rules();
        assert_eq!(
            rules[0].failure_message(312.34567),
            "Response time p95 (312.346ms) exceeds threshold (250ms)"
        );
    }

    #[test]
    fn test_rate_message_matches_rounded_actual() {
        let rules = ThresholdTable::default().rules();
        assert_eq!(
            rules[1].failure_message(0.1236),
            "Error rate (12.40%) exceeds threshold (10.00%)"
        );
        assert_eq!(
            rules[2].failure_message(0.8234),
            "Check pass rate (82.30%) below threshold (90.00%)"
        );
    }
}
