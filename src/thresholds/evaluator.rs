use crate::aggregator::metric_aggregator::serialize_rounded;
use crate::aggregator::{ChecksView, PerformanceView};
use crate::events::Category;
use crate::thresholds::rules::{ThresholdRule, ThresholdTable};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Applies threshold rules to a run's performance and check views
///
/// The evaluator holds no state besides its rules, so evaluating the same
/// views twice always yields the same violations.
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    rules: Vec<ThresholdRule>,
}

/// A single threshold rule failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    /// What kind of problem this is
    #[serde(rename = "type")]
    pub category: Category,
    /// Identifier of the evaluated value (e.g. `http_req_duration_p95`)
    pub metric: String,
    /// Observed value
    #[serde(serialize_with = "serialize_rounded")]
    pub actual: f64,
    /// Limit the value was compared against
    pub threshold: f64,
    /// Human-readable description embedding both values
    pub message: String,
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new(&ThresholdTable::default())
    }
}

impl ThresholdEvaluator {
    /// Create an evaluator enforcing the rules of a threshold table
    pub fn new(table: &ThresholdTable) -> Self {
        Self::with_rules(table.rules())
    }

    /// Create an evaluator with an explicit rule list
    ///
    /// Rules are evaluated in the given order.
    pub fn with_rules(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    /// Get the number of configured rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate every rule independently and collect the failures
    ///
    /// A rule whose value is absent from the views is skipped; missing data is
    /// not a violation.
    pub fn evaluate(
        &self,
        performance: &PerformanceView,
        checks: Option<&ChecksView>,
    ) -> Vec<Violation> {
        info!("Evaluating performance thresholds...");

        let mut violations = Vec::new();
        for rule in &self.rules {
            let Some(actual) = rule.metric_key.resolve(performance, checks) else {
                debug!("No data for '{}', skipping rule", rule.metric_key);
                continue;
            };

            if rule.passes(actual) {
                debug!(
                    "Rule passed: {} {} {} (actual {})",
                    rule.metric_key, rule.comparator, rule.limit, actual
                );
                continue;
            }

            let violation = Violation {
                category: rule.category(),
                metric: rule.metric_key.as_str().to_string(),
                actual,
                threshold: rule.limit,
                message: rule.failure_message(actual),
            };
            info!("Threshold failed: {}", violation.message);
            violations.push(violation);
        }

        violations
    }
}
