/// Threshold evaluation and rule definitions
pub mod evaluator;
pub mod rules;

pub use evaluator::{ThresholdEvaluator, Violation};
pub use rules::{Comparator, MetricKey, ThresholdRule, ThresholdTable};
