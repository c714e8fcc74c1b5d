//! Human-readable renderings of a report
//!
//! Numbers are shown the way they are persisted: rounded to three decimals,
//! with rates as percentages to two decimals.

use crate::aggregator::metric_aggregator::round3;
use crate::config::RunMetadata;
use crate::report::Report;
use chrono::SecondsFormat;
use std::fmt::Write;

const SUMMARY_RULE_WIDTH: usize = 60;

const NEXT_STEPS: [&str; 4] = [
    "Review the failing metrics above",
    "Check recent code changes that might affect performance",
    "Investigate server resources and API endpoint health",
    "Consider rolling back if performance degradation is significant",
];

fn percent(rate: f64) -> String {
    format!("{:.2}%", round3(rate) * 100.0)
}

/// Render the summary printed by `parse-results`
pub fn render_console_summary(report: &Report) -> String {
    let rule = "=".repeat(SUMMARY_RULE_WIDTH);
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "📊 K6 PERFORMANCE TEST SUMMARY");
    let _ = writeln!(out, "{}", rule);

    if let Some(rt) = report.performance.response_time {
        let _ = writeln!(out, "\n⏱️  Response Time:");
        let _ = writeln!(out, "   Average: {}ms", round3(rt.avg));
        let _ = writeln!(out, "   P95: {}ms", round3(rt.p95));
        let _ = writeln!(out, "   P99: {}ms", round3(rt.p99));
    }

    if let Some(er) = report.performance.error_rate {
        let _ = writeln!(out, "\n❌ Error Rate:");
        let _ = writeln!(out, "   Rate: {}", percent(er.rate));
        let _ = writeln!(out, "   Total Errors: {}", round3(er.total));
    }

    if let Some(checks) = report.checks {
        let _ = writeln!(out, "\n✅ Check Pass Rate:");
        let _ = writeln!(out, "   Rate: {}", percent(checks.rate));
        let _ = writeln!(out, "   Total Checks: {}", round3(checks.total));
    }

    let _ = writeln!(out, "\n🎯 Threshold Evaluation:");
    if report.errors.is_empty() {
        let _ = writeln!(out, "   ✅ All thresholds passed!");
    } else {
        for violation in &report.errors {
            let _ = writeln!(out, "   ❌ {}", violation.message);
        }
    }

    let _ = writeln!(out, "\n💡 Recommendations:");
    for recommendation in &report.recommendations {
        let marker = if recommendation.is_success() { "✅" } else { "⚠️" };
        let _ = writeln!(out, "   {} {}", marker, recommendation.message);
    }

    let _ = write!(out, "\n{}", rule);
    out
}

/// Render the notification message sent to every channel
///
/// The failure variant lists violations, recommendations and fixed next
/// steps; the success variant ends with a closing line instead.
pub fn render_notification(report: &Report, metadata: &RunMetadata) -> String {
    let mut message = String::new();

    if report.passed() {
        message.push_str("✅ **K6 Load Tests Passed Successfully**\n\n");
    } else {
        message.push_str("🚨 **K6 Load Test Failures Detected**\n\n");
    }

    let _ = writeln!(
        message,
        "**Timestamp:** {}",
        metadata
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(message, "**Environment:** {}", metadata.environment);
    let _ = writeln!(message, "**Branch:** {}", metadata.branch);
    let _ = writeln!(message, "**Commit:** {}\n", metadata.commit);

    message.push_str("**Performance Metrics:**\n");
    if let Some(rt) = report.performance.response_time {
        let _ = writeln!(
            message,
            "• Response Time - Avg: {}ms, P95: {}ms, P99: {}ms",
            round3(rt.avg),
            round3(rt.p95),
            round3(rt.p99)
        );
    }
    if let Some(er) = report.performance.error_rate {
        let _ = writeln!(
            message,
            "• Error Rate: {} ({} errors)",
            percent(er.rate),
            round3(er.total)
        );
    }
    if let Some(checks) = report.checks {
        let _ = writeln!(
            message,
            "• Check Pass Rate: {} ({} checks)",
            percent(checks.rate),
            round3(checks.total)
        );
    }

    if report.passed() {
        message.push_str("\n🎉 All performance thresholds met! The system is performing well.");
        return message;
    }

    message.push_str("\n**Failed Thresholds:**\n");
    for (index, violation) in report.errors.iter().enumerate() {
        let _ = writeln!(
            message,
            "{}. **{}**: {}",
            index + 1,
            violation.category,
            violation.message
        );
        let _ = writeln!(message, "   - Actual: {}", round3(violation.actual));
        let _ = writeln!(message, "   - Threshold: {}", violation.threshold);
    }

    message.push_str("\n**Recommendations:**\n");
    for recommendation in &report.recommendations {
        let _ = writeln!(message, "• {}", recommendation.message);
    }

    message.push_str("\n**Next Steps:**\n");
    for step in NEXT_STEPS {
        let _ = writeln!(message, "• {}", step);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MetricAggregator;
    use crate::events::MetricEvent;
    use crate::report::ReportAssembler;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn report(samples: &[(&str, f64)]) -> Report {
        let mut aggregator = MetricAggregator::new();
        for (name, value) in samples {
            aggregator.add_event(&MetricEvent::Sample {
                name: name.to_string(),
                timestamp: None,
                value: Some(*value),
                tags: BTreeMap::new(),
            });
        }
        let at = Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap();
        ReportAssembler::default().assemble_at(aggregator.finish(), at)
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 9, 12, 30, 0).unwrap(),
            environment: "CI".to_string(),
            branch: "refs/heads/main".to_string(),
            commit: "abc123".to_string(),
        }
    }

    #[test]
    fn test_console_summary_for_passing_run() {
        let summary = render_console_summary(&report(&[
            ("http_req_duration", 100.0),
            ("http_req_failed", 0.0),
            ("checks", 1.0),
        ]));

        assert!(summary.contains("📊 K6 PERFORMANCE TEST SUMMARY"));
        assert!(summary.contains(&"=".repeat(60)));
        assert!(summary.contains("   Average: 100ms"));
        assert!(summary.contains("   Rate: 0.00%"));
        assert!(summary.contains("   Rate: 100.00%"));
        assert!(summary.contains("   ✅ All thresholds passed!"));
        assert!(summary.contains("   ✅ All performance thresholds met! 🎉"));
    }

    #[test]
    fn test_console_summary_lists_violations() {
        let summary = render_console_summary(&report(&[("http_req_duration", 900.0)]));

        assert!(summary.contains("   ❌ Response time p95 (900ms) exceeds threshold (250ms)"));
        assert!(summary.contains("   ⚠️ Consider optimizing API endpoints"));
        assert!(!summary.contains("Check Pass Rate"));
    }

    #[test]
    fn test_console_summary_rounds_values() {
        let summary = render_console_summary(&report(&[
            ("http_req_duration", 100.0),
            ("http_req_duration", 100.0),
            ("http_req_duration", 100.00001),
        ]));
        assert!(summary.contains("   Average: 100ms"));
    }

    #[test]
    fn test_rates_use_rounded_value() {
        let mut report = report(&[]);
        report.checks = Some(crate::aggregator::ChecksView {
            total: 3.0,
            rate: 0.1236,
        });

        let summary = render_console_summary(&report);
        assert!(summary.contains("   Rate: 12.40%"));

        let message = render_notification(&report, &metadata());
        assert!(message.contains("• Check Pass Rate: 12.40% (3 checks)\n"));
    }

    #[test]
    fn test_failure_notification() {
        let message = render_notification(
            &report(&[("http_req_duration", 900.0), ("checks", 0.5)]),
            &metadata(),
        );

        assert!(message.starts_with("🚨 **K6 Load Test Failures Detected**\n\n"));
        assert!(message.contains("**Timestamp:** 2024-05-09T12:30:00.000Z\n"));
        assert!(message.contains("**Branch:** refs/heads/main\n"));
        assert!(message.contains("**Commit:** abc123\n\n"));
        assert!(message.contains("• Response Time - Avg: 900ms, P95: 900ms, P99: 900ms\n"));
        assert!(message.contains("• Check Pass Rate: 50.00% (0.5 checks)\n"));
        assert!(message.contains(
            "1. **PERFORMANCE**: Response time p95 (900ms) exceeds threshold (250ms)\n"
        ));
        assert!(message.contains("   - Actual: 900\n   - Threshold: 250\n"));
        assert!(message.contains("2. **FUNCTIONALITY**"));
        assert!(message.contains("**Next Steps:**\n• Review the failing metrics above\n"));
        assert!(!message.contains("🎉"));
    }

    #[test]
    fn test_success_notification() {
        let message = render_notification(
            &report(&[("http_req_duration", 90.0), ("http_req_failed", 0.0)]),
            &metadata(),
        );

        assert!(message.starts_with("✅ **K6 Load Tests Passed Successfully**\n\n"));
        assert!(message.contains("• Error Rate: 0.00% (0 errors)\n"));
        assert!(message.ends_with("🎉 All performance thresholds met! The system is performing well."));
        assert!(!message.contains("Failed Thresholds"));
        assert!(!message.contains("Next Steps"));
    }

    #[test]
    fn test_notification_without_metrics() {
        let message = render_notification(&report(&[]), &metadata());
        assert!(message.contains("**Performance Metrics:**\n\n🎉"));
    }
}
