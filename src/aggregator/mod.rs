/// Per-metric aggregation and statistical summaries
pub mod metric_aggregator;

pub use metric_aggregator::{
    checks_view, percentile, Aggregation, ChecksView, MetricAggregator, MetricSeries,
    PerformanceView, RateView, ResponseTimeView, StatisticalSummary,
};
