//! Per-metric sample aggregation and statistical summaries
//!
//! This module provides the MetricAggregator, which collects sample values per
//! metric name during a run and turns every non-empty series into a
//! [`StatisticalSummary`]. Well-known k6 metrics are additionally projected
//! into the [`PerformanceView`] and [`ChecksView`] used by threshold
//! evaluation and rendering.

use crate::error::StreamWarning;
use crate::events::{MetricEvent, MetricKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Request duration trend reported by k6
pub const RESPONSE_TIME_METRIC: &str = "http_req_duration";
/// Rate of failed HTTP requests
pub const ERROR_RATE_METRIC: &str = "http_req_failed";
/// Counter of issued HTTP requests
pub const REQUEST_RATE_METRIC: &str = "http_reqs";
/// Rate of passed k6 checks
pub const CHECKS_METRIC: &str = "checks";

/// Round to 3 decimal places for presentation
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Serialize an `f64` rounded to 3 decimal places
///
/// Values are kept at full precision in memory so comparisons are exact; only
/// the persisted and printed form is rounded.
pub fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round3(*value))
}

/// Nearest-rank percentile of an ascending slice
///
/// Selects the element at `ceil(p/100 * n) - 1`, clamped to the slice bounds,
/// so the result is always an observed value. Returns `None` for an empty
/// slice.
///
/// # Examples
///
/// ```
/// use perfgate::aggregator::percentile;
///
/// let sorted = [100.0, 110.0, 150.0, 200.0, 900.0];
/// assert_eq!(percentile(&sorted, 95.0), Some(900.0));
/// assert_eq!(percentile(&sorted, 50.0), Some(150.0));
/// ```
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let last = sorted.len() as i64 - 1;
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as i64 - 1;
    Some(sorted[rank.clamp(0, last) as usize])
}

/// Statistical summary of one metric's samples
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatisticalSummary {
    pub count: usize,
    #[serde(serialize_with = "serialize_rounded")]
    pub sum: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub avg: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub min: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub max: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub p50: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub p90: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub p95: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub p99: f64,
}

impl StatisticalSummary {
    /// Summarize an already sorted, non-empty set of values
    ///
    /// Returns `None` when `sorted` is empty: no data is not the same as zero.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let count = sorted.len();
        let min = *sorted.first()?;
        let max = *sorted.last()?;
        let sum: f64 = sorted.iter().sum();

        Some(Self {
            count,
            sum,
            avg: sum / count as f64,
            min,
            max,
            p50: percentile(sorted, 50.0)?,
            p90: percentile(sorted, 90.0)?,
            p95: percentile(sorted, 95.0)?,
            p99: percentile(sorted, 99.0)?,
        })
    }
}

/// Response time snapshot taken from `http_req_duration`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResponseTimeView {
    #[serde(serialize_with = "serialize_rounded")]
    pub avg: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub p95: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub p99: f64,
}

/// Total and average of a rate or counter metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateView {
    /// Sum of all samples (failed requests, passed checks, requests issued)
    #[serde(serialize_with = "serialize_rounded")]
    pub total: f64,
    /// Mean sample value
    #[serde(serialize_with = "serialize_rounded")]
    pub rate: f64,
}

impl From<&StatisticalSummary> for RateView {
    fn from(summary: &StatisticalSummary) -> Self {
        Self {
            total: summary.sum,
            rate: summary.avg,
        }
    }
}

/// Check pass-rate snapshot taken from `checks`
pub type ChecksView = RateView;

/// Performance snapshot used for threshold evaluation and rendering
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<ResponseTimeView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<RateView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_rate: Option<RateView>,
}

impl PerformanceView {
    /// Project the well-known k6 metrics out of a summary table
    pub fn from_summaries(summaries: &BTreeMap<String, StatisticalSummary>) -> Self {
        Self {
            response_time: summaries.get(RESPONSE_TIME_METRIC).map(|s| ResponseTimeView {
                avg: s.avg,
                p95: s.p95,
                p99: s.p99,
            }),
            error_rate: summaries.get(ERROR_RATE_METRIC).map(RateView::from),
            request_rate: summaries.get(REQUEST_RATE_METRIC).map(RateView::from),
        }
    }
}

/// Project the check pass rate out of a summary table
pub fn checks_view(summaries: &BTreeMap<String, StatisticalSummary>) -> Option<ChecksView> {
    summaries.get(CHECKS_METRIC).map(RateView::from)
}

/// Values recorded for one metric during a run
#[derive(Debug, Clone, Default)]
pub struct MetricSeries {
    values: Vec<f64>,
}

impl MetricSeries {
    /// Record one value
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// Number of recorded values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value has been recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sort the values and summarize them
    pub fn summarize(mut self) -> Option<StatisticalSummary> {
        self.values.sort_by(f64::total_cmp);
        StatisticalSummary::from_sorted(&self.values)
    }
}

/// Result of aggregating one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Summary per metric with at least one valid sample, keyed by name
    pub summaries: BTreeMap<String, StatisticalSummary>,
    /// Projection of the response time, error rate and request rate metrics
    pub performance: PerformanceView,
    /// Projection of the check pass rate, if the run recorded checks
    pub checks: Option<ChecksView>,
    /// Samples discarded during aggregation
    pub warnings: Vec<StreamWarning>,
}

/// Collects metric samples for one run
///
/// Samples are appended per metric name while events are fed in; calling
/// [`MetricAggregator::finish`] consumes the aggregator, so a series can never
/// change once summaries are being computed.
#[derive(Debug, Default)]
pub struct MetricAggregator {
    /// Sample values per metric name
    series: BTreeMap<String, MetricSeries>,
    /// Declared kind per metric name
    definitions: BTreeMap<String, MetricKind>,
    /// Samples rejected before aggregation
    warnings: Vec<StreamWarning>,
}

impl MetricAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parsed event
    ///
    /// `Definition` events only record the declared kind. `Sample` events
    /// without a value are discarded; non-finite values are discarded with a
    /// warning.
    pub fn add_event(&mut self, event: &MetricEvent) {
        match event {
            MetricEvent::Definition { name, kind, .. } => {
                self.definitions.insert(name.clone(), kind.clone());
            }
            MetricEvent::Sample {
                name,
                value: Some(value),
                ..
            } => {
                if value.is_finite() {
                    self.series.entry(name.clone()).or_default().push(*value);
                } else {
                    let warning = StreamWarning::NonFiniteSample {
                        metric: name.clone(),
                    };
                    warn!("{}", warning);
                    self.warnings.push(warning);
                }
            }
            MetricEvent::Sample { value: None, .. } => {}
        }
    }

    /// Feed a sequence of events
    pub fn add_events<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a MetricEvent>,
    {
        for event in events {
            self.add_event(event);
        }
    }

    /// Declared kind of a metric, if a definition was seen
    pub(crate) fn declared_kind(&self, name: &str) -> Option<&MetricKind> {
        self.definitions.get(name)
    }

    /// Number of samples recorded for a metric
    pub(crate) fn sample_count(&self, name: &str) -> usize {
        self.series.get(name).map_or(0, MetricSeries::len)
    }

    /// Compute summaries and views for every metric with data
    pub fn finish(self) -> Aggregation {
        for (name, kind) in &self.definitions {
            if self.series.get(name).map_or(true, MetricSeries::is_empty) {
                debug!("Metric '{}' ({:?}) recorded no samples", name, kind);
            }
        }

        let summaries: BTreeMap<String, StatisticalSummary> = self
            .series
            .into_iter()
            .filter_map(|(name, series)| series.summarize().map(|summary| (name, summary)))
            .collect();

        debug!("Summarized {} metric(s)", summaries.len());

        Aggregation {
            performance: PerformanceView::from_summaries(&summaries),
            checks: checks_view(&summaries),
            summaries,
            warnings: self.warnings,
        }
    }
}
