use crate::error::{StreamError, StreamWarning};
use crate::events::{MetricEvent, MetricKind, Timestamp};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::Path;

/// Streaming parser for k6 line-delimited JSON output
///
/// Reads one record per line and yields typed [`MetricEvent`]s. Lines that
/// fail to parse are skipped and recorded as [`StreamWarning`]s so a single
/// corrupt line never aborts the run. The stream is single-pass.
pub struct MetricEventStream<R: BufRead> {
    /// Remaining input lines
    lines: Lines<R>,
    /// 1-based number of the last line read
    line_number: usize,
    /// Warnings collected so far
    warnings: Vec<StreamWarning>,
}

/// Everything a fully drained stream produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    /// Successfully parsed events, in input order
    pub events: Vec<MetricEvent>,
    /// Lines that were skipped and why
    pub warnings: Vec<StreamWarning>,
}

/// Envelope shared by every k6 output line
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    data: Value,
}

/// `data` payload of a `Metric` line
#[derive(Debug, Deserialize)]
struct RawDefinition {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    thresholds: Option<Vec<Value>>,
    #[serde(default)]
    submetrics: Option<Vec<Value>>,
}

/// `data` payload of a `Point` line
#[derive(Debug, Deserialize)]
struct RawPoint {
    #[serde(default)]
    time: Option<Timestamp>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    tags: Option<BTreeMap<String, Value>>,
}

impl MetricEvent {
    /// Parse a single k6 output line
    ///
    /// Returns `Ok(None)` for well-formed records whose `type` is neither
    /// `Metric` nor `Point`.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error if the line is not a valid record.
    pub fn from_json(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let record: RawRecord = serde_json::from_str(line)?;

        match record.record_type.as_str() {
            "Metric" => {
                let data: RawDefinition = serde_json::from_value(record.data)?;
                let name = record
                    .metric
                    .or(data.name)
                    .ok_or_else(|| missing_field("metric"))?;

                Ok(Some(MetricEvent::Definition {
                    name,
                    kind: MetricKind::parse(data.kind.as_deref().unwrap_or_default()),
                    declared_thresholds: data
                        .thresholds
                        .unwrap_or_default()
                        .iter()
                        .filter_map(threshold_expression)
                        .collect(),
                    sub_metrics: data
                        .submetrics
                        .unwrap_or_default()
                        .iter()
                        .filter_map(sub_metric_name)
                        .collect(),
                }))
            }
            "Point" => {
                let data: RawPoint = serde_json::from_value(record.data)?;
                let name = record.metric.ok_or_else(|| missing_field("metric"))?;

                Ok(Some(MetricEvent::Sample {
                    name,
                    timestamp: data.time,
                    value: data.value,
                    tags: data
                        .tags
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|(key, value)| tag_value(value).map(|v| (key, v)))
                        .collect(),
                }))
            }
            other => {
                debug!("Ignoring record of type '{}'", other);
                Ok(None)
            }
        }
    }
}

fn missing_field(field: &'static str) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::missing_field(field)
}

/// k6 writes threshold expressions as plain strings; older versions wrap
/// them in objects with a `source` field.
fn threshold_expression(value: &Value) -> Option<String> {
    match value {
        Value::String(expr) => Some(expr.clone()),
        Value::Object(map) => map
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn sub_metric_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.clone()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn tag_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl MetricEventStream<BufReader<File>> {
    /// Open a k6 results file for streaming
    ///
    /// # Errors
    ///
    /// Returns `StreamError::SourceNotFound` if the path does not exist and
    /// `StreamError::IoError` if it cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        if !path.exists() {
            return Err(StreamError::SourceNotFound(path.display().to_string()));
        }

        info!("Parsing k6 results from: {}", path.display());
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> MetricEventStream<R> {
    /// Create a stream over any buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            warnings: Vec::new(),
        }
    }

    /// Warnings recorded for lines consumed so far
    pub fn warnings(&self) -> &[StreamWarning] {
        &self.warnings
    }

    /// Drain the stream, collecting events and warnings
    ///
    /// # Errors
    ///
    /// Returns `StreamError::IoError` if the underlying reader fails.
    pub fn read_all(mut self) -> Result<ParseOutcome, StreamError> {
        let mut events = Vec::new();
        for event in self.by_ref() {
            events.push(event?);
        }

        if !self.warnings.is_empty() {
            warn!(
                "Skipped {} malformed line(s) out of {}",
                self.warnings.len(),
                self.line_number
            );
        }

        Ok(ParseOutcome {
            events,
            warnings: self.warnings,
        })
    }

    fn record_warning(&mut self, reason: String) {
        let warning = StreamWarning::MalformedRecord {
            line: self.line_number,
            reason,
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

impl<R: BufRead> Iterator for MetricEventStream<R> {
    type Item = Result<MetricEvent, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    // Invalid UTF-8 is a bad line, not a broken source
                    self.line_number += 1;
                    self.record_warning(e.to_string());
                    continue;
                }
                Err(e) => return Some(Err(StreamError::IoError(e))),
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            match MetricEvent::from_json(&line) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => self.record_warning(e.to_string()),
            }
        }
    }
}
