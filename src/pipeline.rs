//! End-to-end processing of one k6 run
//!
//! Wires the stream parser, aggregator and report assembler together. Data
//! flows strictly forward; nothing here is shared between runs.

use crate::aggregator::MetricAggregator;
use crate::collectors::MetricEventStream;
use crate::error::{StreamError, StreamWarning};
use crate::report::{Report, ReportAssembler};
use std::io::BufRead;
use std::path::Path;

/// A report together with the recoverable problems met while building it
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub warnings: Vec<StreamWarning>,
}

/// Build a report from any buffered source of k6 output
///
/// # Errors
///
/// Returns `StreamError::IoError` if reading the source fails. Malformed lines
/// are not errors; they are returned as warnings.
pub fn build_report<R: BufRead>(
    reader: R,
    assembler: &ReportAssembler,
) -> Result<RunOutcome, StreamError> {
    run(MetricEventStream::new(reader), assembler)
}

/// Build a report from a k6 results file
///
/// # Errors
///
/// Returns `StreamError::SourceNotFound` if the file does not exist.
pub fn build_report_from_path(
    path: &Path,
    assembler: &ReportAssembler,
) -> Result<RunOutcome, StreamError> {
    run(MetricEventStream::open(path)?, assembler)
}

fn run<R: BufRead>(
    stream: MetricEventStream<R>,
    assembler: &ReportAssembler,
) -> Result<RunOutcome, StreamError> {
    let outcome = stream.read_all()?;

    let mut aggregator = MetricAggregator::new();
    aggregator.add_events(&outcome.events);
    let aggregation = aggregator.finish();

    let mut warnings = outcome.warnings;
    warnings.extend(aggregation.warnings.iter().cloned());

    Ok(RunOutcome {
        report: assembler.assemble(aggregation),
        warnings,
    })
}
