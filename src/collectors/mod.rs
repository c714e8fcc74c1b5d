/// Streaming parser for k6 line-delimited JSON output
pub mod event_stream;

pub use event_stream::{MetricEventStream, ParseOutcome};
