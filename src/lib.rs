/// Error types for parsing, reporting and notification
pub mod error;

/// Metric event model shared by every stage
pub mod events;

/// Streaming reader for k6 JSON line output
pub mod collectors;

/// Per-metric statistics and performance views
pub mod aggregator;

/// Threshold rules and their evaluation
pub mod thresholds;

/// Report assembly, recommendations and persistence
pub mod report;

/// End-to-end report building
pub mod pipeline;

/// Rendering and notification delivery
pub mod alerts;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{ChannelError, ConfigError, ReportError, StreamError, StreamWarning};
pub use pipeline::{build_report, build_report_from_path, RunOutcome};
pub use report::{Report, ReportAssembler};
