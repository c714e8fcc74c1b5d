use thiserror::Error;

/// Errors that end reading of a metric event stream
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("k6 results file not found: {0}")]
    SourceNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Recoverable problems found while parsing a metric event stream
///
/// A warning never stops the stream; the offending line is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamWarning {
    #[error("Skipping invalid JSON line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Discarding non-finite sample for metric '{metric}'")]
    NonFiniteSample { metric: String },
}

/// Errors that can occur when reading or writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Summary file not found: {0}")]
    NotFound(String),

    #[error("Report is missing required data: {0}")]
    MissingReportData(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors that can occur when delivering a notification to a channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to send notification: {0}")]
    DeliveryFailed(String),

    #[error("Channel '{0}' timed out")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message_names_line() {
        let warning = StreamWarning::MalformedRecord {
            line: 7,
            reason: "expected value".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Skipping invalid JSON line 7: expected value"
        );
    }

    #[test]
    fn test_source_not_found_message() {
        let err = StreamError::SourceNotFound("missing.json".to_string());
        assert_eq!(err.to_string(), "k6 results file not found: missing.json");
    }
}
