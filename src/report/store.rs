use crate::error::ReportError;
use crate::report::Report;
use log::info;
use std::fs;
use std::path::Path;

/// Keys the `notify` command cannot work without
const REQUIRED_FIELDS: [&str; 3] = ["performance", "errors", "recommendations"];

impl Report {
    /// Write the report as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns `ReportError::IoError` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Summary exported to: {}", path.display());
        Ok(())
    }

    /// Read a report previously written by [`Report::save`]
    ///
    /// # Errors
    ///
    /// Returns `ReportError::NotFound` if the file does not exist,
    /// `ReportError::JsonError` if it is not valid JSON, and
    /// `ReportError::MissingReportData` if required fields are missing or
    /// malformed.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        info!("Loading test summary from: {}", path.display());

        if !path.exists() {
            return Err(ReportError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        let object = value.as_object().ok_or_else(|| {
            ReportError::MissingReportData("report is not a JSON object".to_string())
        })?;
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|key| !object.contains_key(**key)) {
            return Err(ReportError::MissingReportData(format!(
                "missing field '{}'",
                missing
            )));
        }

        let report: Report = serde_json::from_value(value)
            .map_err(|e| ReportError::MissingReportData(e.to_string()))?;

        info!("Loaded summary with {} errors", report.errors.len());
        Ok(report)
    }
}
