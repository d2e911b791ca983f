pub mod csv;
pub mod json;
pub mod junit;
pub mod sink;
pub mod summary;
pub mod types;
pub mod xlsx;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ExportError;
use crate::utils::url::sanitize_host;

pub use sink::{ResultQuery, ResultSink};
pub use summary::{Recommendation, RunSummary};
pub use types::{Outcome, Severity, TestResult, TestType};

/// Durable report encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    #[serde(alias = "xlsx", alias = "excel")]
    Spreadsheet,
    Json,
    #[serde(alias = "xml")]
    Junit,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Spreadsheet => "xlsx",
            ReportFormat::Json => "json",
            ReportFormat::Junit => "xml",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Spreadsheet => "spreadsheet",
            ReportFormat::Json => "json",
            ReportFormat::Junit => "junit",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "spreadsheet" | "xlsx" | "excel" => Ok(ReportFormat::Spreadsheet),
            "json" => Ok(ReportFormat::Json),
            "junit" | "xml" => Ok(ReportFormat::Junit),
            other => Err(format!("Unknown format: {}", other)),
        }
    }
}

/// `{host}_qa_report_{YYYYmmdd_HHMMSS}.{ext}`
pub fn report_file_name(host: &str, format: ReportFormat, at: DateTime<Local>) -> String {
    format!(
        "{}_qa_report_{}.{}",
        sanitize_host(host),
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Encode `results` in `format` at `path`.
pub fn write_report(
    format: ReportFormat,
    results: &[TestResult],
    summary: &RunSummary,
    path: &Path,
) -> Result<(), ExportError> {
    match format {
        ReportFormat::Csv => csv::write(results, path),
        ReportFormat::Spreadsheet => xlsx::write(results, summary, path),
        ReportFormat::Json => json::write(results, summary, path),
        ReportFormat::Junit => junit::write(results, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            report_file_name("127.0.0.1:8000", ReportFormat::Spreadsheet, at),
            "127.0.0.1_8000_qa_report_20240309_140507.xlsx"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("excel".parse::<ReportFormat>().unwrap(), ReportFormat::Spreadsheet);
        assert_eq!("CSV".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }
}
