use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use super::summary::{recommendations, Recommendation, RunSummary};
use super::types::TestResult;
use crate::error::ExportError;

/// JSON report document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub summary: &'a RunSummary,
    pub results: &'a [TestResult],
    pub weaknesses: Vec<&'a TestResult>,
    pub recommendations: Vec<Recommendation>,
}

pub fn write(results: &[TestResult], summary: &RunSummary, path: &Path) -> Result<(), ExportError> {
    let report = JsonReport {
        generated_at: Utc::now(),
        summary,
        results,
        weaknesses: results.iter().filter(|r| r.outcome.is_weakness()).collect(),
        recommendations: recommendations(results),
    };
    let json = serde_json::to_string_pretty(&report).map_err(|e| ExportError::encode("json", e))?;
    std::fs::write(path, json).map_err(|e| ExportError::unwritable(path, e))
}
