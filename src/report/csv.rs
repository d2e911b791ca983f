use std::path::Path;

use super::types::{ReportRow, TestResult};
use crate::error::ExportError;

/// Write one row per result with the fixed report columns.
pub fn write(results: &[TestResult], path: &Path) -> Result<(), ExportError> {
    let mut wtr = ::csv::Writer::from_path(path).map_err(|e| into_export_error(e, path))?;
    // serialize() would skip the header for an empty sequence.
    wtr.write_record(ReportRow::COLUMNS)
        .map_err(|e| into_export_error(e, path))?;
    for result in results {
        wtr.write_record(result.to_row().cells())
            .map_err(|e| into_export_error(e, path))?;
    }
    wtr.flush()
        .map_err(|e| ExportError::unwritable(path, e))?;
    Ok(())
}

/// Parse a report written by [`write`]; columns are matched by header name.
pub fn read(path: &Path) -> anyhow::Result<Vec<TestResult>> {
    let mut rdr = ::csv::Reader::from_path(path)?;
    let mut results = Vec::new();
    for record in rdr.deserialize() {
        let row: ReportRow = record?;
        results.push(TestResult::from_row(&row).map_err(anyhow::Error::msg)?);
    }
    Ok(results)
}

fn into_export_error(err: ::csv::Error, path: &Path) -> ExportError {
    if err.is_io_error() {
        match err.into_kind() {
            ::csv::ErrorKind::Io(io) => ExportError::unwritable(path, io),
            other => ExportError::encode("csv", format!("{:?}", other)),
        }
    } else {
        ExportError::encode("csv", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::strategies::arb_result;
    use crate::report::types::{Severity, TestType};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_csv_round_trip(results in prop::collection::vec(arb_result(), 0..8)) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("report.csv");
            write(&results, &path).unwrap();

            prop_assert_eq!(read(&path).unwrap(), results);
        }
    }

    #[test]
    fn test_escape_sequences_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let results = vec![TestResult::fail(
            "API Discovery",
            "page load failed: \u{1b}[2m\"quoted\", multi\nline",
            TestType::Api,
            Severity::High,
        )];
        write(&results, &path).unwrap();
        assert_eq!(read(&path).unwrap(), results);
    }

    #[test]
    fn test_header_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "caseName,outcome,details,testType,severity,timestamp");
    }
}
