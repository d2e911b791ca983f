use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::summary::{self, Recommendation, RunSummary};
use super::types::{Outcome, Severity, TestResult, TestType};
use super::{report_file_name, write_report, ReportFormat};
use crate::error::ExportError;
use crate::runner::events::{EventEmitter, TestEvent};

struct SinkState {
    results: Vec<TestResult>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

/// Append-only store for one run's results.
///
/// Cloning shares the same underlying sequence. Appends are serialized by a write
/// lock, so readers never observe a partial append.
#[derive(Clone)]
pub struct ResultSink {
    state: Arc<RwLock<SinkState>>,
    emitter: Option<EventEmitter>,
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SinkState {
                results: Vec::new(),
                started_at: Utc::now(),
                finished_at: None,
            })),
            emitter: None,
        }
    }

    pub fn with_emitter(emitter: EventEmitter) -> Self {
        Self {
            emitter: Some(emitter),
            ..Self::new()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SinkState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SinkState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a result. Timestamps are clamped so the sequence stays
    /// non-decreasing.
    pub fn record(&self, mut result: TestResult) {
        let total = {
            let mut state = self.write();
            if let Some(last) = state.results.last() {
                if result.timestamp < last.timestamp {
                    result.timestamp = last.timestamp;
                }
            }
            state.results.push(result.clone());
            state.results.len()
        };

        log::debug!(
            "recorded [{}] {} ({} total)",
            result.outcome,
            result.case_name,
            total
        );
        if let Some(emitter) = &self.emitter {
            emitter.emit(TestEvent::CaseRecorded { result, total });
        }
    }

    pub fn len(&self) -> usize {
        self.read().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every result in recording order.
    pub fn results(&self) -> Vec<TestResult> {
        self.read().results.clone()
    }

    pub fn summary(&self) -> RunSummary {
        let state = self.read();
        RunSummary::from_results(&state.results).with_window(state.started_at, state.finished_at)
    }

    /// Results with outcome FAIL or BUG, in recording order.
    pub fn weaknesses(&self) -> Vec<TestResult> {
        self.read()
            .results
            .iter()
            .filter(|r| r.outcome.is_weakness())
            .cloned()
            .collect()
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        summary::recommendations(&self.read().results)
    }

    pub fn filter(&self, query: &ResultQuery) -> Vec<TestResult> {
        self.read()
            .results
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.read().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.read().finished_at
    }

    /// Close the run window used for duration reporting.
    pub fn mark_finished(&self) {
        let mut state = self.write();
        if state.finished_at.is_none() {
            state.finished_at = Some(Utc::now());
        }
    }

    /// Write the full sequence to a new file under `dir`.
    ///
    /// The file name carries the sanitized host and a timestamp; an existing
    /// file is never overwritten.
    pub fn export(&self, format: ReportFormat, dir: &Path, host: &str) -> Result<PathBuf, ExportError> {
        let (results, summary) = {
            let state = self.read();
            (
                state.results.clone(),
                RunSummary::from_results(&state.results)
                    .with_window(state.started_at, state.finished_at),
            )
        };

        std::fs::create_dir_all(dir).map_err(|e| ExportError::unwritable(dir, e))?;
        let path = unique_path(dir, &report_file_name(host, format, Local::now()));
        write_report(format, &results, &summary, &path)?;
        log::info!("exported {} results to {}", results.len(), path.display());
        Ok(path)
    }
}

fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (file_name, String::new()),
    };
    (1..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Dashboard filter over recorded results. Empty fields match everything.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultQuery {
    pub outcome: Option<Outcome>,
    pub test_type: Option<TestType>,
    pub severity: Option<Severity>,
    pub search: Option<String>,
}

impl ResultQuery {
    pub fn matches(&self, result: &TestResult) -> bool {
        if self.outcome.is_some_and(|o| o != result.outcome) {
            return false;
        }
        if self.test_type.is_some_and(|t| t != result.test_type) {
            return false;
        }
        if self.severity.is_some_and(|s| s != result.severity) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                result.case_name.to_lowercase().contains(&needle)
                    || result.details.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_results() -> Vec<TestResult> {
        vec![
            TestResult::pass("Homepage Navigation", "Homepage loaded", TestType::Navigation),
            TestResult::bug("API HTTPS", "API served over http", TestType::Security, Severity::High),
            TestResult::pass("Footer Links", "6 links", TestType::Ui),
            TestResult::fail("Search Form Test", "NOT_FOUND: search input", TestType::Form, Severity::Medium),
            TestResult::pass("API Discovery", "/api", TestType::Api),
        ]
    }

    #[test]
    fn test_weaknesses_preserve_recording_order() {
        let sink = ResultSink::new();
        for r in sample_results() {
            sink.record(r);
        }
        let names: Vec<String> = sink.weaknesses().into_iter().map(|r| r.case_name).collect();
        assert_eq!(names, vec!["API HTTPS", "Search Form Test"]);
        assert!(sink.weaknesses().iter().all(|r| r.outcome.is_weakness()));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let sink = ResultSink::new();
        let first = TestResult::pass("a", "", TestType::Ui);
        let mut second = TestResult::pass("b", "", TestType::Ui);
        second.timestamp = first.timestamp - Duration::seconds(30);
        sink.record(first.clone());
        sink.record(second);

        let results = sink.results();
        assert_eq!(results[1].timestamp, first.timestamp);
    }

    #[test]
    fn test_summary_tracks_records() {
        let sink = ResultSink::new();
        for r in sample_results() {
            sink.record(r);
        }
        let summary = sink.summary();
        assert_eq!((summary.total, summary.passed, summary.failed, summary.bugs), (5, 3, 1, 1));
        assert_eq!(summary.pass_rate, 60.0);
        assert!(summary.started_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_records_are_all_kept() {
        let sink = ResultSink::new();
        let mut handles = Vec::new();
        for worker in 0..8 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    sink.record(TestResult::pass(format!("w{}-{}", worker, i), "", TestType::Api));
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(sink.len(), 200);
        assert_eq!(sink.summary().passed, 200);
    }

    #[test]
    fn test_filter_query() {
        let sink = ResultSink::new();
        for r in sample_results() {
            sink.record(r);
        }
        let query = ResultQuery {
            search: Some("api".into()),
            ..Default::default()
        };
        assert_eq!(sink.filter(&query).len(), 2);

        let query = ResultQuery {
            outcome: Some(Outcome::Pass),
            test_type: Some(TestType::Ui),
            ..Default::default()
        };
        assert_eq!(sink.filter(&query)[0].case_name, "Footer Links");
    }

    #[test]
    fn test_export_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new();
        sink.record(TestResult::pass("a", "", TestType::Ui));

        let first = sink.export(ReportFormat::Csv, dir.path(), "shop.test").unwrap();
        let second = sink.export(ReportFormat::Csv, dir.path(), "shop.test").unwrap();
        assert_ne!(first, second);
        assert!(first.file_name().unwrap().to_string_lossy().starts_with("shop.test_qa_report_"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_export_to_unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let sink = ResultSink::new();
        sink.record(TestResult::pass("a", "", TestType::Ui));
        let err = sink
            .export(ReportFormat::Csv, &blocker.join("reports"), "shop.test")
            .unwrap_err();
        assert!(matches!(err, ExportError::Unwritable { .. }));
        assert_eq!(sink.len(), 1);
    }
}
