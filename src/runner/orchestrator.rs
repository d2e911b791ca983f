//! Run lifecycle: admission, suite execution, status and report access.
//!
//! One run is current at a time. `start_run` admits a run only when no other is
//! running; the run executes on its own task while `status()` and the other
//! queries read snapshots without waiting on it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::events::{EventEmitter, TestEvent};
use super::exit_codes;
use super::registry;
use super::state::{RunProgress, RunState, RunStatus};
use super::suite::{SuiteReport, SuiteRunner};
use crate::data::DataProvider;
use crate::driver::{AdapterFactory, DefaultAdapterFactory};
use crate::error::{ExportError, OrchestrationFault, OrchestratorError, ReportAccessError};
use crate::report::{
    Recommendation, ReportFormat, ResultQuery, ResultSink, RunSummary, Severity, TestResult,
    TestType,
};
use crate::utils::url::{host_of, normalize_base_url};
use crate::utils::HarnessConfig;

/// One run and everything it has recorded so far
struct RunRecord {
    id: String,
    base_url: String,
    suites: Vec<String>,
    seed: u64,
    sink: ResultSink,
    progress: RwLock<RunProgress>,
    cancel: Arc<AtomicBool>,
}

impl RunRecord {
    fn progress(&self) -> RunProgress {
        self.progress.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update(&self, f: impl FnOnce(&mut RunProgress)) {
        let mut progress = self.progress.write().unwrap_or_else(|e| e.into_inner());
        f(&mut progress);
    }

    fn is_running(&self) -> bool {
        self.progress().state == RunState::Running
    }
}

struct Inner {
    config: Arc<HarnessConfig>,
    factory: Arc<dyn AdapterFactory>,
    emitter: EventEmitter,
    current: Mutex<Option<Arc<RunRecord>>>,
}

/// Owns the current run. Cloning shares it.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// Final state of a run, returned by [`RunHandle::wait`]
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub state: RunState,
    pub summary: RunSummary,
    pub report_file: Option<PathBuf>,
    pub faults: Vec<String>,
    pub cancelled: bool,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        if self.state == RunState::Failed {
            exit_codes::INFRASTRUCTURE_FAILED
        } else if self.cancelled {
            exit_codes::INTERRUPTED
        } else if self.summary.weaknesses() > 0 {
            exit_codes::WEAKNESSES_FOUND
        } else {
            exit_codes::OK
        }
    }
}

pub struct RunHandle {
    pub run_id: String,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("run {} task aborted: {}", self.run_id, e);
                RunOutcome {
                    run_id: self.run_id,
                    state: RunState::Failed,
                    summary: RunSummary::default(),
                    report_file: None,
                    faults: vec![format!("run task aborted: {}", e)],
                    cancelled: false,
                }
            }
        }
    }
}

/// Dashboard view of the latest run. Empty sections are omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<TestResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weaknesses: Vec<TestResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
}

/// A report file in the reports directory
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl Orchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        let factory = Arc::new(DefaultAdapterFactory::new(config.clone()));
        Self::with_factory(config, factory)
    }

    pub fn with_factory(config: HarnessConfig, factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                factory,
                emitter: EventEmitter::default(),
                current: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.inner.config
    }

    /// Run events for console or dashboard listeners.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TestEvent> {
        self.inner.emitter.subscribe()
    }

    fn current(&self) -> Option<Arc<RunRecord>> {
        self.inner
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Start a run of `suites` (all registered suites when `None`).
    ///
    /// Fails with [`OrchestratorError::AlreadyRunning`] while another run is in
    /// progress and with [`OrchestratorError::UnknownSuite`] before anything
    /// starts when an id is not registered.
    pub fn start_run(
        &self,
        base_url: &str,
        suites: Option<Vec<String>>,
    ) -> Result<RunHandle, OrchestratorError> {
        let suites = match suites {
            Some(ids) => {
                let ids: Vec<String> = ids
                    .into_iter()
                    .map(|id| id.trim().to_lowercase())
                    .filter(|id| !id.is_empty())
                    .collect();
                if ids.is_empty() {
                    return Err(OrchestratorError::NoSuitesSelected);
                }
                let unknown = registry::unknown(&ids);
                if !unknown.is_empty() {
                    return Err(OrchestratorError::UnknownSuite(unknown));
                }
                let mut unique: Vec<String> = Vec::with_capacity(ids.len());
                for id in ids {
                    if !unique.contains(&id) {
                        unique.push(id);
                    }
                }
                unique
            }
            None => registry::ids().into_iter().map(String::from).collect(),
        };

        let run = {
            let mut current = self.inner.current.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(run) = current.as_ref().filter(|r| r.is_running()) {
                return Err(OrchestratorError::AlreadyRunning {
                    run_id: run.id.clone(),
                });
            }

            let run = Arc::new(RunRecord {
                id: uuid::Uuid::new_v4().to_string(),
                base_url: normalize_base_url(base_url),
                suites,
                seed: self.inner.config.seed.unwrap_or_else(rand::random),
                sink: ResultSink::with_emitter(self.inner.emitter.clone()),
                progress: RwLock::new(RunProgress::running()),
                cancel: Arc::new(AtomicBool::new(false)),
            });
            *current = Some(run.clone());
            run
        };

        log::info!(
            "run {} admitted: {} against {} (seed {})",
            run.id,
            run.suites.join(", "),
            run.base_url,
            run.seed
        );

        let inner = self.inner.clone();
        let run_id = run.id.clone();
        let task = tokio::spawn(async move { execute(inner, run).await });
        Ok(RunHandle { run_id, task })
    }

    /// Start a run restricted to `ids`.
    pub fn run_specific_suites(
        &self,
        base_url: &str,
        ids: Vec<String>,
    ) -> Result<RunHandle, OrchestratorError> {
        self.start_run(base_url, Some(ids))
    }

    /// Snapshot of the current run, answerable at any time.
    pub fn status(&self) -> RunStatus {
        let Some(run) = self.current() else {
            return RunStatus::idle();
        };
        let progress = run.progress();
        let summary = run.sink.summary();

        RunStatus {
            run_id: Some(run.id.clone()),
            state: progress.state,
            running: progress.state == RunState::Running,
            base_url: Some(run.base_url.clone()),
            suites: run.suites.clone(),
            completed_suites: progress.completed_suites.clone(),
            current_suite: progress.current_suite.clone(),
            progress: progress.progress(run.suites.len()),
            total_cases: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            bugs: summary.bugs,
            started_at: Some(run.sink.started_at()),
            finished_at: run.sink.finished_at(),
            report_file: progress.report_file.clone(),
            seed: Some(run.seed),
            errors: progress.faults.clone(),
        }
    }

    pub fn tagged_data(&self) -> TaggedData {
        let Some(run) = self.current() else {
            return TaggedData {
                run_id: None,
                summary: None,
                results: Vec::new(),
                weaknesses: Vec::new(),
                recommendations: Vec::new(),
            };
        };
        let results = run.sink.results();
        if results.is_empty() {
            return TaggedData {
                run_id: Some(run.id.clone()),
                summary: None,
                results,
                weaknesses: Vec::new(),
                recommendations: Vec::new(),
            };
        }
        TaggedData {
            run_id: Some(run.id.clone()),
            summary: Some(run.sink.summary()),
            weaknesses: run.sink.weaknesses(),
            recommendations: run.sink.recommendations(),
            results,
        }
    }

    /// Results of the current run matching `query`.
    pub fn results(&self, query: &ResultQuery) -> Vec<TestResult> {
        self.current()
            .map(|run| run.sink.filter(query))
            .unwrap_or_default()
    }

    /// Write the current run's results to a new file in the reports directory.
    pub fn export_report(&self, format: ReportFormat) -> Result<PathBuf, ExportError> {
        let run = self.current().ok_or(ExportError::NothingToExport)?;
        if run.sink.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        run.sink
            .export(format, &self.inner.config.reports_dir, &host_of(&run.base_url))
    }

    /// Bytes of a previously exported report.
    ///
    /// `path` may be a file name inside the reports directory or a path that
    /// resolves into it. Anything resolving elsewhere is rejected before the
    /// file system is read.
    pub async fn download_report(&self, path: &str) -> Result<Vec<u8>, ReportAccessError> {
        let resolved = confine(&self.inner.config.reports_dir, path)?;
        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|source| ReportAccessError::Io {
                path: resolved.clone(),
                source,
            })?;
        log::debug!("serving report {} ({} bytes)", resolved.display(), bytes.len());
        Ok(bytes)
    }

    /// Report files in the reports directory, newest first.
    pub fn list_reports(&self) -> Vec<ReportEntry> {
        let dir = &self.inner.config.reports_dir;
        let mut entries: Vec<ReportEntry> = walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext, "csv" | "xlsx" | "json" | "xml"))
            })
            .map(|e| {
                let meta = e.metadata().ok();
                ReportEntry {
                    name: e.file_name().to_string_lossy().into_owned(),
                    path: e.path().to_path_buf(),
                    size: meta.as_ref().map(|m| m.len()).unwrap_or(0),
                    modified: meta
                        .and_then(|m| m.modified().ok())
                        .map(DateTime::<Utc>::from),
                }
            })
            .collect();
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        entries
    }

    /// Ask the running run to stop after its current check. Returns false when
    /// nothing is running.
    pub fn request_stop(&self) -> bool {
        match self.current() {
            Some(run) if run.is_running() => {
                run.cancel.store(true, Ordering::SeqCst);
                log::info!("stop requested for run {}", run.id);
                true
            }
            _ => false,
        }
    }
}

async fn execute(inner: Arc<Inner>, run: Arc<RunRecord>) -> RunOutcome {
    inner.emitter.emit(TestEvent::RunStarted {
        run_id: run.id.clone(),
        base_url: run.base_url.clone(),
        suites: run.suites.clone(),
    });

    let data = Arc::new(DataProvider::new(Some(run.seed)));
    let runner = Arc::new(
        SuiteRunner::new(inner.factory.clone(), inner.config.clone(), run.cancel.clone())
            .with_emitter(inner.emitter.clone()),
    );

    let spawn_suite = |suite_id: &String| {
        run.update(|p| p.start_suite(suite_id));
        let runner = runner.clone();
        let data = data.clone();
        let sink = run.sink.clone();
        let base_url = run.base_url.clone();
        let id = suite_id.clone();
        tokio::spawn(async move { runner.run(&id, &base_url, data, &sink).await })
    };

    if inner.config.concurrent_suites {
        let handles: Vec<_> = run.suites.iter().map(|id| (id.clone(), spawn_suite(id))).collect();
        for (suite_id, handle) in handles {
            settle(&run, &suite_id, handle.await);
        }
    } else {
        for suite_id in &run.suites {
            if run.cancel.load(Ordering::SeqCst) {
                log::info!("run {} stopped before suite {}", run.id, suite_id);
                break;
            }
            let joined = spawn_suite(suite_id).await;
            settle(&run, suite_id, joined);
        }
    }

    run.sink.mark_finished();
    let cancelled = run.cancel.load(Ordering::SeqCst);

    if let Some(format) = inner.config.auto_report {
        if !run.sink.is_empty() {
            match run
                .sink
                .export(format, &inner.config.reports_dir, &host_of(&run.base_url))
            {
                Ok(path) => run.update(|p| p.report_file = Some(path)),
                Err(e) => {
                    let fault = OrchestrationFault::from(e);
                    log::error!("run {}: {}", run.id, fault);
                    run.update(|p| p.record_fault(fault.to_string()));
                }
            }
        }
    }

    run.update(|p| {
        p.cancelled = cancelled;
        p.finish();
    });
    let progress = run.progress();
    let summary = run.sink.summary();

    log::info!(
        "run {} {}: {} cases, {} weaknesses",
        run.id,
        progress.state,
        summary.total,
        summary.weaknesses()
    );
    inner.emitter.emit(TestEvent::RunFinished {
        run_id: run.id.clone(),
        state: progress.state,
        summary: summary.clone(),
        report_file: progress.report_file.clone(),
    });

    RunOutcome {
        run_id: run.id.clone(),
        state: progress.state,
        summary,
        report_file: progress.report_file,
        faults: progress.faults,
        cancelled,
    }
}

/// Fold one suite's completion into the run.
fn settle(
    run: &RunRecord,
    suite_id: &str,
    joined: Result<Result<SuiteReport, OrchestrationFault>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Ok(report)) => {
            if report.cancelled {
                run.update(|p| p.cancelled = true);
            }
        }
        Ok(Err(fault)) => {
            log::error!("suite {} could not run: {}", suite_id, fault);
            run.sink.record(TestResult::fail(
                format!("Execute {}", suite_id),
                fault.to_string(),
                TestType::System,
                Severity::Critical,
            ));
            run.update(|p| p.record_fault(format!("{}: {}", suite_id, fault)));
        }
        Err(e) => {
            log::error!("suite {} task failed: {}", suite_id, e);
            run.sink.record(TestResult::fail(
                format!("Execute {}", suite_id),
                format!("internal error: {}", e),
                TestType::System,
                Severity::High,
            ));
        }
    }
    run.update(|p| p.finish_suite(suite_id));
}

/// Resolve `requested` inside `root`, rejecting anything that escapes it.
fn confine(root: &Path, requested: &str) -> Result<PathBuf, ReportAccessError> {
    let forbidden = || ReportAccessError::ForbiddenPath(requested.to_string());
    let cwd = std::env::current_dir().unwrap_or_default();
    let absolute = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };

    let base = lexical_normalize(&absolute(root)).ok_or_else(forbidden)?;
    let raw = Path::new(requested.trim());
    if raw.as_os_str().is_empty() {
        return Err(forbidden());
    }
    let candidate = if raw.is_absolute() || raw.starts_with(root) {
        absolute(raw)
    } else {
        base.join(raw)
    };
    let candidate = lexical_normalize(&candidate).ok_or_else(forbidden)?;
    if !candidate.starts_with(&base) || candidate == base {
        return Err(forbidden());
    }

    // Symlinks inside the directory must not lead out of it either.
    let real = candidate
        .canonicalize()
        .map_err(|_| ReportAccessError::NotFound(requested.to_string()))?;
    let real_base = base.canonicalize().unwrap_or(base);
    if !real.starts_with(&real_base) {
        return Err(forbidden());
    }
    if !real.is_file() {
        return Err(ReportAccessError::NotFound(requested.to_string()));
    }
    Ok(real)
}

/// Resolve `.` and `..` without touching the file system. `None` when the path
/// climbs above its root.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() || out.as_os_str().is_empty() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}
