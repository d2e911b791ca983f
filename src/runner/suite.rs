//! Suite execution with per-check isolation.
//!
//! A suite is an ordered list of [`Check`]s. Each check produces exactly one
//! [`TestResult`]: its own verdict, or a classified failure when it returns an
//! error or panics. The next check runs regardless.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use super::events::{EventEmitter, TestEvent};
use super::registry;
use crate::data::DataProvider;
use crate::driver::{AdapterFactory, BrowserSession, TargetAdapter};
use crate::error::{AdapterError, AdapterErrorKind, OrchestrationFault};
use crate::report::{Outcome, ResultSink, Severity, TestResult, TestType};
use crate::utils::url::join_url;
use crate::utils::HarnessConfig;

pub type CheckFuture<'a> = BoxFuture<'a, Result<Verdict, CheckError>>;
pub type CheckFn = for<'a> fn(&'a CheckContext) -> CheckFuture<'a>;

/// Maps a check failure to an outcome and severity. `primary` marks checks on
/// the main user flow.
pub type SeverityPolicy = fn(&CheckError, bool) -> (Outcome, Severity);

/// One atomic test case
#[derive(Clone)]
pub struct Check {
    pub name: &'static str,
    pub test_type: TestType,
    pub primary: bool,
    pub run: CheckFn,
}

impl Check {
    pub fn new(name: &'static str, test_type: TestType, run: CheckFn) -> Self {
        Self {
            name,
            test_type,
            primary: false,
            run,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Verdict a check reaches on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub severity: Severity,
    pub details: String,
    /// Overrides the check's declared test type
    pub test_type: Option<TestType>,
}

impl Verdict {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Pass,
            severity: Severity::Low,
            details: details.into(),
            test_type: None,
        }
    }

    pub fn bug(severity: Severity, details: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Bug,
            severity,
            details: details.into(),
            test_type: None,
        }
    }

    pub fn fail(severity: Severity, details: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail,
            severity,
            details: details.into(),
            test_type: None,
        }
    }

    pub fn with_type(mut self, test_type: TestType) -> Self {
        self.test_type = Some(test_type);
        self
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("assertion failed: {0}")]
    Assertion(String),
}

/// Everything a check may touch
pub struct CheckContext {
    pub base_url: String,
    pub data: Arc<DataProvider>,
    pub config: Arc<HarnessConfig>,
    pub browser: Option<Arc<dyn BrowserSession>>,
    pub http: Option<Arc<dyn TargetAdapter>>,
}

impl CheckContext {
    /// Absolute URL of `path` on the target.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn browser(&self) -> Result<&dyn BrowserSession, CheckError> {
        self.browser
            .as_deref()
            .ok_or_else(|| CheckError::Assertion("check requires a browser session".into()))
    }

    pub fn http(&self) -> Result<&dyn TargetAdapter, CheckError> {
        self.http
            .as_deref()
            .ok_or_else(|| CheckError::Assertion("check requires an http client".into()))
    }
}

/// Which adapter a suite drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Browser,
    Http,
}

/// Registry entry
#[derive(Clone, Copy)]
pub struct SuiteDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub adapter: AdapterKind,
    pub checks: fn() -> Vec<Check>,
    pub policy: SeverityPolicy,
}

/// Counts reported back to the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite_id: String,
    pub cases_run: usize,
    pub cases_failed: usize,
    pub cancelled: bool,
}

/// Deterministic classification used by every suite unless it supplies its own.
pub fn default_policy(err: &CheckError, primary: bool) -> (Outcome, Severity) {
    let pick = |main: Severity, other: Severity| if primary { main } else { other };
    match err {
        CheckError::Adapter(e) => match e.kind {
            AdapterErrorKind::Timeout => (Outcome::Fail, pick(Severity::High, Severity::Medium)),
            AdapterErrorKind::ConnectionRefused => {
                (Outcome::Fail, pick(Severity::Critical, Severity::High))
            }
            AdapterErrorKind::NotFound => (Outcome::Bug, pick(Severity::High, Severity::Medium)),
            AdapterErrorKind::ProtocolError => (Outcome::Fail, Severity::Medium),
        },
        CheckError::Assertion(_) => (Outcome::Fail, Severity::Medium),
    }
}

/// Executes suites against one target
pub struct SuiteRunner {
    factory: Arc<dyn AdapterFactory>,
    config: Arc<HarnessConfig>,
    emitter: Option<EventEmitter>,
    cancel: Arc<AtomicBool>,
}

impl SuiteRunner {
    pub fn new(
        factory: Arc<dyn AdapterFactory>,
        config: Arc<HarnessConfig>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            factory,
            config,
            emitter: None,
            cancel,
        }
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    fn emit(&self, event: TestEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }

    /// Run the registered suite `suite_id`.
    pub async fn run(
        &self,
        suite_id: &str,
        base_url: &str,
        data: Arc<DataProvider>,
        sink: &ResultSink,
    ) -> Result<SuiteReport, OrchestrationFault> {
        let suite = registry::lookup(suite_id)
            .ok_or_else(|| OrchestrationFault::SuiteMissing(suite_id.to_string()))?;
        self.run_definition(&suite, base_url, data, sink).await
    }

    /// Open the suite's adapter, execute every check, release the adapter.
    pub async fn run_definition(
        &self,
        suite: &SuiteDefinition,
        base_url: &str,
        data: Arc<DataProvider>,
        sink: &ResultSink,
    ) -> Result<SuiteReport, OrchestrationFault> {
        let (browser, http) = match suite.adapter {
            AdapterKind::Browser => (Some(self.factory.open_browser().await?), None),
            AdapterKind::Http => (None, Some(self.factory.http_client().await?)),
        };

        let ctx = CheckContext {
            base_url: base_url.to_string(),
            data,
            config: self.config.clone(),
            browser,
            http,
        };

        let report = self.execute(suite, &ctx, sink).await;

        if let Some(browser) = &ctx.browser {
            if let Err(e) = browser.close().await {
                log::warn!("failed to close browser after suite {}: {}", suite.id, e);
            }
        }
        Ok(report)
    }

    async fn execute(
        &self,
        suite: &SuiteDefinition,
        ctx: &CheckContext,
        sink: &ResultSink,
    ) -> SuiteReport {
        let checks = (suite.checks)();
        let mut report = SuiteReport {
            suite_id: suite.id.to_string(),
            ..Default::default()
        };

        self.emit(TestEvent::SuiteStarted {
            suite_id: suite.id.to_string(),
            check_count: checks.len(),
        });
        log::info!("suite {} started ({} checks)", suite.id, checks.len());

        for check in &checks {
            if self.cancel.load(Ordering::SeqCst) {
                log::info!("suite {} stopped before '{}'", suite.id, check.name);
                report.cancelled = true;
                break;
            }

            self.emit(TestEvent::CaseStarted {
                suite_id: suite.id.to_string(),
                case_name: check.name.to_string(),
            });

            let result = run_check(check, ctx, suite.policy).await;
            report.cases_run += 1;
            if result.outcome.is_weakness() {
                report.cases_failed += 1;
            }
            sink.record(result);
        }

        self.emit(TestEvent::SuiteFinished {
            suite_id: suite.id.to_string(),
            cases_run: report.cases_run,
            cases_failed: report.cases_failed,
        });
        log::info!(
            "suite {} finished: {} run, {} weak",
            suite.id,
            report.cases_run,
            report.cases_failed
        );
        report
    }
}

/// Run one check and turn whatever happens into a single result.
pub async fn run_check(check: &Check, ctx: &CheckContext, policy: SeverityPolicy) -> TestResult {
    let outcome = AssertUnwindSafe((check.run)(ctx)).catch_unwind().await;
    match outcome {
        Ok(Ok(verdict)) => TestResult::new(
            check.name,
            verdict.outcome,
            verdict.details,
            verdict.test_type.unwrap_or(check.test_type),
            verdict.severity,
        ),
        Ok(Err(err)) => {
            let (outcome, severity) = policy(&err, check.primary);
            log::debug!("check '{}' failed: {}", check.name, err);
            TestResult::new(check.name, outcome, err.to_string(), check.test_type, severity)
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("check '{}' panicked: {}", check.name, message);
            TestResult::fail(
                check.name,
                format!("internal error: {}", message),
                check.test_type,
                Severity::High,
            )
        }
    }
}
