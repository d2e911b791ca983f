use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable bookkeeping of a run, guarded by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    pub state: RunState,
    pub current_suite: Option<String>,
    pub completed_suites: Vec<String>,
    pub faults: Vec<String>,
    pub report_file: Option<PathBuf>,
    pub cancelled: bool,
}

impl RunProgress {
    pub fn running() -> Self {
        Self {
            state: RunState::Running,
            ..Default::default()
        }
    }

    pub fn start_suite(&mut self, suite_id: &str) {
        self.current_suite = Some(suite_id.to_string());
    }

    pub fn finish_suite(&mut self, suite_id: &str) {
        if !self.completed_suites.iter().any(|s| s == suite_id) {
            self.completed_suites.push(suite_id.to_string());
        }
        if self.current_suite.as_deref() == Some(suite_id) {
            self.current_suite = None;
        }
    }

    pub fn record_fault(&mut self, fault: impl Into<String>) {
        self.faults.push(fault.into());
    }

    /// Completed unless an orchestration fault was recorded.
    pub fn finish(&mut self) {
        self.current_suite = None;
        self.state = if self.faults.is_empty() {
            RunState::Completed
        } else {
            RunState::Failed
        };
    }

    /// Percentage of requested suites that have finished.
    pub fn progress(&self, requested: usize) -> u8 {
        if self.state.is_terminal() || requested == 0 {
            return if self.state.is_terminal() { 100 } else { 0 };
        }
        ((self.completed_suites.len() * 100) / requested).min(100) as u8
    }
}

/// Snapshot answered by `status()`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub run_id: Option<String>,
    pub state: RunState,
    pub running: bool,
    pub base_url: Option<String>,
    pub suites: Vec<String>,
    pub completed_suites: Vec<String>,
    pub current_suite: Option<String>,
    pub progress: u8,
    pub total_cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub bugs: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report_file: Option<PathBuf>,
    pub seed: Option<u64>,
    pub errors: Vec<String>,
}

impl RunStatus {
    pub fn idle() -> Self {
        Self {
            run_id: None,
            state: RunState::Idle,
            running: false,
            base_url: None,
            suites: Vec::new(),
            completed_suites: Vec::new(),
            current_suite: None,
            progress: 0,
            total_cases: 0,
            passed: 0,
            failed: 0,
            bugs: 0,
            started_at: None,
            finished_at: None,
            report_file: None,
            seed: None,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_and_finish() {
        let mut progress = RunProgress::running();
        progress.start_suite("signup");
        progress.finish_suite("signup");
        progress.finish_suite("signup");
        assert_eq!(progress.completed_suites.len(), 1);
        assert_eq!(progress.progress(4), 25);

        progress.finish();
        assert_eq!(progress.state, RunState::Completed);
        assert_eq!(progress.progress(4), 100);
    }

    #[test]
    fn test_fault_fails_run() {
        let mut progress = RunProgress::running();
        progress.record_fault("cannot open browser session");
        progress.finish();
        assert_eq!(progress.state, RunState::Failed);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RunState::Completed).unwrap(), "\"completed\"");
    }
}
