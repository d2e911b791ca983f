//! Error taxonomy for the harness.
//!
//! Adapter errors are converted into test results by the suite runner and never
//! escape a single check. Orchestration faults break the harness itself and force
//! the run into the failed state. Export and report access errors are boundary
//! errors surfaced to the caller without touching run state.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable reason attached to an [`AdapterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterErrorKind {
    Timeout,
    NotFound,
    ConnectionRefused,
    ProtocolError,
}

impl AdapterErrorKind {
    pub fn reason(&self) -> &'static str {
        match self {
            AdapterErrorKind::Timeout => "TIMEOUT",
            AdapterErrorKind::NotFound => "NOT_FOUND",
            AdapterErrorKind::ConnectionRefused => "CONNECTION_REFUSED",
            AdapterErrorKind::ProtocolError => "PROTOCOL_ERROR",
        }
    }
}

impl fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Failure reaching the target through an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Timeout, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::NotFound, message)
    }

    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::ConnectionRefused, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::ProtocolError, message)
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Failure of the harness itself rather than of the target.
#[derive(Debug, Error)]
pub enum OrchestrationFault {
    #[error("cannot open {adapter} session: {message}")]
    AdapterUnavailable {
        adapter: &'static str,
        message: String,
    },

    #[error("suite '{0}' is not registered")]
    SuiteMissing(String),

    #[error("cannot write run report: {0}")]
    ReportWrite(#[from] ExportError),
}

/// Failure writing a report file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("destination {path} is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {format} report: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("no test results to export")]
    NothingToExport,
}

impl ExportError {
    pub(crate) fn unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Unwritable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn encode(format: &'static str, err: impl fmt::Display) -> Self {
        ExportError::Encode {
            format,
            message: err.to_string(),
        }
    }
}

/// Failure reading back a previously exported report.
#[derive(Debug, Error)]
pub enum ReportAccessError {
    #[error("path '{0}' is outside the reports directory")]
    ForbiddenPath(String),

    #[error("report '{0}' does not exist")]
    NotFound(String),

    #[error("failed to read report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rejections from the run orchestrator's control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("run {run_id} is already in progress")]
    AlreadyRunning { run_id: String },

    #[error("unknown suite id(s): {}", .0.join(", "))]
    UnknownSuite(Vec<String>),

    #[error("no suites selected")]
    NoSuitesSelected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_reason_is_stable() {
        let err = AdapterError::timeout("page load exceeded 10000ms");
        assert_eq!(err.kind.reason(), "TIMEOUT");
        assert_eq!(err.to_string(), "TIMEOUT: page load exceeded 10000ms");
        assert_eq!(
            AdapterError::connection_refused("x").kind.to_string(),
            "CONNECTION_REFUSED"
        );
    }

    #[test]
    fn test_unknown_suite_lists_ids() {
        let err = OrchestratorError::UnknownSuite(vec!["checkout".into(), "cart".into()]);
        assert_eq!(err.to_string(), "unknown suite id(s): checkout, cart");
    }
}
