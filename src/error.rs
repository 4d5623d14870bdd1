//! Structured error handling and exit codes.

use serde::Serialize;

use crate::session::SessionError;

/// Exit codes for bloomdupe.
///
/// - 0: Success (scan finished, with or without duplicates)
/// - 1: General error (allocation, configuration or persistence failure)
/// - 3: Strict violation (files were ignored while `strict` was set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the scan completed.
    Success = 0,
    /// General error: a fatal error stopped the run.
    GeneralError = 1,
    /// Strict violation: at least one file was ignored in strict mode.
    StrictViolation = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "BD000",
            Self::GeneralError => "BD001",
            Self::StrictViolation => "BD003",
        }
    }

    /// Pick the exit code for an error returned by `run_app`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let strict = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<SessionError>())
            .any(|e| matches!(e, SessionError::Strict { .. }));
        if strict {
            Self::StrictViolation
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "BD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
