//! Error types and exit codes for solver bridge communication.

use thiserror::Error;

/// Exit codes of the solver bridge process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Malformed request line
    InvalidRequest = 1,
    /// Solver engine failure (license, start-up)
    SolverError = 2,
    /// Case file could not be read or written
    CaseError = 3,
}

impl ExitCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            1 => ExitCode::InvalidRequest,
            3 => ExitCode::CaseError,
            _ => ExitCode::SolverError, // Unknown codes treated as solver error
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Errors that can occur while driving the external solver.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Bridge program not found.
    #[error("Solver bridge '{program}' not found in ~/.n44/solvers or PATH")]
    NotInstalled { program: String },

    /// Bridge process failed to start.
    #[error("Failed to start solver process: {0}")]
    ProcessStart(#[source] std::io::Error),

    /// Bridge process exited with an error.
    #[error("Solver process failed with exit code {exit_code:?}: {message}")]
    ProcessFailed { exit_code: ExitCode, message: String },

    /// Solver is not running (not initialized or already closed).
    #[error("Solver is not running; call initialize first")]
    NotRunning,

    /// The solver refused a command.
    #[error("Solver rejected '{command}': {message}")]
    Rejected { command: String, message: String },

    /// Unexpected or malformed reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
