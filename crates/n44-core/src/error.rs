//! Unified error type for the N44 pipeline.
//!
//! [`N44Error`] covers the fatal conditions of a run (authentication against
//! the market feed, malformed dates, configuration and solver start-up) as
//! well as the generic I/O and parse failures raised by the readers.
//! Per-item and per-hour problems never surface here; they are collected as
//! [`crate::diagnostics::Diagnostics`] instead.
//!
//! # Example
//!
//! ```
//! use n44_core::{N44Error, N44Result};
//!
//! fn check_week(week: u32) -> N44Result<u32> {
//!     if week == 0 || week > 53 {
//!         return Err(N44Error::Validation(format!("week {week} out of range")));
//!     }
//!     Ok(week)
//! }
//!
//! assert!(check_week(54).is_err());
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum N44Error {
    /// I/O errors (file access, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote market feed rejected the credentials
    #[error("Authentication failed for market feed '{host}': {message}")]
    Authentication { host: String, message: String },

    /// Target dates must be `YYYY-MM-DD`
    #[error("'{0}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Errors reported by the external power-flow solver
    #[error("Solver error: {0}")]
    Solver(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

pub type N44Result<T> = Result<T, N44Error>;

impl N44Error {
    /// Fatal errors stop the whole run instead of a single day.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            N44Error::Authentication { .. }
                | N44Error::InvalidDate(_)
                | N44Error::Config(_)
                | N44Error::Solver(_)
        )
    }
}

impl From<anyhow::Error> for N44Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<N44Error>() {
            Ok(inner) => inner,
            Err(other) => N44Error::Other(format!("{other:#}")),
        }
    }
}

impl From<String> for N44Error {
    fn from(s: String) -> Self {
        N44Error::Other(s)
    }
}

impl From<&str> for N44Error {
    fn from(s: &str) -> Self {
        N44Error::Other(s.to_string())
    }
}

impl From<serde_json::Error> for N44Error {
    fn from(err: serde_json::Error) -> Self {
        N44Error::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = N44Error::Authentication {
            host: "ftp.example.org".into(),
            message: "530 Login incorrect".into(),
        };
        assert!(err.to_string().contains("ftp.example.org"));
        assert!(err.to_string().contains("530"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: N44Error = io_err.into();
        assert!(matches!(err, N44Error::Io(_)));
    }

    #[test]
    fn test_anyhow_keeps_typed_error() {
        let wrapped = anyhow::Error::new(N44Error::InvalidDate("2016-13-01".into()));
        let err: N44Error = wrapped.into();
        assert!(matches!(err, N44Error::InvalidDate(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_parse_errors_are_not_fatal() {
        assert!(!N44Error::Parse("bad".into()).is_fatal());
    }
}
