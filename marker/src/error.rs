//! Marker Error Types
//!
//! [`MarkerError`] covers the failures that abort a feedback request before any
//! status can be produced: source that does not parse, a language without a
//! registered plugin, unreadable pool files, and internal faults such as a crashed
//! worker. Everything that happens after parsing (runtime faults, failed or
//! expired synthesis) is reported as a [`crate::types::SessionStatus`] instead.
//!
//! # Example
//!
//! ```rust
//! use marker::error::MarkerError;
//!
//! fn require_source(data: &str) -> Result<(), MarkerError> {
//!     if data.trim().is_empty() {
//!         return Err(MarkerError::InvalidInput("submission is empty".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use code_runner::RunnerError;
use program_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    /// The submission or a pool program could not be parsed.
    #[error("{0}")]
    Parse(#[from] ModelError),
    /// No plugin for the language, or the worker pool failed.
    #[error("{0}")]
    Runner(#[from] RunnerError),
    /// A pool program failed to parse; the file name is attached.
    #[error("reference program '{name}' is invalid: {source}")]
    Pool { name: String, source: ModelError },
    /// Malformed request input (arguments, stdin, config).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// I/O error (file not found, unreadable, etc.).
    #[error("I/O error: {0}")]
    Io(String),
    /// Solver failure, join failure, or another unexpected condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for MarkerError {
    fn from(err: std::io::Error) -> Self {
        MarkerError::Io(err.to_string())
    }
}
