//! Errors raised by the runner layer.

use thiserror::Error;
use util::languages::Language;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunnerError {
    /// No parser/interpreter pair is registered for the language.
    #[error("unsupported language '{0}': no plugin registered")]
    UnsupportedLanguage(Language),
    /// A worker task panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),
}
