//! Inputs and outputs of one interpretation.

use crate::value::Value;
use program_model::Location;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use util::execution_config::ExecutionLimits;

/// One concrete input used to probe behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Invocation {
    /// Positional arguments for the entry function.
    pub args: Vec<Value>,
    /// Lines served to `input()`, in order.
    pub stdin: Vec<String>,
}

impl Invocation {
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            args,
            stdin: Vec::new(),
        }
    }

    pub fn with_stdin(mut self, lines: Vec<String>) -> Self {
        self.stdin = lines;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(Value::repr).collect();
        write!(f, "({})", args.join(", "))?;
        if !self.stdin.is_empty() {
            write!(f, " with input {:?}", self.stdin)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Step or wall-clock limit reached.
    Timeout,
    /// The program raised an error.
    RuntimeError,
    /// The entry function does not exist.
    MissingEntry,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Timeout => write!(f, "Timeout"),
            FaultKind::RuntimeError => write!(f, "RuntimeError"),
            FaultKind::MissingEntry => write!(f, "MissingEntry"),
        }
    }
}

/// A per-invocation failure. Never aborts a batch; comparison treats it as a mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct ExecutionFault {
    pub kind: FaultKind,
    pub message: String,
}

impl ExecutionFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(FaultKind::RuntimeError, message)
    }

    pub fn missing_entry(name: &str) -> Self {
        Self::new(FaultKind::MissingEntry, format!("entry function '{name}' is not defined"))
    }
}

/// A branch decision taken during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BranchVisit {
    pub location: Location,
    pub taken: bool,
}

/// Observable outcome of running one program on one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub return_value: Option<Value>,
    pub stdout: Vec<String>,
    pub fault: Option<ExecutionFault>,
    /// Ordered branch decisions (conditions and loop tests).
    pub trace: Vec<BranchVisit>,
    pub steps: u64,
}

impl ExecutionResult {
    pub fn faulted(fault: ExecutionFault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::default()
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// One-line description used in divergence reports.
    pub fn summary(&self) -> String {
        if let Some(fault) = &self.fault {
            return format!("failed with {fault}");
        }
        let mut parts = Vec::new();
        if let Some(value) = &self.return_value {
            parts.push(format!("returned {}", value.repr()));
        }
        if !self.stdout.is_empty() {
            parts.push(format!("printed {:?}", self.stdout));
        }
        if parts.is_empty() {
            "produced no output".to_string()
        } else {
            parts.join(" and ")
        }
    }
}

/// Limits for one interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub max_steps: u64,
    pub timeout: Duration,
    pub max_depth: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        RunLimits::from(&ExecutionLimits::default())
    }
}

impl From<&ExecutionLimits> for RunLimits {
    fn from(limits: &ExecutionLimits) -> Self {
        Self {
            max_steps: limits.max_steps,
            timeout: limits.invocation_timeout(),
            max_depth: limits.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_describes_each_outcome() {
        let ok = ExecutionResult {
            return_value: Some(Value::Bool(true)),
            ..Default::default()
        };
        assert_eq!(ok.summary(), "returned True");

        let faulted = ExecutionResult::faulted(ExecutionFault::runtime("division by zero"));
        assert_eq!(faulted.summary(), "failed with RuntimeError: division by zero");
    }

    #[test]
    fn invocation_display_uses_literals() {
        let inv = Invocation::new(vec![Value::List(vec![Value::Int(1), Value::Int(1000)])]);
        assert_eq!(inv.to_string(), "([1, 1000])");
    }
}
