//! Interpreter Trait
//!
//! Language plugins implement [`Interpreter`] to execute a [`ProgramModel`] against one
//! [`Invocation`]. Implementations must be deterministic for identical inputs and must
//! capture every side effect (printed lines, consumed input) in the returned result.

use crate::execution::{ExecutionFault, ExecutionResult, Invocation, RunLimits};
use program_model::ProgramModel;

pub trait Interpreter: Send + Sync {
    /// Run `entry` in `model` with the invocation's arguments.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionFault`] when the step/time budget runs out (`Timeout`),
    /// the program raises (`RuntimeError`) or `entry` is undefined (`MissingEntry`).
    fn execute(
        &self,
        model: &ProgramModel,
        entry: &str,
        invocation: &Invocation,
        limits: &RunLimits,
    ) -> Result<ExecutionResult, ExecutionFault>;
}
