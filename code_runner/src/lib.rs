//! # Code Runner
//!
//! Executes [`ProgramModel`]s through pluggable language interpreters.
//!
//! - [`value`]: dynamically typed runtime values.
//! - [`execution`]: invocations, results, faults and limits.
//! - [`interpreter`]: the [`Interpreter`] trait.
//! - [`registry`]: language tag to parser/interpreter lookup.
//! - [`batch`]: bounded parallel execution of program/invocation pairs.

pub mod batch;
pub mod error;
pub mod execution;
pub mod interpreter;
pub mod registry;
pub mod value;

pub use batch::{BatchResults, ProgramTask, run_batch};
pub use error::RunnerError;
pub use execution::{
    BranchVisit, ExecutionFault, ExecutionResult, FaultKind, Invocation, RunLimits,
};
pub use interpreter::Interpreter;
pub use registry::{LanguagePlugin, LanguageRegistry};
pub use value::Value;

use program_model::ProgramModel;
use tracing::trace;

/// Runs one invocation, folding a fault into the returned [`ExecutionResult`].
pub fn run_one(
    interpreter: &dyn Interpreter,
    model: &ProgramModel,
    entry: &str,
    invocation: &Invocation,
    limits: &RunLimits,
) -> ExecutionResult {
    match interpreter.execute(model, entry, invocation, limits) {
        Ok(result) => result,
        Err(fault) => {
            trace!(program = %model.name, %invocation, %fault, "invocation faulted");
            ExecutionResult::faulted(fault)
        }
    }
}

/// Runs all invocations against one program, in order, on the calling thread.
pub fn run_all(
    interpreter: &dyn Interpreter,
    model: &ProgramModel,
    entry: &str,
    invocations: &[Invocation],
    limits: &RunLimits,
) -> Vec<ExecutionResult> {
    invocations
        .iter()
        .map(|inv| run_one(interpreter, model, entry, inv, limits))
        .collect()
}
