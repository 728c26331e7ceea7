//! Bounded parallel execution of many (program, invocation) pairs.
//!
//! Work items are spread over a fixed number of permits; each interpretation runs on
//! the blocking pool. Results are collected into a map keyed by
//! `(program index, invocation index)`, so callers see the same order no matter how
//! the workers were scheduled.

use crate::error::RunnerError;
use crate::execution::{ExecutionResult, Invocation, RunLimits};
use crate::interpreter::Interpreter;
use crate::run_one;
use futures::stream::{FuturesUnordered, StreamExt};
use program_model::ProgramModel;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One program prepared for batch execution.
#[derive(Debug, Clone)]
pub struct ProgramTask {
    pub model: Arc<ProgramModel>,
    pub entry: String,
}

impl ProgramTask {
    pub fn new(model: ProgramModel, entry: impl Into<String>) -> Self {
        Self {
            model: Arc::new(model),
            entry: entry.into(),
        }
    }
}

pub type BatchResults = BTreeMap<(usize, usize), ExecutionResult>;

/// Runs every program on every invocation with at most `workers` interpretations in flight.
///
/// Individual faults are recorded in the results; only a crashed worker fails the batch.
pub async fn run_batch(
    interpreter: Arc<dyn Interpreter>,
    programs: &[ProgramTask],
    invocations: &[Invocation],
    limits: RunLimits,
    workers: usize,
) -> Result<BatchResults, RunnerError> {
    let sem = Arc::new(Semaphore::new(workers.max(1)));
    let invocations: Arc<Vec<Invocation>> = Arc::new(invocations.to_vec());
    let mut futs = FuturesUnordered::new();

    for (p, task) in programs.iter().enumerate() {
        for i in 0..invocations.len() {
            let interpreter = Arc::clone(&interpreter);
            let model = Arc::clone(&task.model);
            let entry = task.entry.clone();
            let invocations = Arc::clone(&invocations);
            let sem = Arc::clone(&sem);

            futs.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| RunnerError::Worker(e.to_string()))?;
                let result = tokio::task::spawn_blocking(move || {
                    run_one(interpreter.as_ref(), &model, &entry, &invocations[i], &limits)
                })
                .await
                .map_err(|e| RunnerError::Worker(e.to_string()))?;
                Ok::<_, RunnerError>(((p, i), result))
            }));
        }
    }

    let mut results = BTreeMap::new();
    while let Some(joined) = futs.next().await {
        let (key, result) = joined.map_err(|e| {
            warn!(error = %e, "batch worker aborted");
            RunnerError::Worker(e.to_string())
        })??;
        results.insert(key, result);
    }

    debug!(
        programs = programs.len(),
        invocations = invocations.len(),
        "batch finished"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionFault;
    use crate::value::Value;

    /// Echoes the first argument back, faulting on negative numbers.
    struct Echo;

    impl Interpreter for Echo {
        fn execute(
            &self,
            _model: &ProgramModel,
            _entry: &str,
            invocation: &Invocation,
            _limits: &RunLimits,
        ) -> Result<ExecutionResult, ExecutionFault> {
            match invocation.args.first() {
                Some(Value::Int(n)) if *n < 0 => Err(ExecutionFault::runtime("negative")),
                other => Ok(ExecutionResult {
                    return_value: other.cloned(),
                    ..Default::default()
                }),
            }
        }
    }

    #[tokio::test]
    async fn results_are_keyed_and_complete() {
        let programs = vec![
            ProgramTask::new(ProgramModel::empty("a"), "f"),
            ProgramTask::new(ProgramModel::empty("b"), "f"),
        ];
        let invocations = vec![
            Invocation::new(vec![Value::Int(1)]),
            Invocation::new(vec![Value::Int(-1)]),
            Invocation::new(vec![Value::Int(3)]),
        ];
        let results = run_batch(Arc::new(Echo), &programs, &invocations, RunLimits::default(), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(results[&(1, 2)].return_value, Some(Value::Int(3)));
        assert!(results[&(0, 1)].is_fault());
        let keys: Vec<_> = results.keys().copied().collect();
        assert_eq!(keys[0], (0, 0));
        assert_eq!(keys[5], (1, 2));
    }

    #[tokio::test]
    async fn zero_workers_still_makes_progress() {
        let programs = vec![ProgramTask::new(ProgramModel::empty("a"), "f")];
        let invocations = vec![Invocation::default()];
        let results = run_batch(Arc::new(Echo), &programs, &invocations, RunLimits::default(), 0)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }
}
