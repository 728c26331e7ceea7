//! # Equivalence Oracle
//!
//! Decides whether a program behaves like a reference over a set of invocations, and
//! picks the reference a failing submission should be repaired towards.
//!
//! Both programs run under the same [`RunLimits`]. Results are compared per invocation
//! with the active [`OutputComparator`]; a fault on either side is a mismatch no matter
//! what the comparator would say. The first diverging invocation is kept as a
//! [`Divergence`] so feedback can cite a concrete failing input.
//!
//! Reference outputs never change during a request, so they are computed once in
//! [`EquivalenceOracle::evaluate_pool`] and reused by every synthesis re-check.

use crate::pool::ReferenceEntry;
use crate::traits::comparator::OutputComparator;
use code_runner::{
    ExecutionResult, Interpreter, Invocation, ProgramTask, RunLimits, RunnerError, run_all,
    run_batch,
};
use program_model::ProgramModel;
use program_model::diff::distance;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use util::execution_config::ComparisonOptions;

/// First invocation on which two programs disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub index: usize,
    pub invocation: Invocation,
    pub expected: ExecutionResult,
    pub actual: ExecutionResult,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "on input {} the reference {}, but the program {}",
            self.invocation,
            self.expected.summary(),
            self.actual.summary()
        )
    }
}

/// Outcome of comparing one program against one reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub passes: bool,
    pub mismatches: usize,
    pub total: usize,
    pub divergence: Option<Divergence>,
}

impl Verdict {
    pub fn mismatch_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.mismatches as f64 / self.total as f64
        }
    }
}

/// Reference outputs and the submission's verdict against one pool entry.
#[derive(Debug, Clone)]
pub struct ReferenceOutcome {
    /// Position of the reference in the pool slice that was evaluated.
    pub index: usize,
    pub expected: Vec<ExecutionResult>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone)]
pub struct PoolEvaluation {
    pub submission: Vec<ExecutionResult>,
    pub references: Vec<ReferenceOutcome>,
}

impl PoolEvaluation {
    /// First reference (in load order) the submission already matches.
    pub fn passing(&self) -> Option<&ReferenceOutcome> {
        self.references.iter().find(|r| r.verdict.passes)
    }
}

/// The reference chosen as repair target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub distance: u32,
    pub estimated: f64,
}

/// Runs programs and judges their behavior against reference outputs.
#[derive(Clone)]
pub struct EquivalenceOracle {
    interpreter: Arc<dyn Interpreter>,
    comparator: Arc<dyn OutputComparator>,
    options: ComparisonOptions,
    limits: RunLimits,
    entry: String,
}

impl EquivalenceOracle {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        comparator: Arc<dyn OutputComparator>,
        options: ComparisonOptions,
        limits: RunLimits,
        entry: impl Into<String>,
    ) -> Self {
        Self {
            interpreter,
            comparator,
            options,
            limits,
            entry: entry.into(),
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Per-invocation equality. Faults never match.
    pub fn outputs_match(&self, expected: &ExecutionResult, actual: &ExecutionResult) -> bool {
        if expected.is_fault() || actual.is_fault() {
            return false;
        }
        self.comparator.compare(expected, actual, &self.options)
    }

    /// Compares two aligned result lists.
    pub fn judge(
        &self,
        invocations: &[Invocation],
        expected: &[ExecutionResult],
        actual: &[ExecutionResult],
    ) -> Verdict {
        let mut mismatches = 0;
        let mut divergence = None;
        for (index, (e, a)) in expected.iter().zip(actual).enumerate() {
            if self.outputs_match(e, a) {
                continue;
            }
            mismatches += 1;
            if divergence.is_none() {
                divergence = Some(Divergence {
                    index,
                    invocation: invocations.get(index).cloned().unwrap_or_default(),
                    expected: e.clone(),
                    actual: a.clone(),
                });
            }
        }
        let total = expected.len().min(actual.len());
        Verdict {
            passes: mismatches == 0 && expected.len() == actual.len(),
            mismatches,
            total,
            divergence,
        }
    }

    /// Runs `model` on every invocation on the calling thread.
    pub fn run(&self, model: &ProgramModel, invocations: &[Invocation]) -> Vec<ExecutionResult> {
        run_all(
            self.interpreter.as_ref(),
            model,
            &self.entry,
            invocations,
            &self.limits,
        )
    }

    /// Runs a candidate program and judges it against precomputed reference outputs.
    pub fn check(
        &self,
        model: &ProgramModel,
        invocations: &[Invocation],
        expected: &[ExecutionResult],
    ) -> Verdict {
        let actual = self.run(model, invocations);
        self.judge(invocations, expected, &actual)
    }

    /// Runs the submission and every reference through the bounded worker pool and
    /// judges the submission against each reference.
    pub async fn evaluate_pool(
        &self,
        submission: &Arc<ProgramModel>,
        references: &[&ReferenceEntry],
        invocations: &[Invocation],
        workers: usize,
    ) -> Result<PoolEvaluation, RunnerError> {
        let mut programs = Vec::with_capacity(references.len() + 1);
        programs.push(ProgramTask {
            model: Arc::clone(submission),
            entry: self.entry.clone(),
        });
        programs.extend(references.iter().map(|r| ProgramTask {
            model: Arc::clone(&r.model),
            entry: self.entry.clone(),
        }));

        let mut results = run_batch(
            Arc::clone(&self.interpreter),
            &programs,
            invocations,
            self.limits,
            workers,
        )
        .await?;

        let mut collect = |p: usize| -> Vec<ExecutionResult> {
            (0..invocations.len())
                .map(|i| results.remove(&(p, i)).unwrap_or_default())
                .collect()
        };

        let submission_results = collect(0);
        let mut outcomes = Vec::with_capacity(references.len());
        for (index, reference) in references.iter().enumerate() {
            let expected = collect(index + 1);
            let verdict = self.judge(invocations, &expected, &submission_results);
            debug!(
                reference = %reference.identity,
                passes = verdict.passes,
                mismatches = verdict.mismatches,
                "judged submission"
            );
            outcomes.push(ReferenceOutcome {
                index,
                expected,
                verdict,
            });
        }

        Ok(PoolEvaluation {
            submission: submission_results,
            references: outcomes,
        })
    }
}

/// Picks the reference with the smallest estimated repair cost.
///
/// The estimate is the structural distance (at least one unit) scaled by
/// `1 + mismatch ratio`. Ties go to the smaller distance, then to load order.
pub fn select_reference(
    submission: &ProgramModel,
    references: &[&ReferenceEntry],
    evaluation: &PoolEvaluation,
) -> Option<Selection> {
    let mut best: Option<Selection> = None;
    for outcome in &evaluation.references {
        let Some(reference) = references.get(outcome.index) else {
            continue;
        };
        let d = distance(submission, &reference.model);
        let estimated = f64::from(d.max(1)) * (1.0 + outcome.verdict.mismatch_ratio());
        let candidate = Selection {
            index: outcome.index,
            distance: d,
            estimated,
        };
        debug!(reference = %reference.identity, distance = d, estimated, "reference estimate");
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let better = candidate.estimated < current.estimated
                    || (candidate.estimated == current.estimated
                        && candidate.distance < current.distance);
                Some(if better { candidate } else { current })
            }
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparators::ExactComparator;
    use code_runner::{ExecutionFault, Value};
    use python_lang::{PythonInterpreter, PythonParser};
    use program_model::ProgramParser;
    use util::languages::Language;

    fn oracle() -> EquivalenceOracle {
        EquivalenceOracle::new(
            Arc::new(PythonInterpreter),
            Arc::new(ExactComparator),
            ComparisonOptions::default(),
            RunLimits::default(),
            "f",
        )
    }

    fn entry(name: &str, source: &str) -> ReferenceEntry {
        ReferenceEntry::new(
            name,
            Language::Python,
            PythonParser.parse_named(name, source).unwrap(),
        )
    }

    fn invocations(xs: &[i64]) -> Vec<Invocation> {
        xs.iter().map(|x| Invocation::new(vec![Value::Int(*x)])).collect()
    }

    #[test]
    fn faults_never_match() {
        let o = oracle();
        let ok = ExecutionResult {
            return_value: Some(Value::Int(1)),
            ..Default::default()
        };
        let bad = ExecutionResult::faulted(ExecutionFault::runtime("boom"));
        assert!(!o.outputs_match(&ok, &bad));
        assert!(!o.outputs_match(&bad, &bad));
    }

    #[test]
    fn check_reports_first_divergence() {
        let o = oracle();
        let inv = invocations(&[1, 5, 10]);
        let reference = PythonParser.parse("def f(x):\n    return x > 3\n").unwrap();
        let candidate = PythonParser.parse("def f(x):\n    return x >= 10\n").unwrap();
        let expected = o.run(&reference, &inv);
        let verdict = o.check(&candidate, &inv, &expected);
        assert!(!verdict.passes);
        assert_eq!(verdict.mismatches, 1);
        let d = verdict.divergence.unwrap();
        assert_eq!(d.index, 1);
        assert_eq!(
            d.to_string(),
            "on input (5) the reference returned True, but the program returned False"
        );
    }

    #[tokio::test]
    async fn evaluate_pool_judges_each_reference() {
        let o = oracle();
        let inv = invocations(&[0, 4, 9]);
        let refs = [
            entry("a.py", "def f(x):\n    return x * 2\n"),
            entry("b.py", "def f(x):\n    return x + x\n"),
        ];
        let refs: Vec<&ReferenceEntry> = refs.iter().collect();
        let sub = Arc::new(PythonParser.parse("def f(x):\n    return x + 2\n").unwrap());
        let eval = o.evaluate_pool(&sub, &refs, &inv, 2).await.unwrap();
        assert_eq!(eval.references.len(), 2);
        assert!(eval.passing().is_none());
        assert_eq!(eval.references[0].verdict.mismatches, 2);
        assert_eq!(eval.submission[1].return_value, Some(Value::Int(6)));
    }

    #[tokio::test]
    async fn selection_prefers_closer_reference_then_load_order() {
        let o = oracle();
        let inv = invocations(&[0, 4, 9]);
        let refs = [
            entry("far.py", "def f(x):\n    y = x\n    z = y * 2\n    return z\n"),
            entry("near.py", "def f(x):\n    return x * 2\n"),
            entry("twin.py", "def f(x):\n    return x * 2\n"),
        ];
        let refs: Vec<&ReferenceEntry> = refs.iter().collect();
        let sub_model = PythonParser.parse("def f(x):\n    return x + 2\n").unwrap();
        let sub = Arc::new(sub_model.clone());
        let eval = o.evaluate_pool(&sub, &refs, &inv, 4).await.unwrap();
        let chosen = select_reference(&sub_model, &refs, &eval).unwrap();
        assert_eq!(chosen.index, 1);
        assert_eq!(chosen.distance, 1);
    }
}
