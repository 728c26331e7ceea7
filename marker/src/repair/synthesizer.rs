//! # Repair Synthesizer
//!
//! Searches for the cheapest subset of candidate edits that makes the submission pass
//! the oracle against the chosen reference.
//!
//! ## Loop
//!
//! 1. Align submission and reference and build the candidate pool.
//! 2. Apply the whole alignment script and check it. It reproduces the reference, so it
//!    normally passes and becomes the first upper bound.
//! 3. Ask a fresh solver for the cheapest selection that beats the bound and satisfies
//!    all constraints. Materialize it and check it.
//!    - It passes: solutions arrive in increasing order, so it is optimal. Stop.
//!    - It fails: add the cut "select at least one candidate outside this selection",
//!      which removes it and all of its subsets, and go again.
//! 4. Stop early on the iteration cap or the deadline.
//!
//! ## Outcome
//!
//! | search ended with            | status                                          |
//! |------------------------------|-------------------------------------------------|
//! | proven minimal passing repair| `Repaired`                                      |
//! | interrupted, passing repair  | `Repaired` if suboptimal results are allowed, else `Timeout` |
//! | no passing repair, ≥1 check  | `Unrepairable`, with the closest failed attempt |
//! | nothing checked              | `Timeout`                                       |
//!
//! A repaired result above the configured cost ceiling becomes `Unrepairable`.

use crate::oracle::{Divergence, EquivalenceOracle, Verdict};
use crate::repair::Repair;
use crate::repair::apply::{describe, materialize};
use crate::repair::candidates::{CandidatePool, build_candidates};
use crate::repair::cost::exceeds_ceiling;
use crate::repair::solver::{Assignment, BranchAndBound, Problem, SolveOutcome, Solver};
use code_runner::{ExecutionResult, Invocation};
use program_model::ProgramModel;
use program_model::diff::align_models;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use util::execution_config::RepairOptions;

/// Creates the solver used for one round.
pub type SolverFactory = Arc<dyn Fn(&RepairOptions) -> Box<dyn Solver> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStatus {
    Repaired,
    Unrepairable,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub status: SynthesisStatus,
    pub repair: Repair,
    pub cost: Option<u32>,
    /// The repair is proven minimal.
    pub optimal: bool,
    /// Solver rounds performed.
    pub iterations: usize,
    /// Oracle checks performed, including the full script.
    pub evaluations: usize,
    pub detail: Option<String>,
    /// Divergence of the last failed check.
    pub divergence: Option<Divergence>,
}

/// Keeps the failed attempt with the fewest mismatches, then the lowest cost.
fn keep_closest(
    closest: &mut Option<(usize, Assignment)>,
    mismatches: usize,
    attempt: &Assignment,
) {
    let closer = closest
        .as_ref()
        .is_none_or(|(m, best)| (mismatches, attempt) < (*m, best));
    if closer {
        *closest = Some((mismatches, attempt.clone()));
    }
}

impl SynthesisOutcome {
    fn timeout(iterations: usize, evaluations: usize) -> Self {
        Self {
            status: SynthesisStatus::Timeout,
            repair: Repair::default(),
            cost: None,
            optimal: false,
            iterations,
            evaluations,
            detail: None,
            divergence: None,
        }
    }
}

/// Inputs of one synthesis run that stay fixed across rounds.
pub struct Target<'a> {
    pub submission: &'a ProgramModel,
    pub reference: &'a ProgramModel,
    pub invocations: &'a [Invocation],
    /// Reference outputs, one per invocation.
    pub expected: &'a [ExecutionResult],
}

#[derive(Clone)]
pub struct RepairSynthesizer {
    oracle: EquivalenceOracle,
    options: RepairOptions,
    verbose: bool,
    solver: SolverFactory,
}

impl RepairSynthesizer {
    pub fn new(oracle: EquivalenceOracle, options: RepairOptions) -> Self {
        Self {
            oracle,
            options,
            verbose: false,
            solver: Arc::new(|opts: &RepairOptions| {
                Box::new(BranchAndBound::new(opts.max_solver_nodes)) as Box<dyn Solver>
            }),
        }
    }

    /// Log every round at info level instead of debug.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_solver(mut self, factory: SolverFactory) -> Self {
        self.solver = factory;
        self
    }

    fn check(&self, target: &Target<'_>, pool: &CandidatePool, selected: &[usize]) -> Verdict {
        let candidate = materialize(target.submission, pool, selected);
        self.oracle
            .check(&candidate, target.invocations, target.expected)
    }

    fn log_round(&self, iteration: usize, assignment: &Assignment, passes: bool) {
        if self.verbose {
            info!(iteration, cost = assignment.cost, edits = ?assignment.selected, passes, "repair round");
        } else {
            debug!(iteration, cost = assignment.cost, edits = ?assignment.selected, passes, "repair round");
        }
    }

    /// Runs the solve / check / cut loop until it finishes or `deadline` passes.
    pub fn synthesize(&self, target: &Target<'_>, deadline: Instant) -> SynthesisOutcome {
        if Instant::now() >= deadline {
            return SynthesisOutcome::timeout(0, 0);
        }

        let alignment = align_models(target.submission, target.reference);
        let pool = build_candidates(&alignment);
        debug!(
            submission = %target.submission.name,
            reference = %target.reference.name,
            distance = alignment.cost,
            candidates = pool.len(),
            "synthesis started"
        );

        let mut problem = Problem::new(pool.costs());
        for &(a, b) in &pool.conflicts {
            problem.at_most_one(vec![a, b]);
        }
        // The submission as written already failed.
        problem.cut(&[]);

        let mut best: Option<Assignment> = None;
        let mut divergence: Option<Divergence> = None;
        let mut closest: Option<(usize, Assignment)> = None;
        let mut proven = false;
        let mut iterations = 0;

        let full = problem.assignment(pool.full_script.clone());
        let verdict = self.check(target, &pool, &full.selected);
        let mut evaluations = 1;
        self.log_round(0, &full, verdict.passes);
        if verdict.passes {
            best = Some(full);
        } else {
            keep_closest(&mut closest, verdict.mismatches, &full);
            divergence = verdict.divergence;
            problem.cut(&full.selected);
        }

        loop {
            if Instant::now() >= deadline {
                debug!(iterations, "synthesis deadline reached");
                break;
            }
            if iterations >= self.options.max_iterations {
                debug!(iterations, "synthesis iteration cap reached");
                break;
            }
            iterations += 1;

            let solver = (self.solver)(&self.options);
            match solver.solve(&problem, best.as_ref(), deadline) {
                Ok(SolveOutcome::Infeasible) => {
                    proven = true;
                    break;
                }
                Ok(SolveOutcome::Optimal(assignment)) => {
                    let verdict = self.check(target, &pool, &assignment.selected);
                    evaluations += 1;
                    self.log_round(iterations, &assignment, verdict.passes);
                    if verdict.passes {
                        best = Some(assignment);
                        proven = true;
                        break;
                    }
                    keep_closest(&mut closest, verdict.mismatches, &assignment);
                    divergence = verdict.divergence;
                    problem.cut(&assignment.selected);
                }
                Err(err) => {
                    warn!(error = %err, iterations, "solver interrupted");
                    break;
                }
            }
        }

        let outcome = match best {
            Some(assignment) if proven || self.options.allow_suboptimal => {
                let repair = describe(target.submission, &pool, &assignment.selected);
                SynthesisOutcome {
                    status: SynthesisStatus::Repaired,
                    cost: Some(repair.cost()),
                    repair,
                    optimal: proven,
                    iterations,
                    evaluations,
                    detail: None,
                    divergence: None,
                }
            }
            Some(_) => SynthesisOutcome::timeout(iterations, evaluations),
            None => {
                let repair = closest
                    .as_ref()
                    .map(|(_, attempt)| describe(target.submission, &pool, &attempt.selected))
                    .unwrap_or_default();
                SynthesisOutcome {
                    status: SynthesisStatus::Unrepairable,
                    cost: closest.as_ref().map(|_| repair.cost()),
                    repair,
                    optimal: false,
                    iterations,
                    evaluations,
                    detail: Some(match &divergence {
                        Some(d) => format!("No repair passes every test; {d}"),
                        None => "No repair passes every test".to_string(),
                    }),
                    divergence,
                }
            }
        };

        let over_ceiling = outcome.cost.filter(|&cost| {
            outcome.status == SynthesisStatus::Repaired
                && exceeds_ceiling(cost, self.options.max_cost)
        });
        match over_ceiling {
            Some(cost) => SynthesisOutcome {
                status: SynthesisStatus::Unrepairable,
                detail: Some(format!(
                    "Max cost exceeded ({cost} > {})",
                    self.options.max_cost
                )),
                ..outcome
            },
            None => outcome,
        }
    }
}
