//! # Marker Library
//!
//! Automated repair feedback for programming exercises. Given a learner submission and a
//! pool of known-correct programs for the same exercise, the marker finds the smallest
//! set of edits that makes the submission behave like one of them and explains those
//! edits back to the learner.
//!
//! ## Key Concepts
//! - **FeedbackJob**: one analysis request for a single submission.
//! - **Reference Pool**: the known-correct programs, shared across requests ([`pool`]).
//! - **Equivalence Oracle**: runs programs on the request's invocations and compares
//!   behavior with a pluggable [`traits::comparator::OutputComparator`] ([`oracle`]).
//! - **Repair Synthesis**: structural alignment, candidate edits and a solve / check / cut
//!   loop that finds a minimal passing repair ([`repair`]).
//! - **Feedback**: pluggable renderers that turn a repair into learner-facing text
//!   ([`feedback`]).
//! - **Session Result**: the final status, cost and feedback ([`types`], [`report`]).

pub mod comparators;
pub mod error;
pub mod feedback;
pub mod oracle;
pub mod plugins;
pub mod pool;
pub mod repair;
pub mod report;
pub mod traits;
pub mod types;

use crate::comparators::{ExactComparator, NormalizedComparator};
use crate::error::MarkerError;
use crate::feedback::{RepairFeedback, SimpleFeedback};
use crate::oracle::{EquivalenceOracle, select_reference};
use crate::pool::ReferencePool;
use crate::repair::synthesizer::{SolverFactory, Target};
use crate::repair::{RepairSynthesizer, SynthesisStatus};
use crate::traits::comparator::OutputComparator;
use crate::traits::feedback::{FeedbackRenderer, RenderOptions};
use crate::types::SessionResult;

use code_runner::{Invocation, LanguageRegistry, RunLimits};
use program_model::diff::distance;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use util::execution_config::{ExecutionConfig, FeedbackScheme};
use util::languages::Language;

/// Extra time granted to the synthesis task beyond its own deadline before the caller
/// stops waiting for it.
const SYNTHESIS_GRACE: Duration = Duration::from_secs(2);

/// A learner program as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Identity used in logs and reports, usually the file name.
    pub name: String,
    pub source: String,
}

impl Submission {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Represents a feedback job for a single learner submission.
///
/// # Fields
/// - `submission`: the learner's source text.
/// - `pool`: known-correct programs for the exercise.
/// - `language`: selects the parser/interpreter plugin.
/// - `invocations`: the inputs behavior is compared on.
/// - `config`: limits, comparison, repair and feedback options.
/// - `comparator` / `renderer`: pluggable strategies, chosen from `config` by default.
/// - `solver`: optional replacement for the repair solver.
pub struct FeedbackJob {
    submission: Submission,
    pool: Arc<ReferencePool>,
    language: Language,
    invocations: Vec<Invocation>,
    config: ExecutionConfig,
    registry: Arc<LanguageRegistry>,
    comparator: Arc<dyn OutputComparator>,
    renderer: Box<dyn FeedbackRenderer>,
    solver: Option<SolverFactory>,
}

impl FeedbackJob {
    /// Create a new feedback job.
    ///
    /// The comparator is [`NormalizedComparator`] when `clean_strings` is set and
    /// [`ExactComparator`] otherwise; the renderer follows the configured feedback scheme.
    pub fn new(
        submission: Submission,
        pool: Arc<ReferencePool>,
        language: Language,
        invocations: Vec<Invocation>,
        config: ExecutionConfig,
    ) -> Self {
        let comparator: Arc<dyn OutputComparator> = if config.comparison.clean_strings {
            Arc::new(NormalizedComparator)
        } else {
            Arc::new(ExactComparator)
        };
        let renderer: Box<dyn FeedbackRenderer> = match config.feedback.feedback_scheme {
            FeedbackScheme::Repair => Box::new(RepairFeedback),
            FeedbackScheme::Simple => Box::new(SimpleFeedback),
        };
        Self {
            submission,
            pool,
            language,
            invocations,
            config,
            registry: Arc::new(plugins::default_registry()),
            comparator,
            renderer,
            solver: None,
        }
    }

    /// Use a custom set of language plugins.
    pub fn with_registry(mut self, registry: Arc<LanguageRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set a custom output comparator strategy for this job.
    pub fn with_comparator<C: OutputComparator + 'static>(mut self, comparator: C) -> Self {
        self.comparator = Arc::new(comparator);
        self
    }

    /// Set a custom feedback renderer for this job.
    pub fn with_renderer<R: FeedbackRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Use a custom solver for repair synthesis instead of the built-in branch and bound.
    pub fn with_solver(mut self, factory: SolverFactory) -> Self {
        self.solver = Some(factory);
        self
    }

    /// Run the analysis and produce a session result.
    ///
    /// # Returns
    /// * `Ok(SessionResult)` for every analysable request, whatever its status.
    /// * `Err(MarkerError)` when the submission does not parse or the language has no plugin.
    ///
    /// # Steps
    /// 1. Parses the submission with the language plugin.
    /// 2. Runs the submission and every reference on all invocations.
    /// 3. Resolves to `Correct` if any reference already agrees or is structurally identical.
    /// 4. Selects the reference with the lowest estimated repair cost.
    /// 5. Synthesizes a minimal repair within the time budget.
    /// 6. Renders feedback for the repair.
    pub async fn run(self) -> Result<SessionResult, MarkerError> {
        let started = Instant::now();
        let config = self.config.clone().sanitize();
        let plugin = self.registry.lookup(self.language)?;
        let submission = Arc::new(
            plugin
                .parser
                .parse_named(&self.submission.name, &self.submission.source)?,
        );
        info!(
            submission = %submission.name,
            language = %self.language,
            invocations = self.invocations.len(),
            "feedback request started"
        );

        let references = self.pool.for_language(self.language);
        if references.is_empty() {
            return Ok(SessionResult::error(
                format!("No reference programs available for {}", self.language),
                started.elapsed(),
            ));
        }

        let Some(entry) = submission
            .resolve_entry(config.entry_function())
            .map(str::to_string)
        else {
            return Ok(SessionResult::error(
                "No entry function: the submission defines no function and none is configured",
                started.elapsed(),
            ));
        };

        let invocations = if self.invocations.is_empty() {
            vec![Invocation::default()]
        } else {
            self.invocations.clone()
        };

        let oracle = EquivalenceOracle::new(
            Arc::clone(&plugin.interpreter),
            Arc::clone(&self.comparator),
            config.comparison.clone(),
            RunLimits::from(&config.execution),
            entry,
        );

        let evaluation = match oracle
            .evaluate_pool(
                &submission,
                &references,
                &invocations,
                config.execution.max_workers,
            )
            .await
        {
            Ok(evaluation) => evaluation,
            Err(err) => {
                let err = MarkerError::Internal(err.to_string());
                error!(error = %err, "evaluation failed");
                return Ok(SessionResult::error(err.to_string(), started.elapsed()));
            }
        };

        if let Some(passing) = evaluation.passing() {
            let identity = references
                .get(passing.index)
                .map(|r| r.identity.clone())
                .unwrap_or_default();
            info!(reference = %identity, "submission already correct");
            return Ok(SessionResult::correct(identity, started.elapsed()));
        }

        // Identical logic is correct even where both sides fault.
        if let Some(twin) = references
            .iter()
            .find(|r| distance(&submission, &r.model) == 0)
        {
            info!(reference = %twin.identity, "submission matches a reference structurally");
            return Ok(SessionResult::correct(
                twin.identity.clone(),
                started.elapsed(),
            ));
        }

        let Some(selection) = select_reference(&submission, &references, &evaluation) else {
            return Ok(SessionResult::error(
                "No reference could be selected",
                started.elapsed(),
            ));
        };
        let (Some(reference), Some(outcome)) = (
            references.get(selection.index),
            evaluation.references.get(selection.index),
        ) else {
            return Ok(SessionResult::error(
                MarkerError::Internal("selected reference is out of range".to_string()).to_string(),
                started.elapsed(),
            ));
        };
        let identity = reference.identity.clone();
        info!(
            reference = %identity,
            distance = selection.distance,
            estimated = selection.estimated,
            mismatches = outcome.verdict.mismatches,
            "reference selected"
        );

        let budget = config.repair.budget();
        let deadline = Instant::now() + budget;
        let mut synthesizer =
            RepairSynthesizer::new(oracle, config.repair.clone()).verbose(config.feedback.verbose);
        if let Some(factory) = &self.solver {
            synthesizer = synthesizer.with_solver(Arc::clone(factory));
        }
        let sub_model = Arc::clone(&submission);
        let ref_model = Arc::clone(&reference.model);
        let expected = outcome.expected.clone();
        let task = tokio::task::spawn_blocking(move || {
            let target = Target {
                submission: &sub_model,
                reference: &ref_model,
                invocations: &invocations,
                expected: &expected,
            };
            synthesizer.synthesize(&target, deadline)
        });

        let outcome = match tokio::time::timeout(budget + SYNTHESIS_GRACE, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join)) => {
                let err = MarkerError::Internal(format!("synthesis task failed: {join}"));
                error!(error = %err, "synthesis aborted");
                return Ok(SessionResult::error(err.to_string(), started.elapsed()));
            }
            Err(_) => {
                warn!(reference = %identity, "synthesis did not return within its budget");
                return Ok(SessionResult::timeout(Some(identity), budget, started.elapsed()));
            }
        };

        let options = RenderOptions {
            materiality_threshold: config.feedback.materiality_threshold,
        };
        let result = match outcome.status {
            SynthesisStatus::Repaired => {
                let items = self.renderer.render(&outcome.repair, &options);
                SessionResult::repaired(
                    outcome.repair.cost(),
                    items,
                    identity,
                    started.elapsed(),
                )
            }
            SynthesisStatus::Unrepairable => {
                // A divergence marks a closest failed attempt; a repair over the cost
                // ceiling carries none and stays undisclosed.
                let items = if outcome.divergence.is_some() {
                    self.renderer.render(&outcome.repair, &options)
                } else {
                    Vec::new()
                };
                SessionResult::unrepairable(
                    outcome.detail.clone().unwrap_or_default(),
                    outcome.cost,
                    items,
                    Some(identity),
                    started.elapsed(),
                )
            }
            SynthesisStatus::Timeout => {
                SessionResult::timeout(Some(identity), budget, started.elapsed())
            }
        };
        info!(
            status = %result.status,
            cost = ?result.cost,
            iterations = outcome.iterations,
            evaluations = outcome.evaluations,
            optimal = outcome.optimal,
            "feedback request finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ReferenceEntry;
    use crate::types::SessionStatus;
    use program_model::ProgramParser;
    use python_lang::PythonParser;

    fn pool(sources: &[(&str, &str)]) -> Arc<ReferencePool> {
        let mut pool = ReferencePool::new();
        for (name, src) in sources {
            let model = PythonParser.parse_named(name, src).unwrap();
            pool.push(ReferenceEntry::new(*name, Language::Python, model));
        }
        Arc::new(pool)
    }

    fn ints(xs: &[i64]) -> Vec<Invocation> {
        xs.iter()
            .map(|x| Invocation::new(vec![code_runner::Value::Int(*x)]))
            .collect()
    }

    #[tokio::test]
    async fn syntax_errors_abort_the_request() {
        let job = FeedbackJob::new(
            Submission::new("bad.py", "def f(x)\n    return x\n"),
            pool(&[("ok.py", "def f(x):\n    return x\n")]),
            Language::Python,
            ints(&[1]),
            ExecutionConfig::default_config(),
        );
        assert!(matches!(job.run().await, Err(MarkerError::Parse(_))));
    }

    #[tokio::test]
    async fn unsupported_language_aborts_the_request() {
        let job = FeedbackJob::new(
            Submission::new("a.java", "class A {}"),
            pool(&[]),
            Language::Java,
            Vec::new(),
            ExecutionConfig::default_config(),
        );
        assert!(matches!(job.run().await, Err(MarkerError::Runner(_))));
    }

    #[tokio::test]
    async fn simple_scheme_is_selected_from_config() {
        let mut config = ExecutionConfig::default_config();
        config.feedback.feedback_scheme = FeedbackScheme::Simple;
        let result = FeedbackJob::new(
            Submission::new("a.py", "def f(x):\n    return x > 3\n"),
            pool(&[("r.py", "def f(x):\n    return x >= 3\n")]),
            Language::Python,
            ints(&[1, 3, 5]),
            config,
        )
        .run()
        .await
        .unwrap();
        assert_eq!(result.status, SessionStatus::Repaired);
        assert_eq!(result.feedback[0].message, "Line 2: check `x > 3`.");
    }

    #[tokio::test]
    async fn identical_programs_are_correct_even_when_they_fault() {
        let source = "def f(x):\n    return 10 // x\n";
        let result = FeedbackJob::new(
            Submission::new("a.py", source),
            pool(&[("r.py", source)]),
            Language::Python,
            ints(&[0, 2]),
            ExecutionConfig::default_config(),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(result.status, SessionStatus::Correct);
        assert_eq!(result.cost, Some(0));
        assert_eq!(result.reference.as_deref(), Some("r.py"));
    }

    #[tokio::test]
    async fn unrepairable_result_describes_the_closest_attempt() {
        let result = FeedbackJob::new(
            Submission::new("a.py", "def f(x):\n    return x - 1\n"),
            pool(&[("r.py", "def f(x):\n    return 10 // x + 1\n")]),
            Language::Python,
            ints(&[0, 1, 2, 5]),
            ExecutionConfig::default_config(),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(result.status, SessionStatus::Unrepairable);
        assert!(!result.feedback.is_empty());
        assert_eq!(
            result.cost,
            Some(result.feedback.iter().map(|i| i.cost).sum::<u32>())
        );
        assert!(
            result
                .error
                .unwrap()
                .starts_with("No repair passes every test; on input (0)")
        );
    }

    #[tokio::test]
    async fn missing_entry_function_is_an_error_status() {
        let result = FeedbackJob::new(
            Submission::new("a.py", "x = 1\n"),
            pool(&[("r.py", "def f(x):\n    return x\n")]),
            Language::Python,
            ints(&[1]),
            ExecutionConfig::default_config(),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(result.status, SessionStatus::Error);
        assert!(result.error.unwrap().starts_with("No entry function"));
    }
}
