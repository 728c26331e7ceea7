use code_runner::{Invocation, Value};
use marker::plugins::default_registry;
use marker::pool::{ReferenceEntry, ReferencePool};
use marker::repair::solver::{Assignment, Problem, SolveOutcome, Solver, SolverError};
use marker::repair::synthesizer::SolverFactory;
use marker::traits::feedback::FeedbackItem;
use marker::types::{SessionResult, SessionStatus};
use marker::{FeedbackJob, Submission};
use program_model::ProgramParser;
use python_lang::PythonParser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use util::execution_config::{ExecutionConfig, FeedbackScheme, RepairOptions};
use util::languages::Language;

fn fixture(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src/test_files")
        .join(rel)
}

fn submission(file: &str) -> Submission {
    let path = fixture("submissions").join(file);
    Submission::new(file, fs::read_to_string(path).unwrap())
}

fn problem_e_pool() -> Arc<ReferencePool> {
    let pool = ReferencePool::load_dir(
        &fixture("clusters/problemE"),
        Language::Python,
        &default_registry(),
    )
    .unwrap();
    Arc::new(pool)
}

/// `(health, score, level)` tuples passed as one list argument.
fn games(rows: &[(i64, i64, i64)]) -> Vec<Invocation> {
    rows.iter()
        .map(|&(h, s, l)| {
            Invocation::new(vec![Value::List(vec![
                Value::Int(h),
                Value::Int(s),
                Value::Int(l),
            ])])
        })
        .collect()
}

fn problem_e_inputs() -> Vec<Invocation> {
    games(&[
        (1, 1000, 1),
        (0, 1000, 1),
        (1, 6999, 3),
        (0, 8993, 5),
        (1, 8993, 5),
    ])
}

fn config(timeout_secs: f64) -> ExecutionConfig {
    let mut config = ExecutionConfig::default_config();
    config.repair.timeout_secs = timeout_secs;
    config
}

async fn run(sub: Submission, pool: Arc<ReferencePool>, config: ExecutionConfig) -> SessionResult {
    FeedbackJob::new(sub, pool, Language::Python, problem_e_inputs(), config)
        .run()
        .await
        .unwrap()
}

/// A solver that sleeps for `pause`, or until the deadline when `pause` is `None`.
struct Sleepy {
    pause: Option<Duration>,
}

impl Solver for Sleepy {
    fn solve(
        &self,
        _problem: &Problem,
        _bound: Option<&Assignment>,
        deadline: Instant,
    ) -> Result<SolveOutcome, SolverError> {
        let pause = self
            .pause
            .unwrap_or_else(|| deadline.saturating_duration_since(Instant::now()));
        std::thread::sleep(pause);
        Err(SolverError::Deadline(0))
    }
}

fn sleepy(pause: Option<Duration>) -> SolverFactory {
    Arc::new(move |_: &RepairOptions| Box::new(Sleepy { pause }) as Box<dyn Solver>)
}

fn assert_timed_out(result: &SessionResult) {
    assert_eq!(result.status, SessionStatus::Timeout);
    assert!(result.cost.is_none());
    assert!(result.feedback.is_empty());
    assert!(result.error.as_deref().unwrap().contains("budget"));
}

fn messages(items: &[FeedbackItem]) -> Vec<&str> {
    items.iter().map(|i| i.message.as_str()).collect()
}

#[tokio::test]
async fn equivalent_formulations_are_judged_equal() {
    let pool = problem_e_pool();
    assert_eq!(pool.len(), 2);

    let c1 = fs::read_to_string(fixture("clusters/problemE/c1.py")).unwrap();
    let c3 = fs::read_to_string(fixture("clusters/problemE/c3.py")).unwrap();
    let only_c1 = Arc::new(
        ReferencePool::from_sources(&default_registry(), Language::Python, [("c1.py", c1.as_str())])
            .unwrap(),
    );

    let result = run(Submission::new("c3.py", c3), only_c1, config(10.0)).await;
    assert_eq!(result.status, SessionStatus::Correct);
    assert_eq!(result.cost, Some(0));
    assert!(result.feedback.is_empty());
    assert_eq!(result.reference.as_deref(), Some("c1.py"));
}

#[tokio::test]
async fn reformatted_copy_of_the_reference_is_correct() {
    let result = run(submission("reformatted.py"), problem_e_pool(), config(10.0)).await;
    assert_eq!(result.status, SessionStatus::Correct);
    assert_eq!(result.cost, Some(0));
}

#[tokio::test]
async fn missing_disjunct_is_repaired() {
    let result = run(
        submission("missing_disjunct.py"),
        problem_e_pool(),
        config(30.0),
    )
    .await;

    assert_eq!(result.status, SessionStatus::Repaired);
    assert_eq!(result.reference.as_deref(), Some("c1.py"));
    let cost = result.cost.unwrap();
    assert!(cost > 0);
    assert_eq!(cost, result.feedback.iter().map(|i| i.cost).sum::<u32>());

    let cited = result
        .feedback
        .iter()
        .find(|i| i.message.contains("score >= 7000"))
        .expect("feedback names the missing condition");
    assert!(cited.message.starts_with("Add the assignment"));
    // Between the last existing condition (line 8) and its use (line 10).
    assert!((8..=10).contains(&cited.location.line));
    assert!(result.feedback.iter().all(|i| i.normalized_cost > 0.0));
}

#[tokio::test]
async fn feedback_is_deterministic() {
    let first = run(
        submission("missing_disjunct.py"),
        problem_e_pool(),
        config(30.0),
    )
    .await;
    let second = run(
        submission("missing_disjunct.py"),
        problem_e_pool(),
        config(30.0),
    )
    .await;
    assert_eq!(first.cost, second.cost);
    assert_eq!(messages(&first.feedback), messages(&second.feedback));
}

#[tokio::test]
async fn simple_scheme_gives_location_hints() {
    let mut config = config(30.0);
    config.feedback.feedback_scheme = FeedbackScheme::Simple;
    let result = run(submission("missing_disjunct.py"), problem_e_pool(), config).await;
    assert_eq!(result.status, SessionStatus::Repaired);
    assert!(
        result
            .feedback
            .iter()
            .any(|i| i.message.starts_with("Something is missing"))
    );
    assert!(result.feedback.iter().all(|i| !i.message.contains("7000")));
}

#[tokio::test]
async fn no_references_for_the_language_is_an_error() {
    let model = PythonParser
        .parse_named("Other.java", "def problemE(game):\n    return True\n")
        .unwrap();
    let pool = Arc::new(ReferencePool::new().with(ReferenceEntry::new(
        "Other.java",
        Language::Java,
        model,
    )));

    let result = run(submission("missing_disjunct.py"), pool, config(30.0)).await;
    assert_eq!(result.status, SessionStatus::Error);
    assert!(result.cost.is_none());
    assert!(result.feedback.is_empty());
    assert_eq!(
        result.error.as_deref(),
        Some("No reference programs available for python")
    );
}

#[tokio::test]
async fn exhausted_budget_times_out() {
    let result = run(submission("missing_disjunct.py"), problem_e_pool(), config(0.0)).await;
    assert_timed_out(&result);
}

#[tokio::test]
async fn budget_running_out_during_the_search_times_out() {
    let mut config = config(0.3);
    config.repair.allow_suboptimal = false;
    let result = FeedbackJob::new(
        submission("missing_disjunct.py"),
        problem_e_pool(),
        Language::Python,
        problem_e_inputs(),
        config,
    )
    .with_solver(sleepy(None))
    .run()
    .await
    .unwrap();
    assert_timed_out(&result);
    assert_eq!(result.error.as_deref(), Some("repair budget of 0.3s exhausted"));
}

#[tokio::test]
async fn overrunning_synthesis_is_abandoned() {
    let started = Instant::now();
    let result = FeedbackJob::new(
        submission("missing_disjunct.py"),
        problem_e_pool(),
        Language::Python,
        problem_e_inputs(),
        config(0.5),
    )
    .with_solver(sleepy(Some(Duration::from_secs(4))))
    .run()
    .await
    .unwrap();
    assert_timed_out(&result);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn cost_ceiling_makes_the_submission_unrepairable() {
    let mut config = config(30.0);
    config.repair.max_cost = 1;
    let result = run(submission("missing_disjunct.py"), problem_e_pool(), config).await;
    assert_eq!(result.status, SessionStatus::Unrepairable);
    assert!(result.cost.unwrap() > 1);
    assert!(result.error.unwrap().starts_with("Max cost exceeded"));
}
