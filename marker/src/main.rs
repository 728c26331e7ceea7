use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use common::config::Config;
use common::logger::init_logger;
use marker::plugins::default_registry;
use marker::pool::ReferencePool;
use marker::report::{FeedbackReport, FeedbackReportResponse};
use marker::types::{SessionResult, SessionStatus};
use marker::{FeedbackJob, Submission};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use util::execution_config::{ExecutionConfig, FeedbackScheme};
use util::languages::Language;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemeArg {
    Repair,
    Simple,
}

impl From<SchemeArg> for FeedbackScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Repair => FeedbackScheme::Repair,
            SchemeArg::Simple => FeedbackScheme::Simple,
        }
    }
}

/// Generate repair-based feedback for a submission against a pool of correct programs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The learner program to analyse
    submission: PathBuf,
    /// Directory holding the correct reference programs
    #[arg(long, short = 'c')]
    cluster: PathBuf,
    /// Entry function (defaults to the first function in the submission)
    #[arg(long)]
    entry: Option<String>,
    /// Argument lists, one per invocation, e.g. "[[1, 2], [3, 4]]"
    #[arg(long, default_value = "")]
    args: String,
    /// Standard input lines, one list per invocation, e.g. "[['3'], ['5']]"
    #[arg(long, default_value = "")]
    inputs: String,
    /// Execution config JSON
    #[arg(long)]
    config: Option<PathBuf>,
    /// Repair time budget in seconds
    #[arg(long)]
    timeout: Option<f64>,
    /// Reject repairs above this cost
    #[arg(long)]
    max_cost: Option<u32>,
    /// Trim and casefold strings before comparing
    #[arg(long)]
    clean_strings: bool,
    /// Ignore printed output
    #[arg(long)]
    ignore_io: bool,
    /// Ignore return values
    #[arg(long)]
    ignore_return: bool,
    /// Only accept repairs proven minimal
    #[arg(long)]
    no_suboptimal: bool,
    /// Feedback style
    #[arg(long, value_enum)]
    scheme: Option<SchemeArg>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
    /// Log every repair round
    #[arg(long, short = 'v')]
    verbose: bool,
    /// Write the effective config as JSON to this path, for reuse with --config
    #[arg(long)]
    save_config: Option<PathBuf>,
    /// Environment file with logging and limit overrides
    #[arg(long, default_value = ".env")]
    env_file: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env = Config::init(&args.env_file);
    let level = if args.verbose { "debug" } else { env.log_level.as_str() };
    if let Err(err) = init_logger(level, env.log_file.as_deref()) {
        eprintln!("logging disabled: {err}");
    }

    let language = Language::from_path(&args.submission)
        .with_context(|| format!("Unrecognised file extension: {:?}", args.submission))?;
    let source = fs::read_to_string(&args.submission)
        .with_context(|| format!("Failed to read {:?}", args.submission))?;
    let config = build_config(&args, env)?;
    if let Some(path) = &args.save_config {
        config.save(path).map_err(anyhow::Error::msg)?;
        eprintln!("Saved config to {}", path.display());
    }

    let registry = Arc::new(default_registry());
    let pool = ReferencePool::load_dir(&args.cluster, language, &registry)?;
    let invocations = python_lang::parse_invocations(&args.args, &args.inputs)
        .context("Invalid --args/--inputs literal")?;

    let name = file_name(&args.submission);
    let result = FeedbackJob::new(
        Submission::new(name.clone(), source),
        Arc::new(pool),
        language,
        invocations,
        config,
    )
    .with_registry(registry)
    .run()
    .await?;

    let code = exit_code(result.status);
    if args.json {
        let response: FeedbackReportResponse = FeedbackReport::new(name, language, result).into();
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_result(&result);
    }
    Ok(code)
}

/// Layers the config file, environment overrides and flags, in that order.
fn build_config(args: &Args, env: &Config) -> Result<ExecutionConfig> {
    let mut config = match &args.config {
        Some(path) => ExecutionConfig::from_json_file(path).map_err(anyhow::Error::msg)?,
        None => ExecutionConfig::default_config(),
    };

    if let Some(secs) = env.feedback_timeout_secs {
        config.repair.timeout_secs = secs;
    }
    if let Some(workers) = env.feedback_max_workers {
        config.execution.max_workers = workers;
    }
    if let Some(steps) = env.feedback_max_steps {
        config.execution.max_steps = steps;
    }

    if let Some(entry) = &args.entry {
        config = config.with_entry_function(entry.clone());
    }
    if let Some(secs) = args.timeout {
        if !secs.is_finite() || secs < 0.0 {
            bail!("--timeout must be a non-negative number of seconds");
        }
        config.repair.timeout_secs = secs;
    }
    if let Some(max) = args.max_cost {
        config.repair.max_cost = max;
    }
    if let Some(scheme) = args.scheme {
        config.feedback.feedback_scheme = scheme.into();
    }
    config.comparison.clean_strings |= args.clean_strings;
    config.comparison.ignore_io |= args.ignore_io;
    config.comparison.ignore_return |= args.ignore_return;
    if args.no_suboptimal {
        config.repair.allow_suboptimal = false;
    }
    config.feedback.verbose |= args.verbose;
    Ok(config.sanitize())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn print_result(result: &SessionResult) {
    println!("{}", result.status_line());
    if let Some(reference) = &result.reference {
        println!("Compared against: {reference}");
    }
    for item in &result.feedback {
        println!("  * {}", item.message);
    }
}

fn exit_code(status: SessionStatus) -> ExitCode {
    match status {
        SessionStatus::Correct | SessionStatus::Repaired => ExitCode::SUCCESS,
        SessionStatus::Unrepairable => ExitCode::from(1),
        SessionStatus::Error => ExitCode::from(2),
        SessionStatus::Timeout => ExitCode::from(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["feedback", "attempt.py", "--cluster", "refs"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_override_the_environment() {
        let env = Config::from_lookup(|k| match k {
            "FEEDBACK_TIMEOUT_SECS" => Some("5".to_string()),
            "FEEDBACK_MAX_STEPS" => Some("1234".to_string()),
            _ => None,
        });
        let config = build_config(
            &args(&["--timeout", "1.5", "--max-cost", "9", "--scheme", "simple", "--no-suboptimal"]),
            &env,
        )
        .unwrap();
        assert_eq!(config.repair.timeout_secs, 1.5);
        assert_eq!(config.repair.max_cost, 9);
        assert!(!config.repair.allow_suboptimal);
        assert_eq!(config.execution.max_steps, 1234);
        assert_eq!(config.feedback.feedback_scheme, FeedbackScheme::Simple);
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let env = Config::from_lookup(|_| None);
        assert!(build_config(&args(&["--timeout=-1"]), &env).is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effective.json");
        let env = Config::from_lookup(|_| None);
        let config = build_config(&args(&["--entry", "problemE", "--clean-strings"]), &env).unwrap();
        config.save(&path).unwrap();

        let mut saved = args(&["--config", path.to_str().unwrap()]);
        saved.clean_strings = false;
        let loaded = build_config(&saved, &env).unwrap();
        assert_eq!(loaded.entry_function(), Some("problemE"));
        assert!(loaded.comparison.clean_strings);
    }
}
