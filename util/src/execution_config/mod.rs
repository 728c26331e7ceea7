use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::languages::Language;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackScheme {
    /// Full sentences with before/after text and costs.
    Repair,
    /// One short location hint per edit.
    Simple,
}

/// Bounds applied to every single interpretation of a program.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionLimits {
    /// Maximum interpreter steps per invocation before a Timeout fault.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Wall-clock bound per invocation, in milliseconds.
    #[serde(default = "default_invocation_timeout_ms")]
    pub invocation_timeout_ms: u64,

    /// Maximum call depth before a RuntimeError fault.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Worker permits for parallel interpretation.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            invocation_timeout_ms: default_invocation_timeout_ms(),
            max_depth: default_max_depth(),
            max_workers: default_max_workers(),
        }
    }
}

impl ExecutionLimits {
    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }

    pub fn sanitize(mut self) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_workers = self.max_workers.clamp(1, cpus.max(1));
        self.max_steps = self.max_steps.max(1);
        self.max_depth = self.max_depth.max(1);
        self
    }
}

/// How two executions are judged equal.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ComparisonOptions {
    /// Ignore captured standard output.
    #[serde(default)]
    pub ignore_io: bool,

    /// Ignore the entry function's return value.
    #[serde(default)]
    pub ignore_return: bool,

    /// Trim and casefold strings before comparing.
    #[serde(default)]
    pub clean_strings: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectSetup {
    #[serde(default = "default_language")]
    pub language: Language,

    /// Entry function to invoke. Empty means the first function the program declares.
    #[serde(default)]
    pub entry_function: String,
}

impl Default for ProjectSetup {
    fn default() -> Self {
        Self {
            language: default_language(),
            entry_function: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepairOptions {
    /// Time budget for repair synthesis, in seconds. Fractions are allowed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Accept the best passing repair found when the budget runs out before it is proven minimal.
    #[serde(default = "default_allow_suboptimal")]
    pub allow_suboptimal: bool,

    /// Maximum solve/check rounds.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum branch-and-bound nodes per solve.
    #[serde(default = "default_max_solver_nodes")]
    pub max_solver_nodes: u64,

    /// Reject repairs above this cost. 0 means no limit.
    #[serde(default)]
    pub max_cost: u32,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allow_suboptimal: default_allow_suboptimal(),
            max_iterations: default_max_iterations(),
            max_solver_nodes: default_max_solver_nodes(),
            max_cost: 0,
        }
    }
}

impl RepairOptions {
    pub fn budget(&self) -> Duration {
        if self.timeout_secs.is_finite() && self.timeout_secs > 0.0 {
            Duration::from_secs_f64(self.timeout_secs)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedbackOptions {
    #[serde(default = "default_feedback_scheme")]
    pub feedback_scheme: FeedbackScheme,

    /// Edits cheaper than this are not rendered.
    #[serde(default = "default_materiality_threshold")]
    pub materiality_threshold: u32,

    /// Log every synthesis round at info level.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for FeedbackOptions {
    fn default() -> Self {
        Self {
            feedback_scheme: default_feedback_scheme(),
            materiality_threshold: default_materiality_threshold(),
            verbose: false,
        }
    }
}

/// Options of one analysis request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub execution: ExecutionLimits,

    #[serde(default)]
    pub comparison: ComparisonOptions,

    #[serde(default)]
    pub project: ProjectSetup,

    #[serde(default)]
    pub repair: RepairOptions,

    #[serde(default)]
    pub feedback: FeedbackOptions,
}

impl ExecutionConfig {
    pub fn sanitize(mut self) -> Self {
        self.execution = self.execution.sanitize();
        if !self.repair.timeout_secs.is_finite() || self.repair.timeout_secs < 0.0 {
            warn!(timeout_secs = self.repair.timeout_secs, "invalid repair timeout, using 0");
            self.repair.timeout_secs = 0.0;
        }
        self.repair.max_iterations = self.repair.max_iterations.max(1);
        self
    }

    pub fn default_config() -> Self {
        ExecutionConfig {
            execution: ExecutionLimits::default(),
            comparison: ComparisonOptions::default(),
            project: ProjectSetup::default(),
            repair: RepairOptions::default(),
            feedback: FeedbackOptions::default(),
        }
    }

    /// The configured entry function, if one was set.
    pub fn entry_function(&self) -> Option<&str> {
        Some(self.project.entry_function.as_str()).filter(|s| !s.is_empty())
    }

    pub fn with_entry_function(mut self, name: impl Into<String>) -> Self {
        self.project.entry_function = name.into();
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self, String> {
        let file_contents = fs::read_to_string(path)
            .map_err(|_| format!("Failed to read config file at {path:?}"))?;
        let cfg: ExecutionConfig = serde_json::from_str(&file_contents)
            .map_err(|e| format!("Invalid config JSON format: {e}"))?;
        Ok(cfg.sanitize())
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e:?}"))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config to JSON: {e}"))?;
        fs::write(path, json).map_err(|e| format!("Failed to write config file to disk: {e:?}"))
    }
}

//Default Functions

fn default_max_steps() -> u64 {
    100_000
}

fn default_invocation_timeout_ms() -> u64 {
    2_000
}

fn default_max_depth() -> usize {
    200
}

fn default_max_workers() -> usize {
    4
}

fn default_language() -> Language {
    Language::Python
}

fn default_timeout_secs() -> f64 {
    60.0
}

fn default_allow_suboptimal() -> bool {
    true
}

fn default_max_iterations() -> usize {
    500
}

fn default_max_solver_nodes() -> u64 {
    2_000_000
}

fn default_feedback_scheme() -> FeedbackScheme {
    FeedbackScheme::Repair
}

fn default_materiality_threshold() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: ExecutionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.execution.max_steps, 100_000);
        assert_eq!(cfg.project.language, Language::Python);
        assert!(cfg.repair.allow_suboptimal);
        assert_eq!(cfg.repair.max_cost, 0);
        assert_eq!(cfg.feedback.feedback_scheme, FeedbackScheme::Repair);
        assert!(cfg.entry_function().is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: ExecutionConfig = serde_json::from_str(
            r#"{"comparison": {"clean_strings": true}, "project": {"entry_function": "problemE"}}"#,
        )
        .unwrap();
        assert!(cfg.comparison.clean_strings);
        assert!(!cfg.comparison.ignore_io);
        assert_eq!(cfg.entry_function(), Some("problemE"));
        assert_eq!(cfg.repair.timeout_secs, 60.0);
    }

    #[test]
    fn sanitize_clamps_bad_values() {
        let mut cfg = ExecutionConfig::default_config();
        cfg.repair.timeout_secs = -3.0;
        cfg.execution.max_workers = 0;
        cfg.repair.max_iterations = 0;
        let cfg = cfg.sanitize();
        assert_eq!(cfg.repair.timeout_secs, 0.0);
        assert_eq!(cfg.repair.budget(), Duration::ZERO);
        assert!(cfg.execution.max_workers >= 1);
        assert_eq!(cfg.repair.max_iterations, 1);
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.json");
        let cfg = ExecutionConfig::default_config().with_entry_function("problemA");
        cfg.save(&path).unwrap();
        let loaded = ExecutionConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.entry_function(), Some("problemA"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ExecutionConfig::from_json_file(Path::new("/nonexistent/config.json"))
            .unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
