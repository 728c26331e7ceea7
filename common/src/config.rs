use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;

/// Process-wide settings read from the environment (optionally seeded from a `.env` file).
///
/// | variable                | default              |
/// |-------------------------|----------------------|
/// | `PROJECT_NAME`          | `clara-feedback`     |
/// | `LOG_LEVEL`             | `info`               |
/// | `LOG_FILE`              | unset (stdout only)  |
/// | `FEEDBACK_TIMEOUT_SECS` | unset                |
/// | `FEEDBACK_MAX_WORKERS`  | unset                |
/// | `FEEDBACK_MAX_STEPS`    | unset                |
///
/// The `FEEDBACK_*` values override the matching per-request options when present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: Option<String>,
    pub feedback_timeout_secs: Option<f64>,
    pub feedback_max_workers: Option<usize>,
    pub feedback_max_steps: Option<u64>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// Loads `env_path` into the environment (if it exists) and caches the result.
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();
        CONFIG.get_or_init(Self::from_env)
    }

    pub fn get() -> Option<&'static Self> {
        CONFIG.get()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparsable numbers are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Config {
            project_name: non_empty("PROJECT_NAME").unwrap_or_else(|| "clara-feedback".into()),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_file: non_empty("LOG_FILE"),
            feedback_timeout_secs: non_empty("FEEDBACK_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|v: &f64| v.is_finite() && *v >= 0.0),
            feedback_max_workers: non_empty("FEEDBACK_MAX_WORKERS")
                .and_then(|v| v.trim().parse().ok()),
            feedback_max_steps: non_empty("FEEDBACK_MAX_STEPS").and_then(|v| v.trim().parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.project_name, "clara-feedback");
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.log_file.is_none());
        assert!(cfg.feedback_timeout_secs.is_none());
    }

    #[test]
    fn numeric_overrides_are_parsed_and_bad_values_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FEEDBACK_TIMEOUT_SECS", "2.5"),
            ("FEEDBACK_MAX_WORKERS", "many"),
            ("FEEDBACK_MAX_STEPS", " 5000 "),
            ("LOG_FILE", ""),
        ]);
        let cfg = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.feedback_timeout_secs, Some(2.5));
        assert_eq!(cfg.feedback_max_workers, None);
        assert_eq!(cfg.feedback_max_steps, Some(5000));
        assert_eq!(cfg.log_file, None);
    }

    #[test]
    #[serial]
    fn reads_the_process_environment() {
        unsafe {
            env::set_var("LOG_LEVEL", "debug");
            env::set_var("FEEDBACK_MAX_WORKERS", "3");
        }
        let cfg = Config::from_env();
        unsafe {
            env::remove_var("LOG_LEVEL");
            env::remove_var("FEEDBACK_MAX_WORKERS");
        }
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.feedback_max_workers, Some(3));
    }
}
