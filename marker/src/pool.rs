//! Reference Pool
//!
//! A read-only set of known-correct programs for one exercise, in load order. A pool is
//! built once (usually from a directory of source files), wrapped in an `Arc`, and then
//! shared by every request for that exercise.

use crate::error::MarkerError;
use code_runner::LanguageRegistry;
use program_model::ProgramModel;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use util::languages::Language;

/// One known-correct program.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    /// Identity reported back in results, usually the file name.
    pub identity: String,
    pub language: Language,
    pub model: Arc<ProgramModel>,
}

impl ReferenceEntry {
    pub fn new(identity: impl Into<String>, language: Language, model: ProgramModel) -> Self {
        Self {
            identity: identity.into(),
            language,
            model: Arc::new(model),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferencePool {
    entries: Vec<ReferenceEntry>,
}

impl ReferencePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ReferenceEntry) {
        self.entries.push(entry);
    }

    pub fn with(mut self, entry: ReferenceEntry) -> Self {
        self.push(entry);
        self
    }

    /// Parses `(identity, source)` pairs with the language's registered parser.
    pub fn from_sources<'a>(
        registry: &LanguageRegistry,
        language: Language,
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, MarkerError> {
        let plugin = registry.lookup(language)?;
        let mut pool = Self::new();
        for (name, source) in sources {
            let model = plugin
                .parser
                .parse_named(name, source)
                .map_err(|source| MarkerError::Pool {
                    name: name.to_string(),
                    source,
                })?;
            pool.push(ReferenceEntry::new(name, language, model));
        }
        Ok(pool)
    }

    /// Loads every file of `language` in `dir`, ordered by file name.
    ///
    /// Files with other extensions are skipped. A file that fails to parse makes the
    /// whole pool invalid.
    pub fn load_dir(
        dir: &Path,
        language: Language,
        registry: &LanguageRegistry,
    ) -> Result<Self, MarkerError> {
        let plugin = registry.lookup(language)?;
        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(|e| MarkerError::Io(format!("Failed to read pool directory {:?}: {e}", dir)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Language::from_path(p) == Some(language))
            .collect();
        paths.sort();

        let mut pool = Self::new();
        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let source = fs::read_to_string(&path)
                .map_err(|e| MarkerError::Io(format!("Failed to read {:?}: {e}", path)))?;
            let model = plugin
                .parser
                .parse_named(&name, &source)
                .map_err(|source| MarkerError::Pool {
                    name: name.clone(),
                    source,
                })?;
            debug!(program = %name, size = model.size(), "loaded reference");
            pool.push(ReferenceEntry::new(name, language, model));
        }
        info!(dir = %dir.display(), programs = pool.len(), "reference pool loaded");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter()
    }

    /// Entries written in `language`, in load order.
    pub fn for_language(&self, language: Language) -> Vec<&ReferenceEntry> {
        self.entries
            .iter()
            .filter(|e| e.language == language)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::default_registry;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn load_dir_sorts_and_filters_by_extension() {
        let dir = tempdir().unwrap();
        for (name, body) in [
            ("b.py", "def f(x):\n    return x\n"),
            ("a.py", "def f(x):\n    return x + 0\n"),
            ("notes.txt", "not a program"),
        ] {
            let mut file = File::create(dir.path().join(name)).unwrap();
            file.write_all(body.as_bytes()).unwrap();
        }

        let pool = ReferencePool::load_dir(dir.path(), Language::Python, &default_registry()).unwrap();
        let names: Vec<&str> = pool.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(names, vec!["a.py", "b.py"]);
        assert_eq!(pool.for_language(Language::Python).len(), 2);
        assert!(pool.for_language(Language::C).is_empty());
    }

    #[test]
    fn invalid_reference_is_reported_by_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.py"), "def f(:\n").unwrap();
        let err = ReferencePool::load_dir(dir.path(), Language::Python, &default_registry())
            .unwrap_err();
        assert!(matches!(err, MarkerError::Pool { ref name, .. } if name == "broken.py"));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let err = ReferencePool::load_dir(
            Path::new("/definitely/not/here"),
            Language::Python,
            &default_registry(),
        )
        .unwrap_err();
        assert!(matches!(err, MarkerError::Io(_)));
    }

    #[test]
    fn unsupported_language_fails_lookup() {
        let err = ReferencePool::from_sources(&default_registry(), Language::Rust, [("a.rs", "")])
            .unwrap_err();
        assert!(matches!(err, MarkerError::Runner(_)));
    }
}
