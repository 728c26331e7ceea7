//! Language plugin registry: one parser/interpreter pair per language tag.
//!
//! Resolve the plugin once per request; unknown tags fail fast with
//! [`RunnerError::UnsupportedLanguage`].

use crate::error::RunnerError;
use crate::interpreter::Interpreter;
use program_model::ProgramParser;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use util::languages::Language;

#[derive(Clone)]
pub struct LanguagePlugin {
    pub parser: Arc<dyn ProgramParser>,
    pub interpreter: Arc<dyn Interpreter>,
}

impl LanguagePlugin {
    pub fn new(parser: Arc<dyn ProgramParser>, interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            parser,
            interpreter,
        }
    }
}

#[derive(Clone, Default)]
pub struct LanguageRegistry {
    plugins: BTreeMap<Language, LanguagePlugin>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, returning the one it replaced.
    pub fn register(&mut self, language: Language, plugin: LanguagePlugin) -> Option<LanguagePlugin> {
        debug!(%language, "registering language plugin");
        self.plugins.insert(language, plugin)
    }

    pub fn with(mut self, language: Language, plugin: LanguagePlugin) -> Self {
        self.register(language, plugin);
        self
    }

    pub fn lookup(&self, language: Language) -> Result<&LanguagePlugin, RunnerError> {
        self.plugins
            .get(&language)
            .ok_or(RunnerError::UnsupportedLanguage(language))
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.plugins.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionFault, ExecutionResult, Invocation, RunLimits};
    use program_model::{ModelError, ProgramModel};

    struct NullParser;
    impl ProgramParser for NullParser {
        fn parse(&self, _source: &str) -> Result<ProgramModel, ModelError> {
            Ok(ProgramModel::empty("null"))
        }
    }

    struct NullInterpreter;
    impl Interpreter for NullInterpreter {
        fn execute(
            &self,
            _model: &ProgramModel,
            _entry: &str,
            _invocation: &Invocation,
            _limits: &RunLimits,
        ) -> Result<ExecutionResult, ExecutionFault> {
            Ok(ExecutionResult::default())
        }
    }

    #[test]
    fn lookup_unknown_language_fails_fast() {
        let registry = LanguageRegistry::new();
        assert_eq!(
            registry.lookup(Language::Java).err(),
            Some(RunnerError::UnsupportedLanguage(Language::Java))
        );
    }

    #[test]
    fn register_then_lookup() {
        let plugin = LanguagePlugin::new(Arc::new(NullParser), Arc::new(NullInterpreter));
        let mut registry = LanguageRegistry::new();
        assert!(registry.register(Language::Python, plugin.clone()).is_none());
        assert!(registry.register(Language::Python, plugin).is_some());
        assert!(registry.lookup(Language::Python).is_ok());
        assert_eq!(registry.languages().collect::<Vec<_>>(), vec![Language::Python]);
    }
}
