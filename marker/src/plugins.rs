//! Built-in language plugins.

use code_runner::LanguageRegistry;
use util::languages::Language;

/// A registry with every language this crate ships a plugin for.
pub fn default_registry() -> LanguageRegistry {
    LanguageRegistry::new().with(Language::Python, python_lang::plugin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_is_registered() {
        let registry = default_registry();
        assert!(registry.lookup(Language::Python).is_ok());
        assert!(registry.lookup(Language::Java).is_err());
        assert_eq!(registry.languages().collect::<Vec<_>>(), vec![Language::Python]);
    }
}
