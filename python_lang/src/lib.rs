//! # Python Language Plugin
//!
//! Parser and interpreter for the Python subset used in introductory exercises.
//!
//! - [`lexer`]: indentation-aware tokenizer.
//! - [`parser`]: [`PythonParser`], source text to a normalized program model.
//! - [`interpreter`]: [`PythonInterpreter`], bounded tree-walking execution.
//! - [`builtins`] / [`ops`]: Python semantics for builtins, methods and operators.
//! - [`literal`]: literal syntax for invocation arguments and input.

pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod literal;
pub mod ops;
pub mod parser;

pub use interpreter::PythonInterpreter;
pub use literal::{parse_invocations, parse_literal};
pub use parser::PythonParser;

use code_runner::LanguagePlugin;
use std::sync::Arc;

/// The parser/interpreter pair registered for the `python` language tag.
pub fn plugin() -> LanguagePlugin {
    LanguagePlugin::new(Arc::new(PythonParser), Arc::new(PythonInterpreter))
}
