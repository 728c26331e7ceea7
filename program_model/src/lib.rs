//! # Program Model
//!
//! Language-independent representation of a learner program.
//!
//! - [`node`]: tree vertices, kinds, operators and literals.
//! - [`model`]: [`ProgramModel`], a named program tree with its entry function.
//! - [`path`]: [`NodePath`] addressing used by edits and feedback.
//! - [`diff`]: structural alignment and distance between two programs.
//! - [`parser`]: the [`ProgramParser`] trait implemented by language plugins.
//! - [`display`]: compact source printing for feedback text.

pub mod diff;
pub mod display;
pub mod error;
pub mod model;
pub mod node;
pub mod parser;
pub mod path;

pub use error::ModelError;
pub use model::ProgramModel;
pub use node::{Literal, Location, Node, NodeKind, NodeValue, Operator};
pub use parser::ProgramParser;
pub use path::NodePath;
