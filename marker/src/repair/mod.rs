//! # Repair Synthesis
//!
//! Finds the cheapest set of edits that makes a submission behave like a chosen
//! reference.
//!
//! - [`candidates`]: turns a structural alignment into a pool of candidate edits and
//!   the conflicts between them.
//! - [`cost`]: cost constants and helpers.
//! - [`solver`]: the [`solver::Solver`] trait and its branch-and-bound implementation.
//! - [`apply`]: materializes a selection of candidates into a new program and describes
//!   it as [`EditOperation`]s.
//! - [`synthesizer`]: the solve / check / cut loop.

pub mod apply;
pub mod candidates;
pub mod cost;
pub mod solver;
pub mod synthesizer;

pub use synthesizer::{RepairSynthesizer, SynthesisOutcome, SynthesisStatus};

use program_model::{Location, NodePath};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
    Reorder,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EditKind::Insert => "insert",
            EditKind::Delete => "delete",
            EditKind::Replace => "replace",
            EditKind::Reorder => "reorder",
        };
        f.write_str(s)
    }
}

/// Where inserted or moved code goes, relative to the submission as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "at", content = "location", rename_all = "snake_case")]
pub enum Placement {
    /// Before the statement starting at this location.
    Before(Location),
    /// After the statement starting at this location (end of its block).
    After(Location),
    /// Inside an empty block opened at this location.
    Inside(Location),
    /// As a new top-level definition at the end of the program.
    EndOfProgram,
}

/// One edit of a repair, described against the submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOperation {
    pub kind: EditKind,
    /// Address in the submission tree. For inserts, the child slot the code goes into.
    pub path: NodePath,
    /// Submission text being removed, replaced or moved.
    pub original: Option<String>,
    /// New text (inserted code or replacement).
    pub fragment: Option<String>,
    /// Human-readable category of the touched code, e.g. "assignment".
    pub what: String,
    /// Enclosing function, if any.
    pub scope: Option<String>,
    pub placement: Option<Placement>,
    pub location: Location,
    pub cost: u32,
}

/// An ordered sequence of edits, top to bottom in the submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Repair {
    pub edits: Vec<EditOperation>,
}

impl Repair {
    pub fn new(mut edits: Vec<EditOperation>) -> Self {
        edits.sort_by(|a, b| a.location.cmp(&b.location).then_with(|| a.path.cmp(&b.path)));
        Self { edits }
    }

    pub fn cost(&self) -> u32 {
        self.edits.iter().map(|e| e.cost).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }
}
