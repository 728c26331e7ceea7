//!
//! # Feedback Trait
//!
//! This module defines the [`FeedbackRenderer`] trait and the [`FeedbackItem`] struct used to
//! implement pluggable feedback strategies.
//!
//! A renderer receives a finished [`Repair`] and produces one item per material edit, in the
//! order the edits appear in the submission. Rendering is pure: the same repair and options
//! always yield the same items.

use crate::repair::Repair;
use program_model::Location;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackItem {
    pub message: String,
    pub cost: u32,
    /// Share of the total repair cost carried by this edit, in `[0, 1]`.
    pub normalized_cost: f64,
    pub location: Location,
}

/// Options shared by all renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Edits cheaper than this are left out.
    pub materiality_threshold: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            materiality_threshold: 1,
        }
    }
}

/// A trait for pluggable feedback strategies.
///
/// # Arguments
/// - `repair`: the minimal passing repair for the submission.
/// - `options`: rendering options such as the materiality threshold.
///
/// # Returns
/// An ordered list of feedback items; empty when every edit is below the threshold.
pub trait FeedbackRenderer: Send + Sync {
    fn render(&self, repair: &Repair, options: &RenderOptions) -> Vec<FeedbackItem>;
}
