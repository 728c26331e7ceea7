//! # Feedback Strategies Module
//!
//! Pluggable renderers that turn a [`crate::repair::Repair`] into learner-facing
//! [`FeedbackItem`](crate::traits::feedback::FeedbackItem)s. Each strategy implements the
//! [`FeedbackRenderer`](crate::traits::feedback::FeedbackRenderer) trait.
//!
//! ## Available Strategies
//!
//! - [`repair_feedback`]: full sentences with location, before/after text and cost share.
//! - [`simple_feedback`]: a short location hint per edit, without revealing the fix.

pub mod repair_feedback;
pub mod simple_feedback;

pub use repair_feedback::RepairFeedback;
pub use simple_feedback::SimpleFeedback;

use crate::repair::{EditOperation, Placement, Repair};
use crate::repair::cost::normalized;
use crate::traits::feedback::{FeedbackItem, RenderOptions};

/// Edits at or above the materiality threshold, paired with their share of the total.
pub(crate) fn material_edits<'a>(
    repair: &'a Repair,
    options: &RenderOptions,
) -> impl Iterator<Item = (&'a EditOperation, f64)> {
    let total = repair.cost();
    let threshold = options.materiality_threshold;
    repair
        .edits
        .iter()
        .filter(move |e| e.cost >= threshold)
        .map(move |e| (e, normalized(e.cost, total)))
}

pub(crate) fn item(edit: &EditOperation, share: f64, message: String) -> FeedbackItem {
    FeedbackItem {
        message,
        cost: edit.cost,
        normalized_cost: share,
        location: edit.location,
    }
}

pub(crate) fn describe_placement(placement: Placement) -> String {
    match placement {
        Placement::Before(l) => format!("before line {}", l.line),
        Placement::After(l) => format!("after line {}", l.line),
        Placement::Inside(l) => format!("inside the empty block at line {}", l.line),
        Placement::EndOfProgram => "at the end of the program".to_string(),
    }
}
