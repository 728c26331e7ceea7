//! # RepairFeedback Strategy
//!
//! Full-sentence feedback: every material edit of the repair is described with its
//! location, the code as written, the code it should become, and its cost together with
//! its share of the whole repair.
//!
//! Example for a missing condition:
//!
//! ```text
//! Add the assignment `cond3 = score >= 7000` before line 11 in function `problemE` (cost 6, 55% of the repair).
//! ```

use crate::feedback::{describe_placement, item, material_edits};
use crate::repair::{EditKind, EditOperation, Repair};
use crate::traits::feedback::{FeedbackItem, FeedbackRenderer, RenderOptions};

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairFeedback;

fn scope_suffix(edit: &EditOperation) -> String {
    match &edit.scope {
        Some(name) => format!(" in function `{name}`"),
        None => String::new(),
    }
}

fn sentence(edit: &EditOperation, share: f64) -> String {
    let original = edit.original.as_deref().unwrap_or_default();
    let fragment = edit.fragment.as_deref().unwrap_or_default();
    let place = edit.placement.map(describe_placement).unwrap_or_default();
    let line = edit.location.line;
    let body = match edit.kind {
        EditKind::Insert => format!("Add the {} `{fragment}` {place}", edit.what),
        EditKind::Delete => format!("Remove the {} `{original}` at line {line}", edit.what),
        EditKind::Replace => format!(
            "Change `{original}` to `{fragment}` at line {line}, column {}",
            edit.location.column
        ),
        EditKind::Reorder => format!("Move the {} `{original}` from line {line} {place}", edit.what),
    };
    format!(
        "{body}{} (cost {}, {:.0}% of the repair).",
        scope_suffix(edit),
        edit.cost,
        share * 100.0
    )
}

impl FeedbackRenderer for RepairFeedback {
    fn render(&self, repair: &Repair, options: &RenderOptions) -> Vec<FeedbackItem> {
        material_edits(repair, options)
            .map(|(edit, share)| item(edit, share, sentence(edit, share)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::Placement;
    use program_model::{Location, NodePath};

    fn edit(kind: EditKind, cost: u32, line: u32) -> EditOperation {
        EditOperation {
            kind,
            path: NodePath(vec![1, 1, 0]),
            original: Some("cond1 or cond2".to_string()),
            fragment: Some("cond1 or cond2 or cond3".to_string()),
            what: "expression".to_string(),
            scope: Some("problemE".to_string()),
            placement: Some(Placement::Before(Location::new(line, 5))),
            location: Location::new(line, 17),
            cost,
        }
    }

    #[test]
    fn replace_sentence_cites_both_texts() {
        let repair = Repair::new(vec![edit(EditKind::Replace, 5, 11)]);
        let items = RepairFeedback.render(&repair, &RenderOptions::default());
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].message,
            "Change `cond1 or cond2` to `cond1 or cond2 or cond3` at line 11, column 17 in function `problemE` (cost 5, 100% of the repair)."
        );
        assert_eq!(items[0].normalized_cost, 1.0);
    }

    #[test]
    fn insert_sentence_uses_placement() {
        let mut e = edit(EditKind::Insert, 6, 11);
        e.what = "assignment".to_string();
        e.fragment = Some("cond3 = score >= 7000".to_string());
        let repair = Repair::new(vec![e, edit(EditKind::Replace, 5, 12)]);
        let items = RepairFeedback.render(&repair, &RenderOptions::default());
        assert_eq!(
            items[0].message,
            "Add the assignment `cond3 = score >= 7000` before line 11 in function `problemE` (cost 6, 55% of the repair)."
        );
        assert_eq!(items[0].normalized_cost, 0.55);
        assert_eq!(items[1].normalized_cost, 0.45);
    }

    #[test]
    fn threshold_suppresses_cheap_edits() {
        let repair = Repair::new(vec![edit(EditKind::Replace, 1, 3), edit(EditKind::Delete, 4, 5)]);
        let options = RenderOptions {
            materiality_threshold: 2,
        };
        let items = RepairFeedback.render(&repair, &options);
        assert_eq!(items.len(), 1);
        assert!(items[0].message.starts_with("Remove the expression `cond1 or cond2` at line 5"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let repair = Repair::new(vec![edit(EditKind::Replace, 2, 9), edit(EditKind::Reorder, 2, 4)]);
        let a = RepairFeedback.render(&repair, &RenderOptions::default());
        let b = RepairFeedback.render(&repair, &RenderOptions::default());
        assert_eq!(a, b);
        assert_eq!(a[0].location.line, 4);
    }
}
