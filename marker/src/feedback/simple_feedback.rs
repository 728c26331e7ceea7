//! # SimpleFeedback Strategy
//!
//! Short hints that point at the place of each material edit without giving the fix
//! away. Useful when learners should find the correction themselves.

use crate::feedback::{describe_placement, item, material_edits};
use crate::repair::{EditKind, EditOperation, Repair};
use crate::traits::feedback::{FeedbackItem, FeedbackRenderer, RenderOptions};

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFeedback;

fn hint(edit: &EditOperation) -> String {
    let line = edit.location.line;
    match edit.kind {
        EditKind::Insert => format!(
            "Something is missing {}.",
            edit.placement.map(describe_placement).unwrap_or_else(|| format!("near line {line}"))
        ),
        EditKind::Delete => format!("Line {line}: this {} is not needed.", edit.what),
        EditKind::Replace => format!(
            "Line {line}: check `{}`.",
            edit.original.as_deref().unwrap_or_default()
        ),
        EditKind::Reorder => format!("Line {line}: this {} is in the wrong place.", edit.what),
    }
}

impl FeedbackRenderer for SimpleFeedback {
    fn render(&self, repair: &Repair, options: &RenderOptions) -> Vec<FeedbackItem> {
        material_edits(repair, options)
            .map(|(edit, share)| item(edit, share, hint(edit)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::Placement;
    use program_model::{Location, NodePath};

    #[test]
    fn hints_do_not_reveal_the_fix() {
        let repair = Repair::new(vec![
            EditOperation {
                kind: EditKind::Replace,
                path: NodePath(vec![1, 1, 2]),
                original: Some("score > 7000".to_string()),
                fragment: Some("score >= 7000".to_string()),
                what: "expression".to_string(),
                scope: None,
                placement: None,
                location: Location::new(7, 13),
                cost: 1,
            },
            EditOperation {
                kind: EditKind::Insert,
                path: NodePath(vec![1, 1, 5]),
                original: None,
                fragment: Some("print(x)".to_string()),
                what: "expression statement".to_string(),
                scope: None,
                placement: Some(Placement::After(Location::new(9, 5))),
                location: Location::new(9, 5),
                cost: 4,
            },
        ]);
        let items = SimpleFeedback.render(&repair, &RenderOptions::default());
        assert_eq!(items[0].message, "Line 7: check `score > 7000`.");
        assert_eq!(items[1].message, "Something is missing after line 9.");
        assert!(items.iter().all(|i| !i.message.contains(">=")));
        assert_eq!(items[1].normalized_cost, 0.8);
    }
}
