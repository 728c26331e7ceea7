//! Applying and describing a selection of candidates.
//!
//! Every primitive edit is addressed in the original submission tree, so a selection is
//! applied in one pass that rebuilds the tree top-down: replaced subtrees are swapped,
//! relabelled nodes keep their (rebuilt) children, deleted children are skipped and
//! inserts are spliced in before the original child at their slot.

use crate::repair::candidates::CandidatePool;
use crate::repair::{EditKind, EditOperation, Placement, Repair};
use program_model::diff::{Fragment, StructuralEdit};
use program_model::display::render;
use program_model::{Location, Node, NodeKind, NodePath, NodeValue, ProgramModel};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Default)]
struct Plan<'a> {
    replacements: HashMap<&'a NodePath, &'a Fragment>,
    deletions: HashSet<&'a NodePath>,
    insertions: BTreeMap<(&'a NodePath, usize), Vec<(usize, &'a Node)>>,
}

impl<'a> Plan<'a> {
    fn new(pool: &'a CandidatePool, selected: &[usize]) -> Self {
        let mut plan = Plan::default();
        for action in selected
            .iter()
            .filter_map(|&i| pool.candidates.get(i))
            .flat_map(|c| c.actions.iter())
        {
            match action {
                StructuralEdit::Delete { path, .. } => {
                    plan.deletions.insert(path);
                }
                StructuralEdit::Insert {
                    parent,
                    slot,
                    order,
                    node,
                    ..
                } => plan
                    .insertions
                    .entry((parent, *slot))
                    .or_default()
                    .push((*order, node)),
                StructuralEdit::Replace { path, to, .. } => {
                    plan.replacements.insert(path, to);
                }
            }
        }
        for inserts in plan.insertions.values_mut() {
            inserts.sort_by_key(|(order, _)| *order);
        }
        plan
    }

    fn rebuild(&self, original: &Node, path: &NodePath) -> Node {
        let mut node = match self.replacements.get(path) {
            Some(Fragment::Subtree(to)) => return to.clone(),
            Some(Fragment::Label(value)) => Node {
                value: Some(value.clone()),
                children: Vec::new(),
                ..original.clone()
            },
            None => Node {
                children: Vec::new(),
                ..original.clone()
            },
        };

        let count = original.children.len();
        let mut children = Vec::with_capacity(count);
        for slot in 0..=count {
            if let Some(inserts) = self.insertions.get(&(path, slot)) {
                children.extend(inserts.iter().map(|(_, n)| (*n).clone()));
            }
            if slot < count {
                let child_path = path.child(slot);
                if !self.deletions.contains(&child_path) {
                    children.push(self.rebuild(&original.children[slot], &child_path));
                }
            }
        }
        node.children = children;
        node
    }
}

/// Builds the program obtained by applying the selected candidates to `submission`.
pub fn materialize(
    submission: &ProgramModel,
    pool: &CandidatePool,
    selected: &[usize],
) -> ProgramModel {
    let plan = Plan::new(pool, selected);
    submission.with_root(plan.rebuild(&submission.root, &NodePath::root()))
}

/// Describes the selected candidates as learner-facing edit operations, top to bottom.
pub fn describe(submission: &ProgramModel, pool: &CandidatePool, selected: &[usize]) -> Repair {
    let root = &submission.root;
    let mut edits = Vec::new();
    for candidate in selected.iter().filter_map(|&i| pool.candidates.get(i)) {
        let op = match (candidate.kind, candidate.actions.as_slice()) {
            (
                EditKind::Reorder,
                [
                    StructuralEdit::Delete { path, node, .. },
                    StructuralEdit::Insert { parent, slot, .. },
                ],
            ) => {
                let placement = placement(root, parent, *slot);
                EditOperation {
                    kind: EditKind::Reorder,
                    path: path.clone(),
                    original: Some(render(node)),
                    fragment: None,
                    what: node.kind.describe().to_string(),
                    scope: scope(root, path),
                    placement: Some(placement),
                    location: node.first_location(),
                    cost: candidate.cost,
                }
            }
            (_, [StructuralEdit::Delete { path, node, cost }]) => EditOperation {
                kind: EditKind::Delete,
                path: path.clone(),
                original: Some(render(node)),
                fragment: None,
                what: node.kind.describe().to_string(),
                scope: scope(root, path),
                placement: None,
                location: node.first_location(),
                cost: *cost,
            },
            (
                _,
                [
                    StructuralEdit::Insert {
                        parent,
                        slot,
                        node,
                        cost,
                        ..
                    },
                ],
            ) => {
                let placement = placement(root, parent, *slot);
                let path = parent.child(*slot);
                EditOperation {
                    kind: EditKind::Insert,
                    original: None,
                    fragment: Some(render(node)),
                    what: node.kind.describe().to_string(),
                    scope: scope(root, &path),
                    placement: Some(placement),
                    location: placement_location(root, placement),
                    path,
                    cost: *cost,
                }
            }
            (
                _,
                [
                    StructuralEdit::Replace {
                        path,
                        from,
                        to,
                        cost,
                    },
                ],
            ) => EditOperation {
                kind: EditKind::Replace,
                path: path.clone(),
                original: Some(render(from)),
                fragment: Some(match to {
                    Fragment::Label(value) => render(&relabelled(from, value)),
                    Fragment::Subtree(node) => render(node),
                }),
                what: if from.kind.is_statement() {
                    from.kind.describe().to_string()
                } else {
                    "expression".to_string()
                },
                scope: scope(root, path),
                placement: None,
                location: from.first_location(),
                cost: *cost,
            },
            _ => continue,
        };
        edits.push(op);
    }
    Repair::new(edits)
}

fn relabelled(node: &Node, value: &NodeValue) -> Node {
    Node {
        value: Some(value.clone()),
        ..node.clone()
    }
}

/// Name of the function enclosing `path`, if any.
fn scope(root: &Node, path: &NodePath) -> Option<String> {
    if path.depth() < 2 {
        return None;
    }
    let top = root.children.get(*path.0.first()?)?;
    (top.kind == NodeKind::Function)
        .then(|| top.name().map(str::to_string))
        .flatten()
}

fn placement(root: &Node, parent: &NodePath, slot: usize) -> Placement {
    if parent.depth() == 0 {
        return Placement::EndOfProgram;
    }
    let Some(container) = root.get(parent) else {
        return Placement::EndOfProgram;
    };
    if let Some(next) = container.children.get(slot) {
        Placement::Before(next.first_location())
    } else if let Some(last) = container.children.last() {
        Placement::After(last.first_location())
    } else {
        Placement::Inside(container.location)
    }
}

fn placement_location(root: &Node, placement: Placement) -> Location {
    match placement {
        Placement::Before(l) | Placement::After(l) | Placement::Inside(l) => l,
        Placement::EndOfProgram => root
            .children
            .last()
            .map(Node::first_location)
            .unwrap_or_default(),
    }
}
