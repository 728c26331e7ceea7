//! Candidate edits.
//!
//! The alignment's edit script is the baseline: applying all of it turns the submission
//! into the (renamed) reference. Each of its edits becomes one candidate. Two kinds of
//! composite candidates are added on top:
//! - a delete and an insert at the same position of one block can be expressed as a
//!   single statement replacement when that is cheaper;
//! - a deleted statement that is re-inserted unchanged elsewhere in the same block
//!   becomes one reorder.
//!
//! Candidates that cannot be applied together are reported as conflicting pairs: they
//! touch the same node or insertion, or one rewrites a subtree the other edits into.

use crate::repair::EditKind;
use crate::repair::cost::{COST_REORDER, replace_statement};
use program_model::NodePath;
use program_model::diff::{Alignment, Fragment, StructuralEdit};
use tracing::trace;

/// One selectable unit of the optimization problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: EditKind,
    /// Primitive edits applied when this candidate is selected, addressed in the submission.
    pub actions: Vec<StructuralEdit>,
    pub cost: u32,
    touches: Vec<Touch>,
}

impl Candidate {
    fn single(edit: StructuralEdit) -> Self {
        let kind = match edit {
            StructuralEdit::Delete { .. } => EditKind::Delete,
            StructuralEdit::Insert { .. } => EditKind::Insert,
            StructuralEdit::Replace { .. } => EditKind::Replace,
        };
        Self {
            kind,
            cost: edit.cost(),
            touches: vec![Touch::of(&edit)],
            actions: vec![edit],
        }
    }
}

/// What part of the submission a primitive edit claims.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Touch {
    /// The node and everything below it.
    Subtree(NodePath),
    /// Only the node's own value.
    Label(NodePath),
    /// One reference statement inserted into the child list at the path.
    Slot(NodePath, usize),
}

impl Touch {
    fn of(action: &StructuralEdit) -> Self {
        match action {
            StructuralEdit::Delete { path, .. } => Touch::Subtree(path.clone()),
            StructuralEdit::Replace {
                path,
                to: Fragment::Subtree(_),
                ..
            } => Touch::Subtree(path.clone()),
            StructuralEdit::Replace {
                path,
                to: Fragment::Label(_),
                ..
            } => Touch::Label(path.clone()),
            StructuralEdit::Insert { parent, order, .. } => Touch::Slot(parent.clone(), *order),
        }
    }

    fn anchor(&self) -> &NodePath {
        match self {
            Touch::Subtree(p) | Touch::Label(p) | Touch::Slot(p, _) => p,
        }
    }

    fn conflicts(&self, other: &Touch) -> bool {
        if self == other {
            return true;
        }
        let covers = |outer: &Touch, inner: &Touch| match outer {
            Touch::Subtree(p) => {
                let q = inner.anchor();
                p == q || p.is_ancestor_of(q)
            }
            _ => false,
        };
        covers(self, other) || covers(other, self)
    }
}

/// All candidates for one submission/reference pair.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    pub candidates: Vec<Candidate>,
    /// Pairs of candidate indices that must not be selected together.
    pub conflicts: Vec<(usize, usize)>,
    /// Indices of the alignment's own edits; selecting all of them yields the reference.
    pub full_script: Vec<usize>,
}

impl CandidatePool {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn costs(&self) -> Vec<u32> {
        self.candidates.iter().map(|c| c.cost).collect()
    }
}

/// Builds the candidate pool from an alignment.
pub fn build_candidates(alignment: &Alignment) -> CandidatePool {
    let mut candidates: Vec<Candidate> = alignment
        .edits
        .iter()
        .cloned()
        .map(Candidate::single)
        .collect();
    let full_script: Vec<usize> = (0..candidates.len()).collect();

    let deletes: Vec<&StructuralEdit> = alignment
        .edits
        .iter()
        .filter(|e| matches!(e, StructuralEdit::Delete { node, .. } if node.kind.is_statement()))
        .collect();
    let inserts: Vec<&StructuralEdit> = alignment
        .edits
        .iter()
        .filter(|e| matches!(e, StructuralEdit::Insert { node, .. } if node.kind.is_statement()))
        .collect();

    for delete in &deletes {
        let StructuralEdit::Delete {
            path,
            node: removed,
            cost: delete_cost,
        } = delete
        else {
            continue;
        };
        let (Some(block), Some(index)) = (path.parent(), path.last()) else {
            continue;
        };
        for insert in &inserts {
            let StructuralEdit::Insert {
                parent,
                slot,
                node: added,
                cost: insert_cost,
                ..
            } = insert
            else {
                continue;
            };
            if *parent != block {
                continue;
            }

            if removed == added {
                if COST_REORDER < delete_cost + insert_cost {
                    candidates.push(Candidate {
                        kind: EditKind::Reorder,
                        actions: vec![(*delete).clone(), (*insert).clone()],
                        cost: COST_REORDER,
                        touches: vec![Touch::of(delete), Touch::of(insert)],
                    });
                }
                continue;
            }

            if *slot == index || *slot == index + 1 {
                let cost = replace_statement(removed, added);
                if cost < delete_cost + insert_cost {
                    let replace = StructuralEdit::Replace {
                        path: path.clone(),
                        from: removed.clone(),
                        to: Fragment::Subtree(added.clone()),
                        cost,
                    };
                    candidates.push(Candidate {
                        kind: EditKind::Replace,
                        touches: vec![Touch::of(&replace), Touch::of(insert)],
                        actions: vec![replace],
                        cost,
                    });
                }
            }
        }
    }

    let mut conflicts = Vec::new();
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let clash = candidates[i]
                .touches
                .iter()
                .any(|a| candidates[j].touches.iter().any(|b| a.conflicts(b)));
            if clash {
                conflicts.push((i, j));
            }
        }
    }

    trace!(
        candidates = candidates.len(),
        baseline = full_script.len(),
        conflicts = conflicts.len(),
        "candidate pool built"
    );
    CandidatePool {
        candidates,
        conflicts,
        full_script,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use program_model::ProgramParser;
    use program_model::diff::align_models;
    use python_lang::PythonParser;

    fn pool(sub: &str, rf: &str) -> CandidatePool {
        let s = PythonParser.parse(sub).unwrap();
        let r = PythonParser.parse(rf).unwrap();
        build_candidates(&align_models(&s, &r))
    }

    #[test]
    fn identical_programs_have_no_candidates() {
        let src = "def f(x):\n    return x + 1\n";
        assert!(pool(src, src).is_empty());
    }

    #[test]
    fn baseline_has_no_internal_conflicts() {
        let p = pool(
            "def f(x):\n    y = x\n    return y > 3\n",
            "def f(x):\n    print(x)\n    y = x * 2\n    return y >= 3\n",
        );
        assert!(!p.full_script.is_empty());
        for (a, b) in &p.conflicts {
            assert!(!(p.full_script.contains(a) && p.full_script.contains(b)));
        }
    }

    #[test]
    fn swapped_statements_offer_a_reorder() {
        let p = pool(
            "def f(x):\n    print(x)\n    y = x * 2\n    return y\n",
            "def f(x):\n    y = x * 2\n    print(x)\n    return y\n",
        );
        let reorder = p
            .candidates
            .iter()
            .position(|c| c.kind == EditKind::Reorder)
            .expect("reorder candidate");
        assert_eq!(p.candidates[reorder].cost, COST_REORDER);
        // The reorder excludes the delete and insert it stands for.
        assert_eq!(p.conflicts.iter().filter(|(a, b)| *a == reorder || *b == reorder).count(), 2);
    }

    #[test]
    fn different_statement_kinds_offer_a_replacement() {
        let p = pool(
            "def f(x):\n    print(x)\n    return x\n",
            "def f(x):\n    x = x + 1\n    return x\n",
        );
        let replace = p
            .candidates
            .iter()
            .find(|c| c.kind == EditKind::Replace && c.touches.len() == 2)
            .expect("statement replacement");
        let baseline: u32 = p.full_script.iter().map(|&i| p.candidates[i].cost).sum();
        assert!(replace.cost < baseline);
    }
}
