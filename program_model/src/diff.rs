//! # Structural Diff
//!
//! Top-down alignment of a submission tree against a reference tree, producing the
//! structural edit script that turns one into the other together with its cost.
//!
//! The alignment works at two granularities:
//! - **Statements** are aligned as ordered sequences per block with a dynamic program
//!   that either matches two statements of the same kind, deletes a submission
//!   statement, or inserts a reference statement.
//! - **Expressions** inside matched statements are compared recursively. A single
//!   differing token (operator, literal, name) becomes a label replacement of cost 1;
//!   larger differences become one subtree replacement priced by tree edit distance.
//!
//! Before aligning, reference identifiers are renamed into the submission's vocabulary
//! (see [`variable_mapping`]) so consistent renaming alone never shows up as an edit.
//!
//! ## Cost weighting
//!
//! All costs are positive integers:
//! - label replacement: [`COST_TOKEN`]
//! - subtree replacement: Selkow tree edit distance (unit relabel, delete/insert by size)
//! - statement delete/insert: [`COST_STATEMENT_BASE`] + subtree size

use crate::display::function_parts;
use crate::model::ProgramModel;
use crate::node::{Node, NodeKind, NodeValue};
use crate::path::NodePath;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::trace;

pub const COST_TOKEN: u32 = 1;
pub const COST_STATEMENT_BASE: u32 = 1;

/// New content for a replaced node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fragment {
    /// Keep the node and its children, swap only its value.
    Label(NodeValue),
    /// Replace the node and everything below it.
    Subtree(Node),
}

/// One step of an edit script, addressed in the submission tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralEdit {
    Delete {
        path: NodePath,
        node: Node,
        cost: u32,
    },
    /// Insert `node` into the child list at `parent`, before the original child
    /// currently at `slot`. `order` is the reference position and orders inserts
    /// sharing a slot.
    Insert {
        parent: NodePath,
        slot: usize,
        order: usize,
        node: Node,
        cost: u32,
    },
    Replace {
        path: NodePath,
        from: Node,
        to: Fragment,
        cost: u32,
    },
}

impl StructuralEdit {
    pub fn cost(&self) -> u32 {
        match self {
            StructuralEdit::Delete { cost, .. }
            | StructuralEdit::Insert { cost, .. }
            | StructuralEdit::Replace { cost, .. } => *cost,
        }
    }
}

/// Result of aligning a submission with a reference.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Sum of edit costs; zero iff the trees are equal after renaming.
    pub cost: u32,
    /// Edits in source order.
    pub edits: Vec<StructuralEdit>,
    /// Reference-name to submission-name substitutions applied to the reference.
    pub renaming: HashMap<String, String>,
}

/// Aligns two whole programs.
pub fn align_models(submission: &ProgramModel, reference: &ProgramModel) -> Alignment {
    let renaming = variable_mapping(&submission.root, &reference.root);
    let renamed = reference.root.renamed(&renaming);
    let (cost, edits) = align_program(&submission.root, &renamed);
    trace!(
        submission = %submission.name,
        reference = %reference.name,
        cost,
        edits = edits.len(),
        "aligned programs"
    );
    Alignment {
        cost,
        edits,
        renaming,
    }
}

/// Structural distance between two programs: the cost of their alignment.
pub fn distance(submission: &ProgramModel, reference: &ProgramModel) -> u32 {
    align_models(submission, reference).cost
}

fn statement_cost(node: &Node) -> u32 {
    COST_STATEMENT_BASE + node.size() as u32
}

fn align_program(sub: &Node, rf: &Node) -> (u32, Vec<StructuralEdit>) {
    let mut cost = 0;
    let mut edits = Vec::new();
    let root = NodePath::root();

    let sub_module = sub.children.first().filter(|c| c.kind == NodeKind::Block);
    let ref_module = rf.children.first().filter(|c| c.kind == NodeKind::Block);
    if let (Some(a), Some(b)) = (sub_module, ref_module) {
        let (c, e) = align_block(a, b, &root.child(0));
        cost += c;
        edits.extend(e);
    }

    let ref_functions: BTreeMap<&str, &Node> = rf
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Function)
        .filter_map(|f| f.name().map(|n| (n, f)))
        .collect();
    let mut seen = HashSet::new();

    for (i, f) in sub.children.iter().enumerate() {
        if f.kind != NodeKind::Function {
            continue;
        }
        let path = root.child(i);
        match f.name().and_then(|n| ref_functions.get(n)) {
            Some(g) => {
                seen.insert(f.name().unwrap_or_default().to_string());
                let (c, e) = align_function(f, g, &path);
                cost += c;
                edits.extend(e);
            }
            None => {
                let c = statement_cost(f);
                cost += c;
                edits.push(StructuralEdit::Delete {
                    path,
                    node: f.clone(),
                    cost: c,
                });
            }
        }
    }

    for (j, g) in rf.children.iter().enumerate() {
        if g.kind != NodeKind::Function || seen.contains(g.name().unwrap_or_default()) {
            continue;
        }
        let c = statement_cost(g);
        cost += c;
        edits.push(StructuralEdit::Insert {
            parent: root.clone(),
            slot: sub.children.len(),
            order: j,
            node: g.clone(),
            cost: c,
        });
    }

    (cost, edits)
}

fn align_function(f: &Node, g: &Node, path: &NodePath) -> (u32, Vec<StructuralEdit>) {
    let (f_params, f_body) = function_parts(f);
    let (g_params, g_body) = function_parts(g);

    let (mut cost, mut edits) = align_sequence(f_params, g_params, path, &|a, b, p| {
        if a.kind != NodeKind::Param || b.kind != NodeKind::Param {
            return None;
        }
        Some(expression_delta(a, b, p))
    });

    if let (Some(a), Some(b)) = (f_body, g_body) {
        let (c, e) = align_block(a, b, &path.child(f.children.len() - 1));
        cost += c;
        edits.extend(e);
    }
    (cost, edits)
}

/// Aligns the statements of two blocks.
pub fn align_block(sub: &Node, rf: &Node, path: &NodePath) -> (u32, Vec<StructuralEdit>) {
    align_sequence(&sub.children, &rf.children, path, &match_statement)
}

fn match_statement(s: &Node, r: &Node, path: &NodePath) -> Option<(u32, Vec<StructuralEdit>)> {
    if s.kind != r.kind || s.children.len() != r.children.len() {
        return None;
    }
    let mut cost = 0;
    let mut edits = Vec::new();
    for (i, (a, b)) in s.children.iter().zip(&r.children).enumerate() {
        let child_path = path.child(i);
        let (c, e) = if a.kind == NodeKind::Block && b.kind == NodeKind::Block {
            align_block(a, b, &child_path)
        } else {
            expression_delta(a, b, &child_path)
        };
        cost += c;
        edits.extend(e);
    }
    Some((cost, edits))
}

type PairFn = dyn Fn(&Node, &Node, &NodePath) -> Option<(u32, Vec<StructuralEdit>)>;

#[derive(Clone, Copy)]
enum Step {
    Match,
    Delete,
    Insert,
}

/// Ordered sequence alignment shared by blocks and parameter lists.
fn align_sequence(
    sub: &[Node],
    rf: &[Node],
    parent: &NodePath,
    pair: &PairFn,
) -> (u32, Vec<StructuralEdit>) {
    let n = sub.len();
    let m = rf.len();
    let pairs: Vec<Vec<Option<(u32, Vec<StructuralEdit>)>>> = sub
        .iter()
        .enumerate()
        .map(|(i, s)| rf.iter().map(|r| pair(s, r, &parent.child(i))).collect())
        .collect();

    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in 1..=n {
        dp[i][0] = dp[i - 1][0] + statement_cost(&sub[i - 1]);
    }
    for j in 1..=m {
        dp[0][j] = dp[0][j - 1] + statement_cost(&rf[j - 1]);
    }
    for i in 1..=n {
        for j in 1..=m {
            let delete = dp[i - 1][j] + statement_cost(&sub[i - 1]);
            let insert = dp[i][j - 1] + statement_cost(&rf[j - 1]);
            let mut best = delete.min(insert);
            if let Some((c, _)) = &pairs[i - 1][j - 1] {
                best = best.min(dp[i - 1][j - 1] + c);
            }
            dp[i][j] = best;
        }
    }

    let mut steps = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let step = if i > 0
            && j > 0
            && pairs[i - 1][j - 1]
                .as_ref()
                .is_some_and(|(c, _)| dp[i - 1][j - 1] + c == dp[i][j])
        {
            Step::Match
        } else if i > 0 && dp[i - 1][j] + statement_cost(&sub[i - 1]) == dp[i][j] {
            Step::Delete
        } else {
            Step::Insert
        };
        steps.push((step, i, j));
        match step {
            Step::Match => {
                i -= 1;
                j -= 1;
            }
            Step::Delete => i -= 1,
            Step::Insert => j -= 1,
        }
    }
    steps.reverse();

    let mut edits = Vec::new();
    let mut pairs = pairs;
    for (step, i, j) in steps {
        match step {
            Step::Match => {
                if let Some((_, e)) = pairs[i - 1][j - 1].take() {
                    edits.extend(e);
                }
            }
            Step::Delete => edits.push(StructuralEdit::Delete {
                path: parent.child(i - 1),
                node: sub[i - 1].clone(),
                cost: statement_cost(&sub[i - 1]),
            }),
            Step::Insert => edits.push(StructuralEdit::Insert {
                parent: parent.clone(),
                slot: i,
                order: j - 1,
                node: rf[j - 1].clone(),
                cost: statement_cost(&rf[j - 1]),
            }),
        }
    }
    (dp[n][m], edits)
}

/// Edits turning expression `a` (at `path`) into `b`, and their total cost.
///
/// Descends while the shapes agree so that edits stay as local as possible; falls back
/// to a single subtree replacement when that is no more expensive.
pub fn expression_delta(a: &Node, b: &Node, path: &NodePath) -> (u32, Vec<StructuralEdit>) {
    if a == b {
        return (0, Vec::new());
    }
    let whole = tree_distance(a, b).max(COST_TOKEN);

    if a.kind == b.kind && a.children.len() == b.children.len() && b.value.is_some() == a.value.is_some()
    {
        let mut cost = 0;
        let mut edits = Vec::new();
        if a.value != b.value {
            if let Some(value) = &b.value {
                cost += COST_TOKEN;
                edits.push(StructuralEdit::Replace {
                    path: path.clone(),
                    from: a.clone(),
                    to: Fragment::Label(value.clone()),
                    cost: COST_TOKEN,
                });
            }
        }
        for (i, (x, y)) in a.children.iter().zip(&b.children).enumerate() {
            let (c, e) = expression_delta(x, y, &path.child(i));
            cost += c;
            edits.extend(e);
        }
        if cost < whole || (cost == whole && edits.len() <= 1) {
            return (cost, edits);
        }
    }

    (
        whole,
        vec![StructuralEdit::Replace {
            path: path.clone(),
            from: a.clone(),
            to: Fragment::Subtree(b.clone()),
            cost: whole,
        }],
    )
}

/// Selkow top-down tree edit distance: unit relabel, delete/insert priced by subtree size.
pub fn tree_distance(a: &Node, b: &Node) -> u32 {
    if a == b {
        return 0;
    }
    let replace_all = (a.size() + b.size()) as u32;
    let relabel = if a.same_label(b) {
        Some(0)
    } else if a.kind == b.kind || (a.is_leaf() && b.is_leaf()) {
        Some(COST_TOKEN)
    } else {
        None
    };
    match relabel {
        Some(r) => (r + forest_distance(&a.children, &b.children)).min(replace_all),
        None => replace_all,
    }
}

fn forest_distance(a: &[Node], b: &[Node]) -> u32 {
    let mut dp = vec![vec![0u32; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        dp[i][0] = dp[i - 1][0] + a[i - 1].size() as u32;
    }
    for j in 1..=b.len() {
        dp[0][j] = dp[0][j - 1] + b[j - 1].size() as u32;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = (dp[i - 1][j] + a[i - 1].size() as u32)
                .min(dp[i][j - 1] + b[j - 1].size() as u32)
                .min(dp[i - 1][j - 1] + tree_distance(&a[i - 1], &b[j - 1]));
        }
    }
    dp[a.len()][b.len()]
}

/// Pairs reference identifiers with submission identifiers.
///
/// Votes are collected wherever two variables occupy the same position in statements
/// paired by kind, parameters vote positionally, and identical names get a small bonus.
/// Pairs are then chosen greedily by vote count. The result maps reference names to
/// the submission names they should be renamed to; identity pairs are omitted.
pub fn variable_mapping(sub: &Node, rf: &Node) -> HashMap<String, String> {
    let mut votes: BTreeMap<(String, String), u32> = BTreeMap::new();

    if let (Some(a), Some(b)) = (sub.children.first(), rf.children.first()) {
        if a.kind == NodeKind::Block && b.kind == NodeKind::Block {
            block_votes(&a.children, &b.children, &mut votes);
        }
    }
    for f in sub.children.iter().filter(|c| c.kind == NodeKind::Function) {
        let Some(g) = rf
            .children
            .iter()
            .find(|c| c.kind == NodeKind::Function && c.name() == f.name())
        else {
            continue;
        };
        let (f_params, f_body) = function_parts(f);
        let (g_params, g_body) = function_parts(g);
        for (p, q) in f_params.iter().zip(g_params) {
            if let (Some(x), Some(y)) = (p.name(), q.name()) {
                *votes.entry((x.to_string(), y.to_string())).or_default() += 2;
            }
        }
        if let (Some(a), Some(b)) = (f_body, g_body) {
            block_votes(&a.children, &b.children, &mut votes);
        }
    }

    let sub_vars = sub.variables();
    let ref_vars = rf.variables();
    for shared in sub_vars.intersection(&ref_vars) {
        *votes.entry((shared.clone(), shared.clone())).or_default() += 1;
    }

    let mut ranked: Vec<((String, String), u32)> = votes.into_iter().collect();
    ranked.sort_by(|(ka, va), (kb, vb)| vb.cmp(va).then_with(|| ka.cmp(kb)));

    let mut used_sub = BTreeSet::new();
    let mut used_ref = BTreeSet::new();
    let mut mapping = HashMap::new();
    for ((s, r), _) in ranked {
        if used_sub.contains(&s) || used_ref.contains(&r) {
            continue;
        }
        used_sub.insert(s.clone());
        used_ref.insert(r.clone());
        if s != r {
            mapping.insert(r, s);
        }
    }

    // An unpaired reference name must not collide with a name another pair now uses.
    for r in ref_vars.iter().filter(|r| !used_ref.contains(*r)) {
        if used_sub.contains(r) {
            let mut fresh = format!("{r}_ref");
            while sub_vars.contains(&fresh) || ref_vars.contains(&fresh) {
                fresh.push('_');
            }
            mapping.insert(r.clone(), fresh);
        }
    }
    mapping
}

fn block_votes(a: &[Node], b: &[Node], votes: &mut BTreeMap<(String, String), u32>) {
    // Longest common subsequence on statement kinds.
    let n = a.len();
    let m = b.len();
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i].kind == b[j].kind {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i].kind == b[j].kind {
            node_votes(&a[i], &b[j], votes);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
}

fn node_votes(a: &Node, b: &Node, votes: &mut BTreeMap<(String, String), u32>) {
    if a.kind != b.kind || a.children.len() != b.children.len() {
        return;
    }
    if matches!(a.kind, NodeKind::Var | NodeKind::Param) {
        if let (Some(x), Some(y)) = (a.name(), b.name()) {
            *votes.entry((x.to_string(), y.to_string())).or_default() += 1;
        }
        return;
    }
    for (x, y) in a.children.iter().zip(&b.children) {
        if x.kind == NodeKind::Block && y.kind == NodeKind::Block {
            block_votes(&x.children, &y.children, votes);
        } else {
            node_votes(x, y, votes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Literal, Location, Operator};

    fn l() -> Location {
        Location::default()
    }

    fn v(name: &str) -> Node {
        Node::var(name, l())
    }

    fn int(i: i64) -> Node {
        Node::literal(Literal::Int(i), l())
    }

    fn assign(target: &str, value: Node) -> Node {
        Node::new(NodeKind::Assign, l()).with_children(vec![v(target), value])
    }

    fn ret(value: Node) -> Node {
        Node::new(NodeKind::Return, l()).with_children(vec![value])
    }

    fn program(params: &[&str], body: Vec<Node>) -> ProgramModel {
        let mut children: Vec<Node> = params
            .iter()
            .map(|p| Node::new(NodeKind::Param, l()).with_value(NodeValue::Name(p.to_string())))
            .collect();
        children.push(Node::block(body, l()));
        let f = Node::new(NodeKind::Function, l())
            .with_value(NodeValue::Name("f".into()))
            .with_children(children);
        ProgramModel::new(
            "p",
            Node::new(NodeKind::Program, l()).with_children(vec![Node::block(vec![], l()), f]),
        )
    }

    #[test]
    fn identical_programs_have_zero_distance() {
        let a = program(&["x"], vec![ret(Node::binary(Operator::Add, v("x"), int(1), l()))]);
        let b = a.clone();
        let alignment = align_models(&a, &b);
        assert_eq!(alignment.cost, 0);
        assert!(alignment.edits.is_empty());
    }

    #[test]
    fn consistent_renaming_is_free() {
        let a = program(&["n"], vec![assign("t", v("n")), ret(v("t"))]);
        let b = program(&["x"], vec![assign("acc", v("x")), ret(v("acc"))]);
        let alignment = align_models(&a, &b);
        assert_eq!(alignment.cost, 0, "edits: {:?}", alignment.edits);
        assert_eq!(alignment.renaming.get("acc").map(String::as_str), Some("t"));
    }

    #[test]
    fn single_operator_change_is_one_token() {
        let a = program(&["s"], vec![ret(Node::binary(Operator::Gt, v("s"), int(7000), l()))]);
        let b = program(&["s"], vec![ret(Node::binary(Operator::GtE, v("s"), int(7000), l()))]);
        let alignment = align_models(&a, &b);
        assert_eq!(alignment.cost, COST_TOKEN);
        match &alignment.edits[..] {
            [StructuralEdit::Replace { to: Fragment::Label(NodeValue::Op(op)), .. }] => {
                assert_eq!(*op, Operator::GtE)
            }
            other => panic!("unexpected edits {other:?}"),
        }
    }

    #[test]
    fn missing_statement_becomes_insert_at_slot() {
        let a = program(&["x"], vec![ret(v("x"))]);
        let b = program(&["x"], vec![assign("x", int(0)), ret(v("x"))]);
        let alignment = align_models(&a, &b);
        match &alignment.edits[..] {
            [StructuralEdit::Insert { parent, slot, cost, .. }] => {
                assert_eq!(*parent, NodePath(vec![1, 1]));
                assert_eq!(*slot, 0);
                assert_eq!(*cost, COST_STATEMENT_BASE + 3);
            }
            other => panic!("unexpected edits {other:?}"),
        }
    }

    #[test]
    fn extra_statement_becomes_delete() {
        let a = program(&["x"], vec![assign("y", int(2)), ret(v("x"))]);
        let b = program(&["x"], vec![ret(v("x"))]);
        let alignment = align_models(&a, &b);
        assert!(matches!(
            &alignment.edits[..],
            [StructuralEdit::Delete { path, .. }] if *path == NodePath(vec![1, 1, 0])
        ));
    }

    #[test]
    fn tree_distance_is_symmetric_on_leaf_swap() {
        assert_eq!(tree_distance(&v("a"), &int(3)), 1);
        assert_eq!(tree_distance(&int(3), &v("a")), 1);
    }
}
