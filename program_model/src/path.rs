//! Addressing of nodes by child-index paths from the program root.

use crate::node::Node;
use serde::Serialize;
use std::fmt;

/// Sequence of child indices leading from the root to a node. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True when `self` lies strictly above `other`.
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

impl Node {
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        path.0
            .iter()
            .try_fold(self, |node, &i| node.children.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Location, NodeKind};

    #[test]
    fn ancestry_is_strict() {
        let p = NodePath(vec![1, 2]);
        assert!(p.is_ancestor_of(&NodePath(vec![1, 2, 0])));
        assert!(!p.is_ancestor_of(&p));
        assert!(!p.is_ancestor_of(&NodePath(vec![1, 3, 0])));
    }

    #[test]
    fn get_follows_indices() {
        let l = Location::default();
        let tree = Node::block(
            vec![Node::new(NodeKind::Pass, l), Node::new(NodeKind::Break, l)],
            l,
        );
        assert_eq!(tree.get(&NodePath(vec![1])).map(|n| n.kind), Some(NodeKind::Break));
        assert!(tree.get(&NodePath(vec![2])).is_none());
        assert_eq!(NodePath(vec![0, 3]).to_string(), "/0/3");
    }
}
