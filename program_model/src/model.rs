//! The [`ProgramModel`]: a named, normalized tree for one whole program.

use crate::display::function_parts;
use crate::node::{Location, Node, NodeKind};
use serde::Serialize;

/// Normalized representation of one program.
///
/// The root is a `Program` node whose first child is the module-level block
/// (top-level assignments) followed by one `Function` node per definition.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramModel {
    /// Identity of the program, usually its file name.
    pub name: String,
    /// Entry function declared by the source (the first definition), if any.
    pub declared_entry: Option<String>,
    pub root: Node,
}

impl PartialEq for ProgramModel {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl ProgramModel {
    pub fn new(name: impl Into<String>, root: Node) -> Self {
        let declared_entry = root
            .children
            .iter()
            .find(|c| c.kind == NodeKind::Function)
            .and_then(|f| f.name().map(str::to_string));
        Self {
            name: name.into(),
            declared_entry,
            root,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Same program identity with a different tree (used after applying edits).
    pub fn with_root(&self, root: Node) -> Self {
        Self {
            name: self.name.clone(),
            declared_entry: self.declared_entry.clone(),
            root,
        }
    }

    /// An empty program: no module statements, no functions.
    pub fn empty(name: impl Into<String>) -> Self {
        let l = Location::default();
        Self::new(
            name,
            Node::new(NodeKind::Program, l).with_children(vec![Node::block(Vec::new(), l)]),
        )
    }

    pub fn module_block(&self) -> Option<&Node> {
        self.root
            .children
            .first()
            .filter(|c| c.kind == NodeKind::Block)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Node> {
        self.root
            .children
            .iter()
            .filter(|c| c.kind == NodeKind::Function)
    }

    pub fn function(&self, name: &str) -> Option<&Node> {
        self.functions().find(|f| f.name() == Some(name))
    }

    /// Parameter names and body of a named function.
    pub fn signature(&self, name: &str) -> Option<(Vec<&str>, Option<&Node>)> {
        let f = self.function(name)?;
        let (params, body) = function_parts(f);
        Some((params.iter().filter_map(|p| p.name()).collect(), body))
    }

    /// Resolves the entry function: the configured name when given, else the declared one.
    pub fn resolve_entry<'a>(&'a self, configured: Option<&'a str>) -> Option<&'a str> {
        configured
            .filter(|name| !name.is_empty())
            .or(self.declared_entry.as_deref())
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }
}
