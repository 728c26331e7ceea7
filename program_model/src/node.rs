//! # Program Model Nodes
//!
//! A [`Node`] is one vertex of the normalized syntax tree. Nodes carry a [`NodeKind`],
//! an optional [`NodeValue`] (identifier, operator or literal), their ordered children
//! and a source [`Location`].
//!
//! Equality between nodes is structural: kind, value and children are compared while
//! locations are ignored. Two programs that differ only in formatting therefore
//! compare equal once parsed.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A 1-based position in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Every syntactic category the model distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Program,
    Function,
    Param,
    Block,
    Assign,
    If,
    While,
    For,
    Return,
    ExprStmt,
    Break,
    Continue,
    Pass,
    Call,
    MethodCall,
    Literal,
    Var,
    BinaryOp,
    UnaryOp,
    Subscript,
    List,
    Tuple,
}

impl NodeKind {
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Assign
                | NodeKind::If
                | NodeKind::While
                | NodeKind::For
                | NodeKind::Return
                | NodeKind::ExprStmt
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Pass
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Call
                | NodeKind::MethodCall
                | NodeKind::Literal
                | NodeKind::Var
                | NodeKind::BinaryOp
                | NodeKind::UnaryOp
                | NodeKind::Subscript
                | NodeKind::List
                | NodeKind::Tuple
        )
    }

    /// Human-readable name used in feedback sentences.
    pub fn describe(self) -> &'static str {
        match self {
            NodeKind::Program => "program",
            NodeKind::Function => "function",
            NodeKind::Param => "parameter",
            NodeKind::Block => "block",
            NodeKind::Assign => "assignment",
            NodeKind::If => "if statement",
            NodeKind::While => "while loop",
            NodeKind::For => "for loop",
            NodeKind::Return => "return statement",
            NodeKind::ExprStmt => "expression statement",
            NodeKind::Break => "break statement",
            NodeKind::Continue => "continue statement",
            NodeKind::Pass => "pass statement",
            NodeKind::Call => "function call",
            NodeKind::MethodCall => "method call",
            NodeKind::Literal => "literal",
            NodeKind::Var => "variable",
            NodeKind::BinaryOp => "operator",
            NodeKind::UnaryOp => "operator",
            NodeKind::Subscript => "subscript",
            NodeKind::List => "list",
            NodeKind::Tuple => "tuple",
        }
    }
}

/// Binary and unary operators. Boolean connectives are operators too, so
/// `a and b` and `a + b` share the [`NodeKind::BinaryOp`] shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    And,
    Or,
    Not,
    Neg,
    Pos,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtE => "<=",
            Operator::Gt => ">",
            Operator::GtE => ">=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Neg => "-",
            Operator::Pos => "+",
        }
    }

    /// Binding strength, higher binds tighter. Used only for printing.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Not => 3,
            Operator::Eq
            | Operator::NotEq
            | Operator::Lt
            | Operator::LtE
            | Operator::Gt
            | Operator::GtE
            | Operator::In
            | Operator::NotIn => 4,
            Operator::Add | Operator::Sub => 5,
            Operator::Mul | Operator::Div | Operator::FloorDiv | Operator::Mod => 6,
            Operator::Neg | Operator::Pos => 7,
            Operator::Pow => 8,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 4
    }
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => write!(f, "None"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

/// The optional payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeValue {
    Name(String),
    Op(Operator),
    Lit(Literal),
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Name(n) => write!(f, "{n}"),
            NodeValue::Op(op) => write!(f, "{}", op.symbol()),
            NodeValue::Lit(lit) => write!(f, "{lit}"),
        }
    }
}

/// One vertex of the program tree.
///
/// Child layout per kind:
/// - `Program`: module block, then functions
/// - `Function` (name): params, then body block
/// - `Assign`: target, value
/// - `If`: condition, then block, else block
/// - `While`: condition, body block
/// - `For`: target, iterable, body block
/// - `Return` / `ExprStmt`: one expression
/// - `Call` (name): arguments
/// - `MethodCall` (name): receiver, then arguments
/// - `BinaryOp` (op): left, right; `UnaryOp` (op): operand
/// - `Subscript`: object, index
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<NodeValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    pub location: Location,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value && self.children == other.children
    }
}

impl Node {
    pub fn new(kind: NodeKind, location: Location) -> Self {
        Self {
            kind,
            value: None,
            children: Vec::new(),
            location,
        }
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn var(name: impl Into<String>, location: Location) -> Self {
        Node::new(NodeKind::Var, location).with_value(NodeValue::Name(name.into()))
    }

    pub fn literal(lit: Literal, location: Location) -> Self {
        Node::new(NodeKind::Literal, location).with_value(NodeValue::Lit(lit))
    }

    pub fn binary(op: Operator, left: Node, right: Node, location: Location) -> Self {
        Node::new(NodeKind::BinaryOp, location)
            .with_value(NodeValue::Op(op))
            .with_children(vec![left, right])
    }

    pub fn unary(op: Operator, operand: Node, location: Location) -> Self {
        Node::new(NodeKind::UnaryOp, location)
            .with_value(NodeValue::Op(op))
            .with_children(vec![operand])
    }

    pub fn block(statements: Vec<Node>, location: Location) -> Self {
        Node::new(NodeKind::Block, location).with_children(statements)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.value {
            Some(NodeValue::Name(n)) => Some(n),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        match &self.value {
            Some(NodeValue::Op(op)) => Some(*op),
            _ => None,
        }
    }

    pub fn literal_value(&self) -> Option<&Literal> {
        match &self.value {
            Some(NodeValue::Lit(lit)) => Some(lit),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }

    /// Same kind and same payload, children not considered.
    pub fn same_label(&self, other: &Node) -> bool {
        self.kind == other.kind && self.value == other.value
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// All identifiers bound or read as variables in this subtree (params included).
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.walk(&mut |n| {
            if matches!(n.kind, NodeKind::Var | NodeKind::Param) {
                if let Some(name) = n.name() {
                    out.insert(name.to_string());
                }
            }
        });
        out
    }

    /// Returns a copy with variable and parameter names substituted through `map`.
    /// Function and method names are left untouched.
    pub fn renamed(&self, map: &HashMap<String, String>) -> Node {
        let mut out = self.clone();
        out.rename_in_place(map);
        out
    }

    fn rename_in_place(&mut self, map: &HashMap<String, String>) {
        if matches!(self.kind, NodeKind::Var | NodeKind::Param) {
            if let Some(NodeValue::Name(name)) = &self.value {
                if let Some(to) = map.get(name) {
                    self.value = Some(NodeValue::Name(to.clone()));
                }
            }
        }
        for child in &mut self.children {
            child.rename_in_place(map);
        }
    }

    /// The first source location found in this subtree, preferring this node's own.
    pub fn first_location(&self) -> Location {
        if self.location != Location::default() {
            return self.location;
        }
        self.children
            .iter()
            .map(Node::first_location)
            .find(|l| *l != Location::default())
            .unwrap_or_default()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::display::render(self))
    }
}
