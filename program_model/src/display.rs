//! Printing of model nodes back to compact source text.
//!
//! Expressions print with the minimum parentheses their operator precedence needs,
//! so printing is itself a normal form. Compound statements print their header and
//! a summarized body; feedback only ever quotes one line at a time.

use crate::node::{Node, NodeKind, Operator};

pub fn render(node: &Node) -> String {
    match node.kind {
        k if k.is_expression() => expr(node, 0),
        k if k.is_statement() => statement(node),
        NodeKind::Param => node.name().unwrap_or("_").to_string(),
        NodeKind::Block => node
            .children
            .iter()
            .map(statement)
            .collect::<Vec<_>>()
            .join("; "),
        NodeKind::Function => {
            let (params, _) = function_parts(node);
            format!(
                "def {}({}):",
                node.name().unwrap_or("_"),
                params
                    .iter()
                    .map(|p| p.name().unwrap_or("_").to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
        _ => String::new(),
    }
}

/// Splits a function node into its parameter list and body block.
pub fn function_parts(node: &Node) -> (&[Node], Option<&Node>) {
    match node.children.split_last() {
        Some((body, params)) if body.kind == NodeKind::Block => (params, Some(body)),
        _ => (&node.children[..], None),
    }
}

fn statement(node: &Node) -> String {
    let c = &node.children;
    match node.kind {
        NodeKind::Assign => format!("{} = {}", expr(&c[0], 0), expr(&c[1], 0)),
        NodeKind::If => format!("if {}:", expr(&c[0], 0)),
        NodeKind::While => format!("while {}:", expr(&c[0], 0)),
        NodeKind::For => format!("for {} in {}:", expr(&c[0], 0), expr(&c[1], 0)),
        NodeKind::Return => match c.first() {
            Some(value) => format!("return {}", expr(value, 0)),
            None => "return".to_string(),
        },
        NodeKind::ExprStmt => c.first().map(|e| expr(e, 0)).unwrap_or_default(),
        NodeKind::Break => "break".to_string(),
        NodeKind::Continue => "continue".to_string(),
        NodeKind::Pass => "pass".to_string(),
        _ => render(node),
    }
}

fn list(items: &[Node]) -> String {
    items
        .iter()
        .map(|i| expr(i, 0))
        .collect::<Vec<_>>()
        .join(", ")
}

fn expr(node: &Node, parent_prec: u8) -> String {
    let c = &node.children;
    match node.kind {
        NodeKind::Var => node.name().unwrap_or("_").to_string(),
        NodeKind::Literal => node
            .literal_value()
            .map(|l| l.to_string())
            .unwrap_or_default(),
        NodeKind::Call => format!("{}({})", node.name().unwrap_or("_"), list(c)),
        NodeKind::MethodCall => match c.split_first() {
            Some((receiver, args)) => format!(
                "{}.{}({})",
                expr(receiver, u8::MAX),
                node.name().unwrap_or("_"),
                list(args)
            ),
            None => format!("{}()", node.name().unwrap_or("_")),
        },
        NodeKind::Subscript => format!("{}[{}]", expr(&c[0], u8::MAX), expr(&c[1], 0)),
        NodeKind::List => format!("[{}]", list(c)),
        NodeKind::Tuple if c.len() == 1 => format!("({},)", expr(&c[0], 0)),
        NodeKind::Tuple => format!("({})", list(c)),
        NodeKind::UnaryOp => {
            let op = node.operator().unwrap_or(Operator::Not);
            let prec = op.precedence();
            let inner = expr(&c[0], prec);
            let text = if op == Operator::Not {
                format!("not {inner}")
            } else {
                format!("{}{inner}", op.symbol())
            };
            wrap(text, prec, parent_prec)
        }
        NodeKind::BinaryOp => {
            let op = node.operator().unwrap_or(Operator::Add);
            let prec = op.precedence();
            // Left-associative except `**`; comparisons never chain after normalization.
            let (lp, rp) = match op {
                Operator::Pow => (prec + 1, prec),
                _ if op.is_comparison() => (prec + 1, prec + 1),
                _ => (prec, prec + 1),
            };
            let text = format!("{} {} {}", expr(&c[0], lp), op.symbol(), expr(&c[1], rp));
            wrap(text, prec, parent_prec)
        }
        _ => render(node),
    }
}

fn wrap(text: String, prec: u8, parent_prec: u8) -> String {
    if prec < parent_prec {
        format!("({text})")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Literal, Location};

    fn v(name: &str) -> Node {
        Node::var(name, Location::default())
    }

    #[test]
    fn prints_minimal_parentheses() {
        let l = Location::default();
        let or = Node::binary(Operator::Or, v("a"), v("b"), l);
        let and = Node::binary(Operator::And, v("alive"), or, l);
        let not = Node::unary(Operator::Not, and, l);
        assert_eq!(render(&not), "not (alive and (a or b))");
    }

    #[test]
    fn prints_left_nested_chain_without_parentheses() {
        let l = Location::default();
        let inner = Node::binary(Operator::Or, v("c1"), v("c2"), l);
        let outer = Node::binary(Operator::Or, inner, v("c3"), l);
        assert_eq!(render(&outer), "c1 or c2 or c3");
    }

    #[test]
    fn prints_comparison_with_literal() {
        let l = Location::default();
        let cmp = Node::binary(
            Operator::GtE,
            v("score"),
            Node::literal(Literal::Int(7000), l),
            l,
        );
        assert_eq!(render(&cmp), "score >= 7000");
    }
}
