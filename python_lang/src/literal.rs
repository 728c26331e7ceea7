//! Python literal syntax for invocation arguments and stdin lines.
//!
//! Accepts the same constant expressions as Python's `ast.literal_eval` restricted
//! to the value types the runner knows: numbers, strings, booleans, `None`, lists
//! and tuples, with unary signs on numbers.

use crate::parser::parse_expression;
use code_runner::{Invocation, Value};
use program_model::{ModelError, Node, NodeKind, Operator};

/// Parses one literal value, e.g. `[[1, 1000, 1], (0, -2.5), 'x']`.
pub fn parse_literal(text: &str) -> Result<Value, ModelError> {
    constant(&parse_expression(text)?)
}

fn constant(node: &Node) -> Result<Value, ModelError> {
    let items = || node.children.iter().map(constant).collect::<Result<Vec<_>, _>>();
    match node.kind {
        NodeKind::Literal => Ok(node.literal_value().map(Value::from).unwrap_or(Value::None)),
        NodeKind::List => Ok(Value::List(items()?)),
        NodeKind::Tuple => Ok(Value::Tuple(items()?)),
        NodeKind::UnaryOp => match (node.operator(), constant(&node.children[0])?) {
            (Some(Operator::Neg), Value::Int(i)) => Ok(Value::Int(-i)),
            (Some(Operator::Neg), Value::Float(x)) => Ok(Value::Float(-x)),
            (Some(Operator::Pos), v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
            _ => Err(malformed(node)),
        },
        _ => Err(malformed(node)),
    }
}

fn malformed(node: &Node) -> ModelError {
    ModelError::syntax(node.first_location(), format!("malformed literal: {node}"))
}

fn sequence(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) | Value::Tuple(items) => items,
        other => vec![other],
    }
}

/// Builds invocations from an argument literal and an stdin literal.
///
/// `args` holds one argument list per invocation (`[[1], [10], [100]]`); `stdin`
/// holds one list of input lines per invocation (`[['3', '4'], ['5']]`). The two are
/// paired by position and the shorter one is padded with empty entries. When both
/// are blank a single invocation without arguments or input is produced.
pub fn parse_invocations(args: &str, stdin: &str) -> Result<Vec<Invocation>, ModelError> {
    let arg_lists: Vec<Vec<Value>> = if args.trim().is_empty() {
        Vec::new()
    } else {
        sequence(parse_literal(args)?).into_iter().map(sequence).collect()
    };
    let input_lists: Vec<Vec<String>> = if stdin.trim().is_empty() {
        Vec::new()
    } else {
        sequence(parse_literal(stdin)?)
            .into_iter()
            .map(|lines| sequence(lines).iter().map(Value::to_string).collect())
            .collect()
    };

    let count = arg_lists.len().max(input_lists.len()).max(1);
    Ok((0..count)
        .map(|i| {
            Invocation::new(arg_lists.get(i).cloned().unwrap_or_default())
                .with_stdin(input_lists.get(i).cloned().unwrap_or_default())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_lists_and_signs() {
        let v = parse_literal("[[1, 1000, 1], (0, -2.5), 'x', None, True]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::List(vec![Value::Int(1), Value::Int(1000), Value::Int(1)]),
                Value::Tuple(vec![Value::Int(0), Value::Float(-2.5)]),
                Value::from("x"),
                Value::None,
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn expressions_are_rejected() {
        assert!(parse_literal("[1 + 2]").is_err());
        assert!(parse_literal("f(1)").is_err());
        assert!(parse_literal("[1,").is_err());
    }

    #[test]
    fn invocations_pair_args_with_input() {
        let invs = parse_invocations("[[1], [10], [100]]", "[['a'], [5]]").unwrap();
        assert_eq!(invs.len(), 3);
        assert_eq!(invs[0].args, vec![Value::Int(1)]);
        assert_eq!(invs[0].stdin, vec!["a".to_string()]);
        assert_eq!(invs[1].stdin, vec!["5".to_string()]);
        assert!(invs[2].stdin.is_empty());
    }

    #[test]
    fn blank_inputs_yield_one_empty_invocation() {
        let invs = parse_invocations("", "  ").unwrap();
        assert_eq!(invs, vec![Invocation::default()]);
    }
}
