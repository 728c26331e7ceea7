//! Runtime values produced and consumed by interpreters.

use program_model::Literal;
use serde::Serialize;
use std::fmt;

/// A dynamically typed value.
///
/// Equality through `PartialEq` is strict: `True`, `1` and `1.0` are three different
/// outputs. Interpreters implement their language's own equality on top of this.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
        }
    }

    /// Numeric view of ints, floats and bools.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Integer view of ints and bools.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Source-literal rendering, as shown inside containers and in feedback.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => Literal::Str(s.clone()).to_string(),
            Value::List(items) => format!(
                "[{}]",
                items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
            ),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!(
                "({})",
                items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
            ),
            other => other.to_string(),
        }
    }

    /// Applies `f` to every string inside this value.
    pub fn map_strings(&self, f: &impl Fn(&str) -> String) -> Value {
        match self {
            Value::Str(s) => Value::Str(f(s)),
            Value::List(items) => Value::List(items.iter().map(|v| v.map_strings(f)).collect()),
            Value::Tuple(items) => Value::Tuple(items.iter().map(|v| v.map_strings(f)).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", Literal::Bool(*b)),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{}", Literal::Float(*x)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(_) | Value::Tuple(_) => write!(f, "{}", self.repr()),
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::None => Value::None,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(x) => Value::Float(*x),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_distinguishes_types() {
        assert_ne!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn repr_quotes_nested_strings_only() {
        let v = Value::List(vec![Value::from("a"), Value::Int(2), Value::None]);
        assert_eq!(v.repr(), "['a', 2, None]");
        assert_eq!(Value::from("a").to_string(), "a");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!Value::List(vec![]).truthy());
        assert!(Value::from("x").truthy());
        assert!(!Value::Int(0).truthy());
    }
}
