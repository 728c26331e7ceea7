//! Python semantics for operators, indexing and iteration over [`Value`]s.

use code_runner::{ExecutionFault, Value};
use program_model::Operator;
use std::cmp::Ordering;

pub type Exec<T> = Result<T, ExecutionFault>;

/// Sequences longer than this are refused with `MemoryError`.
const MAX_SEQUENCE_LEN: usize = 10_000_000;

pub fn raise(kind: &str, message: impl AsRef<str>) -> ExecutionFault {
    ExecutionFault::runtime(format!("{kind}: {}", message.as_ref()))
}

fn int_pair(l: &Value, r: &Value) -> Option<(i64, i64)> {
    match (l, r) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            Some((l.as_i64()?, r.as_i64()?))
        }
        _ => None,
    }
}

fn float_pair(l: &Value, r: &Value) -> Option<(f64, f64)> {
    Some((l.as_f64()?, r.as_f64()?))
}

fn overflow() -> ExecutionFault {
    raise("OverflowError", "integer result out of range")
}

fn unsupported(op: Operator, l: &Value, r: &Value) -> ExecutionFault {
    raise(
        "TypeError",
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            l.type_name(),
            r.type_name()
        ),
    )
}

/// Python `==`: numbers compare across int/float/bool, containers element-wise.
pub fn py_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| py_eq(p, q))
        }
        _ => {
            if let Some((x, y)) = int_pair(a, b) {
                return x == y;
            }
            match float_pair(a, b) {
                Some((x, y)) => x == y,
                None => false,
            }
        }
    }
}

/// Python ordering. `Ok(None)` means unordered (NaN involved).
pub fn compare(a: &Value, b: &Value, symbol: &str) -> Exec<Option<Ordering>> {
    if let Some((x, y)) = int_pair(a, b) {
        return Ok(Some(x.cmp(&y)));
    }
    if let Some((x, y)) = float_pair(a, b) {
        return Ok(x.partial_cmp(&y));
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            for (p, q) in x.iter().zip(y) {
                if !py_eq(p, q) {
                    return compare(p, q, symbol);
                }
            }
            Ok(Some(x.len().cmp(&y.len())))
        }
        _ => Err(raise(
            "TypeError",
            format!(
                "'{symbol}' not supported between instances of '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ),
        )),
    }
}

fn repeat(items: &[Value], times: i64) -> Exec<Vec<Value>> {
    let times = usize::try_from(times.max(0)).map_err(|_| overflow())?;
    if items.len().saturating_mul(times) > MAX_SEQUENCE_LEN {
        return Err(raise("MemoryError", "sequence too large"));
    }
    Ok(items.iter().cloned().cycle().take(items.len() * times).collect())
}

fn repeat_str(s: &str, times: i64) -> Exec<String> {
    let times = usize::try_from(times.max(0)).map_err(|_| overflow())?;
    if s.len().saturating_mul(times) > MAX_SEQUENCE_LEN {
        return Err(raise("MemoryError", "string too large"));
    }
    Ok(s.repeat(times))
}

fn floor_div(x: i64, y: i64) -> Exec<i64> {
    if y == 0 {
        return Err(raise("ZeroDivisionError", "integer division or modulo by zero"));
    }
    let q = x.checked_div(y).ok_or_else(overflow)?;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn int_mod(x: i64, y: i64) -> Exec<i64> {
    if y == 0 {
        return Err(raise("ZeroDivisionError", "integer division or modulo by zero"));
    }
    let m = x.checked_rem(y).unwrap_or(0);
    Ok(if m != 0 && ((m < 0) != (y < 0)) { m + y } else { m })
}

fn float_mod(x: f64, y: f64) -> Exec<f64> {
    if y == 0.0 {
        return Err(raise("ZeroDivisionError", "float modulo"));
    }
    let m = x % y;
    Ok(if m != 0.0 && ((m < 0.0) != (y < 0.0)) { m + y } else { m })
}

fn contains(container: &Value, item: &Value) -> Exec<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(raise(
                "TypeError",
                format!("'in <string>' requires string as left operand, not {}", other.type_name()),
            )),
        },
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().any(|v| py_eq(v, item))),
        other => Err(raise(
            "TypeError",
            format!("argument of type '{}' is not iterable", other.type_name()),
        )),
    }
}

/// Evaluates a non-short-circuit binary operator.
pub fn binary(op: Operator, l: &Value, r: &Value) -> Exec<Value> {
    match op {
        Operator::Add => {
            if let Some((x, y)) = int_pair(l, r) {
                return x.checked_add(y).map(Value::Int).ok_or_else(overflow);
            }
            if let Some((x, y)) = float_pair(l, r) {
                return Ok(Value::Float(x + y));
            }
            match (l, r) {
                (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{x}{y}"))),
                (Value::List(x), Value::List(y)) => Ok(Value::List([x.as_slice(), y.as_slice()].concat())),
                (Value::Tuple(x), Value::Tuple(y)) => Ok(Value::Tuple([x.as_slice(), y.as_slice()].concat())),
                _ => Err(unsupported(op, l, r)),
            }
        }
        Operator::Sub => {
            if let Some((x, y)) = int_pair(l, r) {
                return x.checked_sub(y).map(Value::Int).ok_or_else(overflow);
            }
            float_pair(l, r)
                .map(|(x, y)| Value::Float(x - y))
                .ok_or_else(|| unsupported(op, l, r))
        }
        Operator::Mul => {
            if let Some((x, y)) = int_pair(l, r) {
                return x.checked_mul(y).map(Value::Int).ok_or_else(overflow);
            }
            if let Some((x, y)) = float_pair(l, r) {
                return Ok(Value::Float(x * y));
            }
            match (l, r) {
                (Value::Str(s), n @ (Value::Int(_) | Value::Bool(_)))
                | (n @ (Value::Int(_) | Value::Bool(_)), Value::Str(s)) => {
                    Ok(Value::Str(repeat_str(s, n.as_i64().unwrap_or(0))?))
                }
                (Value::List(items), n @ (Value::Int(_) | Value::Bool(_)))
                | (n @ (Value::Int(_) | Value::Bool(_)), Value::List(items)) => {
                    Ok(Value::List(repeat(items, n.as_i64().unwrap_or(0))?))
                }
                _ => Err(unsupported(op, l, r)),
            }
        }
        Operator::Div => {
            let (x, y) = float_pair(l, r).ok_or_else(|| unsupported(op, l, r))?;
            if y == 0.0 {
                return Err(raise("ZeroDivisionError", "division by zero"));
            }
            Ok(Value::Float(x / y))
        }
        Operator::FloorDiv => {
            if let Some((x, y)) = int_pair(l, r) {
                return floor_div(x, y).map(Value::Int);
            }
            let (x, y) = float_pair(l, r).ok_or_else(|| unsupported(op, l, r))?;
            if y == 0.0 {
                return Err(raise("ZeroDivisionError", "float floor division by zero"));
            }
            Ok(Value::Float((x / y).floor()))
        }
        Operator::Mod => {
            if let Some((x, y)) = int_pair(l, r) {
                return int_mod(x, y).map(Value::Int);
            }
            let (x, y) = float_pair(l, r).ok_or_else(|| unsupported(op, l, r))?;
            float_mod(x, y).map(Value::Float)
        }
        Operator::Pow => {
            if let Some((x, y)) = int_pair(l, r) {
                if y >= 0 {
                    let exp = u32::try_from(y).map_err(|_| overflow())?;
                    return x.checked_pow(exp).map(Value::Int).ok_or_else(overflow);
                }
                if x == 0 {
                    return Err(raise(
                        "ZeroDivisionError",
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                return Ok(Value::Float((x as f64).powf(y as f64)));
            }
            let (x, y) = float_pair(l, r).ok_or_else(|| unsupported(op, l, r))?;
            if x == 0.0 && y < 0.0 {
                return Err(raise(
                    "ZeroDivisionError",
                    "0.0 cannot be raised to a negative power",
                ));
            }
            Ok(Value::Float(x.powf(y)))
        }
        Operator::Eq => Ok(Value::Bool(py_eq(l, r))),
        Operator::NotEq => Ok(Value::Bool(!py_eq(l, r))),
        Operator::Lt => Ok(Value::Bool(compare(l, r, "<")? == Some(Ordering::Less))),
        Operator::LtE => Ok(Value::Bool(matches!(
            compare(l, r, "<=")?,
            Some(Ordering::Less | Ordering::Equal)
        ))),
        Operator::Gt => Ok(Value::Bool(compare(l, r, ">")? == Some(Ordering::Greater))),
        Operator::GtE => Ok(Value::Bool(matches!(
            compare(l, r, ">=")?,
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        Operator::In => contains(r, l).map(Value::Bool),
        Operator::NotIn => contains(r, l).map(|b| Value::Bool(!b)),
        Operator::And | Operator::Or | Operator::Not | Operator::Neg | Operator::Pos => {
            Err(unsupported(op, l, r))
        }
    }
}

pub fn unary(op: Operator, v: &Value) -> Exec<Value> {
    match (op, v) {
        (Operator::Not, v) => Ok(Value::Bool(!v.truthy())),
        (Operator::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        (Operator::Neg, Value::Bool(b)) => Ok(Value::Int(-(*b as i64))),
        (Operator::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (Operator::Pos, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        (Operator::Pos, v @ (Value::Int(_) | Value::Float(_))) => Ok(v.clone()),
        (op, v) => Err(raise(
            "TypeError",
            format!("bad operand type for unary {}: '{}'", op.symbol(), v.type_name()),
        )),
    }
}

fn index_of(type_name: &str, len: usize, index: &Value) -> Exec<usize> {
    let i = match index {
        Value::Int(_) | Value::Bool(_) => index.as_i64().unwrap_or(0),
        other => {
            return Err(raise(
                "TypeError",
                format!("{type_name} indices must be integers, not {}", other.type_name()),
            ));
        }
    };
    let resolved = if i < 0 { i + len as i64 } else { i };
    usize::try_from(resolved)
        .ok()
        .filter(|r| *r < len)
        .ok_or_else(|| raise("IndexError", format!("{type_name} index out of range")))
}

pub fn get_item(container: &Value, index: &Value) -> Exec<Value> {
    match container {
        Value::List(items) | Value::Tuple(items) => {
            let i = index_of(container.type_name(), items.len(), index)?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = index_of("string", chars.len(), index)?;
            Ok(Value::Str(chars[i].to_string()))
        }
        other => Err(raise(
            "TypeError",
            format!("'{}' object is not subscriptable", other.type_name()),
        )),
    }
}

/// Returns `container` with `container[index] = value` applied.
pub fn set_item(container: Value, index: &Value, value: Value) -> Exec<Value> {
    match container {
        Value::List(mut items) => {
            let i = index_of("list", items.len(), index)?;
            items[i] = value;
            Ok(Value::List(items))
        }
        other => Err(raise(
            "TypeError",
            format!("'{}' object does not support item assignment", other.type_name()),
        )),
    }
}

pub fn iterate(v: &Value) -> Exec<Vec<Value>> {
    match v {
        Value::List(items) | Value::Tuple(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(raise(
            "TypeError",
            format!("'{}' object is not iterable", other.type_name()),
        )),
    }
}

/// Stable sort with Python ordering, failing on incomparable items.
pub fn sort_values(items: &mut [Value]) -> Exec<()> {
    let mut failure = None;
    items.sort_by(|a, b| match compare(a, b, "<") {
        Ok(order) => order.unwrap_or(Ordering::Equal),
        Err(e) => {
            failure.get_or_insert(e);
            Ordering::Equal
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
