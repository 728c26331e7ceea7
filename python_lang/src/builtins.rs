//! Builtin functions and the string/list methods the subset supports.

use crate::ops::{Exec, binary, compare, iterate, py_eq, raise, sort_values};
use code_runner::{ExecutionFault, Value};
use program_model::Operator;
use std::cmp::Ordering;
use std::collections::VecDeque;

pub const BUILTINS: [&str; 17] = [
    "print", "input", "len", "range", "int", "float", "str", "bool", "abs", "min", "max", "sum",
    "round", "sorted", "list", "tuple", "type",
];

/// Captured standard streams of one run.
#[derive(Debug, Default)]
pub struct Console {
    pub stdin: VecDeque<String>,
    pub stdout: Vec<String>,
}

impl Console {
    pub fn new(stdin: &[String]) -> Self {
        Self {
            stdin: stdin.iter().cloned().collect(),
            stdout: Vec::new(),
        }
    }
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Exec<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if args.len() < min {
        format!("at least {min}")
    } else {
        format!("at most {max}")
    };
    Err(raise(
        "TypeError",
        format!(
            "{name}() takes {expected} argument{} ({} given)",
            if min == max && min == 1 { "" } else { "s" },
            args.len()
        ),
    ))
}

fn as_int(v: &Value) -> Exec<i64> {
    match v {
        Value::Int(_) | Value::Bool(_) => Ok(v.as_i64().unwrap_or(0)),
        other => Err(raise(
            "TypeError",
            format!("'{}' object cannot be interpreted as an integer", other.type_name()),
        )),
    }
}

fn as_str<'v>(v: &'v Value, context: &str) -> Exec<&'v str> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(raise(
            "TypeError",
            format!("{context} must be str, not {}", other.type_name()),
        )),
    }
}

fn extreme(name: &str, args: Vec<Value>, wanted: Ordering) -> Exec<Value> {
    if args.is_empty() {
        return Err(raise("TypeError", format!("{name} expected at least 1 argument, got 0")));
    }
    let candidates = if args.len() == 1 { iterate(&args[0])? } else { args };
    let mut best: Option<Value> = None;
    for v in candidates {
        best = Some(match best {
            None => v,
            Some(b) => {
                if compare(&v, &b, if wanted == Ordering::Less { "<" } else { ">" })? == Some(wanted) {
                    v
                } else {
                    b
                }
            }
        });
    }
    best.ok_or_else(|| raise("ValueError", format!("{name}() arg is an empty sequence")))
}

fn round(args: &[Value]) -> Exec<Value> {
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(v) => Some(as_int(v)?),
    };
    match (&args[0], digits) {
        (Value::Int(_) | Value::Bool(_), _) => Ok(Value::Int(args[0].as_i64().unwrap_or(0))),
        (Value::Float(x), None) => {
            let r = x.round_ties_even();
            if !r.is_finite() {
                return Err(raise("OverflowError", "cannot convert float infinity to integer"));
            }
            Ok(Value::Int(r as i64))
        }
        (Value::Float(x), Some(n)) => {
            let scale = 10f64.powi(n.clamp(-300, 300) as i32);
            Ok(Value::Float((x * scale).round_ties_even() / scale))
        }
        (other, _) => Err(raise(
            "TypeError",
            format!("type {} doesn't define __round__ method", other.type_name()),
        )),
    }
}

fn to_int(args: &[Value]) -> Exec<Value> {
    let Some(v) = args.first() else {
        return Ok(Value::Int(0));
    };
    match v {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(v.as_i64().unwrap_or(0))),
        Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
        Value::Float(_) => Err(raise("ValueError", "cannot convert float NaN or infinity to integer")),
        Value::Str(s) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| {
                raise(
                    "ValueError",
                    format!("invalid literal for int() with base 10: {}", v.repr()),
                )
            }),
        other => Err(raise(
            "TypeError",
            format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ),
        )),
    }
}

fn to_float(args: &[Value]) -> Exec<Value> {
    let Some(v) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match v {
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            raise(
                "ValueError",
                format!("could not convert string to float: {}", v.repr()),
            )
        }),
        other => other.as_f64().map(Value::Float).ok_or_else(|| {
            raise(
                "TypeError",
                format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ),
            )
        }),
    }
}

fn range(args: &[Value], max_len: u64) -> Exec<Value> {
    let ints = args.iter().map(as_int).collect::<Exec<Vec<i64>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(raise("TypeError", "range expected at most 3 arguments")),
    };
    if step == 0 {
        return Err(raise("ValueError", "range() arg 3 must not be zero"));
    }
    let span = if step > 0 {
        (stop as i128 - start as i128 + step as i128 - 1) / step as i128
    } else {
        (start as i128 - stop as i128 - step as i128 - 1) / (-(step as i128))
    };
    let len = span.max(0) as u128;
    if len > max_len as u128 {
        return Err(ExecutionFault::timeout(format!(
            "range of {len} elements exceeds the step limit"
        )));
    }
    Ok(Value::List(
        (0..len as i64)
            .map(|k| Value::Int(start + k * step))
            .collect(),
    ))
}

/// Calls builtin `name`. `max_len` bounds materialized ranges.
pub fn call(console: &mut Console, name: &str, args: Vec<Value>, max_len: u64) -> Exec<Value> {
    match name {
        "print" => {
            let line = args
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            console.stdout.push(line);
            Ok(Value::None)
        }
        "input" => {
            arity(name, &args, 0, 1)?;
            console
                .stdin
                .pop_front()
                .map(Value::Str)
                .ok_or_else(|| raise("EOFError", "EOF when reading a line"))
        }
        "len" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) | Value::Tuple(items) => Ok(Value::Int(items.len() as i64)),
                other => Err(raise(
                    "TypeError",
                    format!("object of type '{}' has no len()", other.type_name()),
                )),
            }
        }
        "range" => {
            arity(name, &args, 1, 3)?;
            range(&args, max_len)
        }
        "int" => {
            arity(name, &args, 0, 1)?;
            to_int(&args)
        }
        "float" => {
            arity(name, &args, 0, 1)?;
            to_float(&args)
        }
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(Value::to_string).unwrap_or_default()))
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
        }
        "abs" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Int(_) | Value::Bool(_) => args[0]
                    .as_i64()
                    .and_then(i64::checked_abs)
                    .map(Value::Int)
                    .ok_or_else(|| raise("OverflowError", "integer result out of range")),
                Value::Float(x) => Ok(Value::Float(x.abs())),
                other => Err(raise(
                    "TypeError",
                    format!("bad operand type for abs(): '{}'", other.type_name()),
                )),
            }
        }
        "min" => extreme(name, args, Ordering::Less),
        "max" => extreme(name, args, Ordering::Greater),
        "sum" => {
            arity(name, &args, 1, 2)?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            iterate(&args[0])?
                .iter()
                .try_fold(start, |acc, v| binary(Operator::Add, &acc, v))
        }
        "round" => {
            arity(name, &args, 1, 2)?;
            round(&args)
        }
        "sorted" => {
            arity(name, &args, 1, 1)?;
            let mut items = iterate(&args[0])?;
            sort_values(&mut items)?;
            Ok(Value::List(items))
        }
        "list" => {
            arity(name, &args, 0, 1)?;
            args.first()
                .map(iterate)
                .transpose()
                .map(|items| Value::List(items.unwrap_or_default()))
        }
        "tuple" => {
            arity(name, &args, 0, 1)?;
            args.first()
                .map(iterate)
                .transpose()
                .map(|items| Value::Tuple(items.unwrap_or_default()))
        }
        "type" => {
            arity(name, &args, 1, 1)?;
            Ok(Value::Str(format!("<class '{}'>", args[0].type_name())))
        }
        _ => Err(raise("NameError", format!("name '{name}' is not defined"))),
    }
}

fn no_attribute(receiver: &Value, name: &str) -> ExecutionFault {
    raise(
        "AttributeError",
        format!("'{}' object has no attribute '{name}'", receiver.type_name()),
    )
}

fn str_method(s: &str, name: &str, args: &[Value], receiver: &Value) -> Exec<Value> {
    let method = format!("str.{name}");
    match name {
        "upper" => Ok(Value::Str(s.to_uppercase())),
        "lower" => Ok(Value::Str(s.to_lowercase())),
        "strip" | "lstrip" | "rstrip" => {
            arity(&method, args, 0, 1)?;
            let chars: Option<Vec<char>> = match args.first() {
                None | Some(Value::None) => None,
                Some(v) => Some(as_str(v, "strip arg")?.chars().collect()),
            };
            let pred = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let out = match name {
                "strip" => s.trim_matches(pred),
                "lstrip" => s.trim_start_matches(pred),
                _ => s.trim_end_matches(pred),
            };
            Ok(Value::Str(out.to_string()))
        }
        "split" => {
            arity(&method, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => s
                    .split_whitespace()
                    .map(|p| Value::Str(p.to_string()))
                    .collect(),
                Some(sep) => {
                    let sep = as_str(sep, "separator")?;
                    if sep.is_empty() {
                        return Err(raise("ValueError", "empty separator"));
                    }
                    s.split(sep).map(|p| Value::Str(p.to_string())).collect()
                }
            };
            Ok(Value::List(parts))
        }
        "join" => {
            arity(&method, args, 1, 1)?;
            let items = iterate(&args[0])?;
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(p) => parts.push(p.as_str()),
                    other => {
                        return Err(raise(
                            "TypeError",
                            format!(
                                "sequence item {i}: expected str instance, {} found",
                                other.type_name()
                            ),
                        ));
                    }
                }
            }
            Ok(Value::Str(parts.join(s)))
        }
        "count" => {
            arity(&method, args, 1, 1)?;
            let sub = as_str(&args[0], "count arg")?;
            let n = if sub.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(sub).count()
            };
            Ok(Value::Int(n as i64))
        }
        "startswith" | "endswith" => {
            arity(&method, args, 1, 1)?;
            let affix = as_str(&args[0], "affix")?;
            Ok(Value::Bool(if name == "startswith" {
                s.starts_with(affix)
            } else {
                s.ends_with(affix)
            }))
        }
        "replace" => {
            arity(&method, args, 2, 2)?;
            let from = as_str(&args[0], "replace arg 1")?;
            let to = as_str(&args[1], "replace arg 2")?;
            Ok(Value::Str(s.replace(from, to)))
        }
        "find" => {
            arity(&method, args, 1, 1)?;
            let sub = as_str(&args[0], "find arg")?;
            Ok(Value::Int(match s.find(sub) {
                Some(byte) => s[..byte].chars().count() as i64,
                None => -1,
            }))
        }
        "isdigit" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
        "isalpha" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic))),
        _ => Err(no_attribute(receiver, name)),
    }
}

fn position(items: &[Value], needle: &Value) -> Option<usize> {
    items.iter().position(|v| py_eq(v, needle))
}

/// Result of a method call: the returned value and, for mutating methods, the
/// receiver's new contents to be written back to where it came from.
pub type MethodOutcome = (Value, Option<Value>);

fn list_method(mut items: Vec<Value>, name: &str, args: &[Value], receiver: &Value) -> Exec<MethodOutcome> {
    let method = format!("list.{name}");
    match name {
        "append" => {
            arity(&method, args, 1, 1)?;
            items.push(args[0].clone());
            Ok((Value::None, Some(Value::List(items))))
        }
        "extend" => {
            arity(&method, args, 1, 1)?;
            items.extend(iterate(&args[0])?);
            Ok((Value::None, Some(Value::List(items))))
        }
        "insert" => {
            arity(&method, args, 2, 2)?;
            let len = items.len() as i64;
            let mut at = as_int(&args[0])?;
            if at < 0 {
                at = (at + len).max(0);
            }
            items.insert(at.min(len) as usize, args[1].clone());
            Ok((Value::None, Some(Value::List(items))))
        }
        "pop" => {
            arity(&method, args, 0, 1)?;
            if items.is_empty() {
                return Err(raise("IndexError", "pop from empty list"));
            }
            let len = items.len() as i64;
            let at = match args.first() {
                Some(v) => as_int(v)?,
                None => len - 1,
            };
            let at = if at < 0 { at + len } else { at };
            if !(0..len).contains(&at) {
                return Err(raise("IndexError", "pop index out of range"));
            }
            let item = items.remove(at as usize);
            Ok((item, Some(Value::List(items))))
        }
        "remove" => {
            arity(&method, args, 1, 1)?;
            let at = position(&items, &args[0])
                .ok_or_else(|| raise("ValueError", "list.remove(x): x not in list"))?;
            items.remove(at);
            Ok((Value::None, Some(Value::List(items))))
        }
        "sort" => {
            arity(&method, args, 0, 0)?;
            sort_values(&mut items)?;
            Ok((Value::None, Some(Value::List(items))))
        }
        "reverse" => {
            arity(&method, args, 0, 0)?;
            items.reverse();
            Ok((Value::None, Some(Value::List(items))))
        }
        "count" | "index" => sequence_method(&items, name, args, receiver).map(|v| (v, None)),
        _ => Err(no_attribute(receiver, name)),
    }
}

fn sequence_method(items: &[Value], name: &str, args: &[Value], receiver: &Value) -> Exec<Value> {
    match name {
        "count" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Int(items.iter().filter(|v| py_eq(v, &args[0])).count() as i64))
        }
        "index" => {
            arity(name, args, 1, 1)?;
            position(items, &args[0])
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    raise(
                        "ValueError",
                        format!("{} is not in {}", args[0].repr(), receiver.type_name()),
                    )
                })
        }
        _ => Err(no_attribute(receiver, name)),
    }
}

pub fn call_method(receiver: Value, name: &str, args: &[Value]) -> Exec<MethodOutcome> {
    match &receiver {
        Value::Str(s) => str_method(s, name, args, &receiver).map(|v| (v, None)),
        Value::List(items) => list_method(items.clone(), name, args, &receiver),
        Value::Tuple(items) => sequence_method(items, name, args, &receiver).map(|v| (v, None)),
        other => Err(no_attribute(other, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn print_joins_arguments_with_spaces() {
        let mut console = Console::default();
        call(&mut console, "print", vec![Value::from("a"), Value::Int(1), Value::Float(2.0)], 10).unwrap();
        assert_eq!(console.stdout, vec!["a 1 2.0"]);
    }

    #[test]
    fn input_consumes_stdin_then_fails() {
        let mut console = Console::new(&["7".to_string()]);
        assert_eq!(call(&mut console, "input", vec![], 10).unwrap(), Value::from("7"));
        let err = call(&mut console, "input", vec![], 10).unwrap_err();
        assert!(err.message.starts_with("EOFError"));
    }

    #[test]
    fn range_matches_python() {
        let mut console = Console::default();
        let r = call(&mut console, "range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)], 100).unwrap();
        assert_eq!(r, Value::List(vec![Value::Int(5), Value::Int(3), Value::Int(1)]));
        let huge = call(&mut console, "range", vec![Value::Int(1_000_000)], 100).unwrap_err();
        assert_eq!(huge.kind, code_runner::FaultKind::Timeout);
    }

    #[test]
    fn conversions_and_rounding() {
        let mut console = Console::default();
        assert_eq!(call(&mut console, "int", vec![Value::from(" 42 ")], 1).unwrap(), Value::Int(42));
        assert!(call(&mut console, "int", vec![Value::from("x")], 1).is_err());
        assert_eq!(call(&mut console, "round", vec![Value::Float(2.5)], 1).unwrap(), Value::Int(2));
        assert_eq!(
            call(&mut console, "max", vec![Value::Int(3), Value::Float(7.5), Value::Int(1)], 1).unwrap(),
            Value::Float(7.5)
        );
        assert_eq!(
            call(&mut console, "sum", vec![Value::List(vec![Value::Int(1), Value::Int(2)])], 1).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn string_methods() {
        let s = Value::from("  a,b  ");
        let (v, updated) = call_method(s.clone(), "strip", &[]).unwrap();
        assert_eq!(v, Value::from("a,b"));
        assert!(updated.is_none());
        let (parts, _) = call_method(Value::from("a,b"), "split", &[Value::from(",")]).unwrap();
        assert_eq!(parts, strs(&["a", "b"]));
        let (joined, _) = call_method(Value::from("-"), "join", &[strs(&["x", "y"])]).unwrap();
        assert_eq!(joined, Value::from("x-y"));
    }

    #[test]
    fn list_methods_report_new_receiver() {
        let (ret, updated) = call_method(Value::List(vec![]), "append", &[Value::Int(1)]).unwrap();
        assert_eq!(ret, Value::None);
        assert_eq!(updated, Some(Value::List(vec![Value::Int(1)])));

        let (popped, rest) = call_method(strs(&["a", "b"]), "pop", &[]).unwrap();
        assert_eq!(popped, Value::from("b"));
        assert_eq!(rest, Some(strs(&["a"])));

        let err = call_method(Value::Int(1), "append", &[]).unwrap_err();
        assert_eq!(err.message, "AttributeError: 'int' object has no attribute 'append'");
    }
}
