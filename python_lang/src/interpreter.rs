//! Tree-walking interpreter over the normalized program model.
//!
//! Every statement, loop iteration and call consumes one step. The wall clock is
//! sampled every [`CLOCK_INTERVAL`] steps, so a run is bounded by whichever of the
//! step and time limits is reached first. Values have copy semantics: mutating
//! methods and item assignment write the updated container back to its place.

use crate::builtins::{self, Console};
use crate::ops::{self, Exec, raise};
use code_runner::{
    BranchVisit, ExecutionFault, ExecutionResult, Interpreter, Invocation, RunLimits, Value,
};
use program_model::display::function_parts;
use program_model::{Node, NodeKind, Operator, ProgramModel};
use std::collections::HashMap;
use std::time::Instant;
use tracing::trace;

const CLOCK_INTERVAL: u64 = 256;

/// Interpreter plugin for the supported Python subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonInterpreter;

impl Interpreter for PythonInterpreter {
    fn execute(
        &self,
        model: &ProgramModel,
        entry: &str,
        invocation: &Invocation,
        limits: &RunLimits,
    ) -> Result<ExecutionResult, ExecutionFault> {
        let mut machine = Machine::new(model, invocation, limits);
        let result = machine.run(entry, &invocation.args);
        trace!(
            program = %model.name,
            %invocation,
            steps = machine.steps,
            ok = result.is_ok(),
            "interpretation finished"
        );
        result
    }
}

type Scope = HashMap<String, Value>;

enum Flow {
    Next,
    Break,
    Continue,
    Return(Value),
}

struct Machine<'a> {
    model: &'a ProgramModel,
    limits: &'a RunLimits,
    started: Instant,
    steps: u64,
    depth: usize,
    console: Console,
    trace: Vec<BranchVisit>,
    globals: Scope,
}

impl<'a> Machine<'a> {
    fn new(model: &'a ProgramModel, invocation: &Invocation, limits: &'a RunLimits) -> Self {
        Self {
            model,
            limits,
            started: Instant::now(),
            steps: 0,
            depth: 0,
            console: Console::new(&invocation.stdin),
            trace: Vec::new(),
            globals: Scope::new(),
        }
    }

    fn run(&mut self, entry: &str, args: &[Value]) -> Exec<ExecutionResult> {
        let model = self.model;
        if let Some(module) = model.module_block() {
            let mut scope = Scope::new();
            self.exec_block(module, &mut scope)?;
            self.globals = scope;
        }
        if model.function(entry).is_none() {
            return Err(ExecutionFault::missing_entry(entry));
        }
        let value = self.call_user(entry, args.to_vec())?;
        Ok(ExecutionResult {
            return_value: Some(value),
            stdout: std::mem::take(&mut self.console.stdout),
            fault: None,
            trace: std::mem::take(&mut self.trace),
            steps: self.steps,
        })
    }

    fn tick(&mut self) -> Exec<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(ExecutionFault::timeout(format!(
                "step limit of {} exceeded",
                self.limits.max_steps
            )));
        }
        if self.steps % CLOCK_INTERVAL == 0 && self.started.elapsed() > self.limits.timeout {
            return Err(ExecutionFault::timeout(format!(
                "time limit of {} ms exceeded",
                self.limits.timeout.as_millis()
            )));
        }
        Ok(())
    }

    fn call_user(&mut self, name: &str, args: Vec<Value>) -> Exec<Value> {
        let model = self.model;
        let Some(function) = model.function(name) else {
            return Err(raise("NameError", format!("name '{name}' is not defined")));
        };
        let (params, body) = function_parts(function);
        if params.len() != args.len() {
            return Err(raise(
                "TypeError",
                format!(
                    "{name}() takes {} positional argument{} but {} were given",
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    args.len()
                ),
            ));
        }
        self.tick()?;
        if self.depth >= self.limits.max_depth {
            return Err(raise("RecursionError", "maximum recursion depth exceeded"));
        }

        let mut locals: Scope = params
            .iter()
            .filter_map(|p| p.name().map(str::to_string))
            .zip(args)
            .collect();

        self.depth += 1;
        let flow = match body {
            Some(body) => self.exec_block(body, &mut locals),
            None => Ok(Flow::Next),
        };
        self.depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }

    fn exec_block(&mut self, block: &'a Node, scope: &mut Scope) -> Exec<Flow> {
        for stmt in &block.children {
            match self.exec_stmt(stmt, scope)? {
                Flow::Next => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(&mut self, stmt: &'a Node, scope: &mut Scope) -> Exec<Flow> {
        self.tick()?;
        let c = &stmt.children;
        match stmt.kind {
            NodeKind::Assign => {
                let value = self.eval(&c[1], scope)?;
                self.assign(&c[0], value, scope)?;
                Ok(Flow::Next)
            }
            NodeKind::If => {
                let taken = self.eval(&c[0], scope)?.truthy();
                self.trace.push(BranchVisit {
                    location: stmt.location,
                    taken,
                });
                self.exec_block(if taken { &c[1] } else { &c[2] }, scope)
            }
            NodeKind::While => loop {
                let taken = self.eval(&c[0], scope)?.truthy();
                self.trace.push(BranchVisit {
                    location: stmt.location,
                    taken,
                });
                if !taken {
                    return Ok(Flow::Next);
                }
                match self.exec_block(&c[1], scope)? {
                    Flow::Break => return Ok(Flow::Next),
                    ret @ Flow::Return(_) => return Ok(ret),
                    Flow::Next | Flow::Continue => {}
                }
                self.tick()?;
            },
            NodeKind::For => {
                let iterable = self.eval(&c[1], scope)?;
                for item in ops::iterate(&iterable)? {
                    self.tick()?;
                    self.trace.push(BranchVisit {
                        location: stmt.location,
                        taken: true,
                    });
                    self.assign(&c[0], item, scope)?;
                    match self.exec_block(&c[2], scope)? {
                        Flow::Break => return Ok(Flow::Next),
                        ret @ Flow::Return(_) => return Ok(ret),
                        Flow::Next | Flow::Continue => {}
                    }
                }
                self.trace.push(BranchVisit {
                    location: stmt.location,
                    taken: false,
                });
                Ok(Flow::Next)
            }
            NodeKind::Return => {
                let value = match c.first() {
                    Some(e) => self.eval(e, scope)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            NodeKind::ExprStmt => {
                if let Some(e) = c.first() {
                    self.eval(e, scope)?;
                }
                Ok(Flow::Next)
            }
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::Continue => Ok(Flow::Continue),
            NodeKind::Pass => Ok(Flow::Next),
            kind => Err(raise(
                "SystemError",
                format!("cannot execute {} at {}", kind.describe(), stmt.location),
            )),
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Exec<Value> {
        scope
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| raise("NameError", format!("name '{name}' is not defined")))
    }

    fn assign(&mut self, target: &'a Node, value: Value, scope: &mut Scope) -> Exec<()> {
        match target.kind {
            NodeKind::Var => {
                if let Some(name) = target.name() {
                    scope.insert(name.to_string(), value);
                }
                Ok(())
            }
            NodeKind::Subscript => {
                let container = self.eval(&target.children[0], scope)?;
                let index = self.eval(&target.children[1], scope)?;
                let updated = ops::set_item(container, &index, value)?;
                self.assign(&target.children[0], updated, scope)
            }
            NodeKind::Tuple | NodeKind::List => {
                let items = ops::iterate(&value)?;
                let expected = target.children.len();
                if items.len() < expected {
                    return Err(raise(
                        "ValueError",
                        format!(
                            "not enough values to unpack (expected {expected}, got {})",
                            items.len()
                        ),
                    ));
                }
                if items.len() > expected {
                    return Err(raise(
                        "ValueError",
                        format!("too many values to unpack (expected {expected})"),
                    ));
                }
                for (t, v) in target.children.iter().zip(items) {
                    self.assign(t, v, scope)?;
                }
                Ok(())
            }
            kind => Err(raise(
                "SyntaxError",
                format!("cannot assign to {}", kind.describe()),
            )),
        }
    }

    fn eval_all(&mut self, nodes: &'a [Node], scope: &mut Scope) -> Exec<Vec<Value>> {
        nodes.iter().map(|n| self.eval(n, scope)).collect()
    }

    fn eval(&mut self, node: &'a Node, scope: &mut Scope) -> Exec<Value> {
        let c = &node.children;
        match node.kind {
            NodeKind::Literal => Ok(node.literal_value().map(Value::from).unwrap_or(Value::None)),
            NodeKind::Var => self.lookup(node.name().unwrap_or_default(), scope),
            NodeKind::List => Ok(Value::List(self.eval_all(c, scope)?)),
            NodeKind::Tuple => Ok(Value::Tuple(self.eval_all(c, scope)?)),
            NodeKind::UnaryOp => {
                let operand = self.eval(&c[0], scope)?;
                ops::unary(node.operator().unwrap_or(Operator::Not), &operand)
            }
            NodeKind::BinaryOp => {
                let op = node.operator().unwrap_or(Operator::Add);
                let left = self.eval(&c[0], scope)?;
                match op {
                    Operator::And if !left.truthy() => Ok(left),
                    Operator::Or if left.truthy() => Ok(left),
                    Operator::And | Operator::Or => self.eval(&c[1], scope),
                    _ => {
                        let right = self.eval(&c[1], scope)?;
                        ops::binary(op, &left, &right)
                    }
                }
            }
            NodeKind::Subscript => {
                let container = self.eval(&c[0], scope)?;
                let index = self.eval(&c[1], scope)?;
                ops::get_item(&container, &index)
            }
            NodeKind::Call => {
                let name = node.name().unwrap_or_default();
                let args = self.eval_all(c, scope)?;
                if self.model.function(name).is_some() {
                    return self.call_user(name, args);
                }
                if !builtins::is_builtin(name) {
                    return Err(raise("NameError", format!("name '{name}' is not defined")));
                }
                self.tick()?;
                builtins::call(&mut self.console, name, args, self.limits.max_steps)
            }
            NodeKind::MethodCall => {
                let Some((receiver_node, arg_nodes)) = c.split_first() else {
                    return Err(raise("SyntaxError", "method call without receiver"));
                };
                let receiver = self.eval(receiver_node, scope)?;
                let args = self.eval_all(arg_nodes, scope)?;
                self.tick()?;
                let (result, updated) =
                    builtins::call_method(receiver, node.name().unwrap_or_default(), &args)?;
                if let Some(updated) = updated {
                    if matches!(receiver_node.kind, NodeKind::Var | NodeKind::Subscript) {
                        self.assign(receiver_node, updated, scope)?;
                    }
                }
                Ok(result)
            }
            kind => Err(raise(
                "SystemError",
                format!("cannot evaluate {} at {}", kind.describe(), node.location),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use code_runner::FaultKind;

    fn run(source: &str, entry: &str, args: Vec<Value>) -> Result<ExecutionResult, ExecutionFault> {
        let model = parse_program(source).unwrap();
        PythonInterpreter.execute(&model, entry, &Invocation::new(args), &RunLimits::default())
    }

    fn game(h: i64, s: i64, l: i64) -> Vec<Value> {
        vec![Value::List(vec![Value::Int(h), Value::Int(s), Value::Int(l)])]
    }

    const PROBLEM_E: &str = "def problemE(game) :
    health = game[0]
    score = game[1]
    level = game[2]

    alive = health > 0
    cond1 = level == 1 and score >= 1000
    cond2 = level == 2 and score >= 3000
    cond3 = score >= 7000

    game_over = not(alive and (cond1 or cond2 or cond3))

    return game_over
";

    #[test]
    fn evaluates_game_over_rule() {
        let cases = [
            ((1, 1000, 1), false),
            ((0, 1000, 1), true),
            ((1, 8993, 5), false),
            ((1, 500, 1), true),
            ((1, 3000, 2), false),
        ];
        for ((h, s, l), expected) in cases {
            let result = run(PROBLEM_E, "problemE", game(h, s, l)).unwrap();
            assert_eq!(result.return_value, Some(Value::Bool(expected)), "game {h},{s},{l}");
        }
    }

    #[test]
    fn execution_is_deterministic() {
        let source = "def f(n):\n    total = 0\n    for i in range(n):\n        if i % 2 == 0:\n            total += i\n        print(i)\n    return total\n";
        let a = run(source, "f", vec![Value::Int(6)]).unwrap();
        let b = run(source, "f", vec![Value::Int(6)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.return_value, Some(Value::Int(6)));
        assert_eq!(a.stdout.len(), 6);
        assert!(!a.trace.is_empty());
    }

    #[test]
    fn infinite_loop_times_out() {
        let source = "def f():\n    while True:\n        pass\n";
        let model = parse_program(source).unwrap();
        let limits = RunLimits {
            max_steps: 1_000,
            ..RunLimits::default()
        };
        let err = PythonInterpreter
            .execute(&model, "f", &Invocation::default(), &limits)
            .unwrap_err();
        assert_eq!(err.kind, FaultKind::Timeout);
    }

    #[test]
    fn runaway_recursion_is_a_runtime_error() {
        let err = run("def f(n):\n    return f(n + 1)\n", "f", vec![Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, FaultKind::RuntimeError);
        assert!(err.message.starts_with("RecursionError"));
    }

    #[test]
    fn missing_entry_is_reported() {
        let err = run("def g():\n    return 1\n", "f", vec![]).unwrap_err();
        assert_eq!(err.kind, FaultKind::MissingEntry);
    }

    #[test]
    fn globals_helpers_and_mutation() {
        let source = "BASE = 10\n\ndef helper(x):\n    return x + BASE\n\ndef f(xs):\n    out = []\n    for x in xs:\n        out.append(helper(x))\n    out[0] = -1\n    return out\n";
        let result = run(
            source,
            "f",
            vec![Value::List(vec![Value::Int(1), Value::Int(2)])],
        )
        .unwrap();
        assert_eq!(
            result.return_value,
            Some(Value::List(vec![Value::Int(-1), Value::Int(12)]))
        );
    }

    #[test]
    fn stdin_is_served_in_order() {
        let model = parse_program("def f():\n    a = int(input())\n    b = int(input())\n    print(a * b)\n").unwrap();
        let invocation = Invocation::default().with_stdin(vec!["6".into(), "7".into()]);
        let result = PythonInterpreter
            .execute(&model, "f", &invocation, &RunLimits::default())
            .unwrap();
        assert_eq!(result.stdout, vec!["42"]);
        assert_eq!(result.return_value, Some(Value::None));
    }

    #[test]
    fn runtime_errors_become_faults() {
        let err = run("def f(x):\n    return 10 / x\n", "f", vec![Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, FaultKind::RuntimeError);
        assert_eq!(err.message, "ZeroDivisionError: division by zero");
    }
}
