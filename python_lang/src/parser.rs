//! Recursive-descent parser from Python source to a normalized [`ProgramModel`].
//!
//! Normalization performed while building the tree:
//! - parentheses are dropped; precedence is carried by the tree shape
//! - `elif` becomes an `If` nested alone in the else block
//! - a missing `else` becomes an empty block
//! - `x op= e` becomes `x = x op e`
//! - `a < b < c` becomes `a < b and b < c`
//! - `is` / `is not` become `==` / `!=`
//! - bare `return` becomes `return None`
//! - `pass`, docstrings and imports are dropped
//!
//! At module level only function definitions and assignments are kept; other
//! top-level statements (driver code, `if __name__ == ...` blocks) are discarded.

use crate::lexer::{Tok, Token, tokenize};
use program_model::{Literal, Location, ModelError, Node, NodeKind, NodeValue, Operator, ProgramModel, ProgramParser};
use tracing::debug;

const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Parser plugin for the supported Python subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonParser;

impl ProgramParser for PythonParser {
    fn parse(&self, source: &str) -> Result<ProgramModel, ModelError> {
        parse_program(source)
    }
}

pub fn parse_program(source: &str) -> Result<ProgramModel, ModelError> {
    let mut parser = Parser::new(tokenize(source)?);
    let root = parser.program()?;
    Ok(ProgramModel::new("", root))
}

/// Parses a single expression (or comma-separated tuple of expressions).
pub fn parse_expression(source: &str) -> Result<Node, ModelError> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.testlist()?;
    while parser.eat(&Tok::Newline) {}
    if !parser.check(&Tok::Eof) {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    in_function: bool,
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Name(n) => format!("'{n}'"),
        Tok::Int(i) => format!("'{i}'"),
        Tok::Float(x) => format!("'{x}'"),
        Tok::Str(_) => "string literal".to_string(),
        Tok::Punct(p) => format!("'{p}'"),
        Tok::Newline => "end of line".to_string(),
        Tok::Indent => "indent".to_string(),
        Tok::Dedent => "dedent".to_string(),
        Tok::Eof => "end of file".to_string(),
    }
}

fn comparison_op(tok: &Tok) -> Option<Operator> {
    match tok {
        Tok::Punct("==") => Some(Operator::Eq),
        Tok::Punct("!=") => Some(Operator::NotEq),
        Tok::Punct("<") => Some(Operator::Lt),
        Tok::Punct("<=") => Some(Operator::LtE),
        Tok::Punct(">") => Some(Operator::Gt),
        Tok::Punct(">=") => Some(Operator::GtE),
        _ => None,
    }
}

fn augmented_op(tok: &Tok) -> Option<Operator> {
    match tok {
        Tok::Punct("+=") => Some(Operator::Add),
        Tok::Punct("-=") => Some(Operator::Sub),
        Tok::Punct("*=") => Some(Operator::Mul),
        Tok::Punct("/=") => Some(Operator::Div),
        Tok::Punct("//=") => Some(Operator::FloorDiv),
        Tok::Punct("%=") => Some(Operator::Mod),
        Tok::Punct("**=") => Some(Operator::Pow),
        _ => None,
    }
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            in_function: false,
        }
    }

    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .map(|t| &t.tok)
            .unwrap_or(&Tok::Eof)
    }

    fn loc(&self) -> Location {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.location)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, tok: &Tok) -> bool {
        self.peek() == tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.check(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Tok::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.check_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ModelError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{p}'")))
        }
    }

    fn check_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Name(n) if n == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), ModelError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{kw}'")))
        }
    }

    fn expect_name(&mut self) -> Result<String, ModelError> {
        match self.peek().clone() {
            Tok::Name(n) if !KEYWORDS.contains(&n.as_str()) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn unexpected(&self, expected: &str) -> ModelError {
        ModelError::syntax(
            self.loc(),
            format!("invalid syntax: expected {expected} but found {}", describe(self.peek())),
        )
    }

    fn unsupported(&self, what: &str) -> ModelError {
        ModelError::unsupported(self.loc(), format!("{what} are not supported"))
    }

    /// Whether the current token can begin an expression.
    fn starts_expression(&self) -> bool {
        match self.peek() {
            Tok::Name(n) => {
                !KEYWORDS.contains(&n.as_str())
                    || matches!(n.as_str(), "True" | "False" | "None" | "not" | "lambda")
            }
            Tok::Int(_) | Tok::Float(_) | Tok::Str(_) => true,
            Tok::Punct(p) => matches!(*p, "(" | "[" | "{" | "-" | "+"),
            _ => false,
        }
    }

    // ---------------------------------------------------------------- statements

    fn program(&mut self) -> Result<Node, ModelError> {
        let start = Location::new(1, 1);
        let mut module = Vec::new();
        let mut functions = Vec::new();

        while !self.check(&Tok::Eof) {
            if self.eat(&Tok::Newline) {
                continue;
            }
            for stmt in self.statement()? {
                match stmt.kind {
                    NodeKind::Function => functions.push(stmt),
                    NodeKind::Assign => module.push(stmt),
                    kind => debug!(?kind, location = %stmt.location, "discarding top-level statement"),
                }
            }
        }

        let mut children = vec![Node::block(module, start)];
        children.extend(functions);
        Ok(Node::new(NodeKind::Program, start).with_children(children))
    }

    fn statement(&mut self) -> Result<Vec<Node>, ModelError> {
        let Tok::Name(word) = self.peek().clone() else {
            if self.check(&Tok::Indent) {
                return Err(ModelError::syntax(self.loc(), "unexpected indent"));
            }
            return self.simple_line();
        };
        match word.as_str() {
            "def" => Ok(vec![self.function()?]),
            "if" => Ok(vec![self.if_statement()?]),
            "while" => Ok(vec![self.while_statement()?]),
            "for" => Ok(vec![self.for_statement()?]),
            "class" => Err(self.unsupported("class definitions")),
            "try" => Err(self.unsupported("try statements")),
            "with" => Err(self.unsupported("with statements")),
            "async" => Err(self.unsupported("async functions")),
            _ => self.simple_line(),
        }
    }

    fn function(&mut self) -> Result<Node, ModelError> {
        if self.in_function {
            return Err(self.unsupported("nested function definitions"));
        }
        let at = self.loc();
        self.expect_keyword("def")?;
        let name = self.expect_name()?;
        self.expect_punct("(")?;

        let mut params: Vec<Node> = Vec::new();
        while !self.check_punct(")") {
            if self.check_punct("*") || self.check_punct("**") {
                return Err(self.unsupported("variadic parameters"));
            }
            let p_at = self.loc();
            let p = self.expect_name()?;
            if params.iter().any(|q| q.name() == Some(p.as_str())) {
                return Err(ModelError::syntax(
                    p_at,
                    format!("duplicate argument '{p}' in function definition"),
                ));
            }
            if self.eat_punct(":") {
                self.test()?;
            }
            if self.check_punct("=") {
                return Err(self.unsupported("default parameter values"));
            }
            params.push(Node::new(NodeKind::Param, p_at).with_value(NodeValue::Name(p)));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        if self.eat_punct("->") {
            self.test()?;
        }
        self.expect_punct(":")?;

        self.in_function = true;
        let body = self.suite();
        self.in_function = false;

        params.push(body?);
        Ok(Node::new(NodeKind::Function, at)
            .with_value(NodeValue::Name(name))
            .with_children(params))
    }

    /// A block after `:`, either indented on following lines or inline.
    fn suite(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        if !self.eat(&Tok::Newline) {
            return Ok(Node::block(self.simple_line()?, at));
        }
        if !self.eat(&Tok::Indent) {
            return Err(ModelError::syntax(self.loc(), "expected an indented block"));
        }
        let mut statements = Vec::new();
        while !self.eat(&Tok::Dedent) {
            if self.check(&Tok::Eof) {
                break;
            }
            if self.eat(&Tok::Newline) {
                continue;
            }
            statements.extend(self.statement()?);
        }
        Ok(Node::block(statements, at))
    }

    fn if_statement(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        self.advance(); // `if` or `elif`
        let cond = self.test()?;
        self.expect_punct(":")?;
        let then = self.suite()?;

        let otherwise = if self.check_keyword("elif") {
            let elif_at = self.loc();
            Node::block(vec![self.if_statement()?], elif_at)
        } else if self.check_keyword("else") {
            self.advance();
            self.expect_punct(":")?;
            self.suite()?
        } else {
            Node::block(Vec::new(), at)
        };

        Ok(Node::new(NodeKind::If, at).with_children(vec![cond, then, otherwise]))
    }

    fn while_statement(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        self.expect_keyword("while")?;
        let cond = self.test()?;
        self.expect_punct(":")?;
        let body = self.suite()?;
        if self.check_keyword("else") {
            return Err(self.unsupported("loop else clauses"));
        }
        Ok(Node::new(NodeKind::While, at).with_children(vec![cond, body]))
    }

    fn for_statement(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        self.expect_keyword("for")?;

        let target_at = self.loc();
        let mut targets = vec![self.atom_expr()?];
        while self.eat_punct(",") {
            if self.check_keyword("in") {
                break;
            }
            targets.push(self.atom_expr()?);
        }
        let target = if targets.len() == 1 {
            targets.remove(0)
        } else {
            Node::new(NodeKind::Tuple, target_at).with_children(targets)
        };
        check_target(&target)?;

        self.expect_keyword("in")?;
        let iter = self.testlist()?;
        self.expect_punct(":")?;
        let body = self.suite()?;
        if self.check_keyword("else") {
            return Err(self.unsupported("loop else clauses"));
        }
        Ok(Node::new(NodeKind::For, at).with_children(vec![target, iter, body]))
    }

    /// One physical line of `;`-separated simple statements.
    fn simple_line(&mut self) -> Result<Vec<Node>, ModelError> {
        let mut out = Vec::new();
        loop {
            out.extend(self.simple_statement()?);
            if !self.eat_punct(";") || self.check(&Tok::Newline) {
                break;
            }
        }
        if !self.eat(&Tok::Newline) {
            return Err(self.unexpected("end of line"));
        }
        Ok(out)
    }

    fn simple_statement(&mut self) -> Result<Option<Node>, ModelError> {
        let at = self.loc();
        if let Tok::Name(word) = self.peek().clone() {
            match word.as_str() {
                "pass" => {
                    self.advance();
                    return Ok(None);
                }
                "break" => {
                    self.advance();
                    return Ok(Some(Node::new(NodeKind::Break, at)));
                }
                "continue" => {
                    self.advance();
                    return Ok(Some(Node::new(NodeKind::Continue, at)));
                }
                "return" => {
                    self.advance();
                    if !self.in_function {
                        return Err(ModelError::syntax(at, "'return' outside function"));
                    }
                    let value = if self.starts_expression() {
                        self.testlist()?
                    } else {
                        Node::literal(Literal::None, at)
                    };
                    return Ok(Some(Node::new(NodeKind::Return, at).with_children(vec![value])));
                }
                "import" | "from" => {
                    while !self.check(&Tok::Newline) && !self.check_punct(";") && !self.check(&Tok::Eof) {
                        self.advance();
                    }
                    return Ok(None);
                }
                "global" | "nonlocal" => return Err(self.unsupported("global declarations")),
                "del" | "assert" | "raise" | "yield" => {
                    return Err(self.unsupported(&format!("'{word}' statements")));
                }
                _ => {}
            }
        }

        let first = self.testlist()?;

        if self.eat_punct("=") {
            check_target(&first)?;
            let value = self.testlist()?;
            if self.check_punct("=") {
                return Err(self.unsupported("chained assignments"));
            }
            return Ok(Some(Node::new(NodeKind::Assign, at).with_children(vec![first, value])));
        }

        if let Some(op) = augmented_op(self.peek()) {
            if !matches!(first.kind, NodeKind::Var | NodeKind::Subscript) {
                return Err(ModelError::syntax(
                    at,
                    "illegal expression for augmented assignment",
                ));
            }
            self.advance();
            let value = self.testlist()?;
            let combined = Node::binary(op, first.clone(), value, at);
            return Ok(Some(
                Node::new(NodeKind::Assign, at).with_children(vec![first, combined]),
            ));
        }

        if self.check_punct(":") {
            return Err(self.unsupported("annotated assignments"));
        }

        if matches!(first.literal_value(), Some(Literal::Str(_))) {
            return Ok(None);
        }
        Ok(Some(Node::new(NodeKind::ExprStmt, at).with_children(vec![first])))
    }

    // --------------------------------------------------------------- expressions

    fn testlist(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let first = self.test()?;
        if !self.check_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            if !self.starts_expression() {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Node::new(NodeKind::Tuple, at).with_children(items))
    }

    fn test(&mut self) -> Result<Node, ModelError> {
        if self.check_keyword("lambda") {
            return Err(self.unsupported("lambda expressions"));
        }
        let expr = self.or_test()?;
        if self.check_keyword("if") {
            return Err(self.unsupported("conditional expressions"));
        }
        if self.check_keyword("for") {
            return Err(self.unsupported("comprehensions"));
        }
        Ok(expr)
    }

    fn or_test(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let mut left = self.and_test()?;
        while self.eat_keyword("or") {
            let right = self.and_test()?;
            left = Node::binary(Operator::Or, left, right, at);
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let mut left = self.not_test()?;
        while self.eat_keyword("and") {
            let right = self.not_test()?;
            left = Node::binary(Operator::And, left, right, at);
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        if self.eat_keyword("not") {
            let operand = self.not_test()?;
            return Ok(Node::unary(Operator::Not, operand, at));
        }
        self.comparison()
    }

    fn comparison_operator(&mut self) -> Option<Operator> {
        if let Some(op) = comparison_op(self.peek()) {
            self.advance();
            return Some(op);
        }
        if self.eat_keyword("in") {
            return Some(Operator::In);
        }
        if self.check_keyword("not") && matches!(self.peek_at(1), Tok::Name(n) if n == "in") {
            self.advance();
            self.advance();
            return Some(Operator::NotIn);
        }
        if self.eat_keyword("is") {
            return Some(if self.eat_keyword("not") { Operator::NotEq } else { Operator::Eq });
        }
        None
    }

    fn comparison(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let first = self.arith()?;
        let mut operands = vec![first];
        let mut ops = Vec::new();
        while let Some(op) = self.comparison_operator() {
            ops.push(op);
            operands.push(self.arith()?);
        }
        if ops.is_empty() {
            return Ok(operands.remove(0));
        }

        let mut result: Option<Node> = None;
        for (i, op) in ops.into_iter().enumerate() {
            let pair = Node::binary(op, operands[i].clone(), operands[i + 1].clone(), at);
            result = Some(match result {
                None => pair,
                Some(acc) => Node::binary(Operator::And, acc, pair, at),
            });
        }
        Ok(result.unwrap_or_else(|| operands.remove(0)))
    }

    fn arith(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Punct("+") => Operator::Add,
                Tok::Punct("-") => Operator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Node::binary(op, left, right, at);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Punct("*") => Operator::Mul,
                Tok::Punct("/") => Operator::Div,
                Tok::Punct("//") => Operator::FloorDiv,
                Tok::Punct("%") => Operator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            left = Node::binary(op, left, right, at);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let op = match self.peek() {
            Tok::Punct("-") => Operator::Neg,
            Tok::Punct("+") => Operator::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.factor()?;
        Ok(Node::unary(op, operand, at))
    }

    fn power(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let base = self.atom_expr()?;
        if self.eat_punct("**") {
            let exponent = self.factor()?;
            return Ok(Node::binary(Operator::Pow, base, exponent, at));
        }
        Ok(base)
    }

    fn atom_expr(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        let mut expr = self.atom()?;
        loop {
            if self.check_punct("(") {
                let Some(name) = expr.name().filter(|_| expr.kind == NodeKind::Var) else {
                    return Err(self.unsupported("calls of computed callables"));
                };
                let name = name.to_string();
                self.advance();
                let args = self.arguments()?;
                expr = Node::new(NodeKind::Call, at)
                    .with_value(NodeValue::Name(name))
                    .with_children(args);
            } else if self.eat_punct(".") {
                let method = self.expect_name()?;
                if !self.eat_punct("(") {
                    return Err(self.unsupported("attribute accesses"));
                }
                let mut children = vec![expr];
                children.extend(self.arguments()?);
                expr = Node::new(NodeKind::MethodCall, at)
                    .with_value(NodeValue::Name(method))
                    .with_children(children);
            } else if self.eat_punct("[") {
                if self.check_punct(":") {
                    return Err(self.unsupported("slices"));
                }
                let index = self.testlist()?;
                if self.check_punct(":") {
                    return Err(self.unsupported("slices"));
                }
                self.expect_punct("]")?;
                expr = Node::new(NodeKind::Subscript, at).with_children(vec![expr, index]);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Call arguments after the opening parenthesis, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Node>, ModelError> {
        let mut args = Vec::new();
        while !self.check_punct(")") {
            if self.check_punct("*") || self.check_punct("**") {
                return Err(self.unsupported("argument unpacking"));
            }
            if matches!(self.peek(), Tok::Name(_)) && matches!(self.peek_at(1), Tok::Punct("=")) {
                return Err(self.unsupported("keyword arguments"));
            }
            args.push(self.test()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn atom(&mut self) -> Result<Node, ModelError> {
        let at = self.loc();
        match self.peek().clone() {
            Tok::Name(n) => {
                let node = match n.as_str() {
                    "True" => Node::literal(Literal::Bool(true), at),
                    "False" => Node::literal(Literal::Bool(false), at),
                    "None" => Node::literal(Literal::None, at),
                    kw if KEYWORDS.contains(&kw) => return Err(self.unexpected("an expression")),
                    _ => Node::var(n.clone(), at),
                };
                self.advance();
                Ok(node)
            }
            Tok::Int(i) => {
                self.advance();
                Ok(Node::literal(Literal::Int(i), at))
            }
            Tok::Float(x) => {
                self.advance();
                Ok(Node::literal(Literal::Float(x), at))
            }
            Tok::Str(_) => {
                let mut text = String::new();
                while let Tok::Str(s) = self.peek().clone() {
                    text.push_str(&s);
                    self.advance();
                }
                Ok(Node::literal(Literal::Str(text), at))
            }
            Tok::Punct("(") => {
                self.advance();
                if self.eat_punct(")") {
                    return Ok(Node::new(NodeKind::Tuple, at));
                }
                let first = self.test()?;
                if self.eat_punct(")") {
                    return Ok(first);
                }
                let mut items = vec![first];
                while self.eat_punct(",") {
                    if self.check_punct(")") {
                        break;
                    }
                    items.push(self.test()?);
                }
                self.expect_punct(")")?;
                Ok(Node::new(NodeKind::Tuple, at).with_children(items))
            }
            Tok::Punct("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.check_punct("]") {
                    items.push(self.test()?);
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct("]")?;
                Ok(Node::new(NodeKind::List, at).with_children(items))
            }
            Tok::Punct("{") => Err(self.unsupported("dict and set displays")),
            _ => Err(self.unexpected("an expression")),
        }
    }
}

fn check_target(target: &Node) -> Result<(), ModelError> {
    match target.kind {
        NodeKind::Var | NodeKind::Subscript => Ok(()),
        NodeKind::Tuple | NodeKind::List if !target.children.is_empty() => {
            target.children.iter().try_for_each(check_target)
        }
        kind => Err(ModelError::syntax(
            target.location,
            format!("cannot assign to {}", kind.describe()),
        )),
    }
}
