//! Indentation-aware tokenizer for the supported Python subset.
//!
//! Produces `Newline`, `Indent` and `Dedent` tokens the way CPython's tokenizer does:
//! blank and comment-only lines are skipped, and line breaks inside brackets or after
//! a backslash do not end a logical line.

use program_model::{Location, ModelError};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Punct(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub location: Location,
}

/// Longest first so that `**=` wins over `**` and `*`.
const PUNCTUATION: [&str; 33] = [
    "**=", "//=", "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "->", "+",
    "-", "*", "/", "%", "<", ">", "=", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "@",
];

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    depth: usize,
    indents: Vec<u32>,
    tokens: Vec<Token>,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ModelError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        depth: 0,
        indents: vec![0],
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn push(&mut self, tok: Tok, location: Location) {
        self.tokens.push(Token { tok, location });
    }

    fn last_is_newline(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.tok),
            None | Some(Tok::Newline) | Some(Tok::Indent) | Some(Tok::Dedent)
        )
    }

    fn run(&mut self) -> Result<(), ModelError> {
        let mut at_line_start = true;
        loop {
            if at_line_start && self.depth == 0 {
                if !self.indentation()? {
                    break;
                }
                at_line_start = false;
            }
            let Some(c) = self.peek() else { break };
            match c {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\\' if matches!(self.peek_at(1), Some('\n')) => {
                    self.bump();
                    self.bump();
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.bump();
                    self.bump();
                    self.bump();
                }
                '\n' => {
                    let at = self.here();
                    self.bump();
                    if self.depth == 0 {
                        if !self.last_is_newline() {
                            self.push(Tok::Newline, at);
                        }
                        at_line_start = true;
                    }
                }
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.name(),
                '"' | '\'' => self.string()?,
                _ => self.punctuation()?,
            }
        }

        let end = self.here();
        if !self.last_is_newline() {
            self.push(Tok::Newline, end);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent, end);
        }
        self.push(Tok::Eof, end);
        Ok(())
    }

    /// Measures the indentation of a new logical line, emitting `Indent`/`Dedent`.
    /// Returns `false` at end of input.
    fn indentation(&mut self) -> Result<bool, ModelError> {
        loop {
            let mut width = 0u32;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / 8 + 1) * 8,
                    '\x0c' | '\r' => {}
                    _ => break,
                }
                self.bump();
            }
            match self.peek() {
                None => return Ok(false),
                Some('\n') => {
                    self.bump();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {}
            }

            let at = self.here();
            let current = self.indents.last().copied().unwrap_or(0);
            if width > current {
                self.indents.push(width);
                self.push(Tok::Indent, at);
            } else {
                while self.indents.last().is_some_and(|&w| w > width) {
                    self.indents.pop();
                    self.push(Tok::Dedent, at);
                }
                if self.indents.last().copied().unwrap_or(0) != width {
                    return Err(ModelError::syntax(
                        at,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
            return Ok(true);
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn name(&mut self) {
        let at = self.here();
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_alphanumeric() || *c == '_') {
            name.push(c);
            self.bump();
        }
        self.push(Tok::Name(name), at);
    }

    fn number(&mut self) -> Result<(), ModelError> {
        let at = self.here();
        let mut text = String::new();
        let mut is_float = false;
        let digits = |lexer: &mut Lexer, text: &mut String| {
            while let Some(c) = lexer.peek().filter(|c| c.is_ascii_digit() || *c == '_') {
                if c != '_' {
                    text.push(c);
                }
                lexer.bump();
            }
        };

        digits(self, &mut text);
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            digits(self, &mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = self.peek_at(1).filter(|c| *c == '+' || *c == '-');
            let first_digit = if sign.is_some() { self.peek_at(2) } else { self.peek_at(1) };
            if first_digit.is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.bump();
                if let Some(s) = sign {
                    text.push(s);
                    self.bump();
                }
                digits(self, &mut text);
            }
        }
        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(ModelError::syntax(self.here(), "invalid decimal literal"));
        }

        let tok = if is_float {
            let text = if text.starts_with('.') { format!("0{text}") } else { text };
            text.parse::<f64>()
                .map(Tok::Float)
                .map_err(|_| ModelError::syntax(at, format!("invalid float literal '{text}'")))?
        } else {
            text.parse::<i64>()
                .map(Tok::Int)
                .map_err(|_| ModelError::syntax(at, format!("integer literal '{text}' is too large")))?
        };
        self.push(tok, at);
        Ok(())
    }

    fn string(&mut self) -> Result<(), ModelError> {
        let at = self.here();
        let quote = self.bump().unwrap_or('"');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ModelError::syntax(at, "unterminated string literal"));
            };
            match c {
                '\n' if !triple => {
                    return Err(ModelError::syntax(at, "unterminated string literal"));
                }
                c if c == quote && !triple => break,
                c if c == quote && self.peek() == Some(quote) && self.peek_at(1) == Some(quote) => {
                    self.bump();
                    self.bump();
                    break;
                }
                '\\' => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some('\n') => {}
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(ModelError::syntax(at, "unterminated string literal")),
                },
                c => value.push(c),
            }
        }
        self.push(Tok::Str(value), at);
        Ok(())
    }

    fn punctuation(&mut self) -> Result<(), ModelError> {
        let at = self.here();
        let rest = &self.chars[self.pos..];
        let found = PUNCTUATION.iter().copied().find(|p| {
            p.chars().count() <= rest.len() && p.chars().zip(rest.iter()).all(|(a, b)| a == *b)
        });
        let Some(p) = found else {
            let c = rest.first().copied().unwrap_or(' ');
            return Err(ModelError::syntax(at, format!("invalid character '{c}'")));
        };
        for _ in 0..p.len() {
            self.bump();
        }
        match p {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => {
                self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                    ModelError::syntax(at, format!("unmatched '{p}'"))
                })?;
            }
            _ => {}
        }
        self.push(Tok::Punct(p), at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn indentation_produces_block_tokens() {
        let toks = kinds("def f(x):\n    return x\n");
        assert_eq!(
            toks,
            vec![
                Tok::Name("def".into()),
                Tok::Name("f".into()),
                Tok::Punct("("),
                Tok::Name("x".into()),
                Tok::Punct(")"),
                Tok::Punct(":"),
                Tok::Newline,
                Tok::Indent,
                Tok::Name("return".into()),
                Tok::Name("x".into()),
                Tok::Newline,
                Tok::Dedent,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn brackets_join_lines_and_comments_vanish() {
        let toks = kinds("x = [1,\n     2]  # two\n\n# only a comment\ny = 2.5e1");
        assert!(toks.contains(&Tok::Int(2)));
        assert!(toks.contains(&Tok::Float(25.0)));
        assert_eq!(toks.iter().filter(|t| **t == Tok::Newline).count(), 2);
    }

    #[test]
    fn strings_and_escapes() {
        let toks = kinds("s = 'a\\'b' + \"\"\"doc\nline\"\"\"");
        assert!(toks.contains(&Tok::Str("a'b".into())));
        assert!(toks.contains(&Tok::Str("doc\nline".into())));
    }

    #[test]
    fn longest_punctuation_wins() {
        let toks = kinds("x **= 2 // 3");
        assert!(toks.contains(&Tok::Punct("**=")));
        assert!(toks.contains(&Tok::Punct("//")));
    }

    #[test]
    fn bad_dedent_is_a_syntax_error() {
        let err = tokenize("if x:\n        y = 1\n    z = 2\n").unwrap_err();
        assert_eq!(err.location().line, 3);
    }

    #[test]
    fn unterminated_string_reports_location() {
        let err = tokenize("x = 'abc\n").unwrap_err();
        assert_eq!(err.location(), Location::new(1, 5));
    }
}
