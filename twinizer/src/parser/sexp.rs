//! S-expression reader for the modern KiCad file formats.
//!
//! A record is a fully parenthesized group: a head symbol followed by an
//! ordered list of child atoms and groups. Quoted strings may contain spaces
//! and the usual backslash escapes. Malformed quoting or unbalanced
//! parentheses fail with a [`ParseError`] carrying the byte offset and a
//! short context snippet; the reader does not attempt recovery.

use thiserror::Error;

/// Fatal tokenizer error. Carries the byte offset of the failure, the line it
/// fell on, and a short snippet of the surrounding input.
#[derive(Debug, Clone, Error)]
#[error("malformed input at line {line} (byte {offset}): {message}, near `{context}`")]
pub struct ParseError {
    pub offset: usize,
    pub line: usize,
    pub message: String,
    pub context: String,
}

impl ParseError {
    pub fn new(input: &str, offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            offset,
            line: line_at(input, offset),
            message: message.into(),
            context: snippet(input, offset),
        }
    }
}

/// 1-based line number containing `offset`.
fn line_at(input: &str, offset: usize) -> usize {
    input
        .as_bytes()
        .iter()
        .take(offset)
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Up to ~40 bytes of context around `offset`, clamped to char boundaries.
fn snippet(input: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(20);
    while start > 0 && !input.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (offset + 20).min(input.len());
    while end < input.len() && !input.is_char_boundary(end) {
        end += 1;
    }
    input[start..end].trim().replace('\n', " ")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Head symbol of a group: the first element, if it is an atom.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    /// First child group whose head symbol is `key`.
    pub fn child(&self, key: &str) -> Option<&Sexp> {
        self.as_list()?
            .iter()
            .find(|item| item.head() == Some(key))
    }

    /// All child groups whose head symbol is `key`, in order.
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Sexp> + 'a {
        self.as_list()
            .unwrap_or(&[])
            .iter()
            .filter(move |item| item.head() == Some(key))
    }

    /// For a `(key value)` child, the value atom.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.child(key)?.as_list()?.get(1)?.as_atom()
    }

    pub fn f64_of(&self, key: &str) -> Option<f64> {
        self.value_of(key)?.parse().ok()
    }

    pub fn u32_of(&self, key: &str) -> Option<u32> {
        self.value_of(key)?.parse().ok()
    }

    /// Positional atom within a group, skipping the head symbol.
    /// `arg(0)` is the first argument after the head.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.as_list()?.get(index + 1)?.as_atom()
    }

    pub fn f64_arg(&self, index: usize) -> Option<f64> {
        self.arg(index)?.parse().ok()
    }
}

/// Single forward pass over the input; byte offsets are tracked for error
/// reporting. Not restartable.
pub struct SexpReader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SexpReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the single top-level form (KiCad files contain exactly one).
    pub fn parse(&mut self) -> Result<Sexp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(self.err("unexpected end of input"));
        }
        let form = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(self.err("trailing input after top-level group"));
        }
        Ok(form)
    }

    /// Next top-level form, or `None` at end of input.
    pub fn next_form(&mut self) -> Option<Result<Sexp, ParseError>> {
        self.skip_whitespace();
        if self.is_eof() {
            return None;
        }
        Some(self.parse_sexp())
    }

    fn parse_sexp(&mut self) -> Result<Sexp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(self.err("unexpected end of input"));
        }
        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(self.err("unbalanced closing parenthesis")),
            '"' => self.parse_string(),
            _ => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<Sexp, ParseError> {
        let open_at = self.pos;
        self.advance(); // consume '('
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_eof() {
                return Err(ParseError::new(
                    self.input,
                    open_at,
                    "unbalanced parenthesis: group is never closed",
                ));
            }
            if self.peek() == ')' {
                self.advance();
                break;
            }
            items.push(self.parse_sexp()?);
        }
        Ok(Sexp::List(items))
    }

    fn parse_string(&mut self) -> Result<Sexp, ParseError> {
        let open_at = self.pos;
        self.advance(); // consume '"'
        let mut s = String::new();
        let mut escaped = false;
        while !self.is_eof() {
            let ch = self.peek();
            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    _ => s.push(ch),
                }
                escaped = false;
                self.advance();
            } else if ch == '\\' {
                escaped = true;
                self.advance();
            } else if ch == '"' {
                self.advance();
                return Ok(Sexp::Atom(s));
            } else {
                s.push(ch);
                self.advance();
            }
        }
        Err(ParseError::new(
            self.input,
            open_at,
            "unterminated string literal",
        ))
    }

    fn parse_symbol(&mut self) -> Result<Sexp, ParseError> {
        let start = self.pos;
        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            return Err(self.err("empty symbol"));
        }
        Ok(Sexp::Atom(self.input[start..self.pos].to_string()))
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(ch) = self.input[self.pos..].chars().next() {
            self.pos += ch.len_utf8();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn err(&self, message: &str) -> ParseError {
        ParseError::new(self.input, self.pos, message)
    }
}

impl<'a> Iterator for SexpReader<'a> {
    type Item = Result<Sexp, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_form()
    }
}
