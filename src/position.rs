//! Source positions and spans used by tokens, AST nodes and errors.

use std::rc::Rc;

use serde::Serialize;

/// A single point in a source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub idx: usize,
    pub line: usize,
    pub col: usize,
    pub filename: Rc<String>,
    pub source: Rc<String>,
}

impl Position {
    pub fn new(idx: usize, line: usize, col: usize, filename: Rc<String>, source: Rc<String>) -> Self {
        Position { idx, line, col, filename, source }
    }

    /// Advances past `ch`, rolling the column back to zero on a newline.
    pub fn advance(&mut self, ch: Option<char>) -> &mut Self {
        self.idx += 1;
        self.col += 1;

        if ch == Some('\n') {
            self.line += 1;
            self.col = 0;
        }

        self
    }
}

/// A half-open-in-spirit range between two `Position`s, used for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }
}
