//! Error taxonomy, caret-underline source rendering, and runtime tracebacks.

use std::fmt;

use colored::Colorize;

use crate::context::Context;
use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalChar,
    ExpectedChar,
    InvalidSyntax,
    Runtime,
    IndexOutOfRange,
    DivisionByZero,
    IllegalOperation,
    UndefinedName,
    ArgumentCount,
    TypeMismatch,
}

impl ErrorKind {
    fn name(self) -> &'static str {
        match self {
            ErrorKind::IllegalChar => "Illegal Character",
            ErrorKind::ExpectedChar => "Expected Character",
            ErrorKind::InvalidSyntax => "Invalid Syntax",
            ErrorKind::Runtime => "Runtime Error",
            ErrorKind::IndexOutOfRange => "Index Error",
            ErrorKind::DivisionByZero => "Runtime Error",
            ErrorKind::IllegalOperation => "Runtime Error",
            ErrorKind::UndefinedName => "Runtime Error",
            ErrorKind::ArgumentCount => "Runtime Error",
            ErrorKind::TypeMismatch => "Runtime Error",
        }
    }

    fn is_runtime(self) -> bool {
        !matches!(self, ErrorKind::IllegalChar | ErrorKind::ExpectedChar | ErrorKind::InvalidSyntax)
    }
}

/// One frame of a runtime traceback, recorded at the call site.
#[derive(Debug, Clone)]
pub struct TracebackFrame {
    pub pos: Position,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct CloudyError {
    pub kind: ErrorKind,
    pub pos_start: Position,
    pub pos_end: Position,
    pub details: String,
    pub traceback: Vec<TracebackFrame>,
}

impl CloudyError {
    pub fn new(kind: ErrorKind, pos_start: Position, pos_end: Position, details: impl Into<String>) -> Self {
        CloudyError { kind, pos_start, pos_end, details: details.into(), traceback: Vec::new() }
    }

    /// Attaches the calling context chain as a traceback, innermost frame last in storage
    /// order (so printing top-to-bottom yields outermost-first, matching a conventional
    /// traceback).
    pub fn with_context(mut self, ctx: &Context) -> Self {
        if !self.kind.is_runtime() {
            return self;
        }
        let mut frames = Vec::new();
        let mut pos = self.pos_start.clone();
        let mut current = Some(ctx);
        while let Some(c) = current {
            frames.push(TracebackFrame { pos: pos.clone(), display_name: c.display_name.clone() });
            match (&c.parent_entry_pos, &c.parent) {
                (Some(p), Some(parent)) => {
                    pos = p.clone();
                    current = Some(parent.as_ref());
                }
                _ => break,
            }
        }
        frames.reverse();
        self.traceback = frames;
        self
    }

    fn traceback_string(&self) -> String {
        if self.traceback.is_empty() {
            return String::new();
        }
        let mut out = String::from("Traceback (most recent call last):\n");
        for frame in &self.traceback {
            out.push_str(&format!(
                "  File {}, line {}, in {}\n",
                frame.pos.filename, frame.pos.line + 1, frame.display_name
            ));
        }
        out
    }
}

impl fmt::Display for CloudyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.traceback_string())?;
        writeln!(f, "{}: {}", self.kind.name(), self.details)?;
        write!(f, "File {}, line {}", self.pos_start.filename, self.pos_start.line + 1)?;
        write!(f, "\n\n{}", string_with_arrows(&self.pos_start.source, &self.pos_start, &self.pos_end))
    }
}

impl std::error::Error for CloudyError {}

/// Renders the source excerpt spanning `pos_start..pos_end` with a caret-underline,
/// matching the reference implementation's `string_with_arrows` line for line.
pub fn string_with_arrows(text: &str, pos_start: &Position, pos_end: &Position) -> String {
    let bytes: Vec<char> = text.chars().collect();
    let mut result = String::new();

    let idx_start = rfind_newline(&bytes, pos_start.idx);
    let mut idx_end = find_newline(&bytes, (idx_start + 1) as usize);

    let line_count = pos_end.line.saturating_sub(pos_start.line) + 1;
    let mut idx_start = idx_start;

    for i in 0..line_count {
        let line = slice(&bytes, idx_start + 1, idx_end);
        let col_start = if i == 0 { pos_start.col } else { 0 };
        let col_end = if i == line_count - 1 { pos_end.col } else { line.chars().count() };

        result.push_str(&line);
        result.push('\n');
        let underline: String = " ".repeat(col_start) + &"^".repeat(col_end.saturating_sub(col_start).max(1));
        result.push_str(&underline.red().to_string());
        result.push('\n');

        idx_start = idx_end;
        idx_end = find_newline(&bytes, (idx_start + 1) as usize);
    }

    result.replace('\t', "")
}

fn rfind_newline(chars: &[char], from: usize) -> isize {
    let upper = from.min(chars.len());
    for i in (0..upper).rev() {
        if chars[i] == '\n' {
            return i as isize;
        }
    }
    -1
}

fn find_newline(chars: &[char], from: usize) -> isize {
    for i in from..chars.len() {
        if chars[i] == '\n' {
            return i as isize;
        }
    }
    chars.len() as isize
}

fn slice(chars: &[char], start: isize, end: isize) -> String {
    let start = start.max(0) as usize;
    let end = (end.max(0) as usize).min(chars.len()).max(start);
    chars[start..end].iter().collect()
}
