//! Indentation-aware character-stream to token-stream lexer.

use std::rc::Rc;

use crate::error::{CloudyError, ErrorKind};
use crate::position::{Position, Span};
use crate::token::{Token, TokenKind, KEYWORDS};

const DIGITS: &str = "0123456789";

pub struct Lexer {
    filename: Rc<String>,
    source: Rc<String>,
    chars: Vec<char>,
    pos: Position,
    current: Option<char>,
    /// True at the start of a physical line, before any non-whitespace has been seen.
    found_indent: bool,
}

impl Lexer {
    pub fn new(filename: &str, source: &str) -> Self {
        let filename = Rc::new(filename.to_string());
        let source = Rc::new(source.to_string());
        let chars: Vec<char> = source.chars().collect();
        let current = chars.first().copied();
        let pos = Position::new(0, 0, 0, filename.clone(), source.clone());
        Lexer { filename, source, chars, pos, current, found_indent: true }
    }

    fn advance(&mut self) {
        self.pos.advance(self.current);
        self.current = self.chars.get(self.pos.idx).copied();
    }

    fn span_here(&self) -> Span {
        Span::new(self.pos.clone(), self.pos.clone())
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, CloudyError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.current {
            if self.found_indent && (ch == ' ' || ch == '\t') {
                tokens.push(self.make_indent());
                continue;
            }
            self.found_indent = false;

            match ch {
                ' ' | '\t' => self.advance(),
                '#' => {
                    while let Some(c) = self.current {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '\n' => {
                    let start = self.pos.clone();
                    self.advance();
                    tokens.push(Token::new(TokenKind::Newline, Span::new(start, self.pos.clone())));
                    self.found_indent = true;
                }
                c if DIGITS.contains(c) => tokens.push(self.make_number()),
                c if c.is_ascii_alphabetic() || c == '_' => tokens.push(self.make_identifier()),
                '\'' | '"' => tokens.push(self.make_string(ch)?),
                '+' => tokens.push(self.single(TokenKind::Plus)),
                '-' => tokens.push(self.single(TokenKind::Minus)),
                '%' => tokens.push(self.single(TokenKind::Modu)),
                '(' => tokens.push(self.single(TokenKind::LPar)),
                ')' => tokens.push(self.single(TokenKind::RPar)),
                '[' => tokens.push(self.single(TokenKind::LSquare)),
                ']' => tokens.push(self.single(TokenKind::RSquare)),
                '{' => tokens.push(self.single(TokenKind::LCurly)),
                '}' => tokens.push(self.single(TokenKind::RCurly)),
                ',' => tokens.push(self.single(TokenKind::Comma)),
                ':' => tokens.push(self.single(TokenKind::Colon)),
                '*' => tokens.push(self.make_doubled('*', TokenKind::Mult, TokenKind::Pow)),
                '/' => tokens.push(self.make_doubled('/', TokenKind::Div, TokenKind::FDiv)),
                '=' => tokens.push(self.make_doubled('=', TokenKind::Eq, TokenKind::Ee)),
                '<' => tokens.push(self.make_doubled('=', TokenKind::Lt, TokenKind::Lte)),
                '>' => tokens.push(self.make_doubled('=', TokenKind::Gt, TokenKind::Gte)),
                '!' => tokens.push(self.make_not_equals()?),
                other => {
                    let start = self.pos.clone();
                    self.advance();
                    return Err(CloudyError::new(
                        ErrorKind::IllegalChar,
                        start,
                        self.pos.clone(),
                        format!("'{}'", other),
                    ));
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, self.span_here()));
        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos.clone();
        self.advance();
        Token::new(kind, Span::new(start, self.pos.clone()))
    }

    /// Consumes `base`, then `suffix` if followed immediately by `ch`, else `fallback`.
    fn make_doubled(&mut self, ch: char, fallback: TokenKind, doubled: TokenKind) -> Token {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(ch) {
            self.advance();
            Token::new(doubled, Span::new(start, self.pos.clone()))
        } else {
            Token::new(fallback, Span::new(start, self.pos.clone()))
        }
    }

    fn make_not_equals(&mut self) -> Result<Token, CloudyError> {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some('=') {
            self.advance();
            return Ok(Token::new(TokenKind::Ne, Span::new(start, self.pos.clone())));
        }
        Err(CloudyError::new(ErrorKind::ExpectedChar, start, self.pos.clone(), "'=' (after '!')"))
    }

    fn make_indent(&mut self) -> Token {
        let start = self.pos.clone();
        let mut width = 0usize;
        while let Some(c) = self.current {
            match c {
                ' ' => {
                    width += 1;
                    self.advance();
                }
                '\t' => {
                    width += 4;
                    self.advance();
                }
                _ => break,
            }
        }
        Token::new(TokenKind::Space(width), Span::new(start, self.pos.clone()))
    }

    fn make_number(&mut self) -> Token {
        let start = self.pos.clone();
        let mut text = String::new();
        let mut dot_count = 0;

        while let Some(c) = self.current {
            if DIGITS.contains(c) {
                text.push(c);
                self.advance();
            } else if c == '.' && dot_count == 0 {
                dot_count += 1;
                text.push('.');
                self.advance();
            } else {
                break;
            }
        }

        let span = Span::new(start, self.pos.clone());
        if dot_count == 0 {
            Token::new(TokenKind::Int(text.parse().unwrap_or(0)), span)
        } else {
            Token::new(TokenKind::Float(text.parse().unwrap_or(0.0)), span)
        }
    }

    fn make_identifier(&mut self) -> Token {
        let start = self.pos.clone();
        let mut text = String::new();

        while let Some(c) = self.current {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let span = Span::new(start, self.pos.clone());
        match text.as_str() {
            "true" => Token::new(TokenKind::Bool(true), span),
            "false" => Token::new(TokenKind::Bool(false), span),
            _ if KEYWORDS.contains(&text.as_str()) => {
                let word = KEYWORDS.iter().find(|k| **k == text).unwrap();
                Token::new(TokenKind::Keyword(word), span)
            }
            _ => Token::new(TokenKind::Identifier(text), span),
        }
    }

    fn make_string(&mut self, quote: char) -> Result<Token, CloudyError> {
        let start = self.pos.clone();
        self.advance();
        let mut text = String::new();
        let mut closed = false;

        while let Some(c) = self.current {
            if c == quote {
                self.advance();
                closed = true;
                break;
            }
            if c == '\\' {
                self.advance();
                match self.current {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('\'') => text.push('\''),
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => break,
                }
                self.advance();
                continue;
            }
            text.push(c);
            self.advance();
        }

        if !closed {
            return Err(CloudyError::new(
                ErrorKind::ExpectedChar,
                start,
                self.pos.clone(),
                format!("closing '{}'", quote),
            ));
        }

        Ok(Token::new(TokenKind::String(text), Span::new(start, self.pos.clone())))
    }
}

/// Convenience wrapper matching the reference entry point's `(tokens, error)` shape.
pub fn tokenize(filename: &str, source: &str) -> Result<Vec<Token>, CloudyError> {
    Lexer::new(filename, source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize("<test>", src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_arithmetic() {
        assert_eq!(
            kinds("2 + 3 * 4"),
            vec![
                TokenKind::Int(2),
                TokenKind::Plus,
                TokenKind::Int(3),
                TokenKind::Mult,
                TokenKind::Int(4),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_indent_token() {
        let ks = kinds("if true:\n    print(1)\n");
        assert!(ks.iter().any(|k| matches!(k, TokenKind::Space(4))));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize("<test>", "\"abc").is_err());
    }

    #[test]
    fn doubled_operators() {
        assert_eq!(kinds("== != <= >= **"), vec![
            TokenKind::Ee,
            TokenKind::Ne,
            TokenKind::Lte,
            TokenKind::Gte,
            TokenKind::Pow,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn bang_without_eq_is_an_error() {
        assert!(tokenize("<test>", "!x").is_err());
    }
}
