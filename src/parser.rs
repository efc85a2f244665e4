//! Recursive-descent parser producing an AST from a token stream.

use std::mem::discriminant;

use crate::ast::{BinOp, ElseCase, IfCase, Node, NumberLit, UnaryOp};
use crate::error::{CloudyError, ErrorKind};
use crate::position::Span;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    indent_level: usize,
}

type PResult = Result<Node, CloudyError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, indent_level: 0 }
    }

    pub fn parse(mut self) -> PResult {
        if matches!(self.peek().kind, TokenKind::Space(_)) {
            return Err(self.error_at_current("unexpected indent"));
        }
        let program = self.statements()?;
        if !matches!(self.peek().kind, TokenKind::Eof) {
            return Err(self.error_at_current("expected end of input"));
        }
        Ok(program)
    }

    // --- cursor helpers -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check_newline(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline)
    }

    fn check_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn error_at_current(&self, details: impl Into<String>) -> CloudyError {
        let span = self.peek().span.clone();
        CloudyError::new(ErrorKind::InvalidSyntax, span.start, span.end, details)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, CloudyError> {
        if discriminant(&self.peek().kind) == discriminant(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(format!("expected {:?}", kind)))
        }
    }

    // --- statements / indentation ---------------------------------------

    fn statements(&mut self) -> PResult {
        let outer_start = self.peek().span.start.clone();
        let mut stmts = Vec::new();

        while self.check_newline() {
            self.advance();
        }
        if self.check_eof() {
            let span = Span::new(outer_start.clone(), outer_start);
            return Ok(Node::Statements { statements: stmts, span });
        }

        let local_indent = match self.peek().kind {
            TokenKind::Space(n) => {
                if n < self.indent_level {
                    return Err(self.error_at_current("expected indent"));
                }
                self.advance();
                let local = n - self.indent_level;
                self.indent_level += local;
                local
            }
            _ => {
                if self.indent_level > 0 {
                    return Err(self.error_at_current("expected indent"));
                }
                0
            }
        };

        stmts.push(self.statement()?);

        loop {
            let save = self.pos;
            let mut saw_newline = false;
            while self.check_newline() {
                self.advance();
                saw_newline = true;
            }
            if !saw_newline || self.check_eof() {
                self.pos = save;
                break;
            }

            match self.peek().kind {
                TokenKind::Space(n) if n == self.indent_level => {
                    let attempt_start = self.pos;
                    self.advance();
                    match self.statement() {
                        Ok(stmt) => stmts.push(stmt),
                        Err(err) => {
                            // Speculative: the SPACE may just be a blank line's
                            // trailing whitespace (width happens to match the
                            // block's indent) rather than the start of a real
                            // statement. Rewind, and if a NEWLINE/EOF follows
                            // the SPACE, it was blank — skip it and keep
                            // scanning. Otherwise this was a genuine error.
                            self.pos = attempt_start;
                            self.advance();
                            if self.check_newline() || self.check_eof() {
                                continue;
                            }
                            self.pos = attempt_start;
                            return Err(err);
                        }
                    }
                }
                TokenKind::Space(n) if n > self.indent_level - local_indent && n < self.indent_level => {
                    return Err(self.error_at_current("uneven indent"));
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }

        self.indent_level -= local_indent;
        let end = self.peek().span.start.clone();
        Ok(Node::Statements { statements: stmts, span: Span::new(outer_start, end) })
    }

    /// Parses `:` followed by either a NEWLINE-introduced block or a single inline statement.
    fn block_or_inline(&mut self) -> Result<(Node, bool), CloudyError> {
        self.expect(TokenKind::Colon)?;
        if self.check_newline() {
            Ok((self.statements()?, true))
        } else {
            Ok((self.statement()?, false))
        }
    }

    fn statement(&mut self) -> PResult {
        let tok = self.peek().clone();

        if tok.matches_keyword("return") {
            self.advance();
            let start = tok.span.start.clone();
            if self.check_newline() || self.check_eof() || matches!(self.peek().kind, TokenKind::Space(_)) {
                return Ok(Node::Return { value: None, span: Span::new(start.clone(), start) });
            }
            let value = self.expr()?;
            let span = Span::new(start, value.span().end.clone());
            return Ok(Node::Return { value: Some(Box::new(value)), span });
        }
        if tok.matches_keyword("continue") {
            self.advance();
            return Ok(Node::Continue { span: tok.span });
        }
        if tok.matches_keyword("break") {
            self.advance();
            return Ok(Node::Break { span: tok.span });
        }
        if tok.matches_keyword("if") {
            return self.if_expr();
        }
        if tok.matches_keyword("for") {
            return self.for_expr();
        }
        if tok.matches_keyword("while") {
            return self.while_expr();
        }
        if tok.matches_keyword("func") {
            return self.func_def();
        }
        if tok.matches_keyword("del") {
            self.advance();
            let target = self.index_expr()?;
            let span = Span::new(tok.span.start, target.span().end.clone());
            return Ok(Node::Del { target: Box::new(target), span });
        }
        if tok.matches_keyword("var") {
            self.advance();
            return self.assignment();
        }

        self.var_assign_statement()
    }

    fn assignment(&mut self) -> PResult {
        let tok = self.peek().clone();
        let name = match &tok.kind {
            TokenKind::Identifier(n) => n.clone(),
            _ => return Err(self.error_at_current("expected identifier")),
        };
        self.advance();
        self.expect(TokenKind::Eq)?;
        let value = self.expr()?;
        let span = Span::new(tok.span.start, value.span().end.clone());
        Ok(Node::VarAssign { name, value: Box::new(value), span })
    }

    fn var_assign_statement(&mut self) -> PResult {
        let start_pos = self.pos;
        if let TokenKind::Identifier(name) = self.peek().kind.clone() {
            let ident_span = self.peek().span.clone();
            self.advance();

            if matches!(self.peek().kind, TokenKind::LSquare) {
                self.advance();
                let index_expr = self.arith_expr()?;
                if self.expect(TokenKind::RSquare).is_ok() && matches!(self.peek().kind, TokenKind::Eq) {
                    self.advance();
                    let value = self.expr()?;
                    let span = Span::new(ident_span.start.clone(), value.span().end.clone());
                    let target = Node::VarAccess { name, span: ident_span };
                    return Ok(Node::IndexAssign {
                        target: Box::new(target),
                        index: Box::new(index_expr),
                        value: Box::new(value),
                        span,
                    });
                }
                self.pos = start_pos;
            } else if matches!(self.peek().kind, TokenKind::Eq) {
                self.advance();
                let value = self.expr()?;
                let span = Span::new(ident_span.start.clone(), value.span().end.clone());
                return Ok(Node::VarAssign { name, value: Box::new(value), span });
            } else {
                self.pos = start_pos;
            }
        }

        self.expr()
    }

    // --- expressions ------------------------------------------------------

    pub fn expr(&mut self) -> PResult {
        let mut left = self.comp_expr()?;
        loop {
            let op = if self.peek().matches_keyword("and") {
                BinOp::And
            } else if self.peek().matches_keyword("or") {
                BinOp::Or
            } else {
                break;
            };
            self.advance();
            let right = self.comp_expr()?;
            let span = Span::new(left.span().start.clone(), right.span().end.clone());
            left = Node::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn comp_expr(&mut self) -> PResult {
        if self.peek().matches_keyword("not") {
            let start = self.peek().span.start.clone();
            self.advance();
            let operand = self.comp_expr()?;
            let span = Span::new(start, operand.span().end.clone());
            return Ok(Node::UnaryOp { op: UnaryOp::Not, operand: Box::new(operand), span });
        }

        let mut left = self.arith_expr()?;
        loop {
            if self.peek().matches_keyword("not") {
                let save = self.pos;
                self.advance();
                if self.peek().matches_keyword("in") {
                    self.advance();
                    let right = self.arith_expr()?;
                    let span = Span::new(left.span().start.clone(), right.span().end.clone());
                    left = Node::BinOp { left: Box::new(left), op: BinOp::NotIn, right: Box::new(right), span };
                    continue;
                }
                self.pos = save;
                break;
            }

            let op = match self.peek().kind {
                TokenKind::Ee => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Lte => BinOp::Lte,
                TokenKind::Gte => BinOp::Gte,
                _ if self.peek().matches_keyword("in") => BinOp::In,
                _ => break,
            };
            self.advance();
            let right = self.arith_expr()?;
            let span = Span::new(left.span().start.clone(), right.span().end.clone());
            left = Node::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn arith_expr(&mut self) -> PResult {
        let mut left = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            let span = Span::new(left.span().start.clone(), right.span().end.clone());
            left = Node::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn term(&mut self) -> PResult {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Mult => BinOp::Mul,
                TokenKind::Div => BinOp::Div,
                TokenKind::FDiv => BinOp::FDiv,
                TokenKind::Modu => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            let span = Span::new(left.span().start.clone(), right.span().end.clone());
            left = Node::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn factor(&mut self) -> PResult {
        match self.peek().kind {
            TokenKind::Plus => {
                let start = self.peek().span.start.clone();
                self.advance();
                let operand = self.factor()?;
                let span = Span::new(start, operand.span().end.clone());
                Ok(Node::UnaryOp { op: UnaryOp::Plus, operand: Box::new(operand), span })
            }
            TokenKind::Minus => {
                let start = self.peek().span.start.clone();
                self.advance();
                let operand = self.factor()?;
                let span = Span::new(start, operand.span().end.clone());
                Ok(Node::UnaryOp { op: UnaryOp::Neg, operand: Box::new(operand), span })
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> PResult {
        let base = self.call()?;
        if matches!(self.peek().kind, TokenKind::Pow) {
            self.advance();
            let exponent = self.factor()?;
            let span = Span::new(base.span().start.clone(), exponent.span().end.clone());
            return Ok(Node::BinOp { left: Box::new(base), op: BinOp::Pow, right: Box::new(exponent), span });
        }
        Ok(base)
    }

    fn call(&mut self) -> PResult {
        let callee = self.index_expr()?;
        if matches!(self.peek().kind, TokenKind::LPar) {
            self.advance();
            let mut args = Vec::new();
            if !matches!(self.peek().kind, TokenKind::RPar) {
                args.push(self.expr()?);
                while matches!(self.peek().kind, TokenKind::Comma) {
                    self.advance();
                    args.push(self.expr()?);
                }
            }
            let end_tok = self.expect(TokenKind::RPar)?;
            let span = Span::new(callee.span().start.clone(), end_tok.span.end);
            return Ok(Node::Call { callee: Box::new(callee), args, span });
        }
        Ok(callee)
    }

    fn index_expr(&mut self) -> PResult {
        let mut node = self.atom()?;
        while matches!(self.peek().kind, TokenKind::LSquare) {
            self.advance();
            let idx = self.arith_expr()?;
            let end_tok = self.expect(TokenKind::RSquare)?;
            let span = Span::new(node.span().start.clone(), end_tok.span.end);
            node = Node::Index { data: Box::new(node), index: Box::new(idx), span };
        }
        Ok(node)
    }

    fn atom(&mut self) -> PResult {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Node::Number { value: NumberLit::Int(n), span: tok.span })
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Node::Number { value: NumberLit::Float(n), span: tok.span })
            }
            TokenKind::Bool(b) => {
                self.advance();
                Ok(Node::Bool { value: b, span: tok.span })
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Node::String { value: s, span: tok.span })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Node::VarAccess { name, span: tok.span })
            }
            TokenKind::LPar => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RPar)?;
                Ok(inner)
            }
            TokenKind::LSquare => self.list_expr(),
            TokenKind::LCurly => self.dict_expr(),
            _ => Err(self.error_at_current("expected an expression")),
        }
    }

    fn list_expr(&mut self) -> PResult {
        let start_tok = self.expect(TokenKind::LSquare)?;
        let mut elements = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RSquare) {
            elements.push(self.expr()?);
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                elements.push(self.expr()?);
            }
        }
        let end_tok = self.expect(TokenKind::RSquare)?;
        Ok(Node::List { elements, span: Span::new(start_tok.span.start, end_tok.span.end) })
    }

    fn dict_expr(&mut self) -> PResult {
        let start_tok = self.expect(TokenKind::LCurly)?;
        let mut pairs = Vec::new();
        self.skip_newlines_and_spaces();
        if !matches!(self.peek().kind, TokenKind::RCurly) {
            pairs.push(self.dict_pair()?);
            self.skip_newlines_and_spaces();
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                self.skip_newlines_and_spaces();
                pairs.push(self.dict_pair()?);
                self.skip_newlines_and_spaces();
            }
        }
        let end_tok = self.expect(TokenKind::RCurly)?;
        Ok(Node::Dict { pairs, span: Span::new(start_tok.span.start, end_tok.span.end) })
    }

    fn dict_pair(&mut self) -> Result<(Node, Node), CloudyError> {
        let key = self.expr()?;
        self.expect(TokenKind::Colon)?;
        let value = self.expr()?;
        Ok((key, value))
    }

    fn skip_newlines_and_spaces(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Newline | TokenKind::Space(_) => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    // --- compound statements -----------------------------------------------

    fn if_expr(&mut self) -> PResult {
        let start = self.peek().span.start.clone();
        let mut cases = Vec::new();
        let mut else_case = None;

        self.advance(); // 'if'
        let condition = self.expr()?;
        let (body, should_return_null) = self.block_or_inline()?;
        cases.push(IfCase { condition: Box::new(condition), body: Box::new(body), should_return_null });

        loop {
            let save = self.pos;
            self.skip_newlines_before_keyword();
            if self.peek().matches_keyword("elif") {
                self.advance();
                let condition = self.expr()?;
                let (body, should_return_null) = self.block_or_inline()?;
                cases.push(IfCase { condition: Box::new(condition), body: Box::new(body), should_return_null });
                continue;
            }
            if self.peek().matches_keyword("else") {
                self.advance();
                let (body, should_return_null) = self.block_or_inline()?;
                else_case = Some(ElseCase { body: Box::new(body), should_return_null });
                break;
            }
            self.pos = save;
            break;
        }

        let end = self.tokens[self.pos.saturating_sub(1)].span.end.clone();
        Ok(Node::If { cases, else_case, span: Span::new(start, end) })
    }

    /// `elif`/`else` may follow on a new line at the same indent as the `if`.
    fn skip_newlines_before_keyword(&mut self) {
        let save = self.pos;
        let mut advanced = false;
        while self.check_newline() {
            self.advance();
            advanced = true;
        }
        if advanced {
            if let TokenKind::Space(n) = self.peek().kind {
                if n == self.indent_level {
                    self.advance();
                    return;
                }
            } else if self.indent_level == 0 {
                return;
            }
        }
        self.pos = save;
    }

    fn for_expr(&mut self) -> PResult {
        let start = self.peek().span.start.clone();
        self.advance(); // 'for'
        let var_name = match self.peek().kind.clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.error_at_current("expected identifier after 'for'")),
        };
        self.expect(TokenKind::Eq)?;
        let start_expr = self.expr()?;
        if !self.peek().matches_keyword("to") {
            return Err(self.error_at_current("expected 'to'"));
        }
        self.advance();
        let end_expr = self.expr()?;
        let step = if self.peek().matches_keyword("step") {
            self.advance();
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        let (body, should_return_null) = self.block_or_inline()?;
        let end = body.span().end.clone();
        Ok(Node::For {
            var_name,
            start: Box::new(start_expr),
            end: Box::new(end_expr),
            step,
            body: Box::new(body),
            should_return_null,
            span: Span::new(start, end),
        })
    }

    fn while_expr(&mut self) -> PResult {
        let start = self.peek().span.start.clone();
        self.advance(); // 'while'
        let condition = self.expr()?;
        let (body, should_return_null) = self.block_or_inline()?;
        let end = body.span().end.clone();
        Ok(Node::While { condition: Box::new(condition), body: Box::new(body), should_return_null, span: Span::new(start, end) })
    }

    fn func_def(&mut self) -> PResult {
        let start = self.peek().span.start.clone();
        self.advance(); // 'func'
        let name = if let TokenKind::Identifier(n) = self.peek().kind.clone() {
            self.advance();
            Some(n)
        } else {
            None
        };
        self.expect(TokenKind::LPar)?;
        let mut arg_names = Vec::new();
        if let TokenKind::Identifier(n) = self.peek().kind.clone() {
            self.advance();
            arg_names.push(n);
            while matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                if let TokenKind::Identifier(n) = self.peek().kind.clone() {
                    self.advance();
                    arg_names.push(n);
                } else {
                    return Err(self.error_at_current("expected identifier"));
                }
            }
        }
        self.expect(TokenKind::RPar)?;
        let (body, block_body) = self.block_or_inline()?;
        let should_auto_return = !block_body;
        let end = body.span().end.clone();
        Ok(Node::FuncDef { name, arg_names, body: Box::new(body), should_auto_return, span: Span::new(start, end) })
    }
}

pub fn parse(tokens: Vec<Token>) -> PResult {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> Node {
        let tokens = tokenize("<test>", src).unwrap();
        parse(tokens).unwrap()
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let ast = parse_src("2 + 3 * 4");
        match ast {
            Node::Statements { statements, .. } => {
                assert_eq!(statements.len(), 1);
                match &statements[0] {
                    Node::BinOp { op: BinOp::Add, right, .. } => {
                        assert!(matches!(**right, Node::BinOp { op: BinOp::Mul, .. }));
                    }
                    other => panic!("unexpected node: {:?}", other),
                }
            }
            other => panic!("unexpected root: {:?}", other),
        }
    }

    #[test]
    fn blank_line_with_matching_trailing_whitespace_is_skipped() {
        let ast = parse_src("if true:\n    var x = 1\n    \n    var y = 2\n");
        match ast {
            Node::Statements { statements, .. } => {
                assert_eq!(statements.len(), 1);
                match &statements[0] {
                    Node::If { cases, .. } => match &*cases[0].body {
                        Node::Statements { statements, .. } => assert_eq!(statements.len(), 2),
                        other => panic!("unexpected body: {:?}", other),
                    },
                    other => panic!("unexpected node: {:?}", other),
                }
            }
            other => panic!("unexpected root: {:?}", other),
        }
    }

    #[test]
    fn parses_if_block() {
        let ast = parse_src("if true:\n    1\nelse:\n    2\n");
        match ast {
            Node::Statements { statements, .. } => {
                assert!(matches!(&statements[0], Node::If { .. }));
            }
            other => panic!("unexpected root: {:?}", other),
        }
    }

    #[test]
    fn parses_function_definition() {
        let ast = parse_src("func add(a, b): a + b\n");
        match ast {
            Node::Statements { statements, .. } => match &statements[0] {
                Node::FuncDef { arg_names, should_auto_return, .. } => {
                    assert_eq!(arg_names, &vec!["a".to_string(), "b".to_string()]);
                    assert!(should_auto_return);
                }
                other => panic!("unexpected node: {:?}", other),
            },
            other => panic!("unexpected root: {:?}", other),
        }
    }
}
