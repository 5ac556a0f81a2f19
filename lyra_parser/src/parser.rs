//! Recursive-descent parser for Lyra.
//!
//! Parses the token vector produced by the lexer into a statement
//! list. One syntax error aborts the parse; there is no recovery,
//! matching the all-or-nothing compilation model.

use crate::ast::{Expr, ExprKind, Param, Stmt, StmtKind};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};
use lyra_core::{LyraResult, SyntaxError, TypeTag};
use std::sync::Arc;

/// Lyra parser over a pre-lexed token vector.
pub struct Parser {
    /// All tokens, ending with `Eof`.
    tokens: Vec<Token>,
    /// Index of the current token.
    pos: usize,
}

impl Parser {
    /// Create a parser over the given tokens. The vector must end with
    /// an `Eof` token, as produced by [`tokenize`].
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.last().is_some_and(Token::is_eof));
        Self { tokens, pos: 0 }
    }

    /// Parse the whole token stream into a statement list.
    pub fn parse_program(&mut self) -> LyraResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(statements)
    }

    // =========================================================================
    // Token Management
    // =========================================================================

    /// Get the current token.
    #[inline]
    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Peek at the token after the current one.
    #[inline]
    fn peek_next(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + 1).min(last)]
    }

    /// Advance to the next token, returning the one just consumed.
    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token matches the given kind (by variant).
    #[inline]
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    /// Consume the current token if it matches, otherwise return false.
    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect and consume a specific token, or error.
    fn expect(&mut self, kind: &TokenKind, msg: &str) -> LyraResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(msg))
        }
    }

    /// Expect and consume an identifier, returning the name.
    fn expect_identifier(&mut self, msg: &str) -> LyraResult<Arc<str>> {
        if let TokenKind::Ident(name) = &self.current().kind {
            let name = Arc::from(name.as_str());
            self.advance();
            Ok(name)
        } else {
            Err(self.error_at_current(msg))
        }
    }

    /// Skip any newline tokens.
    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Check if at end of file.
    #[inline]
    fn is_at_end(&self) -> bool {
        self.current().is_eof()
    }

    /// Current line, for node construction.
    #[inline]
    fn line(&self) -> u32 {
        self.current().line
    }

    fn error_at_current(&self, msg: &str) -> SyntaxError {
        let token = self.current();
        let location = match &token.kind {
            TokenKind::Eof => "at end of file".to_string(),
            kind => format!("at '{}'", kind),
        };
        SyntaxError::new(format!("{}: {}", location, msg), token.line)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_statement(&mut self) -> LyraResult<Stmt> {
        match &self.current().kind {
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Ident(_) if self.peek_next().kind == TokenKind::Colon => {
                self.parse_declaration()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_print(&mut self) -> LyraResult<Stmt> {
        let line = self.line();
        self.advance();
        let value = self.parse_expression()?;
        self.end_statement()?;
        Ok(Stmt::new(StmtKind::Print(Box::new(value)), line))
    }

    fn parse_return(&mut self) -> LyraResult<Stmt> {
        let line = self.line();
        self.advance();
        let value = self.parse_expression()?;
        self.end_statement()?;
        Ok(Stmt::new(StmtKind::Return(Box::new(value)), line))
    }

    fn parse_if(&mut self) -> LyraResult<Stmt> {
        let line = self.line();
        self.advance();
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;

        // An `else` may sit on its own line after a single-statement
        // then-branch; look past blank lines before giving up on it.
        let mark = self.pos;
        self.skip_newlines();
        let else_branch = if self.match_token(&TokenKind::Else) {
            self.parse_block()?
        } else {
            self.pos = mark;
            Vec::new()
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition: Box::new(condition),
                then_branch,
                else_branch,
            },
            line,
        ))
    }

    fn parse_while(&mut self) -> LyraResult<Stmt> {
        let line = self.line();
        self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::While {
                condition: Box::new(condition),
                body,
            },
            line,
        ))
    }

    fn parse_declaration(&mut self) -> LyraResult<Stmt> {
        let line = self.line();
        let name = self.expect_identifier("expected variable name")?;
        self.expect(&TokenKind::Colon, "expected ':' after variable name")?;
        let ty = self.parse_type()?;
        let init = if self.match_token(&TokenKind::Equal) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.end_statement()?;
        Ok(Stmt::new(StmtKind::Declaration { name, ty, init }, line))
    }

    fn parse_expression_statement(&mut self) -> LyraResult<Stmt> {
        let line = self.line();
        let value = self.parse_expression()?;
        self.end_statement()?;
        Ok(Stmt::new(StmtKind::Expression(Box::new(value)), line))
    }

    /// A block is either `: statement` or `{ statements }`.
    fn parse_block(&mut self) -> LyraResult<Vec<Stmt>> {
        if self.match_token(&TokenKind::Colon) {
            Ok(vec![self.parse_statement()?])
        } else if self.check(&TokenKind::LeftBrace) {
            self.parse_braced_block()
        } else {
            Err(self.error_at_current("expected ':' or '{' to open a block"))
        }
    }

    fn parse_braced_block(&mut self) -> LyraResult<Vec<Stmt>> {
        self.expect(&TokenKind::LeftBrace, "expected '{'")?;
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(self.error_at_current("expected '}' to close block"));
            }
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::RightBrace, "expected '}' to close block")?;
        Ok(statements)
    }

    /// A statement ends at a newline (consumed), end of file, or a
    /// closing brace (left for the block parser).
    fn end_statement(&mut self) -> LyraResult<()> {
        if self.match_token(&TokenKind::Newline)
            || self.is_at_end()
            || self.check(&TokenKind::RightBrace)
        {
            Ok(())
        } else {
            Err(self.error_at_current("expected newline after statement"))
        }
    }

    fn parse_type(&mut self) -> LyraResult<TypeTag> {
        if let TokenKind::Ident(name) = &self.current().kind {
            if let Some(tag) = TypeTag::from_name(name) {
                self.advance();
                return Ok(tag);
            }
            let err = SyntaxError::new(format!("unknown type '{}'", name), self.line());
            return Err(err);
        }
        Err(self.error_at_current("expected type name"))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> LyraResult<Expr> {
        self.parse_assignment()
    }

    /// Assignment is right-associative; its target must be a variable
    /// or an indexed access.
    fn parse_assignment(&mut self) -> LyraResult<Expr> {
        let expr = self.parse_or()?;

        if self.check(&TokenKind::Equal) {
            let equal = self.advance();
            let value = Box::new(self.parse_assignment()?);
            return match expr.kind {
                ExprKind::Variable(name) => {
                    Ok(Expr::new(ExprKind::Assign { name, value }, expr.line))
                }
                ExprKind::Access { name, index } => Ok(Expr::new(
                    ExprKind::AssignIndex { name, index, value },
                    expr.line,
                )),
                _ => Err(SyntaxError::new("invalid assignment target", equal.line)),
            };
        }

        Ok(expr)
    }

    fn parse_or(&mut self) -> LyraResult<Expr> {
        let mut expr = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            let op = self.advance();
            let right = self.parse_and()?;
            let line = expr.line;
            expr = Expr::new(
                ExprKind::Logical {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> LyraResult<Expr> {
        let mut expr = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            let op = self.advance();
            let right = self.parse_equality()?;
            let line = expr.line;
            expr = Expr::new(
                ExprKind::Logical {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> LyraResult<Expr> {
        let mut expr = self.parse_comparison()?;
        while self.current().kind.is_equality() {
            let op = self.advance();
            let right = self.parse_comparison()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> LyraResult<Expr> {
        let mut expr = self.parse_term()?;
        while self.current().kind.is_comparison() {
            let op = self.advance();
            let right = self.parse_term()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> LyraResult<Expr> {
        let mut expr = self.parse_factor()?;
        while matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let op = self.advance();
            let right = self.parse_factor()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> LyraResult<Expr> {
        let mut expr = self.parse_unary()?;
        while matches!(
            self.current().kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            let op = self.advance();
            let right = self.parse_unary()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn binary(left: Expr, op: Token, right: Expr) -> Expr {
        let line = left.line;
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            line,
        )
    }

    fn parse_unary(&mut self) -> LyraResult<Expr> {
        if matches!(self.current().kind, TokenKind::Bang | TokenKind::Minus) {
            let op = self.advance();
            let line = op.line;
            let right = Box::new(self.parse_unary()?);
            return Ok(Expr::new(ExprKind::Unary { op, right }, line));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> LyraResult<Expr> {
        let line = self.line();
        match self.current().kind.clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Int(n), line))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Float(n), line))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(Arc::from(s.as_str())), line))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), line))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), line))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::new(ExprKind::None, line))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RightParen, "expected ')' after expression")?;
                Ok(Expr::new(ExprKind::Group(Box::new(inner)), line))
            }
            TokenKind::LeftBracket => self.parse_list(),
            TokenKind::LeftBrace => self.parse_dictionary(),
            TokenKind::Fn => self.parse_function(),
            TokenKind::Ident(_) => self.parse_identifier_expression(),
            _ => Err(self.error_at_current("expected expression")),
        }
    }

    fn parse_list(&mut self) -> LyraResult<Expr> {
        let line = self.line();
        self.expect(&TokenKind::LeftBracket, "expected '['")?;
        let mut elements = Vec::new();
        if !self.check(&TokenKind::RightBracket) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightBracket, "expected ']' after list elements")?;
        Ok(Expr::new(ExprKind::List(elements), line))
    }

    fn parse_dictionary(&mut self) -> LyraResult<Expr> {
        let line = self.line();
        self.expect(&TokenKind::LeftBrace, "expected '{'")?;
        let mut pairs = Vec::new();
        if !self.check(&TokenKind::RightBrace) {
            loop {
                let key = match &self.current().kind {
                    TokenKind::Str(s) => Arc::from(s.as_str()),
                    _ => return Err(self.error_at_current("expected string key")),
                };
                self.advance();
                self.expect(&TokenKind::Colon, "expected ':' after dictionary key")?;
                let value = self.parse_expression()?;
                pairs.push((key, value));
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(
            &TokenKind::RightBrace,
            "expected '}' after dictionary entries",
        )?;
        Ok(Expr::new(ExprKind::Dictionary(pairs), line))
    }

    fn parse_function(&mut self) -> LyraResult<Expr> {
        let line = self.line();
        self.expect(&TokenKind::Fn, "expected 'fn'")?;
        self.expect(&TokenKind::LeftParen, "expected '(' after 'fn'")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let param_line = self.line();
                let name = self.expect_identifier("expected parameter name")?;
                self.expect(&TokenKind::Colon, "expected ':' after parameter name")?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name,
                    ty,
                    line: param_line,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "expected ')' after parameters")?;
        self.expect(&TokenKind::Arrow, "expected '->' before return type")?;
        let return_type = self.parse_type()?;
        let body = self.parse_braced_block()?;

        Ok(Expr::new(
            ExprKind::Function {
                params,
                return_type,
                body,
            },
            line,
        ))
    }

    fn parse_identifier_expression(&mut self) -> LyraResult<Expr> {
        let line = self.line();
        let name = self.expect_identifier("expected identifier")?;

        if self.match_token(&TokenKind::LeftParen) {
            let mut args = Vec::new();
            if !self.check(&TokenKind::RightParen) {
                loop {
                    args.push(self.parse_expression()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RightParen, "expected ')' after arguments")?;
            return Ok(Expr::new(ExprKind::Call { callee: name, args }, line));
        }

        if self.match_token(&TokenKind::LeftBracket) {
            let index = Box::new(self.parse_expression()?);
            self.expect(&TokenKind::RightBracket, "expected ']' after index")?;
            return Ok(Expr::new(ExprKind::Access { name, index }, line));
        }

        Ok(Expr::new(ExprKind::Variable(name), line))
    }
}

/// Parse source code into a statement list.
pub fn parse(source: &str) -> LyraResult<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}
