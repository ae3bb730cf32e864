//! Recursive descent parser
//!
//! Consumes the token stream produced by [`crate::lexer::tokenize`] and
//! builds the statement tree the interpreter walks. Nothing is evaluated
//! here; assignment targets are checked syntactically only.

use crate::ast::{BinOp, Block, Expr, FnDecl, Program, Span, Spanned, Stmt, UnOp};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use std::mem;
use std::rc::Rc;
use tracing::debug;


/// Parse tokens into AST
pub fn parse(filename: &str, source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let mut parser = Parser::new(tokens, source.len());
    let program = parser.program()?;
    debug!(filename, statements = program.body.len(), "parsed program");
    Ok(program)
}

/// Operand parser for one precedence level
type Operand = fn(&mut Parser) -> Result<Spanned<Expr>>;

/// Parser state
struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// Zero-width span at the end of the source
    eof: Span,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>, source_len: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            eof: Span::new(source_len, source_len),
        }
    }

    // -------------------------------------------------------------------------
    // Cursor
    // -------------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map_or(self.eof, |(_, span)| *span)
    }

    fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, span)) => *span,
            None => Span::new(0, 0),
        }
    }

    /// Check if the current token has the same kind as `kind`
    fn check(&self, kind: &Token) -> bool {
        self.peek()
            .is_some_and(|token| mem::discriminant(token) == mem::discriminant(kind))
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it has the given kind
    fn eat(&mut self, kind: &Token) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: Token, context: &str) -> Result<Span> {
        if self.check(&kind) {
            let span = self.current_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.error_here(&format!("{kind} {context}")))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<Spanned<String>> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = Spanned::new(name.clone(), self.current_span());
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here(&format!("identifier {context}"))),
        }
    }

    fn error_here(&self, expected: &str) -> CompileError {
        let found = match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        };
        CompileError::parser(format!("expected {expected}, found {found}"), self.current_span())
    }

    /// Span from `start` through the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(self.previous_span())
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn program(&mut self) -> Result<Program> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    fn statement(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.current_span();
        let stmt = match self.peek() {
            Some(Token::If) => return self.if_statement(),
            Some(Token::While) => {
                self.advance();
                let cond = self.expression()?;
                let body = self.block()?;
                Stmt::While { cond, body }
            }
            Some(Token::For) => return self.range_statement(),
            Some(Token::Fn) if matches!(self.peek_at(1), Some(Token::Ident(_))) => {
                return self.fn_declaration();
            }
            Some(Token::Break) => {
                self.advance();
                self.expect(Token::Semi, "after `break`")?;
                Stmt::Break
            }
            Some(Token::Continue) => {
                self.advance();
                self.expect(Token::Semi, "after `continue`")?;
                Stmt::Continue
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.check(&Token::Semi) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(Token::Semi, "after return value")?;
                Stmt::Return(value)
            }
            Some(Token::LBrace) => Stmt::Block(self.block()?),
            _ => {
                let expr = self.expression()?;
                self.expect(Token::Semi, "after expression")?;
                Stmt::Expr(expr)
            }
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn block(&mut self) -> Result<Block> {
        self.expect(Token::LBrace, "to start a block")?;
        let mut body = Vec::new();
        while !self.is_at_end() && !self.check(&Token::RBrace) {
            body.push(self.statement()?);
        }
        self.expect(Token::RBrace, "to close the block")?;
        Ok(body)
    }

    /// `if cond { } else if cond { } else { }`
    fn if_statement(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.current_span();
        self.advance();
        let cond = self.expression()?;
        let then_branch = self.block()?;
        let else_branch = if self.eat(&Token::Else) {
            if self.check(&Token::If) {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(Spanned::new(
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            },
            self.span_from(start),
        ))
    }

    /// `for i < start .. end { }`; bounds are parsed at the additive level
    fn range_statement(&mut self) -> Result<Spanned<Stmt>> {
        let start_span = self.current_span();
        self.advance();
        let var = self.expect_ident("after `for`")?;

        let cmp_span = self.current_span();
        let cmp = match self.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::LtEq) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::GtEq) => BinOp::Ge,
            _ => {
                return Err(self.error_here("one of `<`, `<=`, `>`, `>=` after the loop variable"));
            }
        };
        self.advance();

        let start = self.term()?;
        self.expect(Token::DotDot, "between range bounds")?;
        let end = self.term()?;
        let body = self.block()?;

        Ok(Spanned::new(
            Stmt::Range {
                var,
                cmp: Spanned::new(cmp, cmp_span),
                start,
                end,
                body,
            },
            self.span_from(start_span),
        ))
    }

    /// `fn name(params) { }` declares a constant binding
    fn fn_declaration(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.current_span();
        self.advance();
        let name = self.expect_ident("after `fn`")?;
        let decl = self.fn_rest()?;
        let span = self.span_from(start);

        let function = Spanned::new(Expr::Function(Rc::new(decl)), span);
        let assign = Expr::Assign {
            name: name.node,
            global: false,
            constant: true,
            value: Box::new(function),
        };
        Ok(Spanned::new(Stmt::Expr(Spanned::new(assign, span)), span))
    }

    /// Parameter list and body of a function
    fn fn_rest(&mut self) -> Result<FnDecl> {
        self.expect(Token::LParen, "to start the parameter list")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                params.push(self.expect_ident("in parameter list")?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "to close the parameter list")?;
        let body = self.block()?;
        Ok(FnDecl { params, body })
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expression(&mut self) -> Result<Spanned<Expr>> {
        self.assignment()
    }

    /// Right-associative `=` / `:=`
    fn assignment(&mut self) -> Result<Spanned<Expr>> {
        let target = self.ternary()?;
        let constant = match self.peek() {
            Some(Token::Eq) => false,
            Some(Token::ColonEq) => true,
            _ => return Ok(target),
        };
        self.advance();
        let value = Box::new(self.assignment()?);

        let span = target.span.merge(value.span);
        let invalid = || CompileError::parser("invalid assignment target", target.span);
        let node = match &target.node {
            Expr::Var { name, global } => Expr::Assign {
                name: name.clone(),
                global: *global,
                constant,
                value,
            },
            Expr::Index { target: base, index } => match &base.node {
                Expr::Var { name, global } => Expr::IndexAssign {
                    name: name.clone(),
                    global: *global,
                    constant,
                    index: index.clone(),
                    value,
                },
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        };
        Ok(Spanned::new(node, span))
    }

    /// `cond ? a : b`
    fn ternary(&mut self) -> Result<Spanned<Expr>> {
        let cond = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then_branch = self.expression()?;
        self.expect(Token::Colon, "in conditional expression")?;
        let else_branch = self.ternary()?;
        let span = cond.span.merge(else_branch.span);
        Ok(Spanned::new(
            Expr::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn or(&mut self) -> Result<Spanned<Expr>> {
        self.binary(&[BinOp::Or], Self::and)
    }

    fn and(&mut self) -> Result<Spanned<Expr>> {
        self.binary(&[BinOp::And], Self::equality)
    }

    fn equality(&mut self) -> Result<Spanned<Expr>> {
        self.binary(&[BinOp::Eq, BinOp::Ne], Self::comparison)
    }

    fn comparison(&mut self) -> Result<Spanned<Expr>> {
        self.binary(&[BinOp::Lt, BinOp::Le, BinOp::Gt, BinOp::Ge], Self::term)
    }

    fn term(&mut self) -> Result<Spanned<Expr>> {
        self.binary(&[BinOp::Add, BinOp::Sub], Self::factor)
    }

    fn factor(&mut self) -> Result<Spanned<Expr>> {
        self.binary(&[BinOp::Mul, BinOp::Div, BinOp::Mod], Self::unary)
    }

    /// Left-associative chain of `ops` over `operand`
    fn binary(&mut self, ops: &[BinOp], operand: Operand) -> Result<Spanned<Expr>> {
        let mut left = operand(self)?;
        while let Some(op) = self.peek().and_then(binary_op).filter(|op| ops.contains(op)) {
            self.advance();
            let right = operand(self)?;
            let span = left.span.merge(right.span);
            left = Spanned::new(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>> {
        let op = match self.peek() {
            Some(Token::Bang | Token::Not) => UnOp::Not,
            Some(Token::Minus) => UnOp::Neg,
            Some(Token::Plus) => UnOp::Pos,
            Some(Token::TypeOf) => UnOp::TypeOf,
            Some(Token::Dollar) => UnOp::Stringify,
            _ => return self.postfix(),
        };
        let start = self.current_span();
        self.advance();
        let operand = self.unary()?;
        let span = start.merge(operand.span);
        Ok(Spanned::new(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            span,
        ))
    }

    /// Calls and subscripts
    fn postfix(&mut self) -> Result<Spanned<Expr>> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::LParen) {
                let args = self.arguments(Token::RParen, "to close the argument list")?;
                let span = self.span_from(expr.span);
                expr = Spanned::new(
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.eat(&Token::LBracket) {
                expr = self.subscript(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    /// `[i]`, `[a:b]`, `[:b]`, `[a:]`, `[:]`; the opening bracket is consumed
    fn subscript(&mut self, target: Spanned<Expr>) -> Result<Spanned<Expr>> {
        let target_span = target.span;
        if self.check(&Token::RBracket) {
            return Err(self.error_here("subscript"));
        }

        let node = if self.eat(&Token::Colon) {
            Expr::Slice {
                target: Box::new(target),
                start: None,
                end: self.slice_end()?,
            }
        } else {
            let index = Box::new(self.expression()?);
            if self.eat(&Token::Colon) {
                Expr::Slice {
                    target: Box::new(target),
                    start: Some(index),
                    end: self.slice_end()?,
                }
            } else {
                Expr::Index {
                    target: Box::new(target),
                    index,
                }
            }
        };
        self.expect(Token::RBracket, "to close the subscript")?;
        Ok(Spanned::new(node, self.span_from(target_span)))
    }

    fn slice_end(&mut self) -> Result<Option<Box<Spanned<Expr>>>> {
        if self.check(&Token::RBracket) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.expression()?)))
        }
    }

    /// Comma-separated expressions up to `close`; the opener is consumed
    fn arguments(&mut self, close: Token, context: &str) -> Result<Vec<Spanned<Expr>>> {
        let mut args = Vec::new();
        if !self.check(&close) {
            loop {
                args.push(self.expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(close, context)?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Spanned<Expr>> {
        let start = self.current_span();
        let node = match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.advance();
                Expr::Number(n)
            }
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.advance();
                Expr::Str(s)
            }
            Some(Token::True) => {
                self.advance();
                Expr::Bool(true)
            }
            Some(Token::False) => {
                self.advance();
                Expr::Bool(false)
            }
            Some(Token::Nil) => {
                self.advance();
                Expr::Nil
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Expr::Var { name, global: false }
            }
            Some(Token::Global) => {
                self.advance();
                let name = self.expect_ident("after `global`")?;
                Expr::Var {
                    name: name.node,
                    global: true,
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(Token::RParen, "to close the group")?;
                Expr::Grouping(Box::new(inner))
            }
            Some(Token::LBracket) => {
                self.advance();
                Expr::Array(self.arguments(Token::RBracket, "to close the array literal")?)
            }
            Some(Token::Fn) => {
                self.advance();
                Expr::Function(Rc::new(self.fn_rest()?))
            }
            _ => return Err(self.error_here("expression")),
        };
        Ok(Spanned::new(node, self.span_from(start)))
    }
}

fn binary_op(token: &Token) -> Option<BinOp> {
    let op = match token {
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::Percent => BinOp::Mod,
        Token::EqEq => BinOp::Eq,
        Token::NotEq => BinOp::Ne,
        Token::Lt => BinOp::Lt,
        Token::LtEq => BinOp::Le,
        Token::Gt => BinOp::Gt,
        Token::GtEq => BinOp::Ge,
        Token::And => BinOp::And,
        Token::Or => BinOp::Or,
        _ => return None,
    };
    Some(op)
}
