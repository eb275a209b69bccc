//! Rye Parser
//!
//! This crate implements the tokenizer and parser for the Rye language.
//! It takes a string input and produces a `rye_ast::Module` together with
//! a list of recoverable parse errors: the parser re-synchronizes at
//! statement boundaries so a single run reports as many problems as
//! possible, mirroring the analyzer's diagnostic accumulation contract.

pub mod parsed;
pub mod tokenizer;

pub use parsed::ParsedModule;

use rye_ast::*;

use tokenizer::{Token, TokenKind};

/// A recoverable parse error with its source span.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

type PResult<T> = Result<T, ParseError>;

/// Nesting bound; keeps hostile input from overflowing the stack.
const MAX_NESTING_DEPTH: usize = 200;

/// Parse a source string into a module plus accumulated parse errors.
pub fn parse_module(source: &str) -> (Module, Vec<ParseError>) {
    let tokens = tokenizer::tokenize(source);
    Parser::new(tokens).run()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect::<Vec<_>>();
        Self {
            tokens,
            pos: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> (Module, Vec<ParseError>) {
        let start = self.peek_span();
        let name = self.parse_module_header();

        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            match self.parse_stmt() {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        let span = start.start..self.peek_span().end;
        (Module { name, body, span }, self.errors)
    }

    fn parse_module_header(&mut self) -> Option<Ident> {
        if !self.check(&TokenKind::Module) {
            return None;
        }
        self.advance();
        let ident = match self.expect_ident("module name") {
            Ok(i) => i,
            Err(err) => {
                self.errors.push(err);
                self.synchronize();
                return None;
            }
        };
        if let Err(err) = self.expect(TokenKind::Semicolon, "`;` after module name") {
            self.errors.push(err);
        }
        Some(ident)
    }

    // ---- token plumbing ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_span(&self) -> Span {
        self.peek().span.clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Ident(sym) => {
                let tok = self.advance();
                Ok(Ident::new(sym, tok.span))
            }
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn error_here(&self, message: String) -> ParseError {
        ParseError {
            message,
            span: self.peek_span(),
        }
    }

    /// Skip to the next statement boundary after a parse error.
    fn synchronize(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon | TokenKind::RightBrace => {
                    self.advance();
                    return;
                }
                TokenKind::Let
                | TokenKind::Const
                | TokenKind::Func
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Import => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            Err(self.error_here("nesting too deep".into()))
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        self.enter()?;
        let result = self.parse_stmt_inner();
        self.leave();
        result
    }

    fn parse_stmt_inner(&mut self) -> PResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Let | TokenKind::Const => self.parse_var_decl(),
            TokenKind::Alias => self.parse_alias(),
            TokenKind::Use => self.parse_use(),
            TokenKind::Inline | TokenKind::Func => self.parse_func_decl(),
            TokenKind::Class => self.parse_class(),
            TokenKind::Enum => self.parse_enum(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Try => self.parse_try(),
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                let tok = self.advance();
                Ok(Stmt::Empty(EmptyStmt {
                    id: NodeId::UNSET,
                    span: tok.span,
                }))
            }
            _ => {
                let expr = self.parse_expr()?;
                let span = expr.span();
                self.expect(TokenKind::Semicolon, "`;` after expression")?;
                Ok(Stmt::Expr(ExprStmt {
                    id: NodeId::UNSET,
                    expr,
                    span,
                }))
            }
        }
    }

    fn parse_import(&mut self) -> PResult<Stmt> {
        let start = self.advance().span;
        let mut imports = Vec::new();
        loop {
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::Str(path) => {
                    self.advance();
                    imports.push(ImportStmt {
                        id: NodeId::UNSET,
                        path,
                        module: ModuleId::ROOT,
                        span: tok.span,
                    });
                }
                _ => return Err(self.error_here("expected import path string".into())),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::Semicolon, "`;` after import")?.span;
        let span = start.start..end.end;
        match imports.len() {
            1 => {
                let mut only = imports.remove(0);
                only.span = span;
                Ok(Stmt::Import(only))
            }
            _ => Ok(Stmt::Imports(ImportsStmt {
                id: NodeId::UNSET,
                imports,
                span,
            })),
        }
    }

    fn parse_var_decl(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let is_const = kw.kind == TokenKind::Const;
        let ident = self.expect_ident("identifier after declaration keyword")?;
        self.expect(TokenKind::Eq, "`=` in declaration")?;
        let init = self.parse_expr()?;
        let end = self
            .expect(TokenKind::Semicolon, "`;` after declaration")?
            .span;
        Ok(Stmt::VarDecl(VarDecl {
            id: NodeId::UNSET,
            ident,
            is_const,
            init,
            module: ModuleId::ROOT,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_alias(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let ident = self.expect_ident("alias name")?;
        self.expect(TokenKind::Eq, "`=` in alias declaration")?;
        let target = self.parse_expr()?;
        let end = self.expect(TokenKind::Semicolon, "`;` after alias")?.span;
        Ok(Stmt::Alias(AliasDecl {
            id: NodeId::UNSET,
            ident,
            target,
            module: ModuleId::ROOT,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_use(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let ident = self.expect_ident("module name after `use`")?;
        let end = self
            .expect(TokenKind::Semicolon, "`;` after use directive")?
            .span;
        Ok(Stmt::UseModule(UseModuleStmt {
            id: NodeId::UNSET,
            ident,
            module: ModuleId::ROOT,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_func_decl(&mut self) -> PResult<Stmt> {
        let start = self.peek_span();
        let mut attributes = Vec::new();
        while self.check(&TokenKind::Inline) {
            self.advance();
            attributes.push("inline".to_string());
        }
        self.expect(TokenKind::Func, "`func`")?;
        let ident = self.expect_ident("function name")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = start.start..body.span.end;
        Ok(Stmt::FuncDecl(FuncDecl {
            id: NodeId::UNSET,
            ident,
            params,
            body,
            attributes,
            module: ModuleId::ROOT,
            span,
        }))
    }

    fn parse_params(&mut self) -> PResult<Vec<Ident>> {
        self.expect(TokenKind::LeftParen, "`(` before parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "`)` after parameter list")?;
        Ok(params)
    }

    fn parse_class(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let ident = self.expect_ident("class name")?;
        self.expect(TokenKind::LeftBrace, "`{` after class name")?;
        let end = self.expect(TokenKind::RightBrace, "`}` after class body")?.span;
        Ok(Stmt::ClassDecl(ClassDecl {
            id: NodeId::UNSET,
            ident,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_enum(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let ident = self.expect_ident("enum name")?;
        self.expect(TokenKind::LeftBrace, "`{` after enum name")?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let member = self.expect_ident("enum member name")?;
            let span = member.span.clone();
            // Members carry synthesized ordinal values.
            let value = Expr::Int(IntLit {
                id: NodeId::UNSET,
                value: members.len() as i64,
                span: span.clone(),
            });
            members.push(EnumMember {
                ident: member,
                value,
                module: ModuleId::ROOT,
                span,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RightBrace, "`}` after enum body")?.span;
        Ok(Stmt::EnumDecl(EnumDecl {
            id: NodeId::UNSET,
            ident,
            members,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_print(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let mut args = vec![self.parse_expr()?];
        while self.eat(&TokenKind::Comma) {
            args.push(self.parse_expr()?);
        }
        let end = self.expect(TokenKind::Semicolon, "`;` after print")?.span;
        Ok(Stmt::Print(PrintStmt {
            id: NodeId::UNSET,
            args,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let arg = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(TokenKind::Semicolon, "`;` after return")?.span;
        Ok(Stmt::Return(ReturnStmt {
            id: NodeId::UNSET,
            arg,
            unwind_levels: 0,
            synthetic: false,
            span: kw.span.start..end.end,
        }))
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        self.expect(TokenKind::LeftParen, "`(` after `if`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RightParen, "`)` after condition")?;
        let cons = self.parse_block()?;
        let mut end = cons.span.end;
        let alt = if self.eat(&TokenKind::Else) {
            let stmt = if self.check(&TokenKind::If) {
                self.parse_if()?
            } else {
                Stmt::Block(self.parse_block()?)
            };
            end = stmt.span().end;
            Some(Box::new(stmt))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            id: NodeId::UNSET,
            cond,
            cons,
            alt,
            span: kw.span.start..end,
        }))
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        self.expect(TokenKind::LeftParen, "`(` after `while`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RightParen, "`)` after condition")?;
        let body = self.parse_block()?;
        let span = kw.span.start..body.span.end;
        Ok(Stmt::While(WhileStmt {
            id: NodeId::UNSET,
            cond,
            body,
            span,
        }))
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        self.expect(TokenKind::LeftParen, "`(` after `for`")?;

        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else if matches!(self.peek_kind(), TokenKind::Let | TokenKind::Const) {
            // parse_var_decl consumes the trailing `;`
            Some(Box::new(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expr()?;
            let span = expr.span();
            self.expect(TokenKind::Semicolon, "`;` after for initializer")?;
            Some(Box::new(Stmt::Expr(ExprStmt {
                id: NodeId::UNSET,
                expr,
                span,
            })))
        };

        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon, "`;` after for condition")?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RightParen, "`)` after for clauses")?;

        let body = self.parse_block()?;
        let span = kw.span.start..body.span.end;
        Ok(Stmt::For(Box::new(ForStmt {
            id: NodeId::UNSET,
            init,
            cond,
            update,
            body,
            span,
        })))
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        let kw = self.advance();
        let block = self.parse_block()?;
        self.expect(TokenKind::Catch, "`catch` after try block")?;
        self.expect(TokenKind::LeftParen, "`(` after `catch`")?;
        let param = self.expect_ident("exception binding")?;
        self.expect(TokenKind::RightParen, "`)` after exception binding")?;
        let catch_block = self.parse_block()?;
        let span = kw.span.start..catch_block.span.end;
        Ok(Stmt::Try(TryStmt {
            id: NodeId::UNSET,
            block,
            param,
            catch_block,
            span,
        }))
    }

    fn parse_block(&mut self) -> PResult<BlockStmt> {
        self.enter()?;
        let result = self.parse_block_inner();
        self.leave();
        result
    }

    fn parse_block_inner(&mut self) -> PResult<BlockStmt> {
        let open = self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        let close = self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(BlockStmt {
            id: NodeId::UNSET,
            stmts,
            span: open.span.start..close.span.end,
        })
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.enter()?;
        let result = self.parse_assignment();
        self.leave();
        result
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let left = self.parse_range_expr()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => BinOp::Assign,
            TokenKind::PlusEq => BinOp::AddAssign,
            TokenKind::MinusEq => BinOp::SubtractAssign,
            TokenKind::StarEq => BinOp::MultiplyAssign,
            TokenKind::SlashEq => BinOp::DivideAssign,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_assignment()?;
        let span = left.span().start..right.span().end;
        Ok(Expr::Binary(BinaryExpr {
            id: NodeId::UNSET,
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }))
    }

    fn parse_range_expr(&mut self) -> PResult<Expr> {
        let start = self.parse_logical_or()?;
        if self.eat(&TokenKind::DotDot) {
            let end = self.parse_logical_or()?;
            let span = start.span().start..end.span().end;
            return Ok(Expr::Range(RangeExpr {
                id: NodeId::UNSET,
                start: Box::new(start),
                end: Box::new(end),
                span,
            }));
        }
        Ok(start)
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        let span = left.span().start..right.span().end;
        Expr::Binary(BinaryExpr {
            id: NodeId::UNSET,
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn parse_logical_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_logical_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_logical_and()?;
            left = Self::binary(BinOp::LogicalOr, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = Self::binary(BinOp::LogicalAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Equals,
                TokenKind::NotEq => BinOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinOp::Less,
                TokenKind::Gt => BinOp::Greater,
                TokenKind::LtEq => BinOp::LessOrEqual,
                TokenKind::GtEq => BinOp::GreaterOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Multiply,
                TokenKind::Slash => BinOp::Divide,
                TokenKind::Percent => BinOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Not => UnOp::Not,
            TokenKind::Minus => UnOp::Negate,
            _ => return self.parse_postfix(),
        };
        let tok = self.advance();
        let expr = self.parse_unary()?;
        let span = tok.span.start..expr.span().end;
        Ok(Expr::Unary(UnaryExpr {
            id: NodeId::UNSET,
            op,
            expr: Box::new(expr),
            span,
        }))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LeftParen => {
                    // Only named callees are expressible; `a.b(...)` is
                    // handled inside the member chain.
                    let Expr::Var(var) = expr else {
                        return Err(self.error_here("expected identifier before call".into()));
                    };
                    let args = self.parse_args()?;
                    let span = var.span.start..self.prev_span_end();
                    expr = Expr::Call(CallExpr::new(var.ident, args, span));
                }
                TokenKind::Dot => {
                    self.advance();
                    let right = self.parse_member_rest()?;
                    let span = expr.span().start..right.span().end;
                    expr = Expr::Member(MemberExpr {
                        id: NodeId::UNSET,
                        left: Box::new(expr),
                        right: Box::new(right),
                        module: ModuleId::ROOT,
                        span,
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let close = self.expect(TokenKind::RightBracket, "`]` after index")?;
                    let span = expr.span().start..close.span.end;
                    expr = Expr::Index(IndexExpr {
                        id: NodeId::UNSET,
                        obj: Box::new(expr),
                        index: Box::new(index),
                        span,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// The right side of a `.`: an identifier, a call, or a nested member
    /// chain. Chains nest to the right so the leftmost name stays at the
    /// top for module-reference detection.
    fn parse_member_rest(&mut self) -> PResult<Expr> {
        let ident = self.expect_ident("member name after `.`")?;
        let first = if self.check(&TokenKind::LeftParen) {
            let args = self.parse_args()?;
            let span = ident.span.start..self.prev_span_end();
            Expr::Call(CallExpr::new(ident, args, span))
        } else {
            let span = ident.span.clone();
            Expr::Var(VarExpr::new(ident, span))
        };
        if self.eat(&TokenKind::Dot) {
            let rest = self.parse_member_rest()?;
            let span = first.span().start..rest.span().end;
            return Ok(Expr::Member(MemberExpr {
                id: NodeId::UNSET,
                left: Box::new(first),
                right: Box::new(rest),
                module: ModuleId::ROOT,
                span,
            }));
        }
        Ok(first)
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokenKind::LeftParen, "`(` before arguments")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "`)` after arguments")?;
        Ok(args)
    }

    fn prev_span_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Int(IntLit {
                    id: NodeId::UNSET,
                    value,
                    span: tok.span,
                }))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Float(FloatLit {
                    id: NodeId::UNSET,
                    value,
                    span: tok.span,
                }))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::Str(StrLit {
                    id: NodeId::UNSET,
                    value,
                    span: tok.span,
                }))
            }
            TokenKind::True | TokenKind::False => {
                let value = tok.kind == TokenKind::True;
                self.advance();
                Ok(Expr::Bool(BoolLit {
                    id: NodeId::UNSET,
                    value,
                    span: tok.span,
                }))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null(NullLit {
                    id: NodeId::UNSET,
                    span: tok.span,
                }))
            }
            TokenKind::SelfKw => {
                self.advance();
                Ok(Expr::SelfRef(SelfExpr {
                    id: NodeId::UNSET,
                    span: tok.span,
                }))
            }
            TokenKind::New => {
                self.advance();
                let target = self.parse_postfix()?;
                let span = tok.span.start..target.span().end;
                Ok(Expr::New(NewExpr {
                    id: NodeId::UNSET,
                    target: Box::new(target),
                    span,
                }))
            }
            TokenKind::Func => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                let span = tok.span.start..body.span.end;
                Ok(Expr::FuncExpr(FuncExpr {
                    id: NodeId::UNSET,
                    params,
                    body,
                    attributes: Vec::new(),
                    span,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RightParen, "`)`")?;
                Ok(Expr::Paren(ParenExpr {
                    id: NodeId::UNSET,
                    inner: Box::new(inner),
                    span: tok.span.start..close.span.end,
                }))
            }
            TokenKind::DollarBrace => self.parse_object_expr(),
            TokenKind::Ident(sym) => {
                self.advance();
                let ident = Ident::new(sym, tok.span.clone());
                if self.eat(&TokenKind::ColonColon) {
                    let item = self.parse_member_rest_after_colons()?;
                    let span = tok.span.start..item.span().end;
                    return Ok(Expr::ModuleAccess(ModuleAccessExpr {
                        id: NodeId::UNSET,
                        module_name: ident,
                        item: Box::new(item),
                        span,
                    }));
                }
                let span = ident.span.clone();
                Ok(Expr::Var(VarExpr::new(ident, span)))
            }
            _ => Err(self.error_here("expected expression".into())),
        }
    }

    /// Item after `Mod::` — a variable or a call.
    fn parse_member_rest_after_colons(&mut self) -> PResult<Expr> {
        let ident = self.expect_ident("item name after `::`")?;
        if self.check(&TokenKind::LeftParen) {
            let args = self.parse_args()?;
            let span = ident.span.start..self.prev_span_end();
            Ok(Expr::Call(CallExpr::new(ident, args, span)))
        } else {
            let span = ident.span.clone();
            Ok(Expr::Var(VarExpr::new(ident, span)))
        }
    }

    fn parse_object_expr(&mut self) -> PResult<Expr> {
        let open = self.advance();
        let mut members = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.expect_ident("member key")?;
            self.expect(TokenKind::Colon, "`:` after member key")?;
            let value = self.parse_expr()?;
            members.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RightBrace, "`}` after object members")?;
        Ok(Expr::Object(ObjectExpr {
            id: NodeId::UNSET,
            members,
            span: open.span.start..close.span.end,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Module {
        let (module, errors) = parse_module(src);
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        module
    }

    #[test]
    fn parses_declarations_and_functions() {
        let module = parse_ok("let x = 5;\nconst k = 3;\nfunc f(a, b) { return a; }\n");
        assert_eq!(module.body.len(), 3);
        assert!(matches!(module.body[0], Stmt::VarDecl(_)));
        assert!(matches!(module.body[2], Stmt::FuncDecl(_)));
    }

    #[test]
    fn parses_module_header() {
        let module = parse_ok("module main;\nlet x = 1;\n");
        assert_eq!(module.name.as_ref().map(|i| i.sym.as_str()), Some("main"));
    }

    #[test]
    fn member_chains_nest_to_the_right() {
        let module = parse_ok("a.b.c;");
        let Stmt::Expr(stmt) = &module.body[0] else {
            panic!("expected expression statement");
        };
        let Expr::Member(outer) = &stmt.expr else {
            panic!("expected member access");
        };
        assert!(matches!(*outer.left, Expr::Var(_)));
        assert!(matches!(*outer.right, Expr::Member(_)));
    }

    #[test]
    fn inline_attribute_recorded() {
        let module = parse_ok("inline func f() { return 1; }");
        let Stmt::FuncDecl(func) = &module.body[0] else {
            panic!("expected function");
        };
        assert!(func.has_attribute("inline"));
    }

    #[test]
    fn recovers_after_bad_statement() {
        let (module, errors) = parse_module("let = 5;\nlet y = 2;\n");
        assert_eq!(errors.len(), 1);
        assert!(
            module
                .body
                .iter()
                .any(|s| matches!(s, Stmt::VarDecl(v) if v.ident.sym == "y"))
        );
    }

    #[test]
    fn parses_grouped_imports() {
        let module = parse_ok("import \"a.rye\", \"b.rye\";");
        assert!(matches!(module.body[0], Stmt::Imports(_)));
        let module = parse_ok("import \"a.rye\";");
        assert!(matches!(module.body[0], Stmt::Import(_)));
    }

    #[test]
    fn parses_module_access_and_range() {
        let module = parse_ok("mathlib::add(1, 2);\nlet r = 1..5;\n");
        let Stmt::Expr(stmt) = &module.body[0] else {
            panic!("expected expression statement");
        };
        assert!(matches!(stmt.expr, Expr::ModuleAccess(_)));
        let Stmt::VarDecl(decl) = &module.body[1] else {
            panic!("expected declaration");
        };
        assert!(matches!(decl.init, Expr::Range(_)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let module = parse_ok("a = b = 1;");
        let Stmt::Expr(stmt) = &module.body[0] else {
            panic!("expected expression statement");
        };
        let Expr::Binary(outer) = &stmt.expr else {
            panic!("expected assignment");
        };
        assert_eq!(outer.op, BinOp::Assign);
        assert!(matches!(&*outer.right, Expr::Binary(b) if b.op == BinOp::Assign));
    }

    #[test]
    fn empty_statement_parses() {
        let module = parse_ok("func f() { return 1; ; }");
        let Stmt::FuncDecl(func) = &module.body[0] else {
            panic!("expected function");
        };
        assert!(matches!(func.body.stmts[1], Stmt::Empty(_)));
    }
}
