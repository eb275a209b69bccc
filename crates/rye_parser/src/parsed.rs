//! Parsed module representation with additional metadata
//!
//! This module provides `ParsedModule`, which wraps the parsed AST with
//! the information downstream phases need: the module's resolved name, its
//! source path, the raw token stream for tooling, and accumulated parse
//! errors. Finalization stamps every node with its `NodeId` and owning
//! module before the unit enters the registry.

use std::path::{Path, PathBuf};

use rye_ast::*;

use crate::tokenizer::{self, Token};
use crate::{ParseError, parse_module};

/// A parsed compilation unit with its metadata.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    /// The parsed AST module
    pub parsed: Module,
    /// Original source text (no preprocessing)
    pub source: String,
    /// Resolved module name: the `module foo;` declaration when present,
    /// otherwise the source file stem.
    pub name: String,
    /// Path the source was read from; imports resolve relative to its
    /// parent directory.
    pub path: PathBuf,
    /// Token stream for the parsed source code, exposed for testing and
    /// tooling purposes.
    pub tokens: Vec<Token>,
    /// Recoverable parse errors collected while building the AST.
    pub errors: Vec<ParseError>,
}

impl ParsedModule {
    /// Parse `source` into a module unit. The unit is not yet finalized;
    /// the registry assigns its `ModuleId` and calls [`ParsedModule::finalize`].
    pub fn parse(source: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tokens = tokenizer::tokenize(source);
        let (parsed, errors) = parse_module(source);
        let name = parsed
            .name
            .as_ref()
            .map(|i| i.sym.clone())
            .unwrap_or_else(|| file_stem(&path));
        Self {
            parsed,
            source: source.to_string(),
            name,
            path,
            tokens,
            errors,
        }
    }

    /// Stamp every AST node with a fresh `NodeId` and the owning module.
    /// `next_id` is shared across all units of one compilation so node ids
    /// stay unique program-wide.
    pub fn finalize(&mut self, module_id: ModuleId, next_id: &mut u32) {
        for stmt in &mut self.parsed.body {
            finalize_stmt(stmt, module_id, next_id);
        }
    }

    /// Resolve a byte offset within this unit to a source location.
    pub fn locate(&self, offset: usize) -> SourceLocation {
        rye_ast::locate(&self.source, &self.path.to_string_lossy(), offset)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main")
        .to_string()
}

fn fresh(next_id: &mut u32) -> NodeId {
    *next_id += 1;
    NodeId(*next_id)
}

fn finalize_stmt(stmt: &mut Stmt, mid: ModuleId, next: &mut u32) {
    match stmt {
        Stmt::Imports(s) => {
            s.id = fresh(next);
            for import in &mut s.imports {
                import.id = fresh(next);
                import.module = mid;
            }
        }
        Stmt::Import(s) => {
            s.id = fresh(next);
            s.module = mid;
        }
        Stmt::Empty(s) => s.id = fresh(next),
        Stmt::Block(s) => finalize_block(s, mid, next),
        Stmt::Expr(s) => {
            s.id = fresh(next);
            finalize_expr(&mut s.expr, mid, next);
        }
        Stmt::VarDecl(s) => {
            s.id = fresh(next);
            s.module = mid;
            finalize_expr(&mut s.init, mid, next);
        }
        Stmt::Alias(s) => {
            s.id = fresh(next);
            s.module = mid;
            finalize_expr(&mut s.target, mid, next);
        }
        Stmt::UseModule(s) => {
            s.id = fresh(next);
            s.module = mid;
        }
        Stmt::FuncDecl(s) => {
            s.id = fresh(next);
            s.module = mid;
            finalize_block(&mut s.body, mid, next);
        }
        Stmt::ClassDecl(s) => s.id = fresh(next),
        Stmt::EnumDecl(s) => {
            s.id = fresh(next);
            for member in &mut s.members {
                member.module = mid;
                finalize_expr(&mut member.value, mid, next);
            }
        }
        Stmt::Print(s) => {
            s.id = fresh(next);
            for arg in &mut s.args {
                finalize_expr(arg, mid, next);
            }
        }
        Stmt::Return(s) => {
            s.id = fresh(next);
            if let Some(arg) = &mut s.arg {
                finalize_expr(arg, mid, next);
            }
        }
        Stmt::If(s) => {
            s.id = fresh(next);
            finalize_expr(&mut s.cond, mid, next);
            finalize_block(&mut s.cons, mid, next);
            if let Some(alt) = &mut s.alt {
                finalize_stmt(alt, mid, next);
            }
        }
        Stmt::For(s) => {
            s.id = fresh(next);
            if let Some(init) = &mut s.init {
                finalize_stmt(init, mid, next);
            }
            if let Some(cond) = &mut s.cond {
                finalize_expr(cond, mid, next);
            }
            if let Some(update) = &mut s.update {
                finalize_expr(update, mid, next);
            }
            finalize_block(&mut s.body, mid, next);
        }
        Stmt::While(s) => {
            s.id = fresh(next);
            finalize_expr(&mut s.cond, mid, next);
            finalize_block(&mut s.body, mid, next);
        }
        Stmt::Try(s) => {
            s.id = fresh(next);
            finalize_block(&mut s.block, mid, next);
            finalize_block(&mut s.catch_block, mid, next);
        }
    }
}

fn finalize_block(block: &mut BlockStmt, mid: ModuleId, next: &mut u32) {
    block.id = fresh(next);
    for stmt in &mut block.stmts {
        finalize_stmt(stmt, mid, next);
    }
}

fn finalize_expr(expr: &mut Expr, mid: ModuleId, next: &mut u32) {
    match expr {
        Expr::Paren(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.inner, mid, next);
        }
        Expr::Binary(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.left, mid, next);
            finalize_expr(&mut e.right, mid, next);
        }
        Expr::Unary(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.expr, mid, next);
        }
        Expr::Index(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.obj, mid, next);
            finalize_expr(&mut e.index, mid, next);
        }
        Expr::Member(e) => {
            e.id = fresh(next);
            e.module = mid;
            finalize_expr(&mut e.left, mid, next);
            finalize_expr(&mut e.right, mid, next);
        }
        Expr::ModuleAccess(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.item, mid, next);
        }
        Expr::Var(e) => {
            e.id = fresh(next);
            e.module = mid;
        }
        Expr::Int(e) => e.id = fresh(next),
        Expr::Float(e) => e.id = fresh(next),
        Expr::Str(e) => e.id = fresh(next),
        Expr::Bool(e) => e.id = fresh(next),
        Expr::Null(e) => e.id = fresh(next),
        Expr::SelfRef(e) => e.id = fresh(next),
        Expr::New(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.target, mid, next);
        }
        Expr::FuncExpr(e) => {
            e.id = fresh(next);
            finalize_block(&mut e.body, mid, next);
        }
        Expr::Call(e) => {
            e.id = fresh(next);
            e.module = mid;
            for arg in &mut e.args {
                finalize_expr(arg, mid, next);
            }
        }
        Expr::Object(e) => {
            e.id = fresh(next);
            for (_, value) in &mut e.members {
                finalize_expr(value, mid, next);
            }
        }
        Expr::Range(e) => {
            e.id = fresh(next);
            finalize_expr(&mut e.start, mid, next);
            finalize_expr(&mut e.end, mid, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_assigns_unique_ids_and_module() {
        let mut unit = ParsedModule::parse("let x = 1;\nfunc f(a) { return a; }\n", "unit.rye");
        let mut next = 0u32;
        unit.finalize(ModuleId(3), &mut next);
        assert!(next > 0);

        let Stmt::VarDecl(decl) = &unit.parsed.body[0] else {
            panic!("expected declaration");
        };
        assert_ne!(decl.id, NodeId::UNSET);
        assert_eq!(decl.module, ModuleId(3));

        let Stmt::FuncDecl(func) = &unit.parsed.body[1] else {
            panic!("expected function");
        };
        assert_ne!(func.id, NodeId::UNSET);
        assert_ne!(func.id, decl.id);
    }

    #[test]
    fn name_falls_back_to_file_stem() {
        let unit = ParsedModule::parse("let x = 1;", "/tmp/widgets.rye");
        assert_eq!(unit.name, "widgets");
        let unit = ParsedModule::parse("module core;\nlet x = 1;", "/tmp/widgets.rye");
        assert_eq!(unit.name, "core");
    }
}
