//! Semantic analysis for the Rye compiler.
//!
//! A single-pass visitor over the AST that populates the symbol table,
//! resolves identifier references, mangles names, inserts implicit returns,
//! records per-node use counts, and accumulates diagnostics. Errors are
//! recoverable at the statement level: the analyzer records them and keeps
//! visiting siblings so one run reports as many problems as possible.

pub mod fold;
pub mod registry;
pub mod scope;

pub use registry::{ModuleDefine, ModuleRegistry, NativeMethod};
pub use scope::{COMPILER_GLOBAL_LEVEL, CompilerState, LevelInfo, LevelKind, Symbol};

use rye_ast::*;
use rye_parser::ParsedModule;

use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// The semantic analyzer: a visitor over one module and everything it
/// imports, threading an explicit `CompilerState` and module registry.
pub struct SemanticAnalyzer<'a> {
    pub state: &'a mut CompilerState,
    pub registry: &'a mut ModuleRegistry,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(state: &'a mut CompilerState, registry: &'a mut ModuleRegistry) -> Self {
        Self { state, registry }
    }

    /// Analyze a top-level module: visit all of its children, then warn
    /// about unused globals and reset the scope stack for the next unit.
    pub fn analyze(&mut self, module: ModuleId) {
        let mut body = std::mem::take(&mut self.registry.get_mut(module).parsed.body);
        for stmt in &mut body {
            self.visit_stmt(stmt, module);
        }
        self.registry.get_mut(module).parsed.body = body;

        self.state.warn_unused_in_current_level();
        self.state.block_id_counter = 0;
        self.state.level = COMPILER_GLOBAL_LEVEL;
        self.state.levels.clear();
        self.state.levels.push(LevelInfo::new(LevelKind::Global));
    }

    /// Register a host-provided native module: a synthetic unit in the
    /// registry plus one native symbol per method at the current level.
    pub fn add_module(&mut self, def: &ModuleDefine) {
        if self.registry.find_by_name(&def.name).is_some() {
            self.error(
                DiagnosticKind::ModuleAlreadyDefined,
                SourceLocation::synthetic(),
                format!("module `{}` has already been defined", def.name),
            );
            return;
        }

        for meth in &def.methods {
            let mangled = self.state.make_variable_name(&meth.name, &def.name);
            if self.state.find_variable(&mangled, true).is_some() {
                self.error(
                    DiagnosticKind::RedeclaredIdentifier,
                    SourceLocation::synthetic(),
                    format!("identifier `{}` has already been declared", meth.name),
                );
                return;
            }
            let mut symbol = Symbol::new(&meth.name, SourceLocation::synthetic());
            symbol.is_native = true;
            symbol.nargs = meth.nargs;
            symbol.owner_level = self.state.level as i32;
            symbol.field_index = self.state.current_level().locals.len() as i32;
            self.state.declare(mangled, symbol);
        }

        self.registry.insert_native(&def.name);
    }

    // ---- helpers ----

    fn error(&mut self, kind: DiagnosticKind, location: SourceLocation, message: String) {
        self.state
            .errors
            .push(Diagnostic::new(kind, location, message));
    }

    fn locate(&self, unit: ModuleId, span: &Span) -> SourceLocation {
        self.registry.get(unit).locate(span.start)
    }

    fn mangled(&self, name: &str, module: ModuleId) -> String {
        self.state
            .make_variable_name(name, self.registry.module_name(module))
    }

    // ---- statements ----

    fn visit_stmt(&mut self, stmt: &mut Stmt, unit: ModuleId) {
        match stmt {
            Stmt::Imports(s) => {
                for import in &mut s.imports {
                    self.visit_import(import, unit);
                }
            }
            Stmt::Import(s) => self.visit_import(s, unit),
            Stmt::Empty(_) => {}
            Stmt::Block(block) => self.visit_block(block, unit),
            Stmt::Expr(s) => self.visit_expr(&mut s.expr, unit),
            Stmt::VarDecl(s) => self.visit_var_decl(s, unit),
            Stmt::Alias(s) => self.visit_alias(s, unit),
            Stmt::UseModule(s) => {
                let location = self.locate(unit, &s.span);
                self.error(
                    DiagnosticKind::UnsupportedFeature,
                    location,
                    format!("`use {}` is not supported", s.ident.sym),
                );
            }
            Stmt::FuncDecl(s) => self.visit_func_decl(s, unit),
            Stmt::ClassDecl(_) => {}
            Stmt::EnumDecl(s) => self.visit_enum(s, unit),
            Stmt::Print(s) => {
                for arg in &mut s.args {
                    self.visit_expr(arg, unit);
                }
            }
            Stmt::Return(s) => self.visit_return(s, unit),
            Stmt::If(s) => self.visit_if(s, unit),
            Stmt::For(s) => self.visit_for(s, unit),
            Stmt::While(s) => self.visit_while(s, unit),
            Stmt::Try(s) => self.visit_try(s, unit),
        }
    }

    /// Visit a block's children, warning once about statements that follow
    /// a `return` in the same block. No-op statements do not trigger the
    /// warning.
    fn visit_block(&mut self, block: &mut BlockStmt, unit: ModuleId) {
        let mut in_dead_code = false;
        let mut warning_shown = false;
        for stmt in &mut block.stmts {
            self.visit_stmt(stmt, unit);
            if matches!(stmt, Stmt::Return(_)) {
                in_dead_code = true;
            } else if in_dead_code && !warning_shown && !matches!(stmt, Stmt::Empty(_)) {
                let location = self.locate(unit, &stmt.span());
                self.error(
                    DiagnosticKind::UnreachableCode,
                    location,
                    "unreachable code".to_string(),
                );
                warning_shown = true;
            }
        }
    }

    fn visit_import(&mut self, node: &mut ImportStmt, unit: ModuleId) {
        if self.state.level != COMPILER_GLOBAL_LEVEL {
            let location = self.locate(unit, &node.span);
            self.error(
                DiagnosticKind::ImportOutsideGlobal,
                location,
                "imports are only allowed at the global level".to_string(),
            );
        }

        // Resolve relative to the importing unit's directory.
        let base = self
            .registry
            .get(unit)
            .path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        let path = base.join(&node.path);

        if self.registry.contains_path(&path) {
            return;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                let location = self.locate(unit, &node.span);
                self.error(
                    DiagnosticKind::ImportNotFound,
                    location,
                    format!(
                        "cannot import `{}`: no such file `{}`",
                        node.path,
                        path.display()
                    ),
                );
                return;
            }
        };

        let parsed = ParsedModule::parse(&text, &path);
        if self.registry.find_by_name(&parsed.name).is_some() {
            let location = self.locate(unit, &node.span);
            self.error(
                DiagnosticKind::ModuleAlreadyDefined,
                location,
                format!("module `{}` has already been defined", parsed.name),
            );
            return;
        }

        // Parse errors of the imported unit join this compilation's list.
        for err in &parsed.errors {
            let location = parsed.locate(err.span.start);
            self.error(DiagnosticKind::SyntaxError, location, err.message.clone());
        }

        let imported = self.registry.insert(parsed, &mut self.state.node_ids);
        let mut body = std::mem::take(&mut self.registry.get_mut(imported).parsed.body);
        for stmt in &mut body {
            self.visit_stmt(stmt, imported);
        }
        self.registry.get_mut(imported).parsed.body = body;
    }

    fn visit_var_decl(&mut self, node: &mut VarDecl, unit: ModuleId) {
        let mangled = self.mangled(&node.ident.sym, node.module);
        if self.state.find_variable(&mangled, true).is_some() {
            let location = self.locate(unit, &node.ident.span);
            self.error(
                DiagnosticKind::RedeclaredIdentifier,
                location,
                format!(
                    "identifier `{}` has already been declared in this scope",
                    node.ident.sym
                ),
            );
        } else if self.registry.find_by_name(&node.ident.sym).is_some() {
            let location = self.locate(unit, &node.ident.span);
            self.error(
                DiagnosticKind::IdentifierIsModule,
                location,
                format!("`{}` is the name of a module", node.ident.sym),
            );
        } else {
            let location = self.locate(unit, &node.ident.span);
            let mut symbol = Symbol::new(&node.ident.sym, location);
            symbol.node = Some(node.id);
            symbol.is_const = node.is_const;

            let value = self.classify_value(&node.init);
            symbol.is_literal = value.is_literal();
            symbol.current_value = Some(value);
            symbol.owner_level = self.state.level as i32;
            symbol.field_index = self.state.current_level().locals.len() as i32;
            self.state.declare(mangled, symbol);

            self.visit_expr(&mut node.init, unit);
        }
    }

    /// Unwrap one expression layer and constant-fold when enabled; the
    /// result is the symbol's best-known value, used for literal
    /// classification.
    fn classify_value(&self, init: &Expr) -> Expr {
        let rhs = init.unwrap_paren();
        if self.state.optimize_constant_folding
            && let Some(folded) = fold::fold_expr(rhs)
        {
            return folded;
        }
        rhs.clone()
    }

    fn visit_alias(&mut self, node: &mut AliasDecl, unit: ModuleId) {
        let mangled = self.mangled(&node.ident.sym, node.module);
        if self.state.find_variable(&mangled, true).is_some() {
            let location = self.locate(unit, &node.ident.span);
            self.error(
                DiagnosticKind::RedeclaredIdentifier,
                location,
                format!(
                    "identifier `{}` has already been declared in this scope",
                    node.ident.sym
                ),
            );
            return;
        }
        if self.registry.find_by_name(&node.ident.sym).is_some() {
            let location = self.locate(unit, &node.ident.span);
            self.error(
                DiagnosticKind::IdentifierIsModule,
                location,
                format!("`{}` is the name of a module", node.ident.sym),
            );
            return;
        }

        self.visit_expr(&mut node.target, unit);

        let location = self.locate(unit, &node.ident.span);
        let mut symbol = Symbol::new(&node.ident.sym, location);
        symbol.node = Some(node.target.id());
        symbol.is_alias = true;

        // Descend member-access chains to the terminal variable and take
        // over its storage coordinates.
        let mut candidate: &Expr = &node.target;
        loop {
            match candidate {
                Expr::Member(member) => candidate = &member.right,
                Expr::Var(var) => {
                    symbol.owner_level = var.owner_level;
                    symbol.field_index = var.field_index;
                    break;
                }
                _ => {
                    let location = self.locate(unit, &node.span);
                    self.error(
                        DiagnosticKind::UnrecognizedAliasType,
                        location,
                        format!("unrecognized alias target for `{}`", node.ident.sym),
                    );
                    break;
                }
            }
        }

        self.state.declare(mangled, symbol);
    }

    fn visit_func_decl(&mut self, node: &mut FuncDecl, unit: ModuleId) {
        let mangled = self.mangled(&node.ident.sym, node.module);
        if self.state.find_variable(&mangled, true).is_some() {
            let location = self.locate(unit, &node.ident.span);
            self.error(
                DiagnosticKind::RedeclaredIdentifier,
                location,
                format!(
                    "identifier `{}` has already been declared in this scope",
                    node.ident.sym
                ),
            );
            return;
        }
        if self.registry.find_by_name(&node.ident.sym).is_some() {
            let location = self.locate(unit, &node.ident.span);
            self.error(
                DiagnosticKind::IdentifierIsModule,
                location,
                format!("`{}` is the name of a module", node.ident.sym),
            );
            return;
        }

        let location = self.locate(unit, &node.ident.span);
        let inline = node.has_attribute("inline");

        if !inline {
            let mut symbol = Symbol::new(&node.ident.sym, location.clone());
            symbol.node = Some(node.id);
            symbol.owner_level = self.state.level as i32;
            symbol.field_index = self.state.current_level().locals.len() as i32;
            self.state.declare(mangled.clone(), symbol);
        }

        self.ensure_trailing_return(&mut node.body, unit, Some(&node.ident.sym));

        self.state.increase_block(LevelKind::Function);
        for param in &node.params {
            let mangled_param = self.mangled(&param.sym, node.module);
            let param_location = self.locate(unit, &param.span);
            let mut symbol = Symbol::new(&param.sym, param_location);
            symbol.owner_level = self.state.level as i32;
            symbol.field_index = self.state.current_level().locals.len() as i32;
            self.state.declare(mangled_param, symbol);
        }
        self.visit_block(&mut node.body, unit);
        self.state.decrease_block();

        if inline {
            // Registering the symbol only after the body keeps inline
            // functions from referencing themselves.
            let mut symbol = Symbol::new(&node.ident.sym, location);
            symbol.node = Some(node.id);
            symbol.is_const = true;
            symbol.is_inline = true;
            symbol.owner_level = self.state.level as i32;
            symbol.field_index = self.state.current_level().locals.len() as i32;
            self.state.declare(mangled, symbol);
        }
    }

    fn visit_func_expr(&mut self, node: &mut FuncExpr, unit: ModuleId) {
        self.ensure_trailing_return(&mut node.body, unit, None);

        self.state.increase_block(LevelKind::Function);
        for param in &node.params {
            let mangled_param = self.mangled(&param.sym, unit);
            let param_location = self.locate(unit, &param.span);
            let mut symbol = Symbol::new(&param.sym, param_location);
            symbol.owner_level = self.state.level as i32;
            symbol.field_index = self.state.current_level().locals.len() as i32;
            self.state.declare(mangled_param, symbol);
        }
        self.visit_block(&mut node.body, unit);
        self.state.decrease_block();
    }

    /// Guarantee the body ends in a return statement, appending a
    /// synthetic `return null` when it does not. Empty bodies additionally
    /// get an info diagnostic.
    fn ensure_trailing_return(&mut self, body: &mut BlockStmt, unit: ModuleId, name: Option<&str>) {
        if body.stmts.is_empty() {
            let location = self.locate(unit, &body.span);
            let message = match name {
                Some(name) => format!("function `{}` has an empty body", name),
                None => "function has an empty body".to_string(),
            };
            self.error(DiagnosticKind::EmptyFunctionBody, location, message);
            let span = body.span.clone();
            let ret = self.synthetic_return(span);
            body.stmts.push(ret);
        } else if !block_ends_with_return(body) {
            let span = body
                .stmts
                .last()
                .map(|s| s.span())
                .unwrap_or_else(|| body.span.clone());
            let ret = self.synthetic_return(span);
            body.stmts.push(ret);
        }
    }

    fn synthetic_return(&mut self, span: Span) -> Stmt {
        let null = Expr::Null(NullLit {
            id: self.state.fresh_node_id(),
            span: span.clone(),
        });
        Stmt::Return(ReturnStmt {
            id: self.state.fresh_node_id(),
            arg: Some(null),
            unwind_levels: 0,
            synthetic: true,
            span,
        })
    }

    fn visit_enum(&mut self, node: &mut EnumDecl, unit: ModuleId) {
        // Only the members are declared, not the enum name itself.
        for member in &node.members {
            let mangled = self.mangled(&member.ident.sym, member.module);
            if self.state.find_variable(&mangled, true).is_some() {
                let location = self.locate(unit, &member.ident.span);
                self.error(
                    DiagnosticKind::RedeclaredIdentifier,
                    location,
                    format!(
                        "identifier `{}` has already been declared in this scope",
                        member.ident.sym
                    ),
                );
            } else if self.registry.find_by_name(&member.ident.sym).is_some() {
                let location = self.locate(unit, &member.ident.span);
                self.error(
                    DiagnosticKind::IdentifierIsModule,
                    location,
                    format!("`{}` is the name of a module", member.ident.sym),
                );
            } else {
                let location = self.locate(unit, &member.ident.span);
                let mut symbol = Symbol::new(&member.ident.sym, location);
                symbol.node = Some(member.value.id());
                symbol.is_alias = true;
                symbol.is_const = true;
                symbol.owner_level = self.state.level as i32;
                symbol.field_index = self.state.current_level().locals.len() as i32;
                self.state.declare(mangled, symbol);
            }
        }
    }

    fn visit_return(&mut self, node: &mut ReturnStmt, unit: ModuleId) {
        if let Some(arg) = &mut node.arg {
            self.visit_expr(arg, unit);
        }

        // Distance to the nearest enclosing function level; codegen uses
        // this as the stack-unwinding count.
        let mut levels = 0u32;
        let mut idx = self.state.level as i64;
        while idx >= COMPILER_GLOBAL_LEVEL as i64
            && self.state.levels[idx as usize].kind != LevelKind::Function
        {
            idx -= 1;
            levels += 1;
        }
        node.unwind_levels = levels;
    }

    fn visit_if(&mut self, node: &mut IfStmt, unit: ModuleId) {
        self.visit_expr(&mut node.cond, unit);

        self.state.increase_block(LevelKind::Condition);
        self.visit_block(&mut node.cons, unit);
        self.state.decrease_block();

        if let Some(alt) = &mut node.alt {
            self.state.increase_block(LevelKind::Condition);
            self.visit_stmt(alt, unit);
            self.state.decrease_block();
        }
    }

    fn visit_while(&mut self, node: &mut WhileStmt, unit: ModuleId) {
        self.visit_expr(&mut node.cond, unit);

        if node.body.stmts.is_empty() {
            let location = self.locate(unit, &node.body.span);
            self.error(
                DiagnosticKind::EmptyStatementBody,
                location,
                "statement body is empty".to_string(),
            );
        }

        self.state.increase_block(LevelKind::Loop);
        self.visit_block(&mut node.body, unit);
        self.state.decrease_block();
    }

    fn visit_for(&mut self, node: &mut ForStmt, unit: ModuleId) {
        if node.body.stmts.is_empty() {
            let location = self.locate(unit, &node.body.span);
            self.error(
                DiagnosticKind::EmptyStatementBody,
                location,
                "statement body is empty".to_string(),
            );
        }

        // Initializer and condition live in the enclosing scope.
        if let Some(init) = &mut node.init {
            self.visit_stmt(init, unit);
        }
        if let Some(cond) = &mut node.cond {
            self.visit_expr(cond, unit);
        }

        self.state.increase_block(LevelKind::Loop);
        self.visit_block(&mut node.body, unit);
        self.state.decrease_block();

        if let Some(update) = &mut node.update {
            self.visit_expr(update, unit);
        }
    }

    fn visit_try(&mut self, node: &mut TryStmt, unit: ModuleId) {
        if node.block.stmts.is_empty() {
            let location = self.locate(unit, &node.block.span);
            self.error(
                DiagnosticKind::EmptyStatementBody,
                location,
                "statement body is empty".to_string(),
            );
        }
        self.state.increase_block(LevelKind::Default);
        self.visit_block(&mut node.block, unit);
        self.state.decrease_block();

        if node.catch_block.stmts.is_empty() {
            let location = self.locate(unit, &node.catch_block.span);
            self.error(
                DiagnosticKind::EmptyStatementBody,
                location,
                "statement body is empty".to_string(),
            );
        }
        self.state.increase_block(LevelKind::Default);
        // The caught exception is a local of the catch scope.
        let mangled = self.mangled(&node.param.sym, unit);
        let location = self.locate(unit, &node.param.span);
        let mut symbol = Symbol::new(&node.param.sym, location);
        symbol.owner_level = self.state.level as i32;
        symbol.field_index = self.state.current_level().locals.len() as i32;
        self.state.declare(mangled, symbol);
        self.visit_block(&mut node.catch_block, unit);
        self.state.decrease_block();
    }

    // ---- expressions ----

    fn visit_expr(&mut self, expr: &mut Expr, unit: ModuleId) {
        match expr {
            Expr::Paren(e) => self.visit_expr(&mut e.inner, unit),
            Expr::Binary(e) => self.visit_binary(e, unit),
            Expr::Unary(e) => self.visit_expr(&mut e.expr, unit),
            Expr::Index(e) => {
                self.visit_expr(&mut e.obj, unit);
                self.visit_expr(&mut e.index, unit);
            }
            Expr::Member(e) => self.visit_member(e, unit),
            Expr::ModuleAccess(e) => self.visit_module_access(e, unit),
            Expr::Var(e) => self.visit_var(e, unit),
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Str(_)
            | Expr::Bool(_)
            | Expr::Null(_)
            | Expr::SelfRef(_)
            | Expr::New(_)
            | Expr::Range(_) => {}
            Expr::FuncExpr(e) => self.visit_func_expr(e, unit),
            Expr::Call(e) => self.visit_call(e, unit),
            Expr::Object(e) => {
                for (_, value) in &mut e.members {
                    self.visit_expr(value, unit);
                }
            }
        }
    }

    fn visit_binary(&mut self, node: &mut BinaryExpr, unit: ModuleId) {
        self.visit_expr(&mut node.left, unit);
        self.visit_expr(&mut node.right, unit);

        if !node.op.is_assignment() {
            return;
        }

        if node.op == BinOp::Assign
            && let Expr::Var(var) = node.left.as_mut()
            && !var.is_const
            && let Some(symbol_id) = var.symbol
        {
            // Track the new best-known value for later references.
            let value = self.classify_value(&node.right);
            let is_literal = value.is_literal();
            var.is_literal = is_literal;
            var.current_value = Some(Box::new(value.clone()));
            let symbol = self.state.symbol_mut(symbol_id);
            symbol.current_value = Some(value);
            symbol.is_literal = is_literal;
        }

        match node.left.as_ref() {
            Expr::Var(var) => {
                if var.is_const {
                    let location = self.locate(unit, &var.span);
                    self.error(
                        DiagnosticKind::ConstIdentifier,
                        location,
                        format!("cannot assign to constant `{}`", var.ident.sym),
                    );
                }
                if node.left.has_attribute("inline") {
                    let location = self.locate(unit, &node.left.span());
                    self.error(
                        DiagnosticKind::ProhibitedActionAttribute,
                        location,
                        "action prohibited by the `inline` attribute".to_string(),
                    );
                }
                if node.right.has_attribute("inline") {
                    let location = self.locate(unit, &node.right.span());
                    self.error(
                        DiagnosticKind::ProhibitedActionAttribute,
                        location,
                        "action prohibited by the `inline` attribute".to_string(),
                    );
                }
            }
            Expr::Member(_) | Expr::Index(_) => {
                // TODO: reject assignment through const member and array
                // targets once object const-ness is tracked.
            }
            _ => {
                let location = self.locate(unit, &node.left.span());
                self.error(
                    DiagnosticKind::ExpectedIdentifier,
                    location,
                    "expected an identifier on the left side of assignment".to_string(),
                );
            }
        }
    }

    fn visit_member(&mut self, node: &mut MemberExpr, unit: ModuleId) {
        // A leading identifier naming a known module turns the access into
        // a reference inside that module's namespace.
        let found = match node.left.as_ref() {
            Expr::Var(left) => self.registry.find_by_name(&left.ident.sym),
            _ => None,
        };

        if let Some(module) = found {
            set_expr_module(&mut node.right, module);
            self.visit_expr(&mut node.right, unit);
            return;
        }

        self.visit_expr(&mut node.left, unit);
        if matches!(node.right.as_ref(), Expr::Member(_)) {
            self.visit_expr(&mut node.right, unit);
        } else if !matches!(node.right.as_ref(), Expr::Var(_) | Expr::Call(_)) {
            let location = self.locate(unit, &node.span);
            self.error(
                DiagnosticKind::InternalError,
                location,
                "malformed member access".to_string(),
            );
        }
    }

    fn visit_module_access(&mut self, node: &mut ModuleAccessExpr, unit: ModuleId) {
        match self.registry.find_by_name(&node.module_name.sym) {
            Some(module) => {
                set_expr_module(&mut node.item, module);
                self.visit_expr(&mut node.item, unit);
            }
            None => {
                let location = self.locate(unit, &node.span);
                self.error(
                    DiagnosticKind::ModuleNotImported,
                    location,
                    format!("module `{}` has not been imported", node.module_name.sym),
                );
            }
        }
    }

    fn visit_var(&mut self, node: &mut VarExpr, unit: ModuleId) {
        let mangled = self.mangled(&node.ident.sym, node.module);
        let Some(symbol_id) = self.state.find_variable(&mangled, false) else {
            let location = self.locate(unit, &node.span);
            self.error(
                DiagnosticKind::UndeclaredIdentifier,
                location,
                format!("undeclared identifier `{}`", node.ident.sym),
            );
            return;
        };

        let symbol = self.state.symbol(symbol_id);
        let symbol_node = symbol.node;
        let is_inline = symbol.is_inline;
        let is_const = symbol.is_const;
        let is_literal = symbol.is_literal;
        let current_value = symbol.current_value.clone();

        node.is_alias = symbol.is_alias;
        if node.is_alias {
            node.alias_to = symbol_node;
        }
        node.is_const = is_const;
        node.is_literal = is_literal;
        node.current_value = current_value.map(Box::new);
        node.symbol = Some(symbol_id);
        node.owner_level = symbol.owner_level;
        node.field_index = symbol.field_index;

        if let Some(declaration) = symbol_node {
            if is_inline {
                let location = self.locate(unit, &node.span);
                self.error(
                    DiagnosticKind::ProhibitedActionAttribute,
                    location,
                    "action prohibited by the `inline` attribute".to_string(),
                );
            }

            // References that will be inlined do not count as uses of the
            // declaration.
            let suppressed = self.state.optimize_constant_folding
                && is_const
                && is_literal
                && node.current_value.is_some();
            if !suppressed {
                self.state.increment_use_count(declaration);
            }
        }
    }

    fn visit_call(&mut self, node: &mut CallExpr, unit: ModuleId) {
        let mangled = self.mangled(&node.callee.sym, node.module);
        let Some(symbol_id) = self.state.find_variable(&mangled, false) else {
            let location = self.locate(unit, &node.span);
            self.error(
                DiagnosticKind::UndeclaredIdentifier,
                location,
                format!("undeclared identifier `{}`", node.callee.sym),
            );
            return;
        };

        let symbol = self.state.symbol(symbol_id);
        if symbol.is_alias {
            node.is_alias = true;
            node.alias_to = symbol.node;
        }
        node.definition = symbol.node;
        if let Some(declaration) = symbol.node {
            self.state.increment_use_count(declaration);
        }

        // Arguments are analyzed right-to-left, matching the push order
        // of the stack VM.
        for arg in node.args.iter_mut().rev() {
            self.visit_expr(arg, unit);
        }
    }
}

/// True when the last statement of the block, skipping trailing no-op
/// statements, is a return.
fn block_ends_with_return(block: &BlockStmt) -> bool {
    for stmt in block.stmts.iter().rev() {
        match stmt {
            Stmt::Empty(_) => continue,
            Stmt::Return(_) => return true,
            _ => return false,
        }
    }
    false
}

fn set_expr_module(expr: &mut Expr, module: ModuleId) {
    match expr {
        Expr::Var(var) => var.module = module,
        Expr::Call(call) => call.module = module,
        Expr::Member(member) => member.module = module,
        _ => {}
    }
}
