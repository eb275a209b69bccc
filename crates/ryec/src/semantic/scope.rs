//! Symbol table and scope stack.
//!
//! Scopes form a stack of `LevelInfo` records indexed by the current level;
//! level 0 is the global level and is never popped during analysis. Symbol
//! records live in an arena owned by `CompilerState` and are addressed by
//! `SymbolId`, so annotations written into the AST stay valid after the
//! declaring scope is popped.

use std::collections::HashMap;

use rye_ast::{Expr, NodeId, SourceLocation, SymbolId};

use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Index of the global scope level.
pub const COMPILER_GLOBAL_LEVEL: usize = 0;

/// The kind of a scope level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelKind {
    Global,
    Function,
    Loop,
    Condition,
    #[default]
    Default,
}

/// The record produced by a declaration.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// The user-visible name.
    pub original_name: String,
    /// The AST declaration site; None for parameters and native methods.
    pub node: Option<NodeId>,
    /// Where the declaration appeared, for unused-identifier warnings.
    pub location: SourceLocation,
    pub is_const: bool,
    pub is_literal: bool,
    pub is_alias: bool,
    pub is_native: bool,
    /// Set for symbols declared by an `inline` function definition;
    /// referencing such a function as a plain variable is prohibited.
    pub is_inline: bool,
    /// Best-known value expression for the symbol, for inlining.
    pub current_value: Option<Expr>,
    /// Scope level the symbol was introduced at; -1 for unresolved aliases.
    pub owner_level: i32,
    /// Ordinal position within the owning level's locals; -1 for aliases.
    pub field_index: i32,
    /// Declared arity, for native methods.
    pub nargs: u32,
}

impl Symbol {
    pub fn new(original_name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            original_name: original_name.into(),
            node: None,
            location,
            is_const: false,
            is_literal: false,
            is_alias: false,
            is_native: false,
            is_inline: false,
            current_value: None,
            owner_level: -1,
            field_index: -1,
            nargs: 0,
        }
    }
}

/// One scope level: a kind tag and the insertion-ordered local sequence.
#[derive(Debug, Clone, Default)]
pub struct LevelInfo {
    pub kind: LevelKind,
    /// `(mangled_name, symbol)` pairs in declaration order.
    pub locals: Vec<(String, SymbolId)>,
}

impl LevelInfo {
    pub fn new(kind: LevelKind) -> Self {
        Self {
            kind,
            locals: Vec::new(),
        }
    }
}

/// Mutable analysis context threaded through the semantic visitor.
#[derive(Debug)]
pub struct CompilerState {
    /// Current scope level; index into `levels`.
    pub level: usize,
    pub levels: Vec<LevelInfo>,
    pub block_id_counter: u32,
    /// Symbol arena; grows for the lifetime of one compilation.
    symbols: Vec<Symbol>,
    /// Per-declaration reference counts, keyed by AST node identity.
    pub use_counts: HashMap<NodeId, usize>,
    /// Accumulated diagnostics, in detection order.
    pub errors: Vec<Diagnostic>,
    /// Enables the single-expression unwrap and literal classification
    /// after folding.
    pub optimize_constant_folding: bool,
    /// Program-wide AST node id allocator, shared with module finalization.
    pub node_ids: u32,
}

impl CompilerState {
    pub fn new() -> Self {
        Self {
            level: COMPILER_GLOBAL_LEVEL,
            levels: vec![LevelInfo::new(LevelKind::Global)],
            block_id_counter: 0,
            symbols: Vec::new(),
            use_counts: HashMap::new(),
            errors: Vec::new(),
            optimize_constant_folding: false,
            node_ids: 0,
        }
    }

    pub fn current_level(&self) -> &LevelInfo {
        &self.levels[self.level]
    }

    pub fn current_level_mut(&mut self) -> &mut LevelInfo {
        &mut self.levels[self.level]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Move a symbol into the arena and return its handle.
    pub fn alloc_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Declare `symbol` under `mangled` at the current level.
    pub fn declare(&mut self, mangled: String, symbol: Symbol) -> SymbolId {
        let id = self.alloc_symbol(symbol);
        self.current_level_mut().locals.push((mangled, id));
        id
    }

    /// Allocate a fresh AST node id for synthesized nodes.
    pub fn fresh_node_id(&mut self) -> NodeId {
        self.node_ids += 1;
        NodeId(self.node_ids)
    }

    /// Build the mangled name for `name` declared in `module_name`.
    ///
    /// Embeds the module identity only; lookup compares mangled names
    /// across scope levels.
    pub fn make_variable_name(&self, name: &str, module_name: &str) -> String {
        format!("{}::{}", module_name, name)
    }

    /// Walk from the current level down toward the global level and return
    /// the first symbol with the given mangled name. With
    /// `only_this_scope`, only the current level is probed (the
    /// redeclaration check).
    pub fn find_variable(&self, mangled: &str, only_this_scope: bool) -> Option<SymbolId> {
        let mut level = self.level as i64;
        while level >= COMPILER_GLOBAL_LEVEL as i64 {
            let info = &self.levels[level as usize];
            for (key, id) in &info.locals {
                if key == mangled {
                    return Some(*id);
                }
            }
            if only_this_scope {
                break;
            }
            level -= 1;
        }
        None
    }

    /// Push a fresh scope level of the given kind.
    pub fn increase_block(&mut self, kind: LevelKind) {
        self.level += 1;
        self.levels.push(LevelInfo::new(kind));
        self.block_id_counter += 1;
    }

    /// Pop the current level, warning about locals that were never used.
    pub fn decrease_block(&mut self) {
        debug_assert!(self.level > COMPILER_GLOBAL_LEVEL, "cannot pop global level");
        self.warn_unused_in_current_level();
        self.levels.pop();
        self.level -= 1;
    }

    /// Emit `unused_identifier` for every local of the current level whose
    /// declaration node has a use count of zero.
    pub fn warn_unused_in_current_level(&mut self) {
        let mut warnings = Vec::new();
        for (_, id) in &self.levels[self.level].locals {
            let symbol = &self.symbols[id.0 as usize];
            if let Some(node) = symbol.node {
                let count = self.use_counts.get(&node).copied().unwrap_or(0);
                if count == 0 {
                    warnings.push(Diagnostic::new(
                        DiagnosticKind::UnusedIdentifier,
                        symbol.location.clone(),
                        format!("unused identifier `{}`", symbol.original_name),
                    ));
                }
            }
        }
        self.errors.extend(warnings);
    }

    /// Bump the use count recorded for a declaration node.
    pub fn increment_use_count(&mut self, node: NodeId) {
        *self.use_counts.entry(node).or_insert(0) += 1;
    }

    /// Number of error-severity diagnostics collected so far.
    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|d| d.is_error()).count()
    }
}

impl Default for CompilerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::synthetic()
    }

    #[test]
    fn find_variable_walks_toward_global() {
        let mut state = CompilerState::new();
        state.declare("main::outer".into(), Symbol::new("outer", loc()));
        state.increase_block(LevelKind::Function);
        state.declare("main::inner".into(), Symbol::new("inner", loc()));

        assert!(state.find_variable("main::outer", false).is_some());
        assert!(state.find_variable("main::inner", false).is_some());
        // The redeclaration probe only sees the current level.
        assert!(state.find_variable("main::outer", true).is_none());
        assert!(state.find_variable("main::inner", true).is_some());
    }

    #[test]
    fn decrease_block_warns_about_unused_locals() {
        let mut state = CompilerState::new();
        state.increase_block(LevelKind::Function);
        let mut symbol = Symbol::new("tmp", loc());
        symbol.node = Some(NodeId(7));
        state.declare("main::tmp".into(), symbol);
        state.decrease_block();

        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].kind, DiagnosticKind::UnusedIdentifier);
        assert_eq!(state.level, COMPILER_GLOBAL_LEVEL);
    }

    #[test]
    fn used_locals_do_not_warn() {
        let mut state = CompilerState::new();
        state.increase_block(LevelKind::Loop);
        let mut symbol = Symbol::new("i", loc());
        symbol.node = Some(NodeId(9));
        state.declare("main::i".into(), symbol);
        state.increment_use_count(NodeId(9));
        state.decrease_block();
        assert!(state.errors.is_empty());
    }

    #[test]
    fn shadowing_resolves_to_innermost() {
        let mut state = CompilerState::new();
        let outer = state.declare("main::x".into(), Symbol::new("x", loc()));
        state.increase_block(LevelKind::Condition);
        let inner = state.declare("main::x".into(), Symbol::new("x", loc()));
        assert_eq!(state.find_variable("main::x", false), Some(inner));
        state.decrease_block();
        assert_eq!(state.find_variable("main::x", false), Some(outer));
    }
}
