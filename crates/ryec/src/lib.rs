//! The Rye compiler core.
//!
//! `ryec` performs semantic analysis over parsed Rye modules: name
//! resolution through a scoped symbol table, module import resolution,
//! implicit-return insertion, use-count tracking, and diagnostic
//! accumulation. Lexing and parsing live in `rye_parser`; bytecode
//! generation and execution are downstream collaborators consuming the
//! annotated AST this crate produces.

pub mod diagnostics;
pub mod manifest;
pub mod semantic;

use anyhow::Context;

use rye_ast::ModuleId;
use rye_parser::ParsedModule;

use diagnostics::{Diagnostic, DiagnosticKind};
use semantic::{CompilerState, ModuleRegistry, SemanticAnalyzer};

pub use semantic::SemanticAnalyzer as Analyzer;

/// Compilation options for the Rye compiler.
///
/// Follows the rustc model: the compiler accepts explicit options rather
/// than discovering project structure.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Path to the root source file to analyze.
    pub src_file: String,
    /// Enables the single-expression unwrap plus literal classification
    /// after constant folding.
    pub optimize_constant_folding: bool,
}

impl CompileOptions {
    pub fn new(src_file: impl Into<String>) -> Self {
        Self {
            src_file: src_file.into(),
            optimize_constant_folding: false,
        }
    }
}

/// Everything one analysis run produces: the module registry with the
/// annotated ASTs, and the compiler state holding diagnostics, use counts,
/// and the symbol arena.
#[derive(Debug)]
pub struct CompileOutput {
    pub registry: ModuleRegistry,
    pub state: CompilerState,
    pub root: ModuleId,
}

impl CompileOutput {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.state.errors
    }

    pub fn has_errors(&self) -> bool {
        self.state.error_count() > 0
    }
}

/// Analyze a source file with the given options.
pub fn compile(options: &CompileOptions) -> anyhow::Result<CompileOutput> {
    let source = std::fs::read_to_string(&options.src_file)
        .with_context(|| format!("failed to read `{}`", options.src_file))?;
    Ok(analyze_source(
        &source,
        &options.src_file,
        options.optimize_constant_folding,
    ))
}

/// Analyze in-memory source. This is the programmatic entry used by
/// `compile` and by the test suite.
pub fn analyze_source(source: &str, path: &str, optimize_constant_folding: bool) -> CompileOutput {
    let mut state = CompilerState::new();
    state.optimize_constant_folding = optimize_constant_folding;
    let mut registry = ModuleRegistry::new();

    let parsed = ParsedModule::parse(source, path);
    for err in &parsed.errors {
        let location = parsed.locate(err.span.start);
        state.errors.push(Diagnostic::new(
            DiagnosticKind::SyntaxError,
            location,
            err.message.clone(),
        ));
    }

    let root = registry.insert(parsed, &mut state.node_ids);
    let mut analyzer = SemanticAnalyzer::new(&mut state, &mut registry);
    analyzer.analyze(root);

    CompileOutput {
        registry,
        state,
        root,
    }
}
