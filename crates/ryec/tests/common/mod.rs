//! Shared helpers for the compiler test suite.

use ryec::CompileOutput;
use ryec::diagnostics::DiagnosticKind;

/// Analyze in-memory source with constant folding disabled.
pub fn analyze(source: &str) -> CompileOutput {
    ryec::analyze_source(source, "test.rye", false)
}

/// Analyze in-memory source with constant folding enabled.
#[allow(dead_code)]
pub fn analyze_folded(source: &str) -> CompileOutput {
    ryec::analyze_source(source, "test.rye", true)
}

/// The diagnostic kinds produced, in detection order.
pub fn kinds(output: &CompileOutput) -> Vec<DiagnosticKind> {
    output.diagnostics().iter().map(|d| d.kind).collect()
}

/// Count occurrences of one diagnostic kind.
pub fn count_kind(output: &CompileOutput, kind: DiagnosticKind) -> usize {
    output
        .diagnostics()
        .iter()
        .filter(|d| d.kind == kind)
        .count()
}
