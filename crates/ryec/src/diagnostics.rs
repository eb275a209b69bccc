//! Diagnostic reporting for the Rye compiler.
//!
//! Diagnostics are structured values collected by the analyzer and emitted
//! in a compact, rustc-style format on stderr. Collection is decoupled from
//! emission: the analyzer appends to its diagnostic list and keeps going, so
//! a single pass reports as many independent problems as possible.

use std::sync::atomic::{AtomicBool, Ordering};

use rye_ast::SourceLocation;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The kinds of diagnostics the compiler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    ModuleAlreadyDefined,
    ImportOutsideGlobal,
    ImportNotFound,
    RedeclaredIdentifier,
    UndeclaredIdentifier,
    IdentifierIsModule,
    ModuleNotImported,
    ConstIdentifier,
    ProhibitedActionAttribute,
    ExpectedIdentifier,
    UnrecognizedAliasType,
    UnusedIdentifier,
    UnreachableCode,
    EmptyFunctionBody,
    EmptyStatementBody,
    UnsupportedFeature,
    SyntaxError,
    InternalError,
}

impl DiagnosticKind {
    /// The fixed severity of this diagnostic kind.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnusedIdentifier | DiagnosticKind::UnreachableCode => {
                Severity::Warning
            }
            DiagnosticKind::EmptyFunctionBody | DiagnosticKind::EmptyStatementBody => {
                Severity::Info
            }
            _ => Severity::Error,
        }
    }
}

/// A single compiler diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {} ({})", label, self.message, self.location)
    }
}

/// Emits a diagnostic to stderr in rustc style, with ANSI colors.
///
/// Respects the global enable/disable state so tests can verify detection
/// without cluttering their output.
pub fn emit_diagnostic(d: &Diagnostic) {
    if !DIAGNOSTICS_ENABLED.load(Ordering::SeqCst) {
        return;
    }
    let reset = "\x1b[0m";
    let (color, label) = match d.severity {
        Severity::Info => ("\x1b[34m", "info"),
        Severity::Warning => ("\x1b[33m", "warning"),
        Severity::Error => ("\x1b[31m", "error"),
    };
    eprintln!("{}{}{}: {}", color, label, reset, d.message);
    if d.location.line > 0 {
        eprintln!("  --> {}", d.location);
    }
}

/// Emit a batch of diagnostics in collection order.
pub fn emit_all(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        emit_diagnostic(d);
    }
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Temporarily suppresses diagnostic output, for tests.
///
/// The returned guard restores the previous state when dropped.
pub fn suppress() -> SuppressGuard {
    let prev = DIAGNOSTICS_ENABLED.swap(false, Ordering::SeqCst);
    SuppressGuard { prev }
}

/// RAII guard restoring diagnostic output state.
pub struct SuppressGuard {
    prev: bool,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        DIAGNOSTICS_ENABLED.store(self.prev, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_follow_kind() {
        assert_eq!(
            DiagnosticKind::RedeclaredIdentifier.severity(),
            Severity::Error
        );
        assert_eq!(
            DiagnosticKind::UnusedIdentifier.severity(),
            Severity::Warning
        );
        assert_eq!(
            DiagnosticKind::EmptyFunctionBody.severity(),
            Severity::Info
        );
    }

    #[test]
    fn display_includes_location() {
        let d = Diagnostic::new(
            DiagnosticKind::ConstIdentifier,
            SourceLocation::new(3, 1, "m.rye"),
            "cannot assign to constant `k`",
        );
        let text = d.to_string();
        assert!(text.contains("m.rye:3:1"));
        assert!(text.starts_with("error:"));
    }
}
