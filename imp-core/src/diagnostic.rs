//! Diagnostics reported by the lexer, parser and binder.
//!
//! Source-level problems never abort the pipeline. They are recorded as
//! [`Diagnostic`]s and counted by the compiler context, which decides how
//! they are rendered.

use core::fmt;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// Stable code: `E00xx` lexer, `E01xx` parser, `E02xx` binder.
    pub code: Option<&'static str>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            span,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Warning, message, span)
    }

    pub fn note(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Note, message, span)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Error and warning totals of one or more compilation units.
///
/// Units compiled in parallel each keep their own counts; the driver merges
/// them once every unit has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticCounts {
    pub fn merge(&mut self, other: DiagnosticCounts) {
        self.errors += other.errors;
        self.warnings += other.warnings;
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

impl fmt::Display for DiagnosticCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(
            f,
            "{} error{}, {} warning{}",
            self.errors,
            plural(self.errors),
            self.warnings,
            plural(self.warnings)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_code_and_severity() {
        let diag = Diagnostic::error("bad", Span::default()).with_code("E0001");
        assert!(diag.is_error());
        assert_eq!(diag.code, Some("E0001"));
        assert!(!Diagnostic::note("fyi", Span::default()).is_error());
    }

    #[test]
    fn counts_merge_and_render() {
        let mut total = DiagnosticCounts::default();
        total.merge(DiagnosticCounts {
            errors: 1,
            warnings: 0,
        });
        total.merge(DiagnosticCounts {
            errors: 2,
            warnings: 1,
        });
        assert!(total.has_errors());
        assert_eq!(total.to_string(), "3 errors, 1 warning");
    }
}
