//! Diagnostic records and the sink they are collected into.
//!
//! Diagnostics are always values, never an exceptional control transfer
//! across component boundaries (§7) — the evaluator may use `Result`
//! locally, but whatever it returns to its caller is a [`Diagnostic`] plus
//! a fallback value, never a panic or an out-of-band exception.

use std::fmt;

/// Diagnostic severity, ordered least to most severe so a `>` comparison
/// answers "is this diagnostic worse than that one".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Hint,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Hint => "hint",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A secondary location attached to a diagnostic, e.g. pointing back at the
/// `#if` an unmatched `#elif` failed to find.
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    pub message: String,
    pub source_file: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

/// A single diagnostic produced by any pipeline stage.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub source_file: String,
    pub code: Option<&'static str>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        source_file: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            line,
            column,
            length,
            source_file: source_file.into(),
            code: None,
            related: Vec::new(),
        }
    }

    pub fn error(
        source_file: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, source_file, line, column, length, message)
    }

    pub fn warning(
        source_file: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            Severity::Warning,
            source_file,
            line,
            column,
            length,
            message,
        )
    }

    pub fn info(
        source_file: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, source_file, line, column, length, message)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_related(mut self, related: RelatedInfo) -> Self {
        self.related.push(related);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Renders the diagnostic the way a terminal-bound host would; the core
    /// pipeline never calls this itself (§7 says the core does not log),
    /// it exists for `precomp-cli` to use.
    pub fn to_pretty_string(&self) -> String {
        let mut out = format!(
            "{}:{}:{}: {}: {}",
            self.source_file, self.line, self.column, self.severity, self.message
        );
        if let Some(code) = self.code {
            out.push_str(&format!(" [{code}]"));
        }
        for related in &self.related {
            out.push_str(&format!(
                "\n    note: {} ({}:{}:{})",
                related.message, related.source_file, related.line, related.column
            ));
        }
        out
    }
}

/// Anything that can collect diagnostics for later display.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);

    fn emit_error(
        &mut self,
        source_file: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        message: impl Into<String>,
        code: &'static str,
    ) {
        self.emit(Diagnostic::error(source_file, line, column, length, message).with_code(code));
    }

    fn emit_warning(
        &mut self,
        source_file: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        message: impl Into<String>,
        code: &'static str,
    ) {
        self.emit(
            Diagnostic::warning(source_file, line, column, length, message).with_code(code),
        );
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl DiagnosticSink for () {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}

/// A collector with merge/filter support, as named in §2 of spec.md.
///
/// Nested parses accumulate into their own collector and get merged into
/// the parent's once the nested parse completes (§4.5, §7), preserving
/// source-token order within each merge.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn merge(&mut self, other: DiagnosticCollector) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn merge_from(&mut self, other: Vec<Diagnostic>) {
        self.diagnostics.extend(other);
    }

    pub fn filter_by_severity(&self, minimum: Severity) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity >= minimum)
            .collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_merge_preserves_order() {
        let mut parent = DiagnosticCollector::new();
        parent.emit(Diagnostic::error("a.lsl", 1, 1, 1, "first"));

        let mut child = DiagnosticCollector::new();
        child.emit(Diagnostic::error("b.lsl", 2, 1, 1, "second"));
        child.emit(Diagnostic::warning("b.lsl", 3, 1, 1, "third"));

        parent.merge(child);

        let messages: Vec<_> = parent.as_slice().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("a.lsl", 1, 1, 1, "just a warning"));
        assert!(!collector.has_errors());
        collector.emit(Diagnostic::error("a.lsl", 1, 1, 1, "now an error"));
        assert!(collector.has_errors());
    }
}
