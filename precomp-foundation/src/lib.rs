//! Foundational types shared by every stage of the preprocessor pipeline:
//! diagnostics, severities, stable error codes, and the sink they are
//! collected into.

pub mod codes;
pub mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticSink, RelatedInfo, Severity};
