//! Stable diagnostic codes, grouped by the phase that raises them (§6).
//!
//! These strings are part of the host-facing contract: hosts may match on
//! them to special-case certain diagnostics (e.g. to render a quick fix),
//! so they must not change once shipped.

pub mod lex {
    pub const UNTERMINATED_BLOCK_COMMENT: &str = "unterminated-block-comment";
    pub const UNTERMINATED_STRING: &str = "unterminated-string";
    pub const INVALID_NUMBER_LITERAL: &str = "invalid-number-literal";
    pub const UNTERMINATED_VECTOR_LITERAL: &str = "unterminated-vector-literal";
}

pub mod par {
    pub const MALFORMED_DIRECTIVE: &str = "malformed-directive";
    pub const MISSING_DIRECTIVE_ARGUMENT: &str = "missing-directive-argument";
    pub const INVALID_MACRO_DEFINITION: &str = "invalid-macro-definition";
    pub const UNTERMINATED_CONDITIONAL: &str = "unterminated-conditional";
    pub const MISMATCHED_CONDITIONAL: &str = "mismatched-conditional";
    pub const INVALID_MACRO_INVOCATION: &str = "invalid-macro-invocation";
}

pub mod mac {
    pub const UNDEFINED_MACRO: &str = "undefined-macro";
    pub const ARGUMENT_COUNT_MISMATCH: &str = "argument-count-mismatch";
    pub const RECURSIVE_EXPANSION: &str = "recursive-expansion";
    pub const INVALID_DEFINED_SYNTAX: &str = "invalid-defined-syntax";
}

pub mod inc {
    pub const FILE_NOT_FOUND: &str = "file-not-found";
    pub const CIRCULAR_INCLUDE: &str = "circular-include";
    pub const INCLUDE_DEPTH_EXCEEDED: &str = "include-depth-exceeded";
    pub const FILE_READ_ERROR: &str = "file-read-error";
}

pub mod cond {
    pub const INVALID_EXPRESSION: &str = "invalid-expression";
    pub const DIVISION_BY_ZERO: &str = "division-by-zero";
}
