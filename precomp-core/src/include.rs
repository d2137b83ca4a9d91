//! Include/require resolution (§3 "Include state", §4.4).
//!
//! Push/pop of the include stack and depth, and insertion into
//! `included_files` on success, are deliberately **not** done here — §4.4
//! step 7 reserves that for the caller, which pairs them around the nested
//! parse so the guard only takes effect once the nested parse has actually
//! completed.

use precomp_foundation::{codes, DiagnosticSink};
use precomp_lexer::{Dialect, Lexer, Token};
use std::collections::HashSet;

use crate::host::Host;

#[derive(Debug, Clone)]
pub struct IncludeState {
    pub included_files: HashSet<String>,
    pub include_stack: Vec<String>,
    pub depth: u32,
    pub max_depth: u32,
    pub include_paths: Vec<String>,
}

impl IncludeState {
    pub fn new(include_paths: Vec<String>, max_depth: u32) -> Self {
        Self {
            included_files: HashSet::new(),
            include_stack: Vec::new(),
            depth: 0,
            max_depth,
            include_paths,
        }
    }
}

pub struct ProcessedInclude {
    pub resolved_path: String,
    pub tokens: Vec<Token>,
    /// `true` when this is an `#include` of an already-guarded file: the
    /// caller should splice in no tokens at all.
    pub already_included: bool,
}

#[allow(clippy::too_many_arguments)]
pub fn process_include(
    host: &dyn Host,
    dialect: Dialect,
    filename: &str,
    from_file: &str,
    is_require: bool,
    state: &IncludeState,
    diagnostics: &mut dyn DiagnosticSink,
    line: u32,
    column: u32,
) -> Option<ProcessedInclude> {
    let length = filename.len() as u32;

    if state.depth >= state.max_depth {
        diagnostics.emit_error(
            from_file,
            line,
            column,
            length,
            format!("include depth exceeded while resolving `{filename}`"),
            codes::inc::INCLUDE_DEPTH_EXCEEDED,
        );
        return None;
    }

    let extensions = dialect.extensions();
    let no_search_paths: Vec<String> = Vec::new();
    let search_paths = if is_require { &no_search_paths } else { &state.include_paths };
    let Some(resolved) = host.resolve_file(filename, from_file, extensions, search_paths) else {
        diagnostics.emit_error(
            from_file,
            line,
            column,
            length,
            format!("could not resolve `{filename}`"),
            codes::inc::FILE_NOT_FOUND,
        );
        return None;
    };

    if state.include_stack.iter().any(|p| p == &resolved) {
        diagnostics.emit_error(
            from_file,
            line,
            column,
            length,
            format!("circular include of `{resolved}`"),
            codes::inc::CIRCULAR_INCLUDE,
        );
        return None;
    }

    if !is_require && state.included_files.contains(&resolved) {
        return Some(ProcessedInclude {
            resolved_path: resolved,
            tokens: Vec::new(),
            already_included: true,
        });
    }

    let Some(text) = host.read_file(&resolved) else {
        diagnostics.emit_error(
            from_file,
            line,
            column,
            length,
            format!("failed to read `{resolved}`"),
            codes::inc::FILE_READ_ERROR,
        );
        return None;
    };

    let mut lex_diagnostics = Vec::new();
    let tokens = Lexer::new(&text, dialect.config(), &resolved).lex(&mut lex_diagnostics);
    for diagnostic in lex_diagnostics {
        diagnostics.emit(diagnostic);
    }

    Some(ProcessedInclude {
        resolved_path: resolved,
        tokens,
        already_included: false,
    })
}
