//! The parser driver (§4.5): directive dispatch, provenance tracking, and
//! the top-level [`preprocess`] entry point that ties every other module in
//! this crate together.
//!
//! A single index-based walk over an already-lexed token stream dispatches
//! on each `Directive`-kind token it meets (`#define`/`#undef`/`#include`/
//! `require`/`#if`/`#ifdef`/`#ifndef`/`#elif`/`#else`/`#endif`), recursing
//! into `run_tokens` again for each nested include/require target resolved
//! through the host.

use precomp_foundation::{codes, Diagnostic};
use precomp_lexer::{Dialect, Lexer, Token, TokenCursor, TokenKind};
use precomp_macros::substitute::normalize_hash_tokens;
use precomp_macros::{ExpansionSite, MacroEngine};
use tracing::trace;

use crate::assembler::{self, LineMapping};
use crate::conditional::{ConditionalStack, DirectiveKind};
use crate::expression;
use crate::host::Host;
use crate::include::{self, IncludeState};
use crate::require::{self, RequireState};

/// The mutable state shared by the root parser and every nested include/
/// require parse it spawns (§3 "Parser state", §5 concurrency model): one
/// instance per top-level [`preprocess`] call, never cloned or forked.
pub struct ParserState {
    pub macros: MacroEngine,
    pub conditionals: ConditionalStack,
    pub include_state: IncludeState,
    pub require_state: Option<RequireState>,
}

impl ParserState {
    pub fn new(include_paths: Vec<String>, max_include_depth: u32) -> Self {
        Self {
            macros: MacroEngine::new(),
            conditionals: ConditionalStack::new(),
            include_state: IncludeState::new(include_paths, max_include_depth),
            require_state: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedInclude {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub is_require: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedMacro {
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub is_function_like: bool,
    pub parameters: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub content: String,
    pub success: bool,
    pub language: Dialect,
    pub line_mappings: Vec<LineMapping>,
    pub diagnostics: Vec<Diagnostic>,
    pub detected_includes: Vec<DetectedInclude>,
    pub detected_macros: Vec<DetectedMacro>,
}

/// The pipeline entry point (§6): lexes `source`, runs the directive-aware
/// driver over it, and assembles the result. On any error diagnostic,
/// `success` is `false` and `content` is `source` unchanged (§7).
pub fn preprocess(host: &dyn Host, source: &str, source_file: &str, dialect: Dialect) -> PreprocessOutput {
    let config = host.config();
    if !config.enabled {
        return PreprocessOutput {
            content: source.to_string(),
            success: true,
            language: dialect,
            line_mappings: Vec::new(),
            diagnostics: Vec::new(),
            detected_includes: Vec::new(),
            detected_macros: Vec::new(),
        };
    }

    trace!(source_file, ?dialect, "preprocessing entry point");
    let mut diagnostics = Vec::new();
    let tokens = Lexer::new(source, dialect.config(), source_file).lex(&mut diagnostics);

    let mut driver = Driver {
        host,
        dialect,
        state: ParserState::new(config.include_paths.clone(), config.max_include_depth),
        diagnostics,
        detected_includes: Vec::new(),
        detected_macros: Vec::new(),
        last_source_line: 0,
        last_source_file: source_file.to_string(),
        at_line_start: true,
        force_line_marker: false,
    };

    let mut emitted = driver.run_tokens(&tokens, source_file);

    for frame in driver.state.conditionals.unclosed().to_vec() {
        driver.diagnostics.push(
            Diagnostic::error(source_file, frame.start_line, 1, 1, "unterminated conditional block")
                .with_code(codes::par::UNTERMINATED_CONDITIONAL),
        );
    }

    let success = !driver.diagnostics.iter().any(Diagnostic::is_error);

    if success {
        if let Some(require_state) = &driver.state.require_state {
            if !require_state.is_empty() {
                let mut with_table = require::synthesize_table_prelude(require_state);
                with_table.push(Token::new(
                    TokenKind::LineComment,
                    format!("{} @line 1 \"{}\"", dialect.config().line_comment_prefix, host.file_name_to_uri(source_file)),
                    0,
                    1,
                ));
                with_table.push(Token::new(TokenKind::Newline, "\n", 0, 1));
                with_table.extend(emitted);
                with_table.extend(require::synthesize_table_epilogue());
                emitted = with_table;
            }
        }
    }

    let content = if success { assembler::emit(&emitted) } else { source.to_string() };
    let line_mappings = if success {
        assembler::build_line_mappings(&emitted, source_file)
    } else {
        Vec::new()
    };

    PreprocessOutput {
        content,
        success,
        language: dialect,
        line_mappings,
        diagnostics: driver.diagnostics,
        detected_includes: driver.detected_includes,
        detected_macros: driver.detected_macros,
    }
}

struct Driver<'a> {
    host: &'a dyn Host,
    dialect: Dialect,
    state: ParserState,
    diagnostics: Vec<Diagnostic>,
    detected_includes: Vec<DetectedInclude>,
    detected_macros: Vec<DetectedMacro>,
    last_source_line: u32,
    last_source_file: String,
    at_line_start: bool,
    /// Forces the next non-trivial token to get a fresh `@line` marker even
    /// if its line/file would otherwise look contiguous — set right after
    /// splicing a nested include/require's tokens back in (§4.5 "After
    /// inlining, provenance tracking is reset").
    force_line_marker: bool,
}

impl<'a> Driver<'a> {
    /// Walks `tokens` (a single already-lexed file or nested stream),
    /// dispatching directives and expanding macros at emission, and returns
    /// the tokens that make it to output.
    ///
    /// Keeps walking to the end even after an error-severity diagnostic has
    /// been recorded (§7: "parsing ... continues so more errors can be
    /// surfaced in a single run"), so the conditional stack is always closed
    /// out correctly and a failure doesn't leave spurious
    /// `unterminated-conditional` diagnostics behind for blocks the source
    /// plainly does terminate. `success`/`content` in [`preprocess`] already
    /// discard whatever ends up in `out` once any error is present, so
    /// continuing to populate it costs nothing.
    fn run_tokens(&mut self, tokens: &[Token], source_file: &str) -> Vec<Token> {
        let mut out = Vec::new();
        let mut i = 0usize;

        while i < tokens.len() {
            let token = tokens[i].clone();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Directive => {
                    let name = directive_name(&token, self.dialect);
                    let consume_whole_line = name != "require";
                    i += 1;
                    match name.as_str() {
                        "if" | "ifdef" | "ifndef" | "elif" | "else" | "endif" => {
                            i = self.handle_conditional(&name, &token, tokens, i, source_file);
                        }
                        "define" if self.state.conditionals.is_active() => {
                            i = self.handle_define(tokens, i, source_file);
                        }
                        "undef" if self.state.conditionals.is_active() => {
                            i = self.handle_undef(tokens, i, source_file);
                        }
                        "include" if self.state.conditionals.is_active() => {
                            i = self.handle_include(tokens, i, source_file, &mut out);
                        }
                        "require" if self.state.conditionals.is_active() => {
                            i = self.handle_require(&token, tokens, i, source_file, &mut out);
                        }
                        "define" | "undef" | "include" | "require" => {
                            // Inactive branch: the directive is a no-op, its line is discarded.
                        }
                        _ => {
                            self.diagnostics.push(
                                Diagnostic::error(
                                    source_file,
                                    token.line,
                                    token.column,
                                    token.length,
                                    format!("unknown directive `{}`", token.text),
                                )
                                .with_code(codes::par::MALFORMED_DIRECTIVE),
                            );
                        }
                    }
                    if consume_whole_line {
                        i = skip_rest_of_line(tokens, i);
                    }
                }
                _ => {
                    if self.state.conditionals.is_active() {
                        if token.kind == TokenKind::Identifier {
                            i += 1;
                            let mut cursor = TokenCursor::new(&tokens[i..]);
                            let expanded = self.state.macros.expand_one(
                                &token,
                                &mut cursor,
                                &mut self.diagnostics,
                                source_file,
                                ExpansionSite::Emission,
                            );
                            i += cursor.position();
                            for expanded_token in expanded {
                                self.emit_raw(expanded_token, &mut out);
                            }
                        } else {
                            self.emit_token(token, source_file, &mut out);
                            i += 1;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
        }

        out
    }

    fn emit_token(&mut self, token: Token, source_file: &str, out: &mut Vec<Token>) {
        if token.kind == TokenKind::Newline {
            out.push(token);
            self.at_line_start = true;
            return;
        }
        if token.kind.is_trivial() {
            out.push(token);
            return;
        }
        if self.at_line_start {
            let jumped = self.force_line_marker
                || self.last_source_file != source_file
                || token.line != self.last_source_line + 1;
            if jumped {
                self.emit_line_marker(token.line, source_file, out);
            }
            self.at_line_start = false;
            self.force_line_marker = false;
        }
        self.last_source_line = token.line;
        self.last_source_file = source_file.to_string();
        out.push(token);
    }

    /// Pushes a macro-expansion replacement token straight through, bypassing
    /// the provenance check: substituted tokens sit inline at the invocation
    /// site, they are not a new source position (§4.5 only tracks provenance
    /// for tokens coming directly off a source file's token stream).
    fn emit_raw(&mut self, token: Token, out: &mut Vec<Token>) {
        out.push(token);
    }

    fn emit_line_marker(&mut self, line: u32, source_file: &str, out: &mut Vec<Token>) {
        let uri = self.host.file_name_to_uri(source_file);
        let prefix = self.dialect.config().line_comment_prefix;
        let text = format!("{prefix} @line {line} \"{uri}\"");
        out.push(Token::new(TokenKind::LineComment, text, line, 1));
        out.push(Token::new(TokenKind::Newline, "\n", line, 1));
        self.last_source_line = line.saturating_sub(1);
        self.last_source_file = source_file.to_string();
    }

    fn handle_conditional(
        &mut self,
        name: &str,
        directive_token: &Token,
        tokens: &[Token],
        i: usize,
        source_file: &str,
    ) -> usize {
        trace!(directive = name, line = directive_token.line, "`{name}");
        match name {
            "if" => {
                let (cond_tokens, next_i) = collect_directive_line(tokens, i, false);
                let condition = if self.state.conditionals.is_active() {
                    expression::evaluate_condition(
                        &cond_tokens,
                        &self.state.macros,
                        self.dialect.config(),
                        &mut self.diagnostics,
                        source_file,
                    )
                } else {
                    false
                };
                self.state
                    .conditionals
                    .push(condition, directive_token.line, DirectiveKind::If);
                next_i
            }
            "ifdef" | "ifndef" => {
                let (arg_tokens, next_i) = collect_directive_line(tokens, i, false);
                let name_token = arg_tokens.iter().find(|t| t.is_significant());
                let defined = match name_token {
                    Some(t) if t.kind == TokenKind::Identifier => self.state.macros.definitions.is_defined(&t.text),
                    _ => {
                        self.diagnostics.push(
                            Diagnostic::error(
                                source_file,
                                directive_token.line,
                                directive_token.column,
                                directive_token.length,
                                format!("missing macro name after `#{name}`"),
                            )
                            .with_code(codes::par::MISSING_DIRECTIVE_ARGUMENT),
                        );
                        false
                    }
                };
                let condition = if self.state.conditionals.is_active() {
                    if name == "ifdef" {
                        defined
                    } else {
                        !defined
                    }
                } else {
                    false
                };
                let kind = if name == "ifdef" {
                    DirectiveKind::Ifdef
                } else {
                    DirectiveKind::Ifndef
                };
                self.state.conditionals.push(condition, directive_token.line, kind);
                next_i
            }
            "elif" => {
                let (cond_tokens, next_i) = collect_directive_line(tokens, i, false);
                let parent_active = self.state.conditionals.top_parent_active();
                let condition = if parent_active {
                    expression::evaluate_condition(
                        &cond_tokens,
                        &self.state.macros,
                        self.dialect.config(),
                        &mut self.diagnostics,
                        source_file,
                    )
                } else {
                    false
                };
                self.state
                    .conditionals
                    .elif(condition, directive_token.line, &mut self.diagnostics, source_file);
                next_i
            }
            "else" => {
                self.state
                    .conditionals
                    .else_(directive_token.line, &mut self.diagnostics, source_file);
                i
            }
            "endif" => {
                self.state
                    .conditionals
                    .endif(directive_token.line, &mut self.diagnostics, source_file);
                i
            }
            _ => unreachable!("dispatched only for conditional directive names"),
        }
    }

    fn handle_define(&mut self, tokens: &[Token], mut i: usize, source_file: &str) -> usize {
        while i < tokens.len() && !tokens[i].is_significant() {
            i += 1;
        }
        let Some(name_token) = tokens.get(i).filter(|t| t.kind == TokenKind::Identifier).cloned() else {
            self.diagnostics.push(
                Diagnostic::error(
                    source_file,
                    tokens.get(i).map(|t| t.line).unwrap_or(0),
                    tokens.get(i).map(|t| t.column).unwrap_or(1),
                    1,
                    "macro name expected after `#define`",
                )
                .with_code(codes::par::INVALID_MACRO_DEFINITION),
            );
            return skip_rest_of_line(tokens, i);
        };
        i += 1;

        let mut parameters: Option<Vec<String>> = None;
        if tokens.get(i).map(|t| t.kind) == Some(TokenKind::ParenOpen) {
            i += 1;
            let mut params = Vec::new();
            loop {
                while i < tokens.len() && !tokens[i].is_significant() {
                    i += 1;
                }
                match tokens.get(i) {
                    Some(t) if t.kind == TokenKind::ParenClose => {
                        i += 1;
                        break;
                    }
                    Some(t) if t.kind == TokenKind::Identifier => {
                        params.push(t.text.clone());
                        i += 1;
                        while i < tokens.len() && !tokens[i].is_significant() {
                            i += 1;
                        }
                        match tokens.get(i) {
                            Some(t2) if t2.kind == TokenKind::ParenClose => {
                                i += 1;
                                break;
                            }
                            Some(t2) if t2.is_significant() && t2.text == "," => {
                                i += 1;
                            }
                            _ => {
                                self.diagnostics.push(
                                    Diagnostic::error(
                                        source_file,
                                        name_token.line,
                                        name_token.column,
                                        name_token.length,
                                        "expected `,` or `)` in macro parameter list",
                                    )
                                    .with_code(codes::par::INVALID_MACRO_DEFINITION),
                                );
                                break;
                            }
                        }
                    }
                    _ => {
                        self.diagnostics.push(
                            Diagnostic::error(
                                source_file,
                                name_token.line,
                                name_token.column,
                                name_token.length,
                                "expected parameter name or `)` in macro parameter list",
                            )
                            .with_code(codes::par::INVALID_MACRO_DEFINITION),
                        );
                        break;
                    }
                }
            }
            parameters = Some(params);
        }

        let (raw_body, next_i) = collect_directive_line(tokens, i, true);
        let body = normalize_hash_tokens(trim_trivia(raw_body));
        i = next_i;

        self.detected_macros.push(DetectedMacro {
            name: name_token.text.clone(),
            line: name_token.line,
            column: name_token.column,
            is_function_like: parameters.is_some(),
            parameters: parameters.clone(),
        });

        if let Some(params) = parameters {
            if let Err(err) = self
                .state
                .macros
                .definitions
                .define_function_like(name_token.text.clone(), params, body)
            {
                self.diagnostics.push(
                    Diagnostic::error(
                        source_file,
                        name_token.line,
                        name_token.column,
                        name_token.length,
                        format!("duplicate macro parameter `{}`", err.0),
                    )
                    .with_code(codes::par::INVALID_MACRO_DEFINITION),
                );
            }
        } else {
            self.state.macros.definitions.define_object_like(name_token.text.clone(), body);
        }

        i
    }

    fn handle_undef(&mut self, tokens: &[Token], mut i: usize, source_file: &str) -> usize {
        while i < tokens.len() && !tokens[i].is_significant() {
            i += 1;
        }
        match tokens.get(i).filter(|t| t.kind == TokenKind::Identifier) {
            Some(t) => {
                self.state.macros.definitions.undef(&t.text);
                i + 1
            }
            None => {
                self.diagnostics.push(
                    Diagnostic::error(
                        source_file,
                        tokens.get(i).map(|t| t.line).unwrap_or(0),
                        tokens.get(i).map(|t| t.column).unwrap_or(1),
                        1,
                        "macro name expected after `#undef`",
                    )
                    .with_code(codes::par::MISSING_DIRECTIVE_ARGUMENT),
                );
                i
            }
        }
    }

    fn handle_include(&mut self, tokens: &[Token], mut i: usize, source_file: &str, out: &mut Vec<Token>) -> usize {
        while i < tokens.len() && !tokens[i].is_significant() {
            i += 1;
        }
        let Some(filename_token) = tokens.get(i).filter(|t| t.kind == TokenKind::StringLiteral).cloned() else {
            self.diagnostics.push(
                Diagnostic::error(
                    source_file,
                    tokens.get(i).map(|t| t.line).unwrap_or(0),
                    tokens.get(i).map(|t| t.column).unwrap_or(1),
                    1,
                    "filename string expected after `#include`",
                )
                .with_code(codes::par::MISSING_DIRECTIVE_ARGUMENT),
            );
            return i;
        };
        i += 1;

        let filename = strip_quotes(&filename_token.text);
        trace!(filename, from = source_file, "`#include");
        self.detected_includes.push(DetectedInclude {
            file: filename.clone(),
            line: filename_token.line,
            column: filename_token.column,
            is_require: false,
        });

        let processed = include::process_include(
            self.host,
            self.dialect,
            &filename,
            source_file,
            false,
            &self.state.include_state,
            &mut self.diagnostics,
            filename_token.line,
            filename_token.column,
        );
        let Some(processed) = processed else {
            return i;
        };
        if processed.already_included {
            return i;
        }

        self.emit_line_marker(1, &processed.resolved_path, out);
        self.state.include_state.include_stack.push(processed.resolved_path.clone());
        self.state.include_state.depth += 1;
        let child_output = self.run_tokens(&processed.tokens, &processed.resolved_path);
        self.state.include_state.include_stack.pop();
        self.state.include_state.depth -= 1;
        self.state.include_state.included_files.insert(processed.resolved_path.clone());

        out.extend(child_output);
        self.force_line_marker = true;
        self.at_line_start = true;

        i
    }

    fn handle_require(
        &mut self,
        directive_token: &Token,
        tokens: &[Token],
        mut i: usize,
        source_file: &str,
        out: &mut Vec<Token>,
    ) -> usize {
        while i < tokens.len() && !tokens[i].is_significant() {
            i += 1;
        }
        if tokens.get(i).map(|t| t.kind) != Some(TokenKind::ParenOpen) {
            self.diagnostics.push(
                Diagnostic::error(
                    source_file,
                    directive_token.line,
                    directive_token.column,
                    directive_token.length,
                    "`require` must be followed by `(\"filename\")`",
                )
                .with_code(codes::par::MALFORMED_DIRECTIVE),
            );
            return i;
        }
        i += 1;
        while i < tokens.len() && !tokens[i].is_significant() {
            i += 1;
        }
        let Some(filename_token) = tokens.get(i).filter(|t| t.kind == TokenKind::StringLiteral).cloned() else {
            self.diagnostics.push(
                Diagnostic::error(
                    source_file,
                    directive_token.line,
                    directive_token.column,
                    directive_token.length,
                    "`require` expects a string literal filename",
                )
                .with_code(codes::par::MISSING_DIRECTIVE_ARGUMENT),
            );
            return i;
        };
        i += 1;
        while i < tokens.len() && !tokens[i].is_significant() {
            i += 1;
        }
        if tokens.get(i).map(|t| t.kind) != Some(TokenKind::ParenClose) {
            self.diagnostics.push(
                Diagnostic::error(
                    source_file,
                    directive_token.line,
                    directive_token.column,
                    directive_token.length,
                    "expected `)` to close `require(...)`",
                )
                .with_code(codes::par::MALFORMED_DIRECTIVE),
            );
            return i;
        }
        i += 1;

        let filename = strip_quotes(&filename_token.text);
        trace!(filename, from = source_file, "`require");
        self.detected_includes.push(DetectedInclude {
            file: filename.clone(),
            line: directive_token.line,
            column: directive_token.column,
            is_require: true,
        });

        let processed = include::process_include(
            self.host,
            self.dialect,
            &filename,
            source_file,
            true,
            &self.state.include_state,
            &mut self.diagnostics,
            directive_token.line,
            directive_token.column,
        );
        let Some(processed) = processed else {
            return i;
        };

        if self.state.require_state.is_none() {
            self.state.require_state = Some(RequireState::new());
        }
        let existing_id = self.state.require_state.as_ref().unwrap().module_id_for(&processed.resolved_path);
        let module_id = if let Some(id) = existing_id {
            id
        } else {
            self.state.include_state.include_stack.push(processed.resolved_path.clone());
            self.state.include_state.depth += 1;
            let body = self.run_tokens(&processed.tokens, &processed.resolved_path);
            self.state.include_state.include_stack.pop();
            self.state.include_state.depth -= 1;
            self.state
                .require_state
                .as_mut()
                .unwrap()
                .register(processed.resolved_path.clone(), body)
        };

        for invocation_token in require::invocation_tokens(module_id, directive_token.line, directive_token.column) {
            self.emit_raw(invocation_token, out);
        }

        i
    }
}

fn directive_name(token: &Token, dialect: Dialect) -> String {
    match dialect.config().directive_prefix {
        Some(prefix) => token.text.trim_start_matches(prefix).to_string(),
        None => token.text.clone(),
    }
}

fn strip_quotes(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 2 {
        let first = trimmed.chars().next().unwrap();
        let last = trimmed.chars().last().unwrap();
        if (first == '"' || first == '\'') && first == last {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

fn trim_trivia(mut tokens: Vec<Token>) -> Vec<Token> {
    while tokens.first().is_some_and(|t| !t.is_significant()) {
        tokens.remove(0);
    }
    while tokens.last().is_some_and(|t| !t.is_significant()) {
        tokens.pop();
    }
    tokens
}

/// Advances past any remaining tokens on the current line, consuming the
/// terminating newline itself (or stopping at EOF).
fn skip_rest_of_line(tokens: &[Token], mut i: usize) -> usize {
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Newline => {
                i += 1;
                break;
            }
            TokenKind::Eof => break,
            _ => i += 1,
        }
    }
    i
}

/// Collects tokens from `i` up to (not including) the line's terminating
/// newline. When `handle_continuation` is set, a lone `\` immediately before
/// a newline joins the next line into the same logical line, dropping the
/// backslash, the newline, and the following line's leading whitespace
/// (§4.2 "Line continuation").
fn collect_directive_line(tokens: &[Token], mut i: usize, handle_continuation: bool) -> (Vec<Token>, usize) {
    let mut collected = Vec::new();
    while i < tokens.len() {
        let token = &tokens[i];
        if token.kind == TokenKind::Eof {
            break;
        }
        if token.kind == TokenKind::Newline {
            if handle_continuation {
                if let Some(last) = collected.last() {
                    if last.kind == TokenKind::Unknown && last.text == "\\" {
                        collected.pop();
                        i += 1;
                        while i < tokens.len() && tokens[i].kind == TokenKind::Whitespace {
                            i += 1;
                        }
                        continue;
                    }
                }
            }
            break;
        }
        collected.push(token.clone());
        i += 1;
    }
    (collected, i)
}
