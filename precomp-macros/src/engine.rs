//! Macro expansion proper (§4.2): simple macros, function-like macros, and
//! the recursion guard that turns a would-be infinite expansion into a
//! single diagnostic.
//!
//! Recursion is tracked with a flat "currently expanding" name set rather
//! than a per-call frame stack — an expansion only ever needs to ask
//! "am I already in the middle of expanding this name", not reconstruct
//! the call chain that got it there.

use precomp_foundation::{codes, DiagnosticSink};
use precomp_lexer::{Token, TokenCursor, TokenKind};
use tracing::trace;

use crate::definitions::{Body, Definitions, ExpansionContext};
use crate::substitute;

/// Where an expansion attempt originates, controlling two spec-specified
/// quirks that differ between contexts (§4.2, §4.3, §4.5):
///
/// - whether an unresolved name is worth a diagnostic at all: macro bodies
///   warn on unknown identifiers (§4.2), conditional expressions silently
///   treat them as plain identifiers (§4.3), and the driver never looks an
///   identifier up unless the table already says it matches.
/// - whether a function-like macro missing its `(...)` is worth a
///   diagnostic (only `Emission` does, §4.5); inside a macro body or a
///   conditional expression a bare reference to a function-like macro name
///   is ordinary, unremarkable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionSite {
    Emission,
    MacroBody,
    ConditionalExpression,
}

impl ExpansionSite {
    fn warn_on_undefined(self) -> bool {
        matches!(self, ExpansionSite::MacroBody)
    }

    fn warn_on_missing_parens(self) -> bool {
        matches!(self, ExpansionSite::Emission)
    }
}

/// The macro table plus the expansion algorithm that walks it.
#[derive(Debug, Clone, Default)]
pub struct MacroEngine {
    pub definitions: Definitions,
}

impl MacroEngine {
    pub fn new() -> Self {
        Self {
            definitions: Definitions::new(),
        }
    }

    /// Expands every macro-eligible identifier in `tokens` once, following
    /// nested expansions recursively with cycle detection (§4.2).
    pub fn expand(
        &self,
        tokens: &[Token],
        diagnostics: &mut dyn DiagnosticSink,
        source_file: &str,
        site: ExpansionSite,
    ) -> Vec<Token> {
        if !self.definitions.is_enabled() {
            return tokens.to_vec();
        }
        let mut expanding = Vec::new();
        expand_token_stream(tokens, &self.definitions, diagnostics, source_file, site, &mut expanding)
    }

    /// Expands a single identifier already consumed from `cursor`, which is
    /// positioned just past it so a function-like invocation's `(...)` can
    /// be read off the same stream. Used by the driver at emission time,
    /// where tokens are walked one at a time rather than as a whole buffer.
    pub fn expand_one(
        &self,
        name_token: &Token,
        cursor: &mut TokenCursor,
        diagnostics: &mut dyn DiagnosticSink,
        source_file: &str,
        site: ExpansionSite,
    ) -> Vec<Token> {
        if !self.definitions.is_enabled() {
            return vec![name_token.clone()];
        }
        let mut expanding = Vec::new();
        expand_identifier(name_token, cursor, &self.definitions, diagnostics, source_file, site, &mut expanding)
    }
}

fn expand_token_stream(
    tokens: &[Token],
    macros: &Definitions,
    diagnostics: &mut dyn DiagnosticSink,
    source_file: &str,
    site: ExpansionSite,
    expanding: &mut Vec<String>,
) -> Vec<Token> {
    let mut cursor = TokenCursor::new(tokens);
    let mut out = Vec::new();
    loop {
        while let Some(token) = cursor.peek_raw() {
            if token.is_significant() {
                break;
            }
            out.push(token.clone());
            cursor.next_raw();
        }
        let Some(token) = cursor.peek_raw().cloned() else {
            break;
        };
        if token.kind == TokenKind::Eof {
            break;
        }
        if token.kind == TokenKind::Identifier {
            cursor.next_raw();
            let expanded = expand_identifier(
                &token,
                &mut cursor,
                macros,
                diagnostics,
                source_file,
                site,
                expanding,
            );
            out.extend(expanded);
            continue;
        }
        out.push(token);
        cursor.next_raw();
    }
    out
}

fn expand_identifier(
    name_token: &Token,
    cursor: &mut TokenCursor,
    macros: &Definitions,
    diagnostics: &mut dyn DiagnosticSink,
    source_file: &str,
    site: ExpansionSite,
    expanding: &mut Vec<String>,
) -> Vec<Token> {
    let name = name_token.text.as_str();
    trace!(macro_name = name, ?site, "entering expansion");

    if expanding.iter().any(|n| n == name) {
        diagnostics.emit_warning(
            source_file,
            name_token.line,
            name_token.column,
            name_token.length,
            format!("macro `{name}` expands recursively; leaving this occurrence unexpanded"),
            codes::mac::RECURSIVE_EXPANSION,
        );
        return vec![name_token.clone()];
    }

    let Some(definition) = macros.get(name) else {
        if site.warn_on_undefined() {
            diagnostics.emit_warning(
                source_file,
                name_token.line,
                name_token.column,
                name_token.length,
                format!("`{name}` is not a defined macro"),
                codes::mac::UNDEFINED_MACRO,
            );
        }
        return vec![name_token.clone()];
    };

    if definition.is_function_like() {
        let params = definition.parameters.clone().unwrap_or_default();

        if !matches!(cursor.peek().map(|t| t.kind), Some(TokenKind::ParenOpen)) {
            if site.warn_on_missing_parens() {
                diagnostics.emit_warning(
                    source_file,
                    name_token.line,
                    name_token.column,
                    name_token.length,
                    format!("function-like macro `{name}` used without an argument list"),
                    codes::par::INVALID_MACRO_INVOCATION,
                );
            }
            return vec![name_token.clone()];
        }

        let raw_args = substitute::collect_arguments(cursor);
        if raw_args.len() != params.len() {
            diagnostics.emit_error(
                source_file,
                name_token.line,
                name_token.column,
                name_token.length,
                format!(
                    "macro `{name}` expects {} argument(s), got {}",
                    params.len(),
                    raw_args.len()
                ),
                codes::mac::ARGUMENT_COUNT_MISMATCH,
            );
            return vec![name_token.clone()];
        }

        let expanded_args: Vec<Vec<Token>> = raw_args
            .iter()
            .map(|arg| {
                expand_token_stream(
                    arg,
                    macros,
                    diagnostics,
                    source_file,
                    ExpansionSite::MacroBody,
                    expanding,
                )
            })
            .collect();

        let body_tokens = match &definition.body {
            Body::Tokens(tokens) => tokens.clone(),
            Body::Dynamic(_) => Vec::new(),
        };
        let substituted = substitute::substitute(&body_tokens, &params, &raw_args, &expanded_args);

        expanding.push(name.to_string());
        let result = expand_token_stream(
            &substituted,
            macros,
            diagnostics,
            source_file,
            ExpansionSite::MacroBody,
            expanding,
        );
        expanding.pop();
        result
    } else {
        let body_tokens: Vec<Token> = match &definition.body {
            Body::Tokens(tokens) => tokens.clone(),
            Body::Dynamic(generator) => {
                let context = ExpansionContext {
                    source_file: source_file.to_string(),
                    line: name_token.line,
                    column: name_token.column,
                };
                vec![dynamic_token(&generator(&context), name_token)]
            }
        };

        if site == ExpansionSite::ConditionalExpression
            && body_tokens.iter().all(|token| !token.is_significant())
        {
            // A defined-but-empty macro is truthy in a conditional
            // expression even though it expands to nothing (§4.3).
            return vec![Token::new(
                TokenKind::Number,
                "1",
                name_token.line,
                name_token.column,
            )];
        }

        expanding.push(name.to_string());
        let result = expand_token_stream(
            &body_tokens,
            macros,
            diagnostics,
            source_file,
            ExpansionSite::MacroBody,
            expanding,
        );
        expanding.pop();
        result
    }
}

fn dynamic_token(text: &str, at: &Token) -> Token {
    let kind = if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        TokenKind::Number
    } else if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 {
        TokenKind::StringLiteral
    } else {
        TokenKind::Identifier
    };
    Token::new(kind, text, at.line, at.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use precomp_lexer::{Lexer, LSL};

    fn lex(src: &str) -> Vec<Token> {
        let mut diagnostics = Vec::new();
        Lexer::new(src, &LSL, "t.lsl").lex(&mut diagnostics)
    }

    fn text_of(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn object_like_macro_expands() {
        let mut engine = MacroEngine::new();
        engine.definitions.define_object_like("FOO", lex("1 + 2"));
        let mut diagnostics = Vec::new();
        let result = engine.expand(&lex("FOO"), &mut diagnostics, "t.lsl", ExpansionSite::Emission);
        assert_eq!(text_of(&result), "1 + 2");
    }

    #[test]
    fn function_like_macro_substitutes_arguments() {
        let mut engine = MacroEngine::new();
        engine
            .definitions
            .define_function_like("ADD", vec!["a".into(), "b".into()], lex("a + b"))
            .unwrap();
        let mut diagnostics = Vec::new();
        let result = engine.expand(
            &lex("ADD(1, 2)"),
            &mut diagnostics,
            "t.lsl",
            ExpansionSite::Emission,
        );
        assert_eq!(text_of(&result), "1 + 2");
    }

    #[test]
    fn recursive_macro_expands_once_then_warns() {
        let mut engine = MacroEngine::new();
        engine.definitions.define_object_like("FOO", lex("FOO"));
        let mut diagnostics = Vec::new();
        let result = engine.expand(&lex("FOO"), &mut diagnostics, "t.lsl", ExpansionSite::Emission);
        assert_eq!(text_of(&result), "FOO");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(codes::mac::RECURSIVE_EXPANSION));
    }

    #[test]
    fn missing_parens_on_function_like_macro_warns_at_emission_site() {
        let mut engine = MacroEngine::new();
        engine
            .definitions
            .define_function_like("ADD", vec!["a".into()], lex("a"))
            .unwrap();
        let mut diagnostics = Vec::new();
        let result = engine.expand(&lex("ADD"), &mut diagnostics, "t.lsl", ExpansionSite::Emission);
        assert_eq!(text_of(&result), "ADD");
        assert_eq!(diagnostics[0].code, Some(codes::par::INVALID_MACRO_INVOCATION));
    }

    #[test]
    fn missing_parens_is_silent_in_conditional_expression_site() {
        let mut engine = MacroEngine::new();
        engine
            .definitions
            .define_function_like("ADD", vec!["a".into()], lex("a"))
            .unwrap();
        let mut diagnostics = Vec::new();
        let result = engine.expand(
            &lex("ADD"),
            &mut diagnostics,
            "t.lsl",
            ExpansionSite::ConditionalExpression,
        );
        assert_eq!(text_of(&result), "ADD");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn empty_macro_is_truthy_only_in_conditional_expression_site() {
        let mut engine = MacroEngine::new();
        engine.definitions.define_object_like("FOO", vec![]);
        let mut diagnostics = Vec::new();
        let result = engine.expand(
            &lex("FOO"),
            &mut diagnostics,
            "t.lsl",
            ExpansionSite::ConditionalExpression,
        );
        assert_eq!(text_of(&result), "1");
    }

    #[test]
    fn dynamic_line_macro_expands_to_current_line() {
        let mut engine = MacroEngine::new();
        let mut diagnostics = Vec::new();
        let mut tokens = lex("__LINE__");
        for token in &mut tokens {
            token.line = 42;
        }
        let result = engine.expand(&tokens, &mut diagnostics, "t.lsl", ExpansionSite::Emission);
        assert_eq!(text_of(&result), "42");
    }
}
