//! The `defined(...)` pre-pass used by conditional expression evaluation
//! (§4.2 "defined operator", §4.3).
//!
//! This runs before macro expansion proper: `defined(NAME)` collapses to a
//! single `Number` token (`1` or `0`) so the expression grammar never has to
//! know about macros. Any other form after `defined` — missing `(`, missing
//! name, missing `)` — is malformed and left in place with a diagnostic.

use precomp_foundation::{codes, DiagnosticSink};
use precomp_lexer::{Token, TokenKind};

use crate::definitions::Definitions;

fn next_significant(tokens: &[Token], mut i: usize) -> Option<usize> {
    while i < tokens.len() {
        if tokens[i].is_significant() {
            return Some(i);
        }
        i += 1;
    }
    None
}

pub fn expand_defined(
    tokens: &[Token],
    macros: &Definitions,
    diagnostics: &mut dyn DiagnosticSink,
    source_file: &str,
) -> Vec<Token> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token.is_significant() && token.kind == TokenKind::Identifier && token.text == "defined"
        {
            if let Some(replaced) = try_expand_one(tokens, i, macros) {
                out.push(replaced.token);
                i = replaced.next;
                continue;
            }
            diagnostics.emit_error(
                source_file,
                token.line,
                token.column,
                token.length,
                "`defined` must be followed by `(identifier)`",
                codes::mac::INVALID_DEFINED_SYNTAX,
            );
        }
        out.push(token.clone());
        i += 1;
    }
    out
}

struct Replaced {
    token: Token,
    next: usize,
}

fn try_expand_one(tokens: &[Token], defined_idx: usize, macros: &Definitions) -> Option<Replaced> {
    let defined = &tokens[defined_idx];
    let after = next_significant(tokens, defined_idx + 1)?;

    if tokens[after].kind == TokenKind::ParenOpen {
        let name_idx = next_significant(tokens, after + 1)?;
        if tokens[name_idx].kind != TokenKind::Identifier {
            return None;
        }
        let close_idx = next_significant(tokens, name_idx + 1)?;
        if tokens[close_idx].kind != TokenKind::ParenClose {
            return None;
        }
        let truth = if macros.is_defined(&tokens[name_idx].text) {
            "1"
        } else {
            "0"
        };
        return Some(Replaced {
            token: Token::new(TokenKind::Number, truth, defined.line, defined.column),
            next: close_idx + 1,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use precomp_lexer::{Lexer, LSL};

    fn lex(src: &str) -> Vec<Token> {
        let mut diagnostics = Vec::new();
        Lexer::new(src, &LSL, "t.lsl").lex(&mut diagnostics)
    }

    #[test]
    fn parenthesized_form_replaces_with_truth_value() {
        let mut macros = Definitions::new();
        macros.define_object_like("FOO", vec![]);
        let tokens = lex("defined(FOO)");
        let mut diagnostics = Vec::new();
        let result = expand_defined(&tokens, &macros, &mut diagnostics, "t.lsl");
        let numbers: Vec<_> = result
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .collect();
        assert_eq!(numbers.len(), 1);
        assert_eq!(numbers[0].text, "1");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn bare_form_without_parens_is_malformed() {
        let macros = Definitions::new();
        let tokens = lex("defined BAR");
        let mut diagnostics = Vec::new();
        let result = expand_defined(&tokens, &macros, &mut diagnostics, "t.lsl");
        assert!(result.iter().all(|t| t.kind != TokenKind::Number));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        assert_eq!(
            diagnostics[0].code,
            Some(codes::mac::INVALID_DEFINED_SYNTAX)
        );
    }

    #[test]
    fn malformed_defined_emits_error_diagnostic() {
        let macros = Definitions::new();
        let tokens = lex("defined(1)");
        let mut diagnostics = Vec::new();
        expand_defined(&tokens, &macros, &mut diagnostics, "t.lsl");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        assert_eq!(
            diagnostics[0].code,
            Some(codes::mac::INVALID_DEFINED_SYNTAX)
        );
    }
}
