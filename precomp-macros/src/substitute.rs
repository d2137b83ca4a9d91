//! Function-like macro argument collection and body substitution: `#`
//! stringification and `##` token pasting (§4.2).
//!
//! Neither dialect lexes `#`/`##` as their own token kind (LSL treats a
//! bare `#` as its directive prefix, Luau treats it as the length
//! operator), so both operators are recognised here by their token *text*
//! rather than by `TokenKind`. LSL's directive-prefix scan also absorbs a
//! following identifier with no separating whitespace into the same token
//! (`#x` lexes as one `Directive("#x")`, not `#` then `x`); callers run
//! [`normalize_hash_tokens`] over a collected macro body first so that by
//! the time [`substitute`] sees it, `##` is always two adjacent single-`#`
//! tokens and a stringify `#` is always its own token.

use precomp_lexer::{Token, TokenCursor, TokenKind};

fn is_hash(token: &Token) -> bool {
    token.is_significant() && token.text == "#"
}

fn next_significant(body: &[Token], mut i: usize) -> Option<usize> {
    while i < body.len() {
        if body[i].is_significant() {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// `##` is a pair of adjacent `#` tokens; returns the index just past the
/// second `#` if `body[i]` starts such a pair.
fn match_paste_operator(body: &[Token], i: usize) -> Option<usize> {
    if !is_hash(&body[i]) {
        return None;
    }
    let second = next_significant(body, i + 1)?;
    if is_hash(&body[second]) {
        Some(second + 1)
    } else {
        None
    }
}

/// Splits a directive-prefixed hash token that absorbed a following
/// identifier with no separating whitespace back into a lone `#` and the
/// identifier.
///
/// LSL's directive-prefix scan consumes `#` and then greedily eats any
/// following identifier characters — the same rule that turns `#define`
/// into one token also turns a stringify operator written as `#x` (no
/// space) into a single `Directive("#x")` token instead of `#` followed by
/// `x`. Macro bodies are never re-dispatched as real directives, so this
/// normalization is safe to apply unconditionally before `#`/`##` detection.
pub fn normalize_hash_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.kind == TokenKind::Directive && token.text.len() > 1 {
            let rest = token.text[1..].to_string();
            out.push(Token::new(TokenKind::Directive, "#", token.line, token.column));
            out.push(Token::new(TokenKind::Identifier, rest, token.line, token.column + 1));
        } else {
            out.push(token);
        }
    }
    out
}

fn trim_trivia(tokens: Vec<Token>) -> Vec<Token> {
    let start = tokens.iter().position(Token::is_significant);
    let Some(start) = start else {
        return Vec::new();
    };
    let end = tokens.iter().rposition(Token::is_significant).unwrap();
    tokens[start..=end].to_vec()
}

/// Reads a parenthesized, comma-separated argument list starting at the
/// cursor's current position (the opening `(` must be the next significant
/// token). `NAME()` yields zero arguments, not one empty argument.
pub fn collect_arguments(cursor: &mut TokenCursor) -> Vec<Vec<Token>> {
    while let Some(token) = cursor.peek_raw() {
        if token.is_significant() {
            break;
        }
        cursor.next_raw();
    }
    cursor.next_raw(); // the '('

    if matches!(cursor.peek().map(|t| t.kind), Some(TokenKind::ParenClose)) {
        cursor.next();
        return Vec::new();
    }

    let mut arguments = Vec::new();
    let mut current = Vec::new();
    let mut depth: u32 = 0;
    loop {
        let Some(token) = cursor.next_raw().cloned() else {
            arguments.push(trim_trivia(current));
            break;
        };
        match token.kind {
            TokenKind::ParenOpen => {
                depth += 1;
                current.push(token);
            }
            TokenKind::ParenClose => {
                if depth == 0 {
                    arguments.push(trim_trivia(current));
                    break;
                }
                depth -= 1;
                current.push(token);
            }
            TokenKind::Eof => {
                arguments.push(trim_trivia(current));
                break;
            }
            _ if depth == 0 && token.is_significant() && token.text == "," => {
                arguments.push(trim_trivia(std::mem::take(&mut current)));
            }
            _ => current.push(token),
        }
    }
    arguments
}

/// Concatenates an argument's tokens into the text of a `#param`
/// stringification, collapsing any interior trivia run to one space and
/// escaping backslashes/quotes inside string-literal tokens (§4.2).
pub fn stringify_arg(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    let mut started = false;
    for token in tokens {
        if token.kind.is_trivial() {
            if started {
                pending_space = true;
            }
            continue;
        }
        if pending_space {
            out.push(' ');
        }
        pending_space = false;
        if token.kind == TokenKind::StringLiteral {
            out.push_str(&token.text.replace('\\', "\\\\").replace('"', "\\\""));
        } else {
            out.push_str(&token.text);
        }
        started = true;
    }
    out
}

/// Substitutes parameters into a function-like macro's body. `raw_args` is
/// used for stringification and paste operands (unexpanded, per the rule
/// that `#`/`##` operands are not macro-expanded); `expanded_args` is used
/// everywhere else (§4.2: "parameter identifiers replaced by a fully
/// macro-expanded copy of their argument tokens").
pub fn substitute(
    body: &[Token],
    params: &[String],
    raw_args: &[Vec<Token>],
    expanded_args: &[Vec<Token>],
) -> Vec<Token> {
    let param_index = |name: &str| params.iter().position(|p| p == name);
    let mut out = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let token = &body[i];

        if !token.is_significant() {
            out.push(token.clone());
            i += 1;
            continue;
        }

        if is_hash(token) {
            if let Some(name_idx) = next_significant(body, i + 1) {
                let candidate = &body[name_idx];
                if candidate.kind == TokenKind::Identifier {
                    if let Some(pidx) = param_index(&candidate.text) {
                        let text = stringify_arg(&raw_args[pidx]);
                        out.push(Token::new(
                            TokenKind::StringLiteral,
                            format!("\"{text}\""),
                            token.line,
                            token.column,
                        ));
                        i = name_idx + 1;
                        continue;
                    }
                }
            }
            out.push(token.clone());
            i += 1;
            continue;
        }

        let (raw_seq, expanded_seq) = match param_index(&token.text) {
            Some(pidx) if token.kind == TokenKind::Identifier => {
                (raw_args[pidx].clone(), expanded_args[pidx].clone())
            }
            _ => (vec![token.clone()], vec![token.clone()]),
        };

        let mut next_rhs_start = next_significant(body, i + 1).and_then(|idx| match_paste_operator(body, idx));
        if next_rhs_start.is_some() {
            let mut lhs = raw_seq;
            let mut pending = lhs.pop();
            out.extend(lhs);
            let mut cursor = i;

            // `a##b##c` chains left-to-right: once `a##b` has folded into a
            // pending token, a `##` immediately following `b` keeps folding
            // into the same pending token rather than starting a fresh
            // stringify/paste dispatch on what would otherwise look like a
            // bare leftover `#`.
            while let Some(rhs_start) = next_rhs_start {
                let Some(rhs_token_idx) = next_significant(body, rhs_start) else {
                    cursor = rhs_start;
                    next_rhs_start = None;
                    break;
                };
                let rhs_token = &body[rhs_token_idx];
                let mut rhs_raw = match param_index(&rhs_token.text) {
                    Some(pidx) if rhs_token.kind == TokenKind::Identifier => raw_args[pidx].clone(),
                    _ => vec![rhs_token.clone()],
                };
                let first = if rhs_raw.is_empty() {
                    None
                } else {
                    Some(rhs_raw.remove(0))
                };
                let joined = match (pending.take(), first) {
                    (Some(l), Some(r)) => Some(l.with_text(format!("{}{}", l.text, r.text))),
                    (Some(l), None) => Some(l),
                    (None, Some(r)) => Some(r),
                    (None, None) => None,
                };
                if rhs_raw.is_empty() {
                    pending = joined;
                } else {
                    // The operand expanded to more than one token; only its
                    // own boundary tokens participate in pasting.
                    if let Some(joined) = joined {
                        out.push(joined);
                    }
                    let tail = rhs_raw.pop();
                    out.extend(rhs_raw);
                    pending = tail;
                }
                cursor = rhs_token_idx + 1;
                next_rhs_start = next_significant(body, cursor).and_then(|idx| match_paste_operator(body, idx));
            }
            if let Some(pending) = pending {
                out.push(pending);
            }
            i = cursor;
            continue;
        }

        out.extend(expanded_seq);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use precomp_lexer::{Lexer, LSL};

    fn lex(src: &str) -> Vec<Token> {
        let mut diagnostics = Vec::new();
        Lexer::new(src, &LSL, "t.lsl").lex(&mut diagnostics)
    }

    fn significant(tokens: &[Token]) -> Vec<&Token> {
        tokens.iter().filter(|t| t.is_significant()).collect()
    }

    #[test]
    fn collects_zero_arguments() {
        let tokens = lex("()");
        let mut cursor = TokenCursor::new(&tokens);
        assert_eq!(collect_arguments(&mut cursor), Vec::<Vec<Token>>::new());
    }

    #[test]
    fn collects_nested_parens_as_one_argument() {
        let tokens = lex("(a, (b, c), d)");
        let mut cursor = TokenCursor::new(&tokens);
        let args = collect_arguments(&mut cursor);
        assert_eq!(args.len(), 3);
        let middle: String = args[1].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(middle, "(b,c)");
    }

    #[test]
    fn stringify_escapes_quotes_and_backslashes() {
        let tokens = lex(r#""a\b""#);
        let text = stringify_arg(&tokens);
        assert_eq!(text, r#"\"a\\b\""#);
    }

    #[test]
    fn paste_concatenates_adjacent_tokens() {
        let body = normalize_hash_tokens(lex("a##b"));
        let params = vec!["a".to_string(), "b".to_string()];
        let raw_args = vec![vec![Token::new(TokenKind::Identifier, "foo", 1, 1)], vec![
            Token::new(TokenKind::Identifier, "bar", 1, 1),
        ]];
        let result = substitute(&body, &params, &raw_args, &raw_args);
        let joined: String = significant(&result).iter().map(|t| t.text.clone()).collect();
        assert_eq!(joined, "foobar");
    }

    #[test]
    fn chained_paste_joins_every_operand() {
        let body = normalize_hash_tokens(lex("a##b##c"));
        let params = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let raw_args = vec![
            vec![Token::new(TokenKind::Identifier, "foo", 1, 1)],
            vec![Token::new(TokenKind::Identifier, "bar", 1, 1)],
            vec![Token::new(TokenKind::Identifier, "baz", 1, 1)],
        ];
        let result = substitute(&body, &params, &raw_args, &raw_args);
        let joined: String = significant(&result).iter().map(|t| t.text.clone()).collect();
        assert_eq!(joined, "foobarbaz");
    }

    #[test]
    fn stringify_handles_hash_fused_with_identifier() {
        // The lexer fuses `#x` (no space) into a single `Directive("#x")`
        // token; normalization must split it back into `#` and `x` before
        // stringify detection can recognise it.
        let body = normalize_hash_tokens(lex("#x"));
        let params = vec!["x".to_string()];
        let raw_args = vec![vec![Token::new(TokenKind::Identifier, "hello", 1, 1)]];
        let result = substitute(&body, &params, &raw_args, &raw_args);
        let joined: String = significant(&result).iter().map(|t| t.text.clone()).collect();
        assert_eq!(joined, "\"hello\"");
    }

    #[test]
    fn normalize_leaves_spaced_hash_untouched() {
        let tokens = lex("# x");
        let normalized = normalize_hash_tokens(tokens.clone());
        assert_eq!(normalized.len(), tokens.len());
    }
}
