//! Conditional expression evaluation (§4.3): `defined(...)` pre-pass,
//! macro expansion, then a recursive-descent evaluator with C-style
//! integer semantics over the dialect's comparison/logical spellings.

use precomp_foundation::{codes, DiagnosticSink};
use precomp_lexer::{DialectConfig, Token, TokenKind};
use precomp_macros::{ExpansionSite, MacroEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
enum EvalError {
    DivisionByZero,
    Invalid(String),
}

/// Runs the full §4.3 pipeline over a directive's condition tokens and
/// returns whether the branch is truthy. Any evaluator error is caught and
/// reported, yielding a false condition (§4.3 "Any evaluator exception is
/// caught, reported, and yields a false condition").
pub fn evaluate_condition(
    tokens: &[Token],
    macros: &MacroEngine,
    dialect: &'static DialectConfig,
    diagnostics: &mut dyn DiagnosticSink,
    source_file: &str,
) -> bool {
    let line = tokens.iter().find(|t| t.is_significant()).map(|t| t.line).unwrap_or(1);
    let column = tokens
        .iter()
        .find(|t| t.is_significant())
        .map(|t| t.column)
        .unwrap_or(1);

    let pre = precomp_macros::expand_defined(tokens, &macros.definitions, diagnostics, source_file);
    let expanded = macros.expand(&pre, diagnostics, source_file, ExpansionSite::ConditionalExpression);
    let significant: Vec<Token> = expanded.into_iter().filter(Token::is_significant).collect();

    if significant.is_empty() {
        diagnostics.emit_error(
            source_file,
            line,
            column,
            1,
            "empty conditional expression",
            codes::cond::INVALID_EXPRESSION,
        );
        return false;
    }

    let mut parser = ExprParser {
        tokens: &significant,
        pos: 0,
        dialect,
    };
    match parser.parse_or() {
        Ok(value) if parser.pos == significant.len() => value != 0,
        Ok(_) => {
            diagnostics.emit_error(
                source_file,
                line,
                column,
                1,
                "unexpected trailing tokens in conditional expression",
                codes::cond::INVALID_EXPRESSION,
            );
            false
        }
        Err(EvalError::DivisionByZero) => {
            diagnostics.emit_error(
                source_file,
                line,
                column,
                1,
                "division or modulo by zero in conditional expression",
                codes::cond::DIVISION_BY_ZERO,
            );
            false
        }
        Err(EvalError::Invalid(message)) => {
            diagnostics.emit_error(source_file, line, column, 1, message, codes::cond::INVALID_EXPRESSION);
            false
        }
    }
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    dialect: &'static DialectConfig,
}

impl<'a> ExprParser<'a> {
    fn peek_text(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.text.as_str())
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn parse_or(&mut self) -> Result<i64, EvalError> {
        let mut left = self.parse_and()?;
        while self.peek_text() == Some(self.dialect.logical_or) {
            self.advance();
            let right = self.parse_and()?;
            left = bool_to_i64(left != 0 || right != 0);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<i64, EvalError> {
        let mut left = self.parse_comp()?;
        while self.peek_text() == Some(self.dialect.logical_and) {
            self.advance();
            let right = self.parse_comp()?;
            left = bool_to_i64(left != 0 && right != 0);
        }
        Ok(left)
    }

    fn parse_comp(&mut self) -> Result<i64, EvalError> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek_text() {
                Some("==") | Some("!=") | Some("~=") | Some("<") | Some(">") | Some("<=")
                | Some(">=") => self.peek_text().unwrap().to_string(),
                _ => break,
            };
            self.advance();
            let right = self.parse_add()?;
            left = bool_to_i64(match op.as_str() {
                "==" => left == right,
                "!=" | "~=" => left != right,
                "<" => left < right,
                ">" => left > right,
                "<=" => left <= right,
                ">=" => left >= right,
                _ => unreachable!(),
            });
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<i64, EvalError> {
        let mut left = self.parse_mul()?;
        loop {
            match self.peek_text() {
                Some("+") => {
                    self.advance();
                    left += self.parse_mul()?;
                }
                Some("-") => {
                    self.advance();
                    left -= self.parse_mul()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<i64, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek_text() {
                Some("*") => {
                    self.advance();
                    left *= self.parse_unary()?;
                }
                Some("/") => {
                    self.advance();
                    let right = self.parse_unary()?;
                    if right == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left /= right;
                }
                Some("%") => {
                    self.advance();
                    let right = self.parse_unary()?;
                    if right == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left %= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<i64, EvalError> {
        if self.peek_text() == Some("-") {
            self.advance();
            return Ok(-self.parse_unary()?);
        }
        if self.peek_text() == Some(self.dialect.logical_not) {
            self.advance();
            let value = self.parse_unary()?;
            return Ok(bool_to_i64(value == 0));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<i64, EvalError> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(EvalError::Invalid("unexpected end of expression".to_string()));
        };
        match token.kind {
            TokenKind::Number => {
                self.advance();
                parse_number(&token.text)
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(match token.text.as_str() {
                    "true" => 1,
                    "false" => 0,
                    _ => 0,
                })
            }
            TokenKind::ParenOpen => {
                self.advance();
                let value = self.parse_or()?;
                match self.advance() {
                    Some(t) if t.kind == TokenKind::ParenClose => Ok(value),
                    _ => Err(EvalError::Invalid("expected `)`".to_string())),
                }
            }
            _ => Err(EvalError::Invalid(format!("unexpected token `{}`", token.text))),
        }
    }
}

fn bool_to_i64(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn parse_number(text: &str) -> Result<i64, EvalError> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(EvalError::Invalid(format!("invalid number literal `{text}`")));
    }
    digits
        .parse::<i64>()
        .map_err(|_| EvalError::Invalid(format!("number literal `{text}` out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use precomp_lexer::{Lexer, LSL, LUAU};

    fn lex(src: &str, dialect: &'static DialectConfig) -> Vec<Token> {
        let mut diagnostics = Vec::new();
        Lexer::new(src, dialect, "t").lex(&mut diagnostics)
    }

    #[test]
    fn arithmetic_and_comparison() {
        let macros = MacroEngine::new();
        let mut diagnostics = Vec::new();
        let tokens = lex("(2+3)*4 == 20", &LSL);
        assert!(evaluate_condition(&tokens, &macros, &LSL, &mut diagnostics, "t.lsl"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn division_by_zero_is_reported_and_false() {
        let macros = MacroEngine::new();
        let mut diagnostics = Vec::new();
        let tokens = lex("1 / 0", &LSL);
        assert!(!evaluate_condition(&tokens, &macros, &LSL, &mut diagnostics, "t.lsl"));
        assert_eq!(diagnostics[0].code, Some(codes::cond::DIVISION_BY_ZERO));
    }

    #[test]
    fn luau_logical_keywords_and_not_equal() {
        let macros = MacroEngine::new();
        let mut diagnostics = Vec::new();
        let tokens = lex("1 ~= 2 and not false", &LUAU);
        assert!(evaluate_condition(&tokens, &macros, &LUAU, &mut diagnostics, "t.luau"));
    }

    #[test]
    fn defined_macro_truthiness() {
        let mut macros = MacroEngine::new();
        macros.definitions.define_object_like("FOO", vec![]);
        let mut diagnostics = Vec::new();
        let tokens = lex("defined(FOO)", &LSL);
        assert!(evaluate_condition(&tokens, &macros, &LSL, &mut diagnostics, "t.lsl"));
    }

    #[test]
    fn unknown_identifier_is_falsy() {
        let macros = MacroEngine::new();
        let mut diagnostics = Vec::new();
        let tokens = lex("UNKNOWN", &LSL);
        assert!(!evaluate_condition(&tokens, &macros, &LSL, &mut diagnostics, "t.lsl"));
    }
}
