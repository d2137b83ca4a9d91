//! The dialect-aware scanner (§4.1).
//!
//! Single-pass, greedy-match, 1-based line/column tracking: a
//! `current_char`/`advance_char`/dispatch-on-peeked-character scan driven
//! by a `&DialectConfig` rather than a hardcoded grammar, so one lexer
//! serves both supported dialects.

use precomp_foundation::{codes, Diagnostic, DiagnosticSink};
use tracing::trace;

use crate::dialect::DialectConfig;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    dialect: &'static DialectConfig,
    source_file: String,
    position: usize,
    line: u32,
    column: u32,
    /// Tokens already produced by a scan step that emits more than one
    /// token (block comments emit start/content/end) but hasn't handed
    /// them all out yet.
    pending: std::collections::VecDeque<Token>,
}

/// A saved lexer position, used for the vector-literal transactional
/// lookahead (§9 "Lookahead restoration for vector literals") — a single
/// integer position plus line/column, never iterator cloning.
#[derive(Clone, Copy)]
struct SavePoint {
    position: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, dialect: &'static DialectConfig, source_file: impl Into<String>) -> Self {
        Self {
            input,
            dialect,
            source_file: source_file.into(),
            position: 0,
            line: 1,
            column: 1,
            pending: std::collections::VecDeque::new(),
        }
    }

    fn save(&self) -> SavePoint {
        SavePoint {
            position: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn restore(&mut self, save: SavePoint) {
        self.position = save.position;
        self.line = save.line;
        self.column = save.column;
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn rest(&self) -> &str {
        &self.input[self.position..]
    }

    fn advance_char(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn text_since(&self, save: SavePoint) -> &'a str {
        &self.input[save.position..self.position]
    }

    fn token_from(&self, save: SavePoint, kind: TokenKind) -> Token {
        Token::new(kind, self.text_since(save), save.line, save.column)
    }

    /// Runs the whole input through the scanner, returning a flat token
    /// sequence terminated by a single EOF token.
    pub fn lex(mut self, diagnostics: &mut dyn DiagnosticSink) -> Vec<Token> {
        trace!(dialect = self.dialect.name, source_file = %self.source_file, "lexing");
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(diagnostics);
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self, diagnostics: &mut dyn DiagnosticSink) -> Token {
        if let Some(token) = self.pending.pop_front() {
            return token;
        }

        let save = self.save();

        let Some(c) = self.current_char() else {
            return self.token_from(save, TokenKind::Eof);
        };

        match c {
            '\r' | '\n' => self.scan_newline(save),
            ' ' | '\t' => self.scan_whitespace(save),
            '"' | '\'' if self.dialect.string_delimiters.contains(&c) => {
                self.scan_string(save, c, diagnostics)
            }
            '<' if self.dialect.supports_vector_literals => {
                if let Some(token) = self.try_vector_literal(save, diagnostics) {
                    token
                } else {
                    self.scan_operator_or_punctuation(save)
                }
            }
            _ if self.rest().starts_with(self.dialect.block_comment_start) => {
                self.scan_block_comment_start(save, diagnostics)
            }
            _ if self.rest().starts_with(self.dialect.line_comment_prefix) => {
                self.scan_line_comment(save)
            }
            _ if self.matches_directive_prefix(c) => self.scan_prefixed_directive(save),
            c if is_ident_start(c) => self.scan_identifier_or_directive(save),
            c if c.is_ascii_digit() => self.scan_number(save, diagnostics),
            _ => self.scan_operator_or_punctuation(save),
        }
    }

    fn matches_directive_prefix(&self, c: char) -> bool {
        self.dialect.directive_prefix == Some(c)
    }

    fn scan_newline(&mut self, save: SavePoint) -> Token {
        self.advance_char();
        if self.current_char() == Some('\n') && self.text_since(save) == "\r" {
            self.advance_char();
        }
        self.token_from(save, TokenKind::Newline)
    }

    fn scan_whitespace(&mut self, save: SavePoint) -> Token {
        while matches!(self.current_char(), Some(' ' | '\t')) {
            self.advance_char();
        }
        self.token_from(save, TokenKind::Whitespace)
    }

    fn scan_line_comment(&mut self, save: SavePoint) -> Token {
        for _ in 0..self.dialect.line_comment_prefix.chars().count() {
            self.advance_char();
        }
        while !matches!(self.current_char(), None | Some('\n') | Some('\r')) {
            self.advance_char();
        }
        self.token_from(save, TokenKind::LineComment)
    }

    /// Scans a block comment's opening delimiter. For Lua-style long
    /// brackets, the equals run is part of the start delimiter; the close
    /// delimiter is matched against the same count (§4.1 "Comments").
    fn scan_block_comment_start(
        &mut self,
        save: SavePoint,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Token {
        for _ in 0..self.dialect.block_comment_start.chars().count() {
            self.advance_char();
        }
        let mut equals = 0usize;
        if self.dialect.use_long_bracket {
            while self.current_char() == Some('=') {
                equals += 1;
                self.advance_char();
            }
            // `block_comment_start` only covers the prefix and the first
            // opening bracket; the second bracket (closing the `[`*=*`[`
            // opener) must always follow, for any equals count including
            // zero (`--[[` is `--[` + 0 `=` + `[`).
            if self.current_char() == Some('[') {
                self.advance_char();
            } else {
                // Not actually a long bracket (e.g. `--[foo`); this is
                // just a line comment after all.
                self.restore(save);
                return self.scan_line_comment(save);
            }
        }
        let start_token = self.token_from(save, TokenKind::BlockCommentStart);

        let close = closing_long_bracket(equals);
        let close_delim: &str = if self.dialect.use_long_bracket {
            &close
        } else {
            self.dialect.block_comment_end
        };

        let content_start = self.save();
        let mut unterminated = false;
        loop {
            if self.current_char().is_none() {
                unterminated = true;
                break;
            }
            if self.rest().starts_with(close_delim) {
                break;
            }
            self.advance_char();
        }

        if unterminated {
            diagnostics.emit(
                Diagnostic::error(
                    self.source_file.clone(),
                    save.line,
                    save.column,
                    (self.position - save.position) as u32,
                    "block comment is missing its closing delimiter",
                )
                .with_code(codes::lex::UNTERMINATED_BLOCK_COMMENT),
            );
            if self.position > content_start.position {
                self.pending
                    .push_back(self.token_from(content_start, TokenKind::BlockCommentContent));
            }
            return start_token;
        }

        if self.position > content_start.position {
            self.pending
                .push_back(self.token_from(content_start, TokenKind::BlockCommentContent));
        }
        let end_start = self.save();
        for _ in 0..close_delim.chars().count() {
            self.advance_char();
        }
        self.pending
            .push_back(self.token_from(end_start, TokenKind::BlockCommentEnd));

        start_token
    }

    fn scan_operator_or_punctuation(&mut self, save: SavePoint) -> Token {
        if let Some(kind) = bracket_kind(self.current_char()) {
            self.advance_char();
            return self.token_from(save, kind);
        }

        for op in self.dialect.operators_three_char {
            if self.rest().starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.advance_char();
                }
                return self.token_from(save, TokenKind::Operator);
            }
        }
        for op in self.dialect.operators_two_char {
            if self.rest().starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.advance_char();
                }
                return self.token_from(save, TokenKind::Operator);
            }
        }
        if let Some(c) = self.current_char() {
            if self.dialect.operators_one_char.contains(&c) {
                self.advance_char();
                return self.token_from(save, TokenKind::Operator);
            }
            self.advance_char();
            return self.token_from(save, TokenKind::Unknown);
        }
        self.token_from(save, TokenKind::Eof)
    }

    fn scan_string(
        &mut self,
        save: SavePoint,
        delimiter: char,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Token {
        self.advance_char();
        loop {
            match self.current_char() {
                Some(c) if c == delimiter => {
                    self.advance_char();
                    break;
                }
                Some('\\') => {
                    self.advance_char();
                    self.advance_char();
                }
                Some('\n') | None => {
                    diagnostics.emit(
                        Diagnostic::error(
                            self.source_file.clone(),
                            save.line,
                            save.column,
                            1,
                            "string literal is missing its closing quote",
                        )
                        .with_code(codes::lex::UNTERMINATED_STRING),
                    );
                    break;
                }
                _ => {
                    self.advance_char();
                }
            }
        }
        self.token_from(save, TokenKind::StringLiteral)
    }

    fn matches_directive_keyword(&self, text: &str) -> bool {
        self.dialect
            .directive_keywords
            .iter()
            .any(|kw| *kw == text)
    }

    fn scan_prefixed_directive(&mut self, save: SavePoint) -> Token {
        self.advance_char(); // the prefix character itself
        while matches!(self.current_char(), Some(c) if is_ident_continue(c)) {
            self.advance_char();
        }
        self.token_from(save, TokenKind::Directive)
    }

    fn scan_identifier_or_directive(&mut self, save: SavePoint) -> Token {
        while matches!(self.current_char(), Some(c) if is_ident_continue(c)) {
            self.advance_char();
        }
        let text = self.text_since(save);
        if self.matches_directive_keyword(text) {
            self.token_from(save, TokenKind::Directive)
        } else {
            self.token_from(save, TokenKind::Identifier)
        }
    }

    fn scan_number(&mut self, save: SavePoint, diagnostics: &mut dyn DiagnosticSink) -> Token {
        while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
            self.advance_char();
        }
        if self.current_char() == Some('.') {
            self.advance_char();
            while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
                self.advance_char();
            }
        }
        let mut exponent_ok = true;
        if matches!(self.current_char(), Some('e' | 'E')) {
            self.advance_char();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance_char();
            }
            let digits_start = self.position;
            while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
                self.advance_char();
            }
            exponent_ok = self.position > digits_start;
        }
        while matches!(self.current_char(), Some(c) if c.is_ascii_alphabetic()) {
            self.advance_char();
        }
        if !exponent_ok {
            diagnostics.emit(
                Diagnostic::error(
                    self.source_file.clone(),
                    save.line,
                    save.column,
                    (self.position - save.position) as u32,
                    "exponent in number literal must be followed by at least one digit",
                )
                .with_code(codes::lex::INVALID_NUMBER_LITERAL),
            );
        }
        self.token_from(save, TokenKind::Number)
    }

    /// Lookahead-only vector literal parse (§4.1 "Vector literals (LSL
    /// only)", §9). Returns `None` on any non-terminal failure, in which
    /// case the lexer position is fully restored and the caller should
    /// fall through to treating `<` as an operator.
    ///
    /// Decision on the open question in §9: a newline/EOF encountered
    /// while fewer than three components have been parsed is treated as
    /// an ordinary non-match (silent rollback), matching the observed
    /// behavior rather than the stricter "any newline flags an error"
    /// reading — see DESIGN.md.
    fn try_vector_literal(
        &mut self,
        save: SavePoint,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Option<Token> {
        self.advance_char(); // '<'
        let mut components = 0usize;
        let mut crossed_newline = false;

        loop {
            crossed_newline |= self.skip_ws_and_newlines();
            if self.current_char().is_none() {
                return self.vector_literal_failed(save, components, true, diagnostics);
            }
            if !self.scan_vector_component() {
                return self.vector_literal_failed(save, components, crossed_newline, diagnostics);
            }
            components += 1;
            crossed_newline |= self.skip_ws_and_newlines();
            match self.current_char() {
                Some(',') if components < 4 => {
                    self.advance_char();
                }
                Some('>') if (3..=4).contains(&components) => {
                    self.advance_char();
                    return Some(self.token_from(save, TokenKind::VectorLiteral));
                }
                None => {
                    return self.vector_literal_failed(save, components, true, diagnostics);
                }
                _ => {
                    return self.vector_literal_failed(save, components, crossed_newline, diagnostics);
                }
            }
        }
    }

    fn vector_literal_failed(
        &mut self,
        save: SavePoint,
        components: usize,
        crossed_newline_or_eof: bool,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Option<Token> {
        if crossed_newline_or_eof && components >= 3 {
            let token = self.token_from(save, TokenKind::VectorLiteral);
            diagnostics.emit(
                Diagnostic::error(
                    self.source_file.clone(),
                    save.line,
                    save.column,
                    token.length,
                    "vector literal is missing its closing '>'",
                )
                .with_code(codes::lex::UNTERMINATED_VECTOR_LITERAL),
            );
            Some(token)
        } else {
            self.restore(save);
            None
        }
    }

    fn skip_ws_and_newlines(&mut self) -> bool {
        let mut crossed = false;
        loop {
            match self.current_char() {
                Some(' ' | '\t' | '\r') => {
                    self.advance_char();
                }
                Some('\n') => {
                    crossed = true;
                    self.advance_char();
                }
                _ => break,
            }
        }
        crossed
    }

    fn scan_vector_component(&mut self) -> bool {
        match self.current_char() {
            Some('+' | '-') => {
                self.advance_char();
            }
            _ => {}
        }
        match self.current_char() {
            Some(c) if c.is_ascii_digit() || c == '.' => {
                while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
                    self.advance_char();
                }
                if self.current_char() == Some('.') {
                    self.advance_char();
                    while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
                        self.advance_char();
                    }
                }
                if matches!(self.current_char(), Some('e' | 'E')) {
                    self.advance_char();
                    if matches!(self.current_char(), Some('+' | '-')) {
                        self.advance_char();
                    }
                    while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
                        self.advance_char();
                    }
                }
                true
            }
            Some(c) if is_ident_start(c) => {
                while matches!(self.current_char(), Some(c) if is_ident_continue(c)) {
                    self.advance_char();
                }
                true
            }
            _ => false,
        }
    }
}

fn closing_long_bracket(equals: usize) -> String {
    format!("]{}]", "=".repeat(equals))
}

fn bracket_kind(c: Option<char>) -> Option<TokenKind> {
    match c? {
        '(' => Some(TokenKind::ParenOpen),
        ')' => Some(TokenKind::ParenClose),
        '[' => Some(TokenKind::BracketOpen),
        ']' => Some(TokenKind::BracketClose),
        '{' => Some(TokenKind::BraceOpen),
        '}' => Some(TokenKind::BraceClose),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{LSL, LUAU};

    fn lex(input: &str, dialect: &'static DialectConfig) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let tokens = Lexer::new(input, dialect, "test.lsl").lex(&mut diagnostics);
        (tokens, diagnostics)
    }

    fn reconstruct(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn lossless_reconstruction_lsl() {
        let input = "integer x = 1 + 2; // comment\n/* block */\nstring s = \"hi\\\"there\";";
        let (tokens, diagnostics) = lex(input, &LSL);
        assert!(diagnostics.is_empty());
        assert_eq!(reconstruct(&tokens), input);
    }

    #[test]
    fn lossless_reconstruction_luau() {
        let input = "local x = 1 -- comment\nlocal y = require(\"foo\")\n--[[ long\ncomment ]]\n";
        let (tokens, _) = lex(input, &LUAU);
        assert_eq!(reconstruct(&tokens), input);
    }

    #[test]
    fn directive_prefixed() {
        let (tokens, _) = lex("#define FOO 1", &LSL);
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].text, "#define");
    }

    #[test]
    fn require_is_a_bare_directive_in_luau() {
        let (tokens, _) = lex("require(\"mod\")", &LUAU);
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].text, "require");
    }

    #[test]
    fn vector_literal_matches() {
        let (tokens, diagnostics) = lex("<1, 2, 3>", &LSL);
        assert!(diagnostics.is_empty());
        let vector = tokens.iter().find(|t| t.kind == TokenKind::VectorLiteral);
        assert_eq!(vector.unwrap().text, "<1, 2, 3>");
    }

    #[test]
    fn vector_literal_lookahead_falls_back_to_operator() {
        let (tokens, diagnostics) = lex("x < 1", &LSL);
        assert!(diagnostics.is_empty());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Operator && t.text == "<"));
    }

    #[test]
    fn unterminated_string_still_emits_a_token() {
        let (tokens, diagnostics) = lex("\"unterminated", &LSL);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(codes::lex::UNTERMINATED_STRING));
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn invalid_number_literal_still_emits_a_token() {
        let (tokens, diagnostics) = lex("1e", &LSL);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(codes::lex::INVALID_NUMBER_LITERAL));
        assert_eq!(tokens[0].kind, TokenKind::Number);
    }
}
