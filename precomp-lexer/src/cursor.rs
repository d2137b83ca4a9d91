//! A simple index-based cursor over an owned token buffer.
//!
//! This pipeline always works from a fully materialized token vector
//! (macro bodies, directive argument lists, and conditional expressions are
//! all finite, already-lexed slices), so a plain cursor over `&[Token]` is
//! enough — no trait-object plumbing for an incremental or nested source.

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.tokens.len());
    }

    pub fn at_eof(&self) -> bool {
        self.peek_raw().map(|t| t.kind) == Some(TokenKind::Eof) || self.position >= self.tokens.len()
    }

    /// Peeks the next token, including trivia (whitespace/comments).
    pub fn peek_raw(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the next token, including trivia.
    pub fn next_raw(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Peeks the next significant (non-trivia) token.
    pub fn peek(&self) -> Option<&'a Token> {
        let mut i = self.position;
        while let Some(token) = self.tokens.get(i) {
            if token.is_significant() {
                return Some(token);
            }
            i += 1;
        }
        None
    }

    /// Consumes and returns the next significant token, skipping any
    /// whitespace/comments/newlines along the way.
    pub fn next(&mut self) -> Option<&'a Token> {
        while let Some(token) = self.tokens.get(self.position) {
            self.position += 1;
            if token.is_significant() {
                return Some(token);
            }
        }
        None
    }

    /// Returns the remaining tokens, including trivia, from the current
    /// position to the end of the buffer.
    pub fn remaining(&self) -> &'a [Token] {
        &self.tokens[self.position.min(self.tokens.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::LSL;
    use crate::lexer::Lexer;

    #[test]
    fn skips_trivia_on_significant_walk() {
        let mut diagnostics = Vec::new();
        let tokens = Lexer::new("a   b", &LSL, "t.lsl").lex(&mut diagnostics);
        let mut cursor = TokenCursor::new(&tokens);
        assert_eq!(cursor.next().unwrap().text, "a");
        assert_eq!(cursor.next().unwrap().text, "b");
        assert_eq!(cursor.next().unwrap().kind, TokenKind::Eof);
    }
}
