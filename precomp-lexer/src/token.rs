//! Token representation (§3).
//!
//! Tokens are immutable once created; [`Token::with_text`] and friends
//! produce a *new* token with a field overridden rather than mutating one
//! in place.

use std::fmt;

macro_rules! define_token_kinds {
    ($($name:ident),* $(,)?) => {
        /// The kind of a single lexical token.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenKind {
            $($name),*
        }

        impl TokenKind {
            pub const ALL: &'static [TokenKind] = &[$(TokenKind::$name),*];
        }
    };
}

define_token_kinds! {
    Whitespace,
    Newline,
    LineComment,
    BlockCommentStart,
    BlockCommentContent,
    BlockCommentEnd,
    Directive,
    Identifier,
    Number,
    StringLiteral,
    VectorLiteral,
    Operator,
    Punctuation,
    BraceOpen,
    BraceClose,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    Eof,
    Unknown,
}

impl TokenKind {
    /// Whether a token of this kind can start a new output line on its own
    /// (i.e. it is not whitespace/comment noise the assembler should skip
    /// over when deciding whether to emit an `@line` marker).
    pub fn is_trivial(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Newline
                | TokenKind::LineComment
                | TokenKind::BlockCommentStart
                | TokenKind::BlockCommentContent
                | TokenKind::BlockCommentEnd
        )
    }
}

/// A single lexical token. `text` is preserved exactly as it appeared in
/// the source, so concatenating every token's text reconstructs the input
/// byte-for-byte (§8 "Lossless lexing").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line the token starts on.
    pub line: u32,
    /// 1-based column the token starts on.
    pub column: u32,
    /// Length in bytes of `text`.
    pub length: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        let text = text.into();
        let length = text.len() as u32;
        Self {
            kind,
            text,
            line,
            column,
            length,
        }
    }

    pub fn eof(line: u32, column: u32) -> Self {
        Self::new(TokenKind::Eof, "", line, column)
    }

    /// Clones this token with its text replaced (used by macro
    /// substitution and token pasting, which must manufacture new tokens
    /// without losing the original's position).
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        let text = text.into();
        let length = text.len() as u32;
        Self {
            text,
            length,
            ..self.clone()
        }
    }

    pub fn with_kind(&self, kind: TokenKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    pub fn with_position(&self, line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            ..self.clone()
        }
    }

    pub fn is_significant(&self) -> bool {
        !self.kind.is_trivial()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?}) @ {}:{}", self.kind, self.text, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_text_overrides_only_text_and_length() {
        let original = Token::new(TokenKind::Identifier, "foo", 3, 7);
        let renamed = original.with_text("barbaz");
        assert_eq!(renamed.text, "barbaz");
        assert_eq!(renamed.length, 6);
        assert_eq!(renamed.line, 3);
        assert_eq!(renamed.column, 7);
        assert_eq!(renamed.kind, TokenKind::Identifier);
    }
}
