//! Per-dialect lexical configuration (§3 "Dialect config", §4.1).
//!
//! Each dialect is an immutable static record; there is no per-instance
//! mutable state here, so the two supported dialects are exposed as
//! `const fn`-constructed statics rather than something a caller builds up
//! by hand.

/// The two scripting dialects this preprocessor understands (§1, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Lsl,
    Luau,
}

impl Dialect {
    pub fn config(self) -> &'static DialectConfig {
        match self {
            Dialect::Lsl => &LSL,
            Dialect::Luau => &LUAU,
        }
    }

    /// File extensions searched when resolving `#include`/`require` targets
    /// (§4.4 step 2).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Dialect::Lsl => &["lsl"],
            Dialect::Luau => &["luau", "lua"],
        }
    }
}

/// An operator or punctuation spelling, longest-match-first within its
/// length bucket (§4.1 "Operators and brackets").
#[derive(Debug, Clone, Copy)]
pub struct OperatorSpelling {
    pub text: &'static str,
}

/// Immutable per-dialect lexical/operator configuration (§3).
#[derive(Debug, Clone, Copy)]
pub struct DialectConfig {
    pub name: &'static str,
    pub line_comment_prefix: &'static str,
    pub block_comment_start: &'static str,
    pub block_comment_end: &'static str,
    /// Whether the dialect additionally supports Lua-style long brackets
    /// for comments and strings, e.g. `--[=*[ ... ]=*]`.
    pub use_long_bracket: bool,
    pub supports_vector_literals: bool,
    /// `Some('#')` for C-style directive dialects; `None` for dialects that
    /// spell directives as bare keywords (`require`).
    pub directive_prefix: Option<char>,
    /// Identifiers that are directives even without a prefix character.
    pub directive_keywords: &'static [&'static str],
    /// Three-, then two-, then one-character operator spellings, searched
    /// longest-first.
    pub operators_three_char: &'static [&'static str],
    pub operators_two_char: &'static [&'static str],
    pub operators_one_char: &'static [char],
    pub string_delimiters: &'static [char],
    pub logical_and: &'static str,
    pub logical_or: &'static str,
    pub logical_not: &'static str,
}

pub static LSL: DialectConfig = DialectConfig {
    name: "lsl",
    line_comment_prefix: "//",
    block_comment_start: "/*",
    block_comment_end: "*/",
    use_long_bracket: false,
    supports_vector_literals: true,
    directive_prefix: Some('#'),
    directive_keywords: &[],
    operators_three_char: &[">>="],
    operators_two_char: &[
        "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "+=", "-=", "*=", "/=", "%=", "++", "--",
    ],
    operators_one_char: &[
        '+', '-', '*', '/', '%', '=', '<', '>', '!', '&', '|', '^', '~', '.', ',', ';', ':', '?',
    ],
    string_delimiters: &['"'],
    logical_and: "&&",
    logical_or: "||",
    logical_not: "!",
};

pub static LUAU: DialectConfig = DialectConfig {
    name: "luau",
    line_comment_prefix: "--",
    // NOTE: for long-bracket dialects this is only the prefix + the first
    // opening bracket; the lexer reads the `=`* run and the matching `[`
    // itself (the literal delimiter varies with the equals count).
    block_comment_start: "--[",
    block_comment_end: "]]",
    use_long_bracket: true,
    supports_vector_literals: false,
    directive_prefix: None,
    directive_keywords: &["require"],
    operators_three_char: &["..."],
    operators_two_char: &[
        "==", "~=", "<=", ">=", "..", "::", "//",
    ],
    operators_one_char: &[
        '+', '-', '*', '/', '%', '^', '#', '=', '<', '>', '.', ',', ';', ':',
    ],
    string_delimiters: &['"', '\''],
    logical_and: "and",
    logical_or: "or",
    logical_not: "not",
};
