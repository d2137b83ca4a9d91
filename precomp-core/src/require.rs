//! Require-table synthesis for Luau `require()` (§3 "Require state", §4.5
//! "Require handling").

use std::collections::HashMap;

use precomp_lexer::{Token, TokenKind};

#[derive(Debug, Clone, Default)]
pub struct RequireState {
    path_to_module_id: HashMap<String, u32>,
    /// Wrapped module bodies in first-seen order, keyed by id.
    modules: Vec<(u32, Vec<Token>)>,
    next_module_id: u32,
}

impl RequireState {
    pub fn new() -> Self {
        Self {
            path_to_module_id: HashMap::new(),
            modules: Vec::new(),
            next_module_id: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module_id_for(&self, resolved_path: &str) -> Option<u32> {
        self.path_to_module_id.get(resolved_path).copied()
    }

    /// Registers `resolved_path`'s parsed body, wrapping it in a
    /// zero-argument function literal. Returns the module id, reusing a
    /// previously assigned one if this path was already required.
    pub fn register(&mut self, resolved_path: String, body_tokens: Vec<Token>) -> u32 {
        if let Some(&id) = self.path_to_module_id.get(&resolved_path) {
            return id;
        }
        let id = self.next_module_id;
        self.next_module_id += 1;
        self.path_to_module_id.insert(resolved_path, id);
        self.modules.push((id, wrap_as_module(&body_tokens)));
        id
    }

    pub fn modules(&self) -> &[(u32, Vec<Token>)] {
        &self.modules
    }
}

fn synth(kind: TokenKind, text: &str) -> Token {
    Token::new(kind, text, 0, 1)
}

/// Wraps a required file's tokens in `(function() ... end)` so its body
/// executes exactly once, on first invocation through the require table.
fn wrap_as_module(body: &[Token]) -> Vec<Token> {
    let mut wrapped = vec![
        synth(TokenKind::ParenOpen, "("),
        synth(TokenKind::Identifier, "function"),
        synth(TokenKind::ParenOpen, "("),
        synth(TokenKind::ParenClose, ")"),
        synth(TokenKind::Newline, "\n"),
    ];
    wrapped.extend(body.iter().cloned());
    wrapped.push(synth(TokenKind::Newline, "\n"));
    wrapped.push(synth(TokenKind::Identifier, "end"));
    wrapped.push(synth(TokenKind::ParenClose, ")"));
    wrapped
}

/// Builds the `__require_table` invocation emitted at each `require(...)`
/// call site (§4.5 step 3).
pub fn invocation_tokens(module_id: u32, line: u32, column: u32) -> Vec<Token> {
    vec![
        Token::new(TokenKind::Identifier, "__require_table", line, column),
        Token::new(TokenKind::BracketOpen, "[", line, column),
        Token::new(TokenKind::Number, module_id.to_string(), line, column),
        Token::new(TokenKind::BracketClose, "]", line, column),
        Token::new(TokenKind::ParenOpen, "(", line, column),
        Token::new(TokenKind::ParenClose, ")", line, column),
    ]
}

/// Builds the synthesized table declaration prepended to the output once
/// the whole document has been parsed, and the `nil` reset appended after
/// it (§4.5: "prepend a synthesized table declaration ... append
/// `__require_table = nil :: any`").
pub fn synthesize_table_prelude(state: &RequireState) -> Vec<Token> {
    let mut tokens = vec![
        synth(TokenKind::Identifier, "local"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Identifier, "__require_table"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Operator, ":"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::BraceOpen, "{"),
        synth(TokenKind::BracketOpen, "["),
        synth(TokenKind::Identifier, "number"),
        synth(TokenKind::BracketClose, "]"),
        synth(TokenKind::Operator, "-"),
        synth(TokenKind::Operator, ">"),
        synth(TokenKind::Identifier, "any"),
        synth(TokenKind::BraceClose, "}"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Operator, "="),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::BraceOpen, "{"),
        synth(TokenKind::BraceClose, "}"),
        synth(TokenKind::Newline, "\n"),
    ];
    for (id, wrapped) in state.modules() {
        tokens.push(synth(TokenKind::Identifier, "__require_table"));
        tokens.push(synth(TokenKind::BracketOpen, "["));
        tokens.push(synth(TokenKind::Number, &id.to_string()));
        tokens.push(synth(TokenKind::BracketClose, "]"));
        tokens.push(synth(TokenKind::Whitespace, " "));
        tokens.push(synth(TokenKind::Operator, "="));
        tokens.push(synth(TokenKind::Whitespace, " "));
        tokens.extend(wrapped.iter().cloned());
        tokens.push(synth(TokenKind::Newline, "\n"));
    }
    tokens
}

pub fn synthesize_table_epilogue() -> Vec<Token> {
    vec![
        synth(TokenKind::Identifier, "__require_table"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Operator, "="),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Identifier, "nil"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Operator, ":"),
        synth(TokenKind::Operator, ":"),
        synth(TokenKind::Whitespace, " "),
        synth(TokenKind::Identifier, "any"),
        synth(TokenKind::Newline, "\n"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requiring_the_same_path_twice_reuses_the_id() {
        let mut state = RequireState::new();
        let first = state.register("d.luau".to_string(), vec![]);
        let second = state.register("d.luau".to_string(), vec![]);
        assert_eq!(first, second);
        assert_eq!(state.modules().len(), 1);
    }

    #[test]
    fn ids_are_assigned_in_first_seen_order() {
        let mut state = RequireState::new();
        let b = state.register("b.luau".to_string(), vec![]);
        let d = state.register("d.luau".to_string(), vec![]);
        assert_eq!(b, 1);
        assert_eq!(d, 2);
    }
}
