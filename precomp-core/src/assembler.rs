//! Output assembly (§4.6): token stream → string, plus the processed-line
//! → original-location mapping table, and a standalone reverse-parser for
//! `@line` markers embedded in arbitrary preprocessed text.

use precomp_lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMapping {
    pub processed_line: u32,
    pub original_line: u32,
    pub source_file: String,
}

/// Concatenates every token's text in order; no normalization (§4.6 "Emit").
pub fn emit(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Walks the output tokens, tracking `@line` markers, to build the
/// processed-line → (source file, source line) table (§4.6 "Mapping").
pub fn build_line_mappings(tokens: &[Token], main_source_file: &str) -> Vec<LineMapping> {
    let mut mappings = Vec::new();
    let mut processed_line: u32 = 1;
    let mut current_file = main_source_file.to_string();
    let mut current_line: u32 = 1;

    for token in tokens {
        if token.kind == TokenKind::LineComment {
            if let Some((line, uri)) = parse_line_marker(&token.text) {
                current_line = line;
                current_file = uri;
                continue;
            }
        }
        if token.kind == TokenKind::Newline {
            mappings.push(LineMapping {
                processed_line,
                original_line: current_line,
                source_file: current_file.clone(),
            });
            processed_line += 1;
            current_line += 1;
        }
    }
    mappings
}

/// Parses a single `@line` marker out of a line-comment's text, e.g.
/// `// @line 12 "foo.lsl"` or `-- @line 12 "foo.lsl"`. Returns `None` for
/// ordinary comments.
fn parse_line_marker(comment_text: &str) -> Option<(u32, String)> {
    let at_pos = comment_text.find("@line")?;
    let rest = comment_text[at_pos + "@line".len()..].trim_start();
    let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let line: u32 = rest[..digits_end].parse().ok()?;
    let rest = rest[digits_end..].trim_start();
    let rest = rest.strip_prefix('"')?;
    let end_quote = rest.find('"')?;
    Some((line, rest[..end_quote].to_string()))
}

/// Scans arbitrary preprocessed text (not a token stream — just a string)
/// for `@line` markers, returning `(text_line_number, original_line, uri)`
/// for each one found. The reverse operation for tools that only have the
/// output string, not the token stream that produced it (§4.6).
pub fn parse_line_markers_from_text(text: &str) -> Vec<(u32, u32, String)> {
    let mut found = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if let Some((original_line, uri)) = parse_line_marker(line) {
            found.push((index as u32 + 1, original_line, uri));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use precomp_lexer::{Lexer, LSL};

    #[test]
    fn emit_reconstructs_token_text_byte_exact() {
        let mut diagnostics = Vec::new();
        let tokens = Lexer::new("integer x = 1;", &LSL, "t.lsl").lex(&mut diagnostics);
        assert_eq!(emit(&tokens), "integer x = 1;");
    }

    #[test]
    fn line_marker_round_trips() {
        let comment = "// @line 7 \"foo/bar.lsl\"";
        assert_eq!(parse_line_marker(comment), Some((7, "foo/bar.lsl".to_string())));
    }

    #[test]
    fn mapping_tracks_file_switches() {
        let tokens = vec![
            Token::new(TokenKind::Identifier, "a", 1, 1),
            Token::new(TokenKind::Newline, "\n", 1, 2),
            Token::new(TokenKind::LineComment, "// @line 1 \"inc.lsl\"", 2, 1),
            Token::new(TokenKind::Newline, "\n", 2, 1),
            Token::new(TokenKind::Identifier, "b", 3, 1),
            Token::new(TokenKind::Newline, "\n", 3, 2),
        ];
        let mappings = build_line_mappings(&tokens, "main.lsl");
        assert_eq!(mappings[0].source_file, "main.lsl");
        assert_eq!(mappings[1].source_file, "inc.lsl");
        assert_eq!(mappings[1].original_line, 1);
    }

    #[test]
    fn reverse_parser_finds_markers_in_plain_text() {
        let text = "x = 1\n// @line 5 \"a.lsl\"\ny = 2\n";
        let markers = parse_line_markers_from_text(text);
        assert_eq!(markers, vec![(2, 5, "a.lsl".to_string())]);
    }
}
