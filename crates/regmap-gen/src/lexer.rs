//! Tokenizer for C-style register declarations.
//!
//! Only the shapes the parser cares about get their own token kinds.
//! Everything else in the surrounding header (operators, string literals,
//! stray punctuation) is still tokenized so that it can be skipped, never
//! rejected. Preprocessor directive lines are dropped whole, comments are
//! dropped, and line-continuation backslashes count as whitespace.

use thiserror::Error;

use crate::source::SourceLine;

/// Position of a token in the original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

/// Token classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident(String),
    /// Integer literal as written, including any suffix.
    Number(String),
    /// One of `( ) { } [ ] , ; :`.
    Punct(char),
    /// String or character literal; contents are irrelevant.
    Literal,
    /// Any other character.
    Other(char),
}

/// A token with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Where the token starts.
    pub location: SourceLocation,
}

/// Tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unterminated block comment")]
pub struct LexError {
    /// Where the comment was opened.
    pub location: SourceLocation,
}

const PUNCTUATION: &[char] = &['(', ')', '{', '}', '[', ']', ',', ';', ':'];

/// Tokenizes extracted source lines.
///
/// # Errors
///
/// Returns `LexError` when a `/*` comment is never closed.
pub fn tokenize(lines: &[SourceLine]) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut open_comment: Option<SourceLocation> = None;

    for line in lines {
        let chars: Vec<char> = line.text.chars().collect();
        let mut i = 0;

        if open_comment.is_none() && line.text.trim_start().starts_with('#') {
            continue;
        }

        while i < chars.len() {
            let location = SourceLocation {
                line: line.original_line,
                column: i + 1,
            };

            if open_comment.is_some() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    open_comment = None;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            let c = chars[i];
            match c {
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '/' if chars.get(i + 1) == Some(&'*') => {
                    open_comment = Some(location);
                    i += 2;
                }
                '"' | '\'' => {
                    i = skip_literal(&chars, i);
                    tokens.push(Token {
                        kind: TokenKind::Literal,
                        location,
                    });
                }
                c if c.is_whitespace() || c == '\\' => i += 1,
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let end = scan_word(&chars, i);
                    tokens.push(Token {
                        kind: TokenKind::Ident(chars[i..end].iter().collect()),
                        location,
                    });
                    i = end;
                }
                c if c.is_ascii_digit() => {
                    let end = scan_word(&chars, i);
                    tokens.push(Token {
                        kind: TokenKind::Number(chars[i..end].iter().collect()),
                        location,
                    });
                    i = end;
                }
                c => {
                    let kind = if PUNCTUATION.contains(&c) {
                        TokenKind::Punct(c)
                    } else {
                        TokenKind::Other(c)
                    };
                    tokens.push(Token { kind, location });
                    i += 1;
                }
            }
        }
    }

    match open_comment {
        Some(location) => Err(LexError { location }),
        None => Ok(tokens),
    }
}

fn scan_word(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(chars.len(), |offset| start + offset)
}

/// Returns the index just past a quoted literal, or the end of the line
/// when the literal is unterminated.
fn skip_literal(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Parses an integer literal in decimal or `0x` hexadecimal, ignoring C
/// integer suffixes (`u`, `l`).
#[must_use]
pub fn parse_integer(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(&['u', 'U', 'l', 'L'][..]);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<SourceLine> {
        text.lines()
            .enumerate()
            .map(|(i, t)| SourceLine {
                text: t.to_string(),
                original_line: i + 1,
            })
            .collect()
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(&lines(text))
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn field_declaration() {
        assert_eq!(
            kinds("uint8_t mode : 3;"),
            vec![
                TokenKind::Ident("uint8_t".into()),
                TokenKind::Ident("mode".into()),
                TokenKind::Punct(':'),
                TokenKind::Number("3".into()),
                TokenKind::Punct(';'),
            ]
        );
    }

    #[test]
    fn comments_and_directives_are_skipped() {
        let text = "#pragma once\n/* multi\n line */ a // trailing\n  # define X 1\nb";
        assert_eq!(
            kinds(text),
            vec![TokenKind::Ident("a".into()), TokenKind::Ident("b".into())]
        );
    }

    #[test]
    fn continuation_backslash_is_whitespace() {
        assert_eq!(
            kinds("m(struct T, N, RO) \\"),
            vec![
                TokenKind::Ident("m".into()),
                TokenKind::Punct('('),
                TokenKind::Ident("struct".into()),
                TokenKind::Ident("T".into()),
                TokenKind::Punct(','),
                TokenKind::Ident("N".into()),
                TokenKind::Punct(','),
                TokenKind::Ident("RO".into()),
                TokenKind::Punct(')'),
            ]
        );
    }

    #[test]
    fn literals_and_operators_are_kept_opaque() {
        assert_eq!(
            kinds(r#"x = "a;b\"c" * 2;"#),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Other('='),
                TokenKind::Literal,
                TokenKind::Other('*'),
                TokenKind::Number("2".into()),
                TokenKind::Punct(';'),
            ]
        );
    }

    #[test]
    fn locations_are_one_indexed() {
        let tokens = tokenize(&lines("\n  abc")).unwrap();
        assert_eq!(tokens[0].location, SourceLocation { line: 2, column: 3 });
    }

    #[test]
    fn unterminated_comment() {
        let err = tokenize(&lines("a /* never\nclosed")).unwrap_err();
        assert_eq!(err.location, SourceLocation { line: 1, column: 3 });
    }

    #[test]
    fn integer_literals() {
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("8u"), Some(8));
        assert_eq!(parse_integer("0b1"), None);
    }
}
