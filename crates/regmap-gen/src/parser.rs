//! Declaration parser.
//!
//! Turns the token stream of a register header into the region model. Two
//! top-level forms are recognised; every other token is skipped:
//!
//! ```text
//! m(struct REGMAP_ADC, ADC, RO)          region entry, in map order
//! m(uint16_t, RAW, RW)                   opaque region entry
//! __REGMAP_STRUCT REGMAP_ADC {           struct definition, any order
//!     uint16_t v_in;
//!     uint8_t ready : 1;
//! };
//! ```

use std::collections::HashMap;

use regmap_core::{Access, FieldDeclaration, FieldKind, Region, RegionKind};
use thiserror::Error;

use crate::lexer::{parse_integer, tokenize, SourceLocation, Token, TokenKind};
use crate::source::SourceContent;

/// Identifier that introduces a region entry.
pub const ENTRY_MACRO: &str = "m";
/// Identifier that introduces a struct definition.
pub const STRUCT_MACRO: &str = "__REGMAP_STRUCT";

/// A region together with where its parts were declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRegion {
    /// The region model handed to the allocator.
    pub region: Region,
    /// Location of the region entry.
    pub location: SourceLocation,
    /// Location of each field, indexed by declaration order.
    pub field_locations: Vec<SourceLocation>,
}

/// Every region found in one input, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSet {
    /// Parsed regions.
    pub regions: Vec<ParsedRegion>,
}

impl DeclarationSet {
    /// The bare region models, in order.
    #[must_use]
    pub fn to_regions(&self) -> Vec<Region> {
        self.regions.iter().map(|p| p.region.clone()).collect()
    }

    /// Location of field `order` of the region named `region`.
    #[must_use]
    pub fn field_location(&self, region: &str, order: usize) -> Option<SourceLocation> {
        self.regions
            .iter()
            .find(|p| p.region.name == region)
            .and_then(|p| p.field_locations.get(order).copied())
    }
}

/// Parse error with source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// Location of the error.
    pub location: SourceLocation,
    /// Kind of parse error.
    pub kind: ParseErrorKind,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A token other than the one required.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the parser needed.
        expected: &'static str,
        /// What it got.
        found: String,
    },
    /// Input ended inside a declaration.
    #[error("expected {expected}, found end of input")]
    UnexpectedEnd {
        /// What the parser needed.
        expected: &'static str,
    },
    /// A `/*` comment was never closed.
    #[error("unterminated block comment")]
    UnterminatedComment,
    /// A region entry names a struct that is never defined.
    #[error("struct '{0}' is not defined")]
    UndefinedStruct(String),
    /// The same struct tag is defined twice.
    #[error("struct '{0}' is defined more than once")]
    DuplicateStruct(String),
    /// The same region name appears in two entries.
    #[error("region '{0}' is declared more than once")]
    DuplicateRegion(String),
    /// Access qualifier is not one of `RO`, `RW`, `0`, `1`, `false`, `true`.
    #[error("invalid access qualifier '{0}'")]
    InvalidAccess(String),
    /// Bitfield width is not an integer that fits in a byte.
    #[error("invalid bitfield width '{0}'")]
    InvalidBitWidth(String),
    /// Struct or union nested inside a struct definition.
    #[error("nested aggregate declarations are not supported")]
    NestedAggregate,
}

/// Tokenizes and parses extracted source.
///
/// # Errors
///
/// Returns `ParseError` for unterminated comments, malformed entries or
/// struct bodies, and entries that reference undefined structs.
pub fn parse_source(source: &SourceContent) -> Result<DeclarationSet, ParseError> {
    let tokens = tokenize(&source.lines).map_err(|e| ParseError {
        location: e.location,
        kind: ParseErrorKind::UnterminatedComment,
    })?;
    parse_declarations(&tokens)
}

/// Parses a token stream into regions.
///
/// # Errors
///
/// See [`parse_source`].
pub fn parse_declarations(tokens: &[Token]) -> Result<DeclarationSet, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut entries = Vec::new();
    let mut structs: HashMap<String, StructDefinition> = HashMap::new();

    while let Some(token) = parser.peek() {
        match &token.kind {
            TokenKind::Ident(name)
                if name == ENTRY_MACRO
                    && matches!(parser.peek_kind(1), Some(TokenKind::Punct('('))) =>
            {
                let entry = parser.parse_entry()?;
                if entries.iter().any(|e: &Entry| e.name == entry.name) {
                    return Err(ParseError {
                        location: entry.location,
                        kind: ParseErrorKind::DuplicateRegion(entry.name),
                    });
                }
                entries.push(entry);
            }
            TokenKind::Ident(name) if name == STRUCT_MACRO => {
                let location = token.location;
                let definition = parser.parse_struct()?;
                if structs.contains_key(&definition.tag) {
                    return Err(ParseError {
                        location,
                        kind: ParseErrorKind::DuplicateStruct(definition.tag),
                    });
                }
                structs.insert(definition.tag.clone(), definition);
            }
            _ => parser.pos += 1,
        }
    }

    let regions = entries
        .into_iter()
        .map(|entry| resolve_entry(entry, &structs))
        .collect::<Result<_, _>>()?;
    Ok(DeclarationSet { regions })
}

struct Entry {
    struct_tag: Option<String>,
    name: String,
    access: Access,
    location: SourceLocation,
}

struct StructDefinition {
    tag: String,
    fields: Vec<(String, FieldKind, SourceLocation)>,
}

fn resolve_entry(
    entry: Entry,
    structs: &HashMap<String, StructDefinition>,
) -> Result<ParsedRegion, ParseError> {
    let Some(tag) = entry.struct_tag else {
        return Ok(ParsedRegion {
            region: Region::opaque(entry.name, entry.access),
            location: entry.location,
            field_locations: Vec::new(),
        });
    };
    let definition = structs.get(&tag).ok_or_else(|| ParseError {
        location: entry.location,
        kind: ParseErrorKind::UndefinedStruct(tag.clone()),
    })?;
    let fields = definition
        .fields
        .iter()
        .enumerate()
        .map(|(order, (name, kind, _))| FieldDeclaration::new(name.clone(), kind.clone(), order))
        .collect();
    Ok(ParsedRegion {
        region: Region {
            name: entry.name,
            kind: RegionKind::BitfieldStruct,
            access: entry.access,
            fields,
        },
        location: entry.location,
        field_locations: definition.fields.iter().map(|(_, _, loc)| *loc).collect(),
    })
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self, expected: &'static str) -> Result<&'a Token, ParseError> {
        let token = self.tokens.get(self.pos).ok_or_else(|| ParseError {
            location: self.end_location(),
            kind: ParseErrorKind::UnexpectedEnd { expected },
        })?;
        self.pos += 1;
        Ok(token)
    }

    fn end_location(&self) -> SourceLocation {
        self.tokens
            .last()
            .map_or(SourceLocation { line: 1, column: 1 }, |t| t.location)
    }

    fn expect_punct(&mut self, punct: char, expected: &'static str) -> Result<(), ParseError> {
        let token = self.advance(expected)?;
        if token.kind == TokenKind::Punct(punct) {
            Ok(())
        } else {
            Err(unexpected(token, expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        let token = self.advance(expected)?;
        match &token.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(unexpected(token, expected)),
        }
    }

    /// `m ( <type> , <NAME> , <ACCESS> )`
    fn parse_entry(&mut self) -> Result<Entry, ParseError> {
        let location = self.advance("region entry")?.location;
        self.expect_punct('(', "'('")?;

        let mut type_tokens = Vec::new();
        loop {
            let token = self.advance("','")?;
            match &token.kind {
                TokenKind::Punct(',') => break,
                TokenKind::Ident(word) => type_tokens.push(word.as_str()),
                _ => return Err(unexpected(token, "type name")),
            }
        }
        let struct_tag = match type_tokens.as_slice() {
            ["struct", tag] => Some((*tag).to_string()),
            [] => {
                return Err(ParseError {
                    location,
                    kind: ParseErrorKind::UnexpectedToken {
                        expected: "type name",
                        found: "','".into(),
                    },
                })
            }
            _ => None,
        };

        let name = self.expect_ident("region name")?.to_string();
        self.expect_punct(',', "','")?;
        let access_token = self.advance("access qualifier")?;
        let access = parse_access(access_token)?;
        self.expect_punct(')', "')'")?;

        Ok(Entry {
            struct_tag,
            name,
            access,
            location,
        })
    }

    /// `__REGMAP_STRUCT <tag> { <field>; ... } [;]`
    fn parse_struct(&mut self) -> Result<StructDefinition, ParseError> {
        self.advance("struct definition")?;
        let tag = self.expect_ident("struct tag")?.to_string();
        self.expect_punct('{', "'{'")?;

        let mut fields = Vec::new();
        let mut pending: Vec<&'a Token> = Vec::new();
        loop {
            let token = self.advance("'}'")?;
            match &token.kind {
                TokenKind::Punct('}') if pending.is_empty() => break,
                TokenKind::Punct('}') => return Err(unexpected(token, "';'")),
                TokenKind::Punct('{') => {
                    return Err(ParseError {
                        location: token.location,
                        kind: ParseErrorKind::NestedAggregate,
                    })
                }
                TokenKind::Punct(';') => {
                    if !pending.is_empty() {
                        fields.push(parse_field(&pending)?);
                        pending.clear();
                    }
                }
                _ => pending.push(token),
            }
        }
        if matches!(self.peek_kind(0), Some(TokenKind::Punct(';'))) {
            self.pos += 1;
        }

        Ok(StructDefinition { tag, fields })
    }
}

/// `<type tokens> <name> [: <width> | [<len>]]`
fn parse_field(tokens: &[&Token]) -> Result<(String, FieldKind, SourceLocation), ParseError> {
    let location = tokens[0].location;
    let (head, width, array_len) = match tokens {
        [head @ .., colon, width] if colon.kind == TokenKind::Punct(':') => {
            (head, Some(parse_width(width)?), None)
        }
        [head @ .., open, len, close]
            if open.kind == TokenKind::Punct('[') && close.kind == TokenKind::Punct(']') =>
        {
            (head, None, Some(token_text(len)))
        }
        _ => (tokens, None, None),
    };

    let Some((name_token, type_tokens)) = head.split_last() else {
        return Err(unexpected(tokens[0], "field name"));
    };
    let TokenKind::Ident(name) = &name_token.kind else {
        return Err(unexpected(name_token, "field name"));
    };
    if type_tokens.is_empty() {
        return Err(unexpected(name_token, "field type"));
    }
    let mut type_words = Vec::with_capacity(type_tokens.len());
    for token in type_tokens {
        match &token.kind {
            TokenKind::Ident(word) => type_words.push(word.as_str()),
            _ => return Err(unexpected(token, "field type")),
        }
    }
    let type_name = type_words.join(" ");

    let kind = match (width, array_len) {
        (Some(width), _) => FieldKind::Bit(width),
        (None, Some(len)) => FieldKind::Unresolved(format!("{type_name}[{len}]")),
        (None, None) if type_name.contains("int16_t") => FieldKind::Word,
        (None, None) if type_name.contains("int8_t") => FieldKind::Byte,
        (None, None) => FieldKind::Unresolved(type_name),
    };

    Ok((name.to_ascii_uppercase(), kind, location))
}

fn parse_width(token: &Token) -> Result<u8, ParseError> {
    let invalid = || ParseError {
        location: token.location,
        kind: ParseErrorKind::InvalidBitWidth(token_text(token)),
    };
    let TokenKind::Number(text) = &token.kind else {
        return Err(invalid());
    };
    parse_integer(text)
        .and_then(|value| u8::try_from(value).ok())
        .ok_or_else(invalid)
}

fn parse_access(token: &Token) -> Result<Access, ParseError> {
    let text = token_text(token);
    match text.as_str() {
        "RO" | "0" | "false" => Ok(Access::ReadOnly),
        "RW" | "1" | "true" => Ok(Access::ReadWrite),
        _ => Err(ParseError {
            location: token.location,
            kind: ParseErrorKind::InvalidAccess(text),
        }),
    }
}

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(text) | TokenKind::Number(text) => text.clone(),
        TokenKind::Punct(c) | TokenKind::Other(c) => c.to_string(),
        TokenKind::Literal => "literal".into(),
    }
}

fn unexpected(token: &Token, expected: &'static str) -> ParseError {
    ParseError {
        location: token.location,
        kind: ParseErrorKind::UnexpectedToken {
            expected,
            found: format!("'{}'", token_text(token)),
        },
    }
}
