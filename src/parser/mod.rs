//! The composable parser framework: a tagged variant of parser kinds, each
//! exposing the same `{decode_text, decode_binary}` capability pair.
//!
//! This is the re-expression called for by `SPEC_FULL.md` §9: dynamic parser
//! composition becomes a closed enum instead of dynamic dispatch, and
//! sharing a parser across many [`crate::registry::CommandEntry`] values is
//! plain `Arc` sharing (read-only, no cycles).

pub mod list;
pub mod pair;
pub mod primitive;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ident::IdentifierTable;
use crate::value::{IntWidth, Value};

pub use list::ListParser;
pub use pair::PairParser;

/// Shared, immutable handle to a [`Parser`]. Parsers are built once at
/// startup and never mutated, so sharing one across many command entries
/// needs no interior mutability.
pub type ParserRef = Arc<Parser>;

/// One kind of value parser/encoder. Every variant understands both text and
/// binary forms of the values it produces.
#[derive(Debug, Clone)]
pub enum Parser {
    Integer {
        width: IntWidth,
        signed: bool,
        separator: char,
    },
    Float32 {
        units: Option<String>,
        separator: char,
    },
    Str {
        separator: char,
    },
    Identifier {
        table: Arc<IdentifierTable>,
        separator: char,
    },
    List(ListParser),
    Pair(PairParser),
}

impl Parser {
    pub fn integer(width: IntWidth, signed: bool, separator: char) -> ParserRef {
        Arc::new(Parser::Integer {
            width,
            signed,
            separator,
        })
    }

    pub fn float32(units: Option<String>, separator: char) -> ParserRef {
        Arc::new(Parser::Float32 { units, separator })
    }

    pub fn string(separator: char) -> ParserRef {
        Arc::new(Parser::Str { separator })
    }

    pub fn identifier(table: Arc<IdentifierTable>, separator: char) -> ParserRef {
        Arc::new(Parser::Identifier { table, separator })
    }

    pub fn list(inner: ParserRef, max_length: Option<usize>, separator: &'static str) -> ParserRef {
        Arc::new(Parser::List(ListParser::new(inner, max_length, separator)))
    }

    pub fn pair(first: ParserRef, default_second: Option<ParserRef>) -> PairParser {
        PairParser::new(first, default_second)
    }

    /// The backing [`IdentifierTable`], if this parser is an
    /// [`Parser::Identifier`]. Used by the script façade to enumerate
    /// configuration parameter labels without reaching into registry
    /// internals (`SPEC_FULL.md` §9).
    pub fn as_identifier_table(&self) -> Option<&Arc<IdentifierTable>> {
        match self {
            Parser::Identifier { table, .. } => Some(table),
            _ => None,
        }
    }

    /// The token separator this parser expects to follow its own value in
    /// text form. A [`PairParser`] uses its `first` parser's separator as
    /// the separator between the rendered discriminant and its payload, so
    /// that e.g. a `=`-separated pair like `valve_id=open` renders back the
    /// same way it was parsed instead of always joining with a space.
    pub fn separator_str(&self) -> &'static str {
        match self {
            Parser::Integer { separator, .. }
            | Parser::Float32 { separator, .. }
            | Parser::Str { separator }
            | Parser::Identifier { separator, .. } => match separator {
                '=' => "=",
                _ => " ",
            },
            Parser::List(list) => list.separator,
            Parser::Pair(pair) => pair.first.separator_str(),
        }
    }

    /// Decode one value from the start of `input`, returning the remainder.
    pub fn decode_text<'a>(&self, input: &'a str) -> Result<(&'a str, Value)> {
        match self {
            Parser::Integer {
                width,
                signed,
                separator,
            } => {
                let (token, rest) = primitive::split_at_separator(input, *separator);
                let value = primitive::parse_integer_token(token, *width, *signed)?;
                Ok((rest, Value::new_integer(*width, *signed, value)?))
            }
            Parser::Float32 { units, separator } => {
                let (token, rest) = primitive::split_at_separator(input, *separator);
                let value = primitive::parse_float_token(token)?;
                Ok((
                    rest,
                    Value::Float32 {
                        value,
                        units: units.clone(),
                    },
                ))
            }
            Parser::Str { separator } => {
                let (rest, bytes) = primitive::parse_quoted_string(input)?;
                let rest = rest.strip_prefix(*separator).unwrap_or(rest);
                Ok((rest, Value::String(bytes)))
            }
            Parser::Identifier { table, separator } => table.decode_text(input, *separator),
            Parser::List(list) => list.decode_text(input),
            Parser::Pair(pair) => pair.decode_text(input),
        }
    }

    /// Decode one value from the start of `input`, returning the remainder.
    pub fn decode_binary<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Value)> {
        match self {
            Parser::Integer { width, signed, .. } => {
                let (rest, value) = primitive::decode_integer_binary(input, *width, *signed)?;
                Ok((rest, Value::new_integer(*width, *signed, value)?))
            }
            Parser::Float32 { units, .. } => {
                let (rest, value) = primitive::decode_float_binary(input)?;
                Ok((
                    rest,
                    Value::Float32 {
                        value,
                        units: units.clone(),
                    },
                ))
            }
            Parser::Str { .. } => {
                let terminator = input
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or_else(|| Error::Parse("string is missing a null terminator".to_string()))?;
                let (body, rest) = input.split_at(terminator);
                Ok((&rest[1..], Value::String(body.to_vec())))
            }
            Parser::Identifier { table, .. } => table.decode_binary(input),
            Parser::List(list) => list.decode_binary(input),
            Parser::Pair(pair) => pair.decode_binary(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdentifierTable;

    #[test]
    fn integer_text_round_trip() {
        let p = Parser::integer(IntWidth::W16, true, ' ');
        let (rest, value) = p.decode_text("-1234 tail").unwrap();
        assert_eq!(rest, "tail");
        assert_eq!(value.render_text(), "-1234");
    }

    #[test]
    fn integer_binary_round_trip() {
        let p = Parser::integer(IntWidth::W32, false, ' ');
        let mut out = Vec::new();
        let value = Value::new_integer(IntWidth::W32, false, 42).unwrap();
        value.render_binary(&mut out);
        let (rest, decoded) = p.decode_binary(&out).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, value);
    }

    #[test]
    fn string_binary_stops_at_null() {
        let p = Parser::string(' ');
        let (rest, value) = p.decode_binary(b"hi\0trailer").unwrap();
        assert_eq!(rest, b"trailer");
        assert_eq!(value, Value::String(b"hi".to_vec()));
    }

    #[test]
    fn list_repeats_until_input_exhausted() {
        let inner = Parser::integer(IntWidth::W8, false, ' ');
        let list = Parser::list(inner, None, " ");
        let (rest, value) = list.decode_text("1 2 3").unwrap();
        assert!(rest.is_empty());
        assert_eq!(value.render_text(), "1 2 3");
    }

    #[test]
    fn pair_falls_back_to_empty_when_second_parser_absent() {
        let mut table = IdentifierTable::new();
        table.add(4, "ping", &[]).unwrap();
        let first = Parser::identifier(Arc::new(table), ' ');
        let pair = Parser::pair(first, None);
        let (rest, value) = pair.decode_text("ping").unwrap();
        assert!(rest.is_empty());
        assert_eq!(value.as_list().unwrap().len(), 1);
    }

    #[test]
    fn pair_rejects_unknown_code_with_payload() {
        let mut table = IdentifierTable::new();
        table.add(4, "ping", &[]).unwrap();
        let first = Parser::identifier(Arc::new(table), ' ');
        let pair = Parser::pair(first, None);
        assert!(pair.decode_text("ping extra").is_err());
    }
}
