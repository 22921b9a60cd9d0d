//! Text/binary tokenizing helpers for the primitive value kinds.
//!
//! These are pure functions over `&str`/`&[u8]`, grounded in the tokenizing
//! style of a `nom`-based grammar: small combinators, `nom::IResult` as the
//! intermediate type, mapped to this crate's [`crate::error::Error`] at the
//! boundary of each public function.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char as nom_char, digit1, hex_digit1},
    combinator::{map, opt, recognize},
    number::complete::{le_f32, le_i16, le_i32, le_i64, le_i8, le_u16, le_u32, le_u64, le_u8},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::value::{IntWidth, Value};

/// Split `input` at the first occurrence of `sep`, or at the end of the
/// string if `sep` does not occur.
pub fn split_at_separator(input: &str, sep: char) -> (&str, &str) {
    match input.find(sep) {
        Some(idx) => (&input[..idx], &input[idx + sep.len_utf8()..]),
        None => (input, ""),
    }
}

fn decimal_or_hex(input: &str) -> IResult<&str, (bool, &str)> {
    alt((
        map(preceded(tag("0x"), hex_digit1), |d| (true, d)),
        map(preceded(tag("0X"), hex_digit1), |d| (true, d)),
        map(recognize(tuple((opt(nom_char('-')), digit1))), |d| {
            (false, d)
        }),
    ))(input)
}

/// Parse a decimal or `0x`-prefixed hex integer literal, wrapping hex values
/// into two's complement for signed widths the way the original tool does.
pub fn parse_integer_token(token: &str, width: IntWidth, signed: bool) -> Result<i64> {
    let (remainder, (is_hex, digits)) = decimal_or_hex(token)
        .map_err(|_| Error::Parse(format!("not a valid integer literal: {token:?}")))?;
    if !remainder.is_empty() {
        return Err(Error::Parse(format!(
            "not a valid integer literal: {token:?}"
        )));
    }

    if is_hex {
        let magnitude = u64::from_str_radix(digits, 16)
            .map_err(|_| Error::ParameterInvalid(format!("invalid hex literal: {token:?}")))?;
        let bits = width.bits();
        let modulus: u128 = 1u128 << bits;
        let wrapped = (magnitude as u128) % modulus;
        let value = if signed && wrapped >= modulus / 2 {
            (wrapped as i128 - modulus as i128) as i64
        } else {
            wrapped as i64
        };
        Ok(value)
    } else {
        digits
            .parse::<i64>()
            .map_err(|_| Error::ParameterInvalid(format!("invalid integer literal: {token:?}")))
    }
}

/// Decode `width.bytes()` little-endian bytes from `input` as an integer.
pub fn decode_integer_binary(
    input: &[u8],
    width: IntWidth,
    signed: bool,
) -> Result<(&[u8], i64)> {
    let result: IResult<&[u8], i64> = match (width, signed) {
        (IntWidth::W8, true) => map(le_i8, i64::from)(input),
        (IntWidth::W8, false) => map(le_u8, i64::from)(input),
        (IntWidth::W16, true) => map(le_i16, i64::from)(input),
        (IntWidth::W16, false) => map(le_u16, i64::from)(input),
        (IntWidth::W32, true) => map(le_i32, i64::from)(input),
        (IntWidth::W32, false) => map(le_u32, i64::from)(input),
        (IntWidth::W64, true) => map(le_i64, |v| v)(input),
        (IntWidth::W64, false) => map(le_u64, |v| v as i64)(input),
    };
    result.map_err(|_| Error::Parse("not enough bytes for integer".to_string()))
}

pub fn decode_float_binary(input: &[u8]) -> Result<(&[u8], f32)> {
    le_f32(input).map_err(|_| Error::Parse("not enough bytes for float32".to_string()))
}

/// Parse a float literal, accepting the conventional `inf`/`nan` spellings
/// in addition to ordinary decimal/scientific notation.
pub fn parse_float_token(token: &str) -> Result<f32> {
    token
        .parse::<f32>()
        .map_err(|_| Error::ParameterInvalid(format!("invalid float literal: {token:?}")))
}

/// Parse a single- or double-quoted text literal at the start of `input`,
/// returning the unescaped value and the remainder.
///
/// Builds the result directly as raw bytes rather than through a `String`
/// intermediate: a `\xNN` escape must be able to produce any single byte
/// 0x00-0xFF (per `SPEC_FULL.md` §9's decision to keep `Value::String` as
/// raw, possibly non-UTF-8, bytes), which a `char`-based escape transform
/// cannot express without re-encoding high bytes as multi-byte UTF-8.
pub fn parse_quoted_string(input: &str) -> Result<(&str, Vec<u8>)> {
    let quote = input
        .chars()
        .next()
        .filter(|&c| c == '"' || c == '\'')
        .ok_or_else(|| Error::Parse(format!("expected a quoted string: {input:?}")))?;

    let mut chars = input.char_indices().skip(1);
    let mut bytes = Vec::new();
    loop {
        let (idx, c) = chars
            .next()
            .ok_or_else(|| Error::Parse(format!("unterminated quoted string: {input:?}")))?;
        if c == quote {
            let end = idx + quote.len_utf8();
            return Ok((&input[end..], bytes));
        }
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let (_, escaped) = chars
            .next()
            .ok_or_else(|| Error::Parse(format!("unterminated escape in: {input:?}")))?;
        match escaped {
            '\\' => bytes.push(b'\\'),
            '"' => bytes.push(b'"'),
            '\'' => bytes.push(b'\''),
            'n' => bytes.push(b'\n'),
            't' => bytes.push(b'\t'),
            'r' => bytes.push(b'\r'),
            '0' => bytes.push(0),
            'x' => {
                let mut hex = String::with_capacity(2);
                for _ in 0..2 {
                    let (_, h) = chars.next().ok_or_else(|| {
                        Error::Parse(format!("incomplete \\x escape in: {input:?}"))
                    })?;
                    hex.push(h);
                }
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|_| Error::Parse(format!("invalid \\x escape: {hex:?}")))?;
                bytes.push(byte);
            }
            other => {
                return Err(Error::Parse(format!(
                    "unknown escape sequence \\{other} in: {input:?}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_round_trip() {
        assert_eq!(
            parse_integer_token("42", IntWidth::W8, false).unwrap(),
            42
        );
        assert_eq!(
            parse_integer_token("-5", IntWidth::W8, true).unwrap(),
            -5
        );
    }

    #[test]
    fn rejects_trailing_garbage_after_the_digits() {
        assert!(parse_integer_token("12abc", IntWidth::W8, false).is_err());
        assert!(parse_integer_token("0x1Gg", IntWidth::W8, false).is_err());
    }

    #[test]
    fn hex_wraps_into_twos_complement() {
        // 0xFF as a signed 8-bit integer wraps to -1.
        assert_eq!(
            parse_integer_token("0xFF", IntWidth::W8, true).unwrap(),
            -1
        );
        assert_eq!(
            parse_integer_token("0xFF", IntWidth::W8, false).unwrap(),
            255
        );
    }

    #[test]
    fn quoted_string_escapes() {
        let (rest, bytes) = parse_quoted_string(r#""a\"b" tail"#).unwrap();
        assert_eq!(bytes, b"a\"b");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn quoted_string_single_quotes_with_double_quote_inside() {
        let (rest, bytes) = parse_quoted_string(r#"'say "hi"'"#).unwrap();
        assert_eq!(bytes, br#"say "hi""#);
        assert_eq!(rest, "");
    }

    #[test]
    fn hex_escape_produces_a_single_raw_byte_above_ascii() {
        // \xFF must decode to the single raw byte 0xFF, not the two-byte
        // UTF-8 encoding of U+00FF, so that render/reparse round-trips.
        let (rest, bytes) = parse_quoted_string(r#""\xff""#).unwrap();
        assert_eq!(bytes, vec![0xffu8]);
        assert_eq!(rest, "");
    }

    #[test]
    fn non_ascii_byte_round_trips_through_render_and_reparse() {
        let value = Value::String(vec![0xff]);
        let text = value.render_text();
        assert_eq!(text, r#""\xff""#);
        let (rest, bytes) = parse_quoted_string(&text).unwrap();
        assert!(rest.is_empty());
        assert_eq!(bytes, vec![0xffu8]);
    }
}
