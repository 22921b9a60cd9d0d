//! Discriminant-dispatch decoding: [`PairParser`].
//!
//! The separator between discriminant and payload is owned by the `first`
//! parser (always an identifier table in practice, per `SPEC_FULL.md` §3):
//! it already knows where its own token ends, so `PairParser` carries no
//! separate separator configuration of its own.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::value::Value;

use super::ParserRef;

/// Reads a discriminant with `first`, then dispatches to a second parser
/// chosen by the discriminant's byte code.
#[derive(Debug, Clone)]
pub struct PairParser {
    pub first: ParserRef,
    pub default_second: Option<ParserRef>,
    by_code: BTreeMap<u8, Option<ParserRef>>,
}

impl PairParser {
    pub fn new(first: ParserRef, default_second: Option<ParserRef>) -> Self {
        Self {
            first,
            default_second,
            by_code: BTreeMap::new(),
        }
    }

    /// Register the second parser to use for `code` (or `None` if `code`
    /// takes no payload). Fails if `code` is already registered, mirroring
    /// the uniqueness invariant on command codes.
    pub fn add(&mut self, code: u8, second: Option<ParserRef>) -> Result<()> {
        if self.by_code.contains_key(&code) {
            return Err(Error::Initialization(format!(
                "code {code} already has a second parser registered"
            )));
        }
        self.by_code.insert(code, second);
        Ok(())
    }

    /// First-class lookup of the payload parser registered for `code`,
    /// replacing the internals-reaching that the original config-save logic
    /// relied on (`SPEC_FULL.md` §9).
    pub fn payload_parser_for(&self, code: u8) -> Option<&ParserRef> {
        match self.by_code.get(&code) {
            Some(explicit) => explicit.as_ref(),
            None => self.default_second.as_ref(),
        }
    }

    pub fn decode_text<'a>(&self, input: &'a str) -> Result<(&'a str, Value)> {
        let (rest, discriminant) = self.first.decode_text(input)?;
        let code = discriminant.as_i64().ok_or_else(|| {
            Error::Parse("pair discriminant did not decode to a byte".to_string())
        })? as u8;

        match self.payload_parser_for(code) {
            None => {
                if rest.is_empty() {
                    Ok((
                        rest,
                        Value::List {
                            items: vec![discriminant],
                            separator: self.first.separator_str(),
                        },
                    ))
                } else {
                    Err(Error::IdentifierUnknown(format!(
                        "code {code} takes no payload but text remains: {rest:?}"
                    )))
                }
            }
            Some(second) => {
                // The remainder is returned, not rejected: a pair used as a
                // `ListParser`'s inner parser (e.g. `telemetry_field()`) must
                // hand back whatever the second parser didn't consume so the
                // list can keep repeating. Consuming the whole input is a
                // top-level invariant, enforced once by `MessageParser`.
                let (rest, value) = second.decode_text(rest)?;
                Ok((
                    rest,
                    Value::List {
                        items: vec![discriminant, value],
                        separator: self.first.separator_str(),
                    },
                ))
            }
        }
    }

    pub fn decode_binary<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Value)> {
        let (rest, discriminant) = self.first.decode_binary(input)?;
        let code = discriminant.as_i64().ok_or_else(|| {
            Error::Parse("pair discriminant did not decode to a byte".to_string())
        })? as u8;

        match self.payload_parser_for(code) {
            None => {
                if rest.is_empty() {
                    Ok((
                        rest,
                        Value::List {
                            items: vec![discriminant],
                            separator: self.first.separator_str(),
                        },
                    ))
                } else {
                    Err(Error::IdentifierUnknown(format!(
                        "code {code} takes no payload but {} bytes remain",
                        rest.len()
                    )))
                }
            }
            Some(second) => {
                // See the matching comment in `decode_text`: the remainder
                // is returned, not rejected, so a pair nested inside a
                // `ListParser` can keep repeating over it.
                let (rest, value) = second.decode_binary(rest)?;
                Ok((
                    rest,
                    Value::List {
                        items: vec![discriminant, value],
                        separator: self.first.separator_str(),
                    },
                ))
            }
        }
    }
}
