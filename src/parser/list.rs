//! Repeated-inner-parser decoding: [`ListParser`].

use crate::error::{Error, Result};
use crate::value::Value;

use super::ParserRef;

/// Repeats an inner parser until input is exhausted or `max_length` values
/// have been produced.
#[derive(Debug, Clone)]
pub struct ListParser {
    pub inner: ParserRef,
    pub max_length: Option<usize>,
    pub separator: &'static str,
}

impl ListParser {
    pub fn new(inner: ParserRef, max_length: Option<usize>, separator: &'static str) -> Self {
        Self {
            inner,
            max_length,
            separator,
        }
    }

    pub fn decode_text<'a>(&self, input: &'a str) -> Result<(&'a str, Value)> {
        let mut items = Vec::new();
        let mut rest = input;
        loop {
            let trimmed = rest.trim_start_matches(self.separator);
            if trimmed.is_empty() {
                rest = trimmed;
                break;
            }
            if let Some(max) = self.max_length {
                if items.len() >= max {
                    rest = trimmed;
                    break;
                }
            }
            let (next, value) = self.inner.decode_text(trimmed)?;
            items.push(value);
            rest = next;
        }
        Ok((
            rest,
            Value::List {
                items,
                separator: self.separator,
            },
        ))
    }

    pub fn decode_binary<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Value)> {
        let mut items = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            if let Some(max) = self.max_length {
                if items.len() >= max {
                    break;
                }
            }
            let (next, value) = self.inner.decode_binary(rest).map_err(|_| {
                Error::Parse(format!(
                    "list body of {} bytes does not divide evenly by its inner parser",
                    rest.len()
                ))
            })?;
            items.push(value);
            rest = next;
        }
        Ok((
            rest,
            Value::List {
                items,
                separator: self.separator,
            },
        ))
    }
}
