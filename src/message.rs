//! The message layer: a [`Message`] pairs a message-type code with its typed
//! payload and a deadline; [`MessageParser`] is the `PairParser`
//! specialization described in `SPEC_FULL.md` §4.3 that recognizes the
//! reserved empty `ping` form.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::registry::{CommandRegistry, PING_NAME};
use crate::value::Value;

/// Deadline (seconds) used for commands with no registered deadline and for
/// the reserved `ping` pair, matching the original tool's `MINIMUM_DEADLINE`.
pub const MINIMUM_DEADLINE: f32 = 0.002;

/// A decoded or to-be-encoded protocol message: message-type code plus
/// optional payload, carrying the deadline its code is registered with.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub value: Value,
    pub deadline_seconds: f32,
}

impl Message {
    /// The message-type code, or `None` for the reserved empty `ping` form.
    pub fn code(&self) -> Option<u8> {
        match &self.value {
            Value::List { items, .. } => items.first().and_then(Value::as_i64).map(|c| c as u8),
            Value::Empty { .. } => None,
            _ => None,
        }
    }

    /// The payload value, if this message carries one.
    pub fn payload(&self) -> Option<&Value> {
        match &self.value {
            Value::List { items, .. } if items.len() > 1 => Some(&items[1]),
            _ => None,
        }
    }

    pub fn render_text(&self) -> String {
        self.value.render_text()
    }

    pub fn render_binary(&self) -> Vec<u8> {
        match &self.value {
            Value::Empty { .. } => Vec::new(),
            other => {
                let mut out = Vec::new();
                other.render_binary(&mut out);
                out
            }
        }
    }
}

/// A `PairParser` specialization: separator is always a single space, the
/// reserved empty form (`ping` ↔ empty body) is special-cased, and every
/// code carries a deadline compiled from the registry it was built from.
#[derive(Debug, Clone)]
pub struct MessageParser {
    pair: crate::parser::PairParser,
    deadlines: BTreeMap<u8, f32>,
}

impl MessageParser {
    pub fn from_registry(registry: &CommandRegistry) -> Result<Self> {
        let pair = registry.build_pair_parser(' ')?;
        let mut deadlines = BTreeMap::new();
        for entry in registry.entries() {
            deadlines.insert(entry.command_code, entry.deadline_seconds);
            deadlines.insert(entry.reply_code, entry.deadline_seconds);
        }
        Ok(Self { pair, deadlines })
    }

    fn deadline_for(&self, code: u8) -> f32 {
        self.deadlines.get(&code).copied().unwrap_or(MINIMUM_DEADLINE)
    }

    pub fn decode_text(&self, input: &str) -> Result<Message> {
        let trimmed = input.trim();
        if trimmed == PING_NAME {
            return Ok(Message {
                value: Value::Empty { label: PING_NAME },
                deadline_seconds: MINIMUM_DEADLINE,
            });
        }
        let (rest, value) = self.pair.decode_text(trimmed)?;
        if !rest.is_empty() {
            return Err(Error::Parse(format!("trailing text in message: {rest:?}")));
        }
        let code = value_code(&value)?;
        Ok(Message {
            value,
            deadline_seconds: self.deadline_for(code),
        })
    }

    pub fn decode_binary(&self, input: &[u8]) -> Result<Message> {
        if input.is_empty() {
            return Ok(Message {
                value: Value::Empty { label: PING_NAME },
                deadline_seconds: MINIMUM_DEADLINE,
            });
        }
        let (rest, value) = self.pair.decode_binary(input)?;
        if !rest.is_empty() {
            return Err(Error::Parse(format!(
                "{} trailing bytes in message",
                rest.len()
            )));
        }
        let code = value_code(&value)?;
        Ok(Message {
            value,
            deadline_seconds: self.deadline_for(code),
        })
    }
}

fn value_code(value: &Value) -> Result<u8> {
    match value {
        Value::List { items, .. } => items
            .first()
            .and_then(Value::as_i64)
            .map(|c| c as u8)
            .ok_or_else(|| Error::Parse("message has no discriminant code".to_string())),
        _ => Err(Error::Parse("message has no discriminant code".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::value::IntWidth;

    fn build_registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        let int_parser = Parser::integer(IntWidth::W8, false, ' ');
        reg.register(0x10, "igniter", 0.002, Some(int_parser.clone()), Some(int_parser))
            .unwrap();
        reg
    }

    #[test]
    fn ping_round_trips_to_empty_bytes() {
        let parser = MessageParser::from_registry(&build_registry()).unwrap();
        let message = parser.decode_text("ping").unwrap();
        assert_eq!(message.render_binary(), Vec::<u8>::new());
        assert_eq!(message.render_text(), "ping");

        let decoded = parser.decode_binary(&[]).unwrap();
        assert_eq!(decoded.render_text(), "ping");
    }

    #[test]
    fn ordinary_command_carries_its_registered_deadline() {
        let parser = MessageParser::from_registry(&build_registry()).unwrap();
        let message = parser.decode_text("igniter 1").unwrap();
        assert_eq!(message.deadline_seconds, 0.002);
        assert_eq!(message.code(), Some(0x10));
    }
}
