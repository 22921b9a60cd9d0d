//! The command-set registry: binds numeric message types to their payload
//! parsers and deadlines, and compiles into the [`PairParser`] the message
//! layer dispatches through.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ident::IdentifierTable;
use crate::parser::{Parser, ParserRef, PairParser};

/// One command/reply pair known to the registry.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub command_code: u8,
    pub command_name: String,
    pub reply_code: u8,
    pub reply_name: String,
    pub request_parser: Option<ParserRef>,
    pub reply_parser: Option<ParserRef>,
    pub deadline_seconds: f32,
}

/// The reserved empty command/reply pair: `ping` with no payload.
pub const PING_NAME: &str = "ping";

/// Builds an immutable command catalog. Parsers and entries are constructed
/// once at startup and never mutated afterwards (`SPEC_FULL.md` §3
/// Lifecycles).
#[derive(Debug, Default, Clone)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. `reply_code` is `command_code + 1` and
    /// `reply_name` is `{name}_ack`, by convention.
    pub fn register(
        &mut self,
        command_code: u8,
        name: &str,
        deadline_seconds: f32,
        request_parser: Option<ParserRef>,
        reply_parser: Option<ParserRef>,
    ) -> Result<()> {
        let reply_code = command_code
            .checked_add(1)
            .ok_or_else(|| Error::Initialization(format!("command code {command_code} has no room for a reply code")))?;
        let reply_name = format!("{name}_ack");

        for existing in &self.entries {
            if existing.command_code == command_code || existing.reply_code == command_code {
                return Err(Error::Initialization(format!(
                    "command code {command_code} collides with an existing entry"
                )));
            }
            if existing.command_code == reply_code || existing.reply_code == reply_code {
                return Err(Error::Initialization(format!(
                    "reply code {reply_code} collides with an existing entry"
                )));
            }
            if existing.command_name == name || existing.reply_name == name {
                return Err(Error::Initialization(format!(
                    "name {name:?} is already registered"
                )));
            }
            if existing.command_name == reply_name || existing.reply_name == reply_name {
                return Err(Error::Initialization(format!(
                    "name {reply_name:?} is already registered"
                )));
            }
        }

        self.entries.push(CommandEntry {
            command_code,
            command_name: name.to_string(),
            reply_code,
            reply_name,
            request_parser,
            reply_parser,
            deadline_seconds,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn entry_by_command_code(&self, code: u8) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.command_code == code)
    }

    pub fn entry_by_reply_code(&self, code: u8) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.reply_code == code)
    }

    pub fn entry_by_name(&self, name: &str) -> Option<&CommandEntry> {
        self.entries
            .iter()
            .find(|e| e.command_name == name || e.reply_name == name)
    }

    /// Compile the registry into the identifier table keyed by code that the
    /// `MessageParser`'s first parser consumes: every command and reply code
    /// plus name/alias, including the reserved empty `ping` pair.
    pub fn identifier_table(&self) -> Result<IdentifierTable> {
        let mut table = IdentifierTable::new();
        for entry in &self.entries {
            table.add(entry.command_code, &entry.command_name, &[])?;
            table.add(entry.reply_code, &entry.reply_name, &[])?;
        }
        Ok(table)
    }

    /// Compile the registry into a [`PairParser`] indexed by both command
    /// and reply codes, with `separator` used by the discriminant identifier
    /// table (the `MessageParser` uses `' '`; intra-payload pairs use `=`).
    pub fn build_pair_parser(&self, separator: char) -> Result<PairParser> {
        let table = self.identifier_table()?;
        let first = Parser::identifier(Arc::new(table), separator);
        let mut pair = PairParser::new(first, None);
        for entry in &self.entries {
            pair.add(entry.command_code, entry.request_parser.clone())?;
            pair.add(entry.reply_code, entry.reply_parser.clone())?;
        }
        Ok(pair)
    }
}
