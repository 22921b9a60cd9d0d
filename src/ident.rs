//! Bidirectional code/label tables for one-byte identifiers.
//!
//! This is the first-class replacement for the attribute-reaching the
//! original tool used to enumerate configuration keys during `csave`
//! (`SPEC_FULL.md` §9): callers use [`IdentifierTable::keys`] instead of
//! poking at parser internals.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// A code ↔ label/alias mapping for one family of one-byte identifiers
/// (e.g. telemetry fields, valve IDs, command codes).
#[derive(Debug, Clone, Default)]
pub struct IdentifierTable {
    code_to_label: BTreeMap<u8, String>,
    label_to_code: BTreeMap<String, u8>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `code` under `label`, plus any additional `aliases`. The
    /// decimal string of `code` is always registered as an implicit alias.
    ///
    /// Fails with [`Error::Initialization`] if `code` is already registered
    /// under a different label, or if `label`/any alias already resolves to
    /// a different code.
    pub fn add(&mut self, code: u8, label: &str, aliases: &[&str]) -> Result<()> {
        if let Some(existing) = self.code_to_label.get(&code) {
            if existing != label {
                return Err(Error::Initialization(format!(
                    "code {code} already registered as {existing:?}, cannot also register as {label:?}"
                )));
            }
        }

        let mut names: Vec<&str> = vec![label];
        names.extend_from_slice(aliases);
        let decimal = code.to_string();
        if !names.contains(&decimal.as_str()) {
            names.push(&decimal);
        }

        for name in &names {
            if let Some(&existing_code) = self.label_to_code.get(*name) {
                if existing_code != code {
                    return Err(Error::Initialization(format!(
                        "name {name:?} already resolves to code {existing_code}, cannot also resolve to {code}"
                    )));
                }
            }
        }

        self.code_to_label.insert(code, label.to_string());
        for name in names {
            self.label_to_code.insert(name.to_string(), code);
        }
        Ok(())
    }

    pub fn label_for(&self, code: u8) -> Option<&str> {
        self.code_to_label.get(&code).map(String::as_str)
    }

    pub fn code_for(&self, name: &str) -> Option<u8> {
        self.label_to_code.get(name).copied()
    }

    /// All registered `(code, canonical label)` pairs, in ascending code
    /// order. This is the first-class enumeration surface that replaces
    /// reaching into parser-internal maps.
    pub fn keys(&self) -> impl Iterator<Item = (u8, &str)> {
        self.code_to_label.iter().map(|(&c, l)| (c, l.as_str()))
    }

    pub fn contains_code(&self, code: u8) -> bool {
        self.code_to_label.contains_key(&code)
    }

    /// Decode one byte as a [`Value::Byte`] with its canonical label.
    pub fn decode_binary<'a>(&self, input: &'a [u8]) -> Result<(&'a [u8], Value)> {
        let (&code, rest) = input
            .split_first()
            .ok_or_else(|| Error::Parse("expected one byte for an identifier".to_string()))?;
        let label = self
            .label_for(code)
            .ok_or_else(|| Error::IdentifierUnknown(format!("no identifier registered for code {code}")))?
            .to_string();
        Ok((
            rest,
            Value::Byte {
                code,
                label: Some(label),
            },
        ))
    }

    /// Decode a token (up to but excluding `sep`) as a [`Value::Byte`],
    /// resolving label, alias, or decimal code text to its canonical label.
    pub fn decode_text<'a>(&self, input: &'a str, sep: char) -> Result<(&'a str, Value)> {
        let (token, rest) = match input.find(sep) {
            Some(idx) => (&input[..idx], &input[idx + sep.len_utf8()..]),
            None => (input, ""),
        };
        if token.is_empty() {
            return Err(Error::Parse("expected an identifier token".to_string()));
        }
        let code = self
            .code_for(token)
            .ok_or_else(|| Error::IdentifierUnknown(format!("unknown identifier {token:?}")))?;
        let label = self.label_for(code).unwrap().to_string();
        Ok((
            rest,
            Value::Byte {
                code,
                label: Some(label),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_conflicting_code() {
        let mut t = IdentifierTable::new();
        t.add(1, "a", &[]).unwrap();
        assert!(t.add(1, "b", &[]).is_err());
    }

    #[test]
    fn rejects_conflicting_alias() {
        let mut t = IdentifierTable::new();
        t.add(1, "a", &["x"]).unwrap();
        assert!(t.add(2, "b", &["x"]).is_err());
    }

    #[test]
    fn decimal_of_code_is_an_implicit_alias() {
        let mut t = IdentifierTable::new();
        t.add(22, "valve_id", &[]).unwrap();
        assert_eq!(t.code_for("22"), Some(22));
    }

    #[test]
    fn repeated_identical_registration_is_idempotent() {
        let mut t = IdentifierTable::new();
        t.add(1, "a", &["x"]).unwrap();
        assert!(t.add(1, "a", &["x"]).is_ok());
    }

    #[test]
    fn keys_enumerates_in_code_order() {
        let mut t = IdentifierTable::new();
        t.add(5, "five", &[]).unwrap();
        t.add(1, "one", &[]).unwrap();
        let keys: Vec<_> = t.keys().collect();
        assert_eq!(keys, vec![(1, "one"), (5, "five")]);
    }
}
