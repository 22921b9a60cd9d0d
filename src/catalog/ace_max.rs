//! SPP protocol definitions for the ACE Max thruster: the common ACE
//! command set plus `magcoil`, transcribed from `ace_max.py`.

use std::sync::Arc;

use crate::error::Result;
use crate::ident::IdentifierTable;
use crate::parser::Parser;
use crate::registry::CommandRegistry;

fn magcoil_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(0, "inner", &["in"])?;
    t.add(1, "outer", &["out"])?;
    Ok(Arc::new(t))
}

/// Build the ACE Max command registry: [`super::ace_common::register_all`]
/// plus the `magcoil` command.
pub fn build_registry() -> Result<CommandRegistry> {
    let mut registry = super::ace_common::build_registry()?;
    let magcoil = magcoil_table()?;
    let float = || Parser::float32(None, ' ');
    let pair = Arc::new(Parser::Pair(Parser::pair(
        Parser::identifier(magcoil.clone(), '='),
        Some(float()),
    )));
    registry.register(
        0x14,
        "magcoil",
        0.005,
        Some(Parser::list(pair.clone(), None, " ")),
        Some(Parser::list(pair, None, " ")),
    )?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_magcoil_on_top_of_the_common_set() {
        let registry = build_registry().unwrap();
        assert!(registry.entry_by_name("magcoil").is_some());
        assert!(registry.entry_by_name("igniter").is_some());
    }
}
