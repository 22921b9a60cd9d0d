//! Example thruster command catalogs.
//!
//! `spec.md` §1 treats "the specific command catalogs for individual
//! thruster variants" as external collaborators — data supplied to the
//! core, not part of it. These two catalogs (`ace_common`/`ace_radhard` and
//! `ace_max`) are kept in the crate anyway so the [`crate::session::Session`]
//! and `spacesuit` binary have something real to drive; they carry none of
//! the parser/registry/transport logic itself.

pub mod ace_common;
pub mod ace_max;

use crate::error::{Error, Result};
use crate::registry::CommandRegistry;

/// Build the command registry for a named thruster variant.
///
/// `ace_radhard` is exactly the common ACE command set; `ace_max` extends it
/// with the `magcoil` command, mirroring `ace_radhard.py`/`ace_max.py`.
pub fn registry_for(variant: &str) -> Result<CommandRegistry> {
    match variant {
        "ace_radhard" => ace_common::build_registry(),
        "ace_max" => ace_max::build_registry(),
        other => Err(Error::Initialization(format!(
            "unknown thruster variant: {other:?}"
        ))),
    }
}
