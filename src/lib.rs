//! SPP: a host-side control and scripting stack for electric-propulsion
//! thruster controllers that speak the Serial Ping-Pong command/reply
//! protocol over an asynchronous serial link.
//!
//! The crate is organized bottom-up, the same way the wire protocol itself
//! is layered:
//!
//! - [`value`] / [`ident`]: the structured value model and identifier tables.
//! - [`parser`]: the composable text/binary parser framework built from them.
//! - [`registry`] / [`message`]: the command catalog and the message layer
//!   it compiles into.
//! - [`frame`] / [`crc`]: the wire envelope and its checksums.
//! - [`transport`]: the serial request/response exchange.
//! - [`session`]: the scripting and logging façade built on top of all of
//!   the above.
//! - [`catalog`]: example thruster command catalogs, supplied as data
//!   rather than part of the protocol core.

pub mod catalog;
pub mod crc;
pub mod error;
pub mod frame;
pub mod ident;
pub mod message;
pub mod parser;
pub mod registry;
pub mod session;
pub mod transport;
pub mod value;

pub use error::{Error, Result};
pub use message::Message;
pub use registry::CommandRegistry;
pub use session::Session;
pub use transport::Transport;
pub use value::Value;
