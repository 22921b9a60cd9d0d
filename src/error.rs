//! Error taxonomy for the protocol stack.
//!
//! Every fallible operation in this crate returns one of the variants below.
//! The split mirrors the named error kinds of the protocol design: callers
//! that only care about "did it work" can match on [`Error`] directly, while
//! the script façade downgrades most of these to per-line diagnostics rather
//! than tearing down the session.

use thiserror::Error;

/// The error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A registry was built with conflicting codes, names, or aliases.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// Text or binary input did not match the expected grammar.
    #[error("parse error: {0}")]
    Parse(String),

    /// A numeric code or textual label has no registered meaning.
    #[error("unknown identifier: {0}")]
    IdentifierUnknown(String),

    /// A value was syntactically well-formed but not of the expected shape.
    #[error("invalid parameter: {0}")]
    ParameterInvalid(String),

    /// A value parsed correctly but falls outside the type's allowed range.
    #[error("parameter out of range: {0}")]
    ParameterOutOfRange(String),

    /// No reply arrived before the command's deadline (plus slack) elapsed.
    #[error("timed out waiting for a reply")]
    TransportTimeout,

    /// A frame failed sync, address, length, or CRC validation.
    #[error("invalid frame: {0}")]
    FrameInvalid(String),

    /// The caller used the protocol stack in a way it does not support.
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// Underlying I/O failure (log file, firmware image, etc).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying serial port failure.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
