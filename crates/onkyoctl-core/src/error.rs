//! Error types for the protocol codecs

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the command, parameter and frame codecs
#[derive(Error, Debug)]
pub enum Error {
    /// A friendly value cannot be formatted, or a raw payload token
    /// cannot be parsed, under the command's parameter kind
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No command definition for this friendly name
    #[error("unknown command: {0:?}")]
    UnknownName(String),

    /// No command definition for this ISCP group
    #[error("unknown command group: {0:?}")]
    UnknownGroup(String),

    /// A group must be exactly three ASCII characters
    #[error("invalid group {0:?}: must be three ASCII characters")]
    BadGroup(String),

    /// Frame does not start with the `ISCP` magic
    #[error("invalid magic: expected \"ISCP\", got {0:02x?}")]
    BadMagic([u8; 4]),

    /// Frame header shorter than the fixed minimum
    #[error("header too short: need {needed} bytes, have {have}")]
    ShortHeader { needed: usize, have: usize },

    /// Buffer shorter than the length declared in the header
    #[error("buffer too short: need {needed} bytes, have {have}")]
    ShortBuffer { needed: usize, have: usize },

    /// Malformed ISCP payload
    #[error("bad ISCP payload: {0}")]
    BadPayload(&'static str),

    /// Command-set file could not be read
    #[error("failed to read command file: {0}")]
    CommandFileIo(#[from] std::io::Error),

    /// Command-set file could not be parsed
    #[error("failed to parse command file: {0}")]
    CommandFileFormat(#[from] serde_yaml::Error),
}
