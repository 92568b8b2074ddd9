//! Error types for the trail engine and node runtimes.
//!
//! Failures split two ways. Wire errors are absorbed: the datagram is
//! counted and dropped. Node errors are fatal: the process reports them and
//! exits with status 1.

use gesture_env::EnvError;
use std::path::PathBuf;
use thiserror::Error;

/// A datagram or line that could not be turned into a message, or a
/// message that cannot be put on the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    /// Payload did not split into exactly four `~`-separated fields
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),

    /// A coordinate was not a decimal number (strict policy only)
    #[error("field {index} is not numeric: {text:?}")]
    NonNumeric { index: usize, text: String },

    /// Object name is empty or contains a delimiter, newline, or NUL
    #[error("invalid object name {0:?}")]
    InvalidName(String),

    /// Coordinate is NaN or infinite
    #[error("coordinate is not finite")]
    NonFinite,

    /// Encoded message exceeds the datagram limit
    #[error("message is {0} bytes, limit is {limit}", limit = gesture_env::MAX_DATAGRAM_LEN)]
    TooLong(usize),
}

/// Fatal failures of a master or slave node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Socket creation, bind, send, or receive failed
    #[error("transport failure: {0}")]
    Transport(#[from] EnvError),

    /// The recorded file for replay could not be opened or read
    #[error("cannot read replay file {path}: {source}")]
    Replay {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The flat log file could not be created or written
    #[error("log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// A background task panicked or was cancelled
    #[error("task failure: {0}")]
    Task(String),

    /// Snapshot export failed
    #[error("export failed: {0}")]
    Export(String),
}
