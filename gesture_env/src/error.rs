//! Error types for the environment abstraction.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised by datagram transports.
///
/// Every variant is fatal for the loop that hit it: the installation has no
/// retry path, a broken socket ends the process.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Socket creation or bind failed
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Datagram send failed
    #[error("send to {dest} failed: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Datagram receive failed
    #[error("receive failed: {0}")]
    Recv(#[source] std::io::Error),

    /// The peer side of an in-process link went away
    #[error("transport closed: {0}")]
    Closed(String),

    /// Socket option or other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Creates a closed-link error.
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::Closed(msg.into())
    }

    /// True when the error came from a link shutting down rather than a socket fault.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}
