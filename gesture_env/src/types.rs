//! Common types for the environment abstraction.

use std::net::SocketAddr;

/// One received datagram.
///
/// The payload is the raw bytes as they came off the wire, already
/// truncated to the received length. Decoding is the receiver's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Raw payload bytes
    pub payload: Vec<u8>,

    /// Sender address, when the transport knows it
    pub source: Option<SocketAddr>,
}

impl Datagram {
    /// Creates a datagram from payload bytes with no known source.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            source: None,
        }
    }

    /// Creates a datagram tagged with its sender.
    pub fn from_source(payload: Vec<u8>, source: SocketAddr) -> Self {
        Self {
            payload,
            source: Some(source),
        }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
