//! Datagram transport abstraction for master and slave nodes.

use async_trait::async_trait;
use std::net::SocketAddr;
use crate::error::EnvError;
use crate::types::Datagram;

/// Largest datagram either side will send or accept.
///
/// Messages are fixed well under the MTU so a datagram is never fragmented
/// and the receiver never reassembles.
pub const MAX_DATAGRAM_LEN: usize = 512;

/// Connectionless, unreliable datagram I/O.
///
/// # Implementations
///
/// - **Production**: `UdpTransport` - a UDP socket, broadcast-enabled on the master
/// - **Simulation**: `SimNetwork` (gesture_sim) - channels with seeded loss
///
/// # Packet Flow
///
/// ```text
/// Master                     LAN                       Slave(s)
///   |                         |                           |
///   |-- send("A~1~2~3\n") --->|                           |
///   |                         |-- [may drop] ------------>|
///   |                         |                           |-- recv() -> Datagram
/// ```
#[async_trait]
pub trait DatagramTransport: Send + Sync + 'static {
    /// Sends one datagram to the transport's configured destination.
    ///
    /// # Returns
    /// * `Ok(n)` - `n` bytes handed to the network
    /// * `Err(EnvError::Send)` - Immediate send failure
    ///
    /// # Note
    /// Success does not mean delivery. There is no acknowledgement.
    async fn send(&self, payload: &[u8]) -> Result<usize, EnvError>;

    /// Receives the next datagram.
    ///
    /// Blocks until a datagram arrives; there is no timeout.
    async fn recv(&self) -> Result<Datagram, EnvError>;

    /// Returns the locally bound address, if any.
    fn local_addr(&self) -> Option<SocketAddr>;
}
