//! Production implementations backed by Tokio.

use crate::error::EnvError;
use crate::network::{DatagramTransport, MAX_DATAGRAM_LEN};
use crate::types::Datagram;
use crate::NodeContext;
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

/// Production context backed by the Tokio timer.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// UDP socket transport.
///
/// A broadcaster sends every datagram to one fixed destination (normally a
/// subnet broadcast address). A listener binds the well-known port on all
/// interfaces and only receives.
pub struct UdpTransport {
    socket: UdpSocket,

    /// Fixed destination for `send`; `None` on a listener
    destination: Option<SocketAddr>,
}

impl UdpTransport {
    /// Binds an ephemeral port with `SO_BROADCAST` set, sending to `destination`.
    pub async fn broadcaster(destination: SocketAddr) -> Result<Self, EnvError> {
        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| EnvError::Bind { addr: bind_addr, source })?;
        socket.set_broadcast(true)?;

        tracing::info!("UDP broadcaster bound to {:?}, sending to {}", socket.local_addr().ok(), destination);

        Ok(Self {
            socket,
            destination: Some(destination),
        })
    }

    /// Binds `0.0.0.0:port` for receiving.
    pub async fn listener(port: u16) -> Result<Self, EnvError> {
        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        Self::listener_on(bind_addr).await
    }

    /// Binds an explicit address for receiving.
    pub async fn listener_on(bind_addr: SocketAddr) -> Result<Self, EnvError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| EnvError::Bind { addr: bind_addr, source })?;

        tracing::info!("UDP listener bound to {}", bind_addr);

        Ok(Self {
            socket,
            destination: None,
        })
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send(&self, payload: &[u8]) -> Result<usize, EnvError> {
        let dest = self
            .destination
            .ok_or_else(|| EnvError::closed("listener socket has no send destination"))?;

        self.socket
            .send_to(payload, dest)
            .await
            .map_err(|source| EnvError::Send { dest, source })
    }

    async fn recv(&self) -> Result<Datagram, EnvError> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let (len, source) = self.socket.recv_from(&mut buf).await.map_err(EnvError::Recv)?;
        Ok(Datagram::from_source(buf[..len].to_vec(), source))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}
