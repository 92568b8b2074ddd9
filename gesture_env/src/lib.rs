//! Gesture Trails Environment Abstraction Layer
//!
//! This crate provides the seam between the trail engines and the outside
//! world, so the same master/slave loops run against real UDP sockets in
//! production and against channel-backed, lossy links in simulation.
//!
//! # What gets abstracted
//!
//! - Time (`now()`, `sleep()`) via [`NodeContext`]
//! - Datagrams (`send()`, `recv()`) via [`DatagramTransport`]
//!
//! # Example
//!
//! ```ignore
//! use gesture_env::{NodeContext, DatagramTransport};
//!
//! async fn pump<Ctx: NodeContext, Net: DatagramTransport>(ctx: &Ctx, net: &Net) {
//!     loop {
//!         let datagram = net.recv().await?;
//!         handle(datagram);
//!         ctx.sleep(Duration::from_millis(1)).await;
//!     }
//! }
//! ```

mod context;
mod network;
mod types;
mod error;
mod tokio_impl;

pub use context::NodeContext;
pub use network::{DatagramTransport, MAX_DATAGRAM_LEN};
pub use types::Datagram;
pub use error::EnvError;
pub use tokio_impl::{TokioContext, UdpTransport};
