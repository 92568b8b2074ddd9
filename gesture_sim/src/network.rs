//! Simulated broadcast link with fault injection.
//!
//! One master end fans every datagram out to any number of slave ends.
//! Each delivery is dropped independently with the controller's loss rate,
//! drawn from a seeded RNG. Dropping the master end closes the link: every
//! slave's `recv` then reports [`EnvError::Closed`].

use async_trait::async_trait;
use gesture_env::{Datagram, DatagramTransport, EnvError, MAX_DATAGRAM_LEN};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Port the simulated master appears to send from.
const SIM_MASTER_PORT: u16 = 40_000;

/// Delivery counters over the whole link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Datagrams handed to the link by the master
    pub sent: u64,
    /// Per-slave deliveries
    pub delivered: u64,
    /// Per-slave drops (loss or partition)
    pub dropped: u64,
}

struct ControllerState {
    loss_rate: f64,
    partitioned: bool,
    rng: ChaCha8Rng,
    stats: LinkStats,
}

/// Network controller for fault injection.
///
/// Cloning shares the same link state.
#[derive(Clone)]
pub struct SimNetworkController {
    state: Arc<Mutex<ControllerState>>,
}

impl SimNetworkController {
    pub fn new(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                loss_rate: 0.0,
                partitioned: false,
                rng: ChaCha8Rng::seed_from_u64(seed),
                stats: LinkStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the per-delivery loss probability (clamped to [0, 1]).
    pub fn set_loss(&self, loss_rate: f64) {
        self.lock().loss_rate = loss_rate.clamp(0.0, 1.0);
    }

    pub fn loss(&self) -> f64 {
        self.lock().loss_rate
    }

    /// Cuts the link: everything sent is dropped until [`heal`](Self::heal).
    pub fn partition(&self) {
        self.lock().partitioned = true;
    }

    pub fn heal(&self) {
        self.lock().partitioned = false;
    }

    pub fn stats(&self) -> LinkStats {
        self.lock().stats
    }

    fn note_sent(&self) {
        self.lock().stats.sent += 1;
    }

    /// Decides the fate of one delivery and records it.
    fn should_deliver(&self) -> bool {
        let mut state = self.lock();
        let deliver = if state.partitioned {
            false
        } else if state.loss_rate <= 0.0 {
            true
        } else {
            let roll: f64 = state.rng.gen();
            roll >= state.loss_rate
        };

        if deliver {
            state.stats.delivered += 1;
        } else {
            state.stats.dropped += 1;
        }
        deliver
    }
}

/// One end of the simulated link.
pub struct SimNetwork {
    local_addr: SocketAddr,

    /// Fan-out senders (master end only)
    peers: Vec<mpsc::UnboundedSender<Datagram>>,

    /// Incoming datagrams (slave ends only, behind tokio mutex for async)
    rx: Option<tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>>,

    controller: SimNetworkController,
}

impl SimNetwork {
    /// Creates a master end and `slaves` slave ends sharing `controller`.
    pub fn broadcast_group(slaves: usize, controller: &SimNetworkController) -> (SimNetwork, Vec<SimNetwork>) {
        let mut peers = Vec::with_capacity(slaves);
        let mut ends = Vec::with_capacity(slaves);

        for i in 0..slaves {
            let (tx, rx) = mpsc::unbounded_channel();
            peers.push(tx);
            ends.push(SimNetwork {
                local_addr: sim_addr(10 + i as u8, 25884),
                peers: Vec::new(),
                rx: Some(tokio::sync::Mutex::new(rx)),
                controller: controller.clone(),
            });
        }

        let master = SimNetwork {
            local_addr: sim_addr(1, SIM_MASTER_PORT),
            peers,
            rx: None,
            controller: controller.clone(),
        };
        (master, ends)
    }

    /// A master end connected to exactly one slave.
    pub fn pair(controller: &SimNetworkController) -> (SimNetwork, SimNetwork) {
        let (master, mut slaves) = Self::broadcast_group(1, controller);
        let slave = slaves.remove(0);
        (master, slave)
    }

    pub fn controller(&self) -> &SimNetworkController {
        &self.controller
    }
}

fn sim_addr(host: u8, port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 2, 0, host), port))
}

#[async_trait]
impl DatagramTransport for SimNetwork {
    async fn send(&self, payload: &[u8]) -> Result<usize, EnvError> {
        if self.rx.is_some() {
            return Err(EnvError::closed("slave end of the simulated link cannot send"));
        }

        self.controller.note_sent();
        for peer in &self.peers {
            if !self.controller.should_deliver() {
                continue;
            }
            // A slave that already exited just misses the datagram
            let _ = peer.send(Datagram::from_source(payload.to_vec(), self.local_addr));
        }
        Ok(payload.len())
    }

    async fn recv(&self) -> Result<Datagram, EnvError> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| EnvError::closed("master end of the simulated link cannot receive"))?;

        let mut rx = rx.lock().await;
        match rx.recv().await {
            Some(mut datagram) => {
                // Same truncation a fixed-size receive buffer applies
                datagram.payload.truncate(MAX_DATAGRAM_LEN);
                Ok(datagram)
            }
            None => Err(EnvError::closed("simulated master went away")),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_every_delivery_is_accounted(seed in any::<u64>(), loss in 0.0f64..1.0, slaves in 1usize..5, sends in 0u64..60) {
            let controller = SimNetworkController::new(seed);
            controller.set_loss(loss);
            for _ in 0..sends {
                controller.note_sent();
                for _ in 0..slaves {
                    controller.should_deliver();
                }
            }

            let stats = controller.stats();
            prop_assert_eq!(stats.sent, sends);
            prop_assert_eq!(stats.delivered + stats.dropped, sends * slaves as u64);
        }
    }

    #[tokio::test]
    async fn test_lossless_pair_delivers_in_order() {
        let controller = SimNetworkController::new(1);
        let (master, slave) = SimNetwork::pair(&controller);

        master.send(b"A~1~2~3\n").await.unwrap();
        master.send(b"DUMMYDATA\n").await.unwrap();

        assert_eq!(slave.recv().await.unwrap().payload, b"A~1~2~3\n".to_vec());
        let keepalive = slave.recv().await.unwrap();
        assert_eq!(keepalive.payload, b"DUMMYDATA\n".to_vec());
        assert_eq!(keepalive.source, master.local_addr());

        assert_eq!(
            controller.stats(),
            LinkStats {
                sent: 2,
                delivered: 2,
                dropped: 0
            }
        );
    }

    #[tokio::test]
    async fn test_closing_master_closes_slaves() {
        let controller = SimNetworkController::new(1);
        let (master, slave) = SimNetwork::pair(&controller);
        master.send(b"last\n").await.unwrap();
        drop(master);

        assert!(slave.recv().await.is_ok());
        let err = slave.recv().await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_ends_are_one_way() {
        let controller = SimNetworkController::new(1);
        let (master, slave) = SimNetwork::pair(&controller);
        assert!(slave.send(b"x").await.unwrap_err().is_closed());
        assert!(master.recv().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_seeded_loss_is_deterministic() {
        async fn delivered_with(seed: u64) -> Vec<u8> {
            let controller = SimNetworkController::new(seed);
            controller.set_loss(0.5);
            let (master, slave) = SimNetwork::pair(&controller);
            for i in 0..200u8 {
                master.send(&[i]).await.unwrap();
            }
            drop(master);

            let mut got = Vec::new();
            while let Ok(datagram) = slave.recv().await {
                got.push(datagram.payload[0]);
            }
            got
        }

        let first = delivered_with(9).await;
        assert_eq!(first, delivered_with(9).await);
        assert!(first.len() > 50 && first.len() < 150, "delivered {}", first.len());
    }

    #[tokio::test]
    async fn test_partition_drops_everything_for_every_slave() {
        let controller = SimNetworkController::new(3);
        let (master, slaves) = SimNetwork::broadcast_group(3, &controller);
        controller.partition();
        master.send(b"A~0~0~1\n").await.unwrap();
        controller.heal();
        master.send(b"B~0~0~1\n").await.unwrap();
        drop(master);

        for slave in &slaves {
            assert_eq!(slave.recv().await.unwrap().payload, b"B~0~0~1\n".to_vec());
            assert!(slave.recv().await.is_err());
        }
        assert_eq!(
            controller.stats(),
            LinkStats {
                sent: 2,
                delivered: 3,
                dropped: 3
            }
        );
    }
}
