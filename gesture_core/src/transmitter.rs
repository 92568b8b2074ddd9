//! Master runtime: capture or replay → wire → broadcast.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Transmitter                         │
//! │  CaptureDevice ──poll──► GestureGate ──enabled?──┐       │
//! │       │                                          ▼       │
//! │       └──position(mm)──► metres ──► AxisTransform        │
//! │                                          │               │
//! │                              wire::encode ──► transport  │
//! │                                          └──► log file   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Generic over the context and transport, so the same loop runs against a
//! UDP socket in production and an in-memory link in simulation.

use crate::config::{GateConfig, TransmitConfig};
use crate::error::NodeError;
use crate::gesture_gate::{DrawingState, GestureGate};
use crate::sample::Sample;
use crate::source::{connect_with_retries, CaptureDevice, FrameStatus};
use crate::wire::{self, KEEPALIVE};
use gesture_env::{DatagramTransport, NodeContext, MAX_DATAGRAM_LEN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, error, info, warn};

/// A `NoData` warning is logged on the first occurrence and then every Nth.
const NO_DATA_WARN_EVERY: u64 = 500;

/// Counters for one master run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitStats {
    pub ticks: u64,
    pub positions_sent: u64,
    pub keepalives_sent: u64,
    pub lines_replayed: u64,
    pub bytes_sent: u64,
    pub no_data_ticks: u64,
    pub skipped_objects: u64,
    pub gate_flips: u64,
    /// Replay lines dropped for exceeding the datagram limit
    pub oversize_skipped: u64,
}

/// Append-only flat log of every emitted line.
struct LineLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// The master node.
pub struct Transmitter<Ctx, Net>
where
    Ctx: NodeContext,
    Net: DatagramTransport,
{
    context: Arc<Ctx>,
    network: Arc<Net>,
    config: TransmitConfig,
    gate: GestureGate,
    log: Option<LineLog>,
    stats: TransmitStats,
}

impl<Ctx, Net> Transmitter<Ctx, Net>
where
    Ctx: NodeContext,
    Net: DatagramTransport,
{
    pub fn new(context: Arc<Ctx>, network: Arc<Net>, config: TransmitConfig, gate: GateConfig) -> Self {
        Self {
            context,
            network,
            config,
            gate: GestureGate::new(gate),
            log: None,
            stats: TransmitStats::default(),
        }
    }

    /// Creates (truncating) a log file that receives every emitted line.
    pub async fn with_log_file(mut self, path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(|source| NodeError::LogFile {
            path: path.clone(),
            source,
        })?;
        info!("logging emitted positions to {}", path.display());
        self.log = Some(LineLog {
            path,
            writer: BufWriter::new(file),
        });
        Ok(self)
    }

    pub fn gate(&self) -> &GestureGate {
        &self.gate
    }

    pub fn stats(&self) -> TransmitStats {
        self.stats
    }

    async fn broadcast(&mut self, payload: &[u8]) -> Result<(), NodeError> {
        match self.network.send(payload).await {
            Ok(n) => {
                self.stats.bytes_sent += n as u64;
                Ok(())
            }
            Err(e) => {
                error!("broadcast failed: {}", e);
                Err(e.into())
            }
        }
    }

    async fn append_log(&mut self, line: &str) -> Result<(), NodeError> {
        if let Some(log) = self.log.as_mut() {
            log.writer
                .write_all(line.as_bytes())
                .await
                .map_err(|source| NodeError::LogFile {
                    path: log.path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Flushes buffered log lines to disk.
    pub async fn flush_log(&mut self) -> Result<(), NodeError> {
        if let Some(log) = self.log.as_mut() {
            log.writer.flush().await.map_err(|source| NodeError::LogFile {
                path: log.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Runs one polling tick. Returns the number of positions broadcast.
    ///
    /// The gate reads the trigger in capture space (metres, before the
    /// calibration transform). Objects without a position this tick are
    /// skipped.
    pub async fn tick<D>(&mut self, device: &mut D, objects: &[String], trigger: &str) -> Result<usize, NodeError>
    where
        D: CaptureDevice + ?Sized,
    {
        let tick = self.stats.ticks;
        self.stats.ticks += 1;

        if device.poll_frame() == FrameStatus::NoData {
            self.stats.no_data_ticks += 1;
            if self.stats.no_data_ticks == 1 || self.stats.no_data_ticks % NO_DATA_WARN_EVERY == 0 {
                warn!("capture device has no data ({} ticks so far)", self.stats.no_data_ticks);
            }
        }

        let trigger_sample = device.position(trigger).map(Sample::from_millimetres);
        if let Some(state) = self.gate.evaluate(trigger_sample) {
            self.stats.gate_flips += 1;
            match state {
                DrawingState::Enabled => info!("drawing switched ON at tick {}", tick),
                DrawingState::Disabled => info!("drawing switched OFF at tick {}", tick),
            }
        }

        if !self.gate.is_enabled() {
            if self.config.keepalive {
                self.broadcast(KEEPALIVE).await?;
                self.stats.keepalives_sent += 1;
                self.context.sleep(self.config.keepalive_interval()).await;
            }
            return Ok(0);
        }

        if tick % self.config.emit_divider.max(1) != 0 {
            return Ok(0);
        }

        let mut sent = 0;
        for object in objects {
            let Some(position) = device.position(object) else {
                self.stats.skipped_objects += 1;
                continue;
            };
            let sample = self.config.transform.apply(Sample::from_millimetres(position));
            let line = match wire::encode(object, sample) {
                Ok(line) => line,
                Err(e) => {
                    warn!("not sending {:?}: {}", object, e);
                    self.stats.skipped_objects += 1;
                    continue;
                }
            };

            self.broadcast(line.as_bytes()).await?;
            self.append_log(&line).await?;
            self.stats.positions_sent += 1;
            sent += 1;
        }

        debug!("tick {}: sent {} positions", tick, sent);
        Ok(sent)
    }

    /// Connects to the capture device and polls it until `max_ticks` ticks
    /// have run (forever if `None`).
    pub async fn run_live<D>(
        &mut self,
        device: &mut D,
        target: &str,
        objects: &[String],
        trigger: &str,
        max_ticks: Option<u64>,
    ) -> Result<TransmitStats, NodeError>
    where
        D: CaptureDevice + ?Sized,
    {
        connect_with_retries(
            self.context.as_ref(),
            &mut *device,
            target,
            self.config.connect_attempts,
            self.config.connect_retry(),
        )
        .await;

        info!("master live: {} objects, trigger {:?}", objects.len(), trigger);
        let result = self.live_loop(&mut *device, objects, trigger, max_ticks).await;
        // Whatever was emitted before a failure stays in the log
        self.flush_log().await?;
        result?;

        info!(
            "master finished after {} ticks, {} positions sent",
            self.stats.ticks, self.stats.positions_sent
        );
        Ok(self.stats)
    }

    async fn live_loop<D>(
        &mut self,
        device: &mut D,
        objects: &[String],
        trigger: &str,
        max_ticks: Option<u64>,
    ) -> Result<(), NodeError>
    where
        D: CaptureDevice + ?Sized,
    {
        while max_ticks.map_or(true, |limit| self.stats.ticks < limit) {
            self.tick(&mut *device, objects, trigger).await?;
            self.context.sleep(self.config.tick_interval()).await;
        }
        Ok(())
    }

    /// Broadcasts a recorded file line by line, verbatim, with pacing.
    ///
    /// Lines that would not fit in one datagram are skipped.
    pub async fn run_replay(&mut self, path: impl AsRef<Path>) -> Result<TransmitStats, NodeError> {
        let path = path.as_ref();
        let replay_error = |source| NodeError::Replay {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).await.map_err(replay_error)?;
        info!("replaying {}", path.display());

        let mut lines = BufReader::new(file).split(b'\n');
        while let Some(mut line) = lines.next_segment().await.map_err(replay_error)? {
            line.push(b'\n');
            if line.len() > MAX_DATAGRAM_LEN {
                self.stats.oversize_skipped += 1;
                warn!(
                    "skipping replay line {} of {} bytes (limit {})",
                    self.stats.lines_replayed + self.stats.oversize_skipped,
                    line.len(),
                    MAX_DATAGRAM_LEN
                );
                continue;
            }
            self.broadcast(&line).await?;
            self.stats.lines_replayed += 1;
            self.context.sleep(self.config.replay_pacing()).await;
        }

        info!("replay finished: {} lines", self.stats.lines_replayed);
        Ok(self.stats)
    }
}
