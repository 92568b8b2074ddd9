//! Slave runtime: receive loop (writer) and render loop (reader).
//!
//! ```text
//!  transport ──recv──► receive_loop ──lock──► SlaveState ◄──lock── render loop
//!                       (tokio task)          TrailStore            (fixed rate)
//!                                             ColorCycle               │
//!                                             Liveness                 ▼
//!                                                                  Renderer
//! ```
//!
//! Both loops take the same lock and never await while holding it. A frame
//! sees the store exactly as the receive loop last left it.

use crate::config::{NodeConfig, RenderConfig};
use crate::error::NodeError;
use crate::export::TrailExport;
use crate::liveness::{Liveness, LivenessVerdict, SessionEnd};
use crate::render::{FrameView, Renderer};
use crate::stats::ColorCycle;
use crate::trail_store::{IngestOutcome, TrailStore};
use gesture_env::{DatagramTransport, NodeContext};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{error, info, trace};

/// Everything both slave loops touch.
#[derive(Debug, Clone)]
pub struct SlaveState {
    pub store: TrailStore,
    pub color: ColorCycle,
    pub liveness: Liveness,
    pub frames: u64,
}

impl SlaveState {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            store: TrailStore::new(config.trail.clone()),
            color: ColorCycle::new(&config.color_cycle),
            liveness: Liveness::new(config.liveness.clone()),
            frames: 0,
        }
    }

    /// Handles one received datagram, valid or not.
    pub fn on_datagram(&mut self, payload: &[u8]) -> IngestOutcome {
        self.liveness.note_packet();
        let color = self.color.current();
        self.store.ingest_datagram(payload, color)
    }

    /// Draws one frame and checks liveness.
    pub fn render_frame<R>(&mut self, renderer: &mut R, style: &RenderConfig) -> LivenessVerdict
    where
        R: Renderer + ?Sized,
    {
        self.color.advance();
        let view = FrameView::new(&self.store, self.frames, self.color.current(), style);
        renderer.render(&view);
        self.frames += 1;
        self.liveness.on_frame()
    }
}

pub type SharedState = Arc<Mutex<SlaveState>>;

/// Locks the state, recovering it if a renderer panicked mid-frame.
pub fn lock_state(state: &Mutex<SlaveState>) -> MutexGuard<'_, SlaveState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receives datagrams until the link closes or fails.
///
/// A closed link (the simulated network going away) ends the loop
/// normally; the render loop keeps going until liveness expires. Any other
/// transport error is fatal.
pub async fn receive_loop<Net>(network: Arc<Net>, state: SharedState) -> Result<u64, NodeError>
where
    Net: DatagramTransport,
{
    let mut received = 0u64;
    loop {
        match network.recv().await {
            Ok(datagram) => {
                received += 1;
                let outcome = lock_state(&state).on_datagram(&datagram.payload);
                if let IngestOutcome::Rejected { reason, .. } = outcome {
                    trace!("datagram {} from {:?} rejected: {}", received, datagram.source, reason);
                }
            }
            Err(e) if e.is_closed() => {
                info!("link closed after {} datagrams", received);
                return Ok(received);
            }
            Err(e) => {
                error!("receive failed: {}", e);
                return Err(e.into());
            }
        }
    }
}

/// The slave node.
pub struct SlaveNode<Ctx, Net>
where
    Ctx: NodeContext,
    Net: DatagramTransport,
{
    context: Arc<Ctx>,
    network: Arc<Net>,
    config: NodeConfig,
    state: SharedState,
}

impl<Ctx, Net> SlaveNode<Ctx, Net>
where
    Ctx: NodeContext,
    Net: DatagramTransport,
{
    pub fn new(context: Arc<Ctx>, network: Arc<Net>, config: NodeConfig) -> Self {
        let state = Arc::new(Mutex::new(SlaveState::new(&config)));
        Self {
            context,
            network,
            config,
            state,
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Snapshot of the trails as they stand now.
    pub fn snapshot(&self) -> TrailExport {
        TrailExport::from_store(&lock_state(&self.state).store)
    }

    /// Runs until liveness expires or the transport fails.
    pub async fn run<R>(&self, renderer: &mut R) -> Result<SessionEnd, NodeError>
    where
        R: Renderer + ?Sized,
    {
        self.run_until(renderer, std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also ends with
    /// [`SessionEnd::Interrupted`] once `shutdown` completes.
    pub async fn run_until<R, F>(&self, renderer: &mut R, shutdown: F) -> Result<SessionEnd, NodeError>
    where
        R: Renderer + ?Sized,
        F: Future<Output = ()>,
    {
        info!("slave running at {} fps", self.config.render.frame_rate_hz);
        let mut receiver: Option<JoinHandle<Result<u64, NodeError>>> =
            Some(tokio::spawn(receive_loop(self.network.clone(), self.state.clone())));

        let result = self.frame_loop(renderer, &mut receiver, shutdown).await;

        if let Some(handle) = receiver.take() {
            handle.abort();
        }
        renderer.finish();

        match &result {
            Ok(end) => info!("slave session over: {:?}", end),
            Err(e) => error!("slave stopped: {}", e),
        }
        result
    }

    async fn frame_loop<R, F>(
        &self,
        renderer: &mut R,
        receiver: &mut Option<JoinHandle<Result<u64, NodeError>>>,
        shutdown: F,
    ) -> Result<SessionEnd, NodeError>
    where
        R: Renderer + ?Sized,
        F: Future<Output = ()>,
    {
        let frame_interval = self.config.render.frame_interval();
        tokio::pin!(shutdown);

        loop {
            if receiver.as_ref().is_some_and(JoinHandle::is_finished) {
                if let Some(handle) = receiver.take() {
                    match handle.await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => return Err(e),
                        Err(join) => return Err(NodeError::Task(join.to_string())),
                    }
                }
            }

            let verdict = lock_state(&self.state).render_frame(renderer, &self.config.render);
            if let LivenessVerdict::Expired(end) = verdict {
                return Ok(end);
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(SessionEnd::Interrupted);
                }
                _ = self.context.sleep(frame_interval) => {}
            }
        }
    }
}
