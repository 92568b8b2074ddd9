//! Scenario runner - executes master/slave scenarios on one virtual clock.

use crate::capture::SimulatedCapture;
use crate::context::SimContext;
use crate::error::SimError;
use crate::network::{LinkStats, SimNetwork, SimNetworkController};
use crate::scenarios::ScenarioId;

use gesture_core::source::CaptureDevice;
use gesture_core::{
    wire, GateConfig, LivenessConfig, MessageCounters, NodeConfig, NodeError, Renderer, Sample, SessionEnd, SlaveNode,
    StatsRenderer, TickMode, TrailExport, TransmitConfig, TransmitStats, Transmitter,
};
use gesture_env::NodeContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Randomness stream for link loss.
const LINK_STREAM: u64 = 1;
/// Randomness stream for capture jitter.
const CAPTURE_STREAM: u64 = 2;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Master-side counters (default if the master failed)
    pub master: TransmitStats,

    /// How the slave session ended, if it ended cleanly
    pub session_end: Option<SessionEnd>,

    /// Slave-side datagram counters
    pub counters: MessageCounters,

    /// Objects the slave ended up tracking
    pub tracks: usize,

    /// Ticks the slave closed
    pub ticks: u64,

    /// Link delivery counters
    pub link: LinkStats,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Slave trails at exit
    pub snapshot: TrailExport,
}

/// What drives the master side of a scenario.
enum MasterPlan {
    Live { capture: SimulatedCapture, ticks: u64 },
    Replay { path: PathBuf },
}

impl MasterPlan {
    async fn drive(self, mut master: Transmitter<SimContext, SimNetwork>) -> Result<TransmitStats, NodeError> {
        match self {
            MasterPlan::Live { mut capture, ticks } => {
                let objects = capture.object_names();
                let trigger = capture.trigger().to_string();
                master
                    .run_live(&mut capture, "sim-capture", &objects, &trigger, Some(ticks))
                    .await
            }
            MasterPlan::Replay { path } => master.run_replay(&path).await,
        }
    }
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Ticks the live master runs before exiting
    master_ticks: u64,

    /// Rounds written into the replay fixture
    replay_rounds: usize,

    /// Per-delivery loss for the lossy scenario
    loss_rate: f64,

    /// Settings every scenario starts from
    base: NodeConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            master_ticks: 800,
            replay_rounds: 50,
            loss_rate: 0.3,
            base: NodeConfig::default(),
        }
    }

    /// Starts every scenario from `config` instead of the defaults.
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.base = config;
        self
    }

    /// Sets how many ticks the live master runs.
    pub fn with_master_ticks(mut self, ticks: u64) -> Self {
        self.master_ticks = ticks;
        self
    }

    /// Sets how many rounds the replay fixture holds.
    pub fn with_replay_rounds(mut self, rounds: usize) -> Self {
        self.replay_rounds = rounds;
        self
    }

    /// Sets the loss rate of the lossy link.
    pub fn with_loss(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate;
        self
    }

    /// The base settings compressed for simulation: emit every other tick
    /// and a shorter gate cooldown, so two raise gestures fit in a few
    /// hundred ticks. The slave expects exactly the performer's objects.
    pub fn sim_config(&self) -> NodeConfig {
        let mut config = self.base.clone();
        config.gate = GateConfig {
            threshold_m: 2.0,
            hysteresis_ticks: 100,
        };
        config.transmit = TransmitConfig {
            emit_divider: 2,
            ..config.transmit
        };
        config.trail.expected_objects = SimulatedCapture::new(0).object_names().len();
        config
    }

    /// The simulated performer: raises the wand at ticks 100 and 500.
    fn performer(&self, ctx: &SimContext) -> SimulatedCapture {
        SimulatedCapture::new(ctx.derive_seed(CAPTURE_STREAM)).with_raise_windows(vec![100..110, 500..510])
    }

    /// Runs a scenario with the headless renderer.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        let mut renderer = StatsRenderer::new(self.base.render.stats_every);
        self.run_with_renderer(scenario, &mut renderer)
    }

    /// Runs a scenario, drawing every slave frame with `renderer`.
    pub fn run_with_renderer(&self, scenario: ScenarioId, renderer: &mut dyn Renderer) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SimError::Runtime)?;
        runtime.block_on(self.run_async(scenario, renderer))
    }

    async fn run_async(&self, scenario: ScenarioId, renderer: &mut dyn Renderer) -> Result<ScenarioResult, SimError> {
        let ctx = SimContext::shared(self.seed);
        let controller = SimNetworkController::new(ctx.derive_seed(LINK_STREAM));
        let mut config = self.sim_config();
        let mut fixture = None;

        let plan = match scenario {
            ScenarioId::SteadyDraw => MasterPlan::Live {
                capture: self.performer(&ctx),
                ticks: self.master_ticks,
            },
            ScenarioId::LossyLink => {
                controller.set_loss(self.loss_rate);
                MasterPlan::Live {
                    capture: self.performer(&ctx),
                    ticks: self.master_ticks,
                }
            }
            ScenarioId::ReplayJunk => {
                config.trail.tick_mode = TickMode::Delimited;
                // File reads run on real blocking threads while frames run on
                // the virtual clock, so idle windows must cover an IO stall
                config.liveness = LivenessConfig {
                    session_timeout_frames: 20_000,
                    connect_timeout_frames: 200_000,
                };
                let path = std::env::temp_dir().join(format!(
                    "gesture-trails-replay-{}-{}.txt",
                    std::process::id(),
                    self.seed
                ));
                self.write_replay_fixture(&ctx, &path).await?;
                fixture = Some(path.clone());
                MasterPlan::Replay { path }
            }
            ScenarioId::Starvation => {
                controller.partition();
                MasterPlan::Live {
                    capture: self.performer(&ctx).with_connect_failures(u32::MAX),
                    ticks: self.master_ticks,
                }
            }
        };

        let (master_net, slave_net) = SimNetwork::pair(&controller);
        let master = Transmitter::new(
            ctx.clone(),
            Arc::new(master_net),
            config.transmit.clone(),
            config.gate.clone(),
        );
        // The master's end of the link closes when this task finishes
        let master_task = tokio::spawn(plan.drive(master));

        let slave = SlaveNode::new(ctx.clone(), Arc::new(slave_net), config.clone());
        let slave_result = slave.run(renderer).await;
        let master_result = match master_task.await {
            Ok(result) => result,
            Err(join) => Err(NodeError::Task(join.to_string())),
        };

        if let Some(path) = fixture {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("could not remove {}: {}", path.display(), e);
            }
        }

        let snapshot = slave.snapshot();
        let mut result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            master: TransmitStats::default(),
            session_end: None,
            counters: snapshot.counters,
            tracks: snapshot.tracks.len(),
            ticks: snapshot.ticks,
            link: controller.stats(),
            final_time_secs: ctx.now().as_secs_f64(),
            failure_reason: None,
            snapshot,
        };

        let verdict = match (slave_result, master_result) {
            (Err(e), _) => Err(format!("slave failed: {}", e)),
            (_, Err(e)) => Err(format!("master failed: {}", e)),
            (Ok(end), Ok(master)) => {
                result.session_end = Some(end);
                result.master = master;
                self.check(scenario, &config, &result)
            }
        };

        match verdict {
            Ok(()) => {
                result.passed = true;
                info!("✓ {} passed", scenario);
            }
            Err(reason) => {
                warn!("✗ {} failed: {}", scenario, reason);
                result.failure_reason = Some(reason);
            }
        }
        Ok(result)
    }

    /// Records rounds of the performer, each followed by a junk line.
    async fn write_replay_fixture(&self, ctx: &SimContext, path: &Path) -> Result<(), SimError> {
        let mut capture = self.performer(ctx);
        capture.connect("fixture");
        let objects = capture.object_names();

        let mut text = String::new();
        for round in 0..self.replay_rounds {
            capture.poll_frame();
            for object in &objects {
                // Recordings carry whole millimetres
                if let Some(position) = capture.position(object) {
                    let position = position.map(f64::round);
                    text.push_str(&wire::encode(object, Sample::from_millimetres(position))?);
                }
            }
            if round % 2 == 0 {
                text.push_str("DUMMYDATA\n");
            } else {
                text.push_str(&format!("-- frame {} --\n", round));
            }
        }

        tokio::fs::write(path, text).await.map_err(|source| SimError::Fixture {
            path: path.to_path_buf(),
            source,
        })
    }

    fn check(&self, scenario: ScenarioId, config: &NodeConfig, result: &ScenarioResult) -> Result<(), String> {
        let objects = SimulatedCapture::new(0).object_names().len();
        check_bounds(config, &result.snapshot)?;

        match scenario {
            ScenarioId::SteadyDraw => {
                expect_end(result, SessionEnd::SessionEnded)?;
                ensure(result.tracks == objects, format!("tracked {} objects, expected {}", result.tracks, objects))?;
                ensure(
                    result.counters.valid == result.master.positions_sent,
                    format!("{} valid of {} sent", result.counters.valid, result.master.positions_sent),
                )?;
                ensure(
                    result.counters.invalid == result.master.keepalives_sent,
                    format!("{} invalid of {} keep-alives", result.counters.invalid, result.master.keepalives_sent),
                )?;
                ensure(result.master.gate_flips == 2, format!("gate flipped {} times", result.master.gate_flips))?;
                ensure(result.snapshot.mean_distance.is_some(), "no mean distance recorded".to_string())
            }
            ScenarioId::LossyLink => {
                expect_end(result, SessionEnd::SessionEnded)?;
                ensure(
                    result.counters.received == result.link.delivered,
                    format!("received {} of {} delivered", result.counters.received, result.link.delivered),
                )?;
                ensure(result.link.dropped > 0, "link dropped nothing".to_string())?;
                ensure(
                    result.counters.valid < result.master.positions_sent,
                    "every position arrived over a lossy link".to_string(),
                )
            }
            ScenarioId::ReplayJunk => {
                let rounds = self.replay_rounds as u64;
                expect_end(result, SessionEnd::SessionEnded)?;
                ensure(result.ticks == rounds, format!("{} ticks for {} rounds", result.ticks, rounds))?;
                ensure(
                    result.counters.valid == rounds * objects as u64 && result.counters.invalid == rounds,
                    format!("counters {:?}", result.counters),
                )?;
                ensure(
                    result.master.lines_replayed == rounds * (objects as u64 + 1),
                    format!("replayed {} lines", result.master.lines_replayed),
                )
            }
            ScenarioId::Starvation => {
                expect_end(result, SessionEnd::NeverConnected)?;
                ensure(result.counters.received == 0, format!("received {}", result.counters.received))?;
                ensure(result.master.positions_sent == 0, "positions sent without data".to_string())?;
                ensure(
                    result.master.no_data_ticks == result.master.ticks,
                    format!("{} no-data ticks of {}", result.master.no_data_ticks, result.master.ticks),
                )
            }
        }
    }
}

fn ensure(condition: bool, reason: String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason)
    }
}

fn expect_end(result: &ScenarioResult, end: SessionEnd) -> Result<(), String> {
    ensure(
        result.session_end == Some(end),
        format!("session ended {:?}, expected {:?}", result.session_end, end),
    )
}

fn check_bounds(config: &NodeConfig, snapshot: &TrailExport) -> Result<(), String> {
    for track in &snapshot.tracks {
        ensure(
            track.history.len() <= config.trail.history_capacity
                && track.afterimages <= config.trail.afterimage_capacity
                && track.segments <= config.trail.segment_capacity,
            format!("track {} exceeds its bounds", track.name),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_draw() {
        let result = ScenarioRunner::new(42).run(ScenarioId::SteadyDraw).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        // Enabled for ticks 100..500, emitting every other tick
        assert_eq!(result.master.positions_sent, 200 * 4);
        assert_eq!(result.master.keepalives_sent, 400);
        assert_eq!(result.tracks, 4);
    }

    #[test]
    fn test_lossy_link() {
        let result = ScenarioRunner::new(42).run(ScenarioId::LossyLink).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.link.dropped > 0);
    }

    #[test]
    fn test_replay_junk() {
        let result = ScenarioRunner::new(7)
            .with_replay_rounds(30)
            .run(ScenarioId::ReplayJunk)
            .unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.ticks, 30);
    }

    #[test]
    fn test_starvation() {
        let result = ScenarioRunner::new(1).with_master_ticks(200).run(ScenarioId::Starvation).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.session_end, Some(SessionEnd::NeverConnected));
        assert_eq!(result.link.delivered, 0);
    }

    #[test]
    fn test_base_config_bounds_the_trails() {
        let mut base = NodeConfig::default();
        base.trail.history_capacity = 16;
        base.trail.segment_capacity = 50;
        base.trail.expected_objects = 2;

        let result = ScenarioRunner::new(42)
            .with_config(base)
            .run(ScenarioId::SteadyDraw)
            .unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        for track in &result.snapshot.tracks {
            assert!(track.history.len() <= 16);
            assert_eq!(track.segments, 50);
            assert!(track.segments_total > 50);
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let runner = ScenarioRunner::new(3);
        let a = runner.run(ScenarioId::LossyLink).unwrap();
        let b = runner.run(ScenarioId::LossyLink).unwrap();
        assert_eq!(a.link, b.link);
        assert_eq!(a.counters, b.counters);
    }
}
