//! Gesture Trails CLI
//!
//! `master` broadcasts positions, `slave` receives and draws them, `sim`
//! runs the deterministic master/slave scenarios.

use clap::{Args, Parser, Subcommand};
use gesture_core::{
    DecodePolicy, NodeConfig, NodeError, Renderer, SlaveNode, StatsRenderer, TickMode, Transmitter,
};
use gesture_env::{TokioContext, UdpTransport};
use gesture_sim::{RerunRenderer, ScenarioId, ScenarioResult, ScenarioRunner, SimError, SimulatedCapture};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Subnet broadcast address of the installation network.
const DEFAULT_DESTINATION: &str = "10.2.255.255:25884";

/// Port every slave listens on.
const DEFAULT_PORT: &str = "25884";

#[derive(Parser, Debug)]
#[command(name = "gesture-trails")]
#[command(about = "Motion-capture gesture trails over UDP broadcast", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file; flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Broadcast object positions
    Master {
        #[command(subcommand)]
        mode: MasterMode,
    },

    /// Receive positions and draw trails until the master goes quiet
    Slave(SlaveArgs),

    /// Run simulation scenarios
    Sim(SimArgs),
}

#[derive(Subcommand, Debug)]
enum MasterMode {
    /// Re-broadcast a recorded file, one datagram per line
    Replay {
        /// Recorded file
        #[arg(short, long)]
        file: PathBuf,

        /// Destination address
        #[arg(long, default_value = DEFAULT_DESTINATION)]
        dest: SocketAddr,
    },

    /// Poll the capture device and broadcast tracked objects
    Live {
        /// Capture server host
        #[arg(short, long, default_value = "localhost")]
        target: String,

        /// Comma-separated object names to broadcast
        #[arg(short, long, value_delimiter = ',', default_value = "LeftHand,RightHand,Head,Wand")]
        objects: Vec<String>,

        /// Object whose height toggles drawing
        #[arg(long, default_value = "Wand")]
        trigger: String,

        /// Also append every emitted line to this file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Destination address
        #[arg(long, default_value = DEFAULT_DESTINATION)]
        dest: SocketAddr,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Seed of the simulated performer
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[derive(Args, Debug)]
struct SlaveArgs {
    /// Port to listen on
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: u16,

    /// Number of tracked objects the distance series waits for
    #[arg(short, long)]
    expected: Option<usize>,

    /// Invalid lines close ticks (for replayed recordings)
    #[arg(long)]
    delimited: bool,

    /// Reject coordinates that are not complete numbers
    #[arg(long)]
    strict: bool,

    /// Do not record line segments
    #[arg(long)]
    no_segments: bool,

    /// Write a JSON snapshot of the trails on exit
    #[arg(long)]
    export: Option<PathBuf>,

    /// Draw in a Rerun viewer
    #[arg(long)]
    rerun: bool,
}

#[derive(Args, Debug)]
struct SimArgs {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (steady_draw, lossy_link, replay_junk, starvation, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Write full results, trail snapshots included, to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Draw the slave side in a Rerun viewer
    #[arg(long)]
    rerun: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, SimError> {
    let config = match &cli.config {
        Some(path) => NodeConfig::from_json_file(path)?,
        None => NodeConfig::default(),
    };

    match cli.command {
        Command::Master { mode } => run_master(config, mode),
        Command::Slave(args) => run_slave(config, args),
        Command::Sim(args) => run_sim(config, args),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, SimError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(SimError::Runtime)
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn run_master(config: NodeConfig, mode: MasterMode) -> Result<ExitCode, SimError> {
    let rt = runtime()?;
    rt.block_on(async move {
        match mode {
            MasterMode::Replay { file, dest } => {
                let network = Arc::new(UdpTransport::broadcaster(dest).await.map_err(NodeError::from)?);
                let mut master = Transmitter::new(TokioContext::shared(), network, config.transmit, config.gate);

                tokio::select! {
                    result = master.run_replay(&file) => { result?; }
                    _ = shutdown_signal() => info!("replay interrupted"),
                }
                info!("replayed {} lines", master.stats().lines_replayed);
            }
            MasterMode::Live {
                target,
                objects,
                trigger,
                log,
                dest,
                ticks,
                seed,
            } => {
                let network = Arc::new(UdpTransport::broadcaster(dest).await.map_err(NodeError::from)?);
                let mut master = Transmitter::new(TokioContext::shared(), network, config.transmit, config.gate);
                if let Some(path) = log {
                    master = master.with_log_file(path).await?;
                }

                // Simulated performer: wand raised for 10 ticks every 30 s
                let windows = (0..120u64).map(|i| i * 3000 + 500..i * 3000 + 510).collect();
                let mut capture = SimulatedCapture::new(seed).with_raise_windows(windows);

                let outcome = tokio::select! {
                    result = master.run_live(&mut capture, &target, &objects, &trigger, ticks) => result.map(|_| ()),
                    _ = shutdown_signal() => {
                        info!("master interrupted");
                        Ok(())
                    }
                };
                master.flush_log().await?;
                outcome?;

                let stats = master.stats();
                info!(
                    "master sent {} positions and {} keep-alives over {} ticks",
                    stats.positions_sent, stats.keepalives_sent, stats.ticks
                );
            }
        }
        Ok::<_, SimError>(ExitCode::SUCCESS)
    })
}

fn run_slave(mut config: NodeConfig, args: SlaveArgs) -> Result<ExitCode, SimError> {
    if let Some(expected) = args.expected {
        config.trail.expected_objects = expected;
    }
    if args.delimited {
        config.trail.tick_mode = TickMode::Delimited;
    }
    if args.strict {
        config.trail.decode_policy = DecodePolicy::Strict;
    }
    if args.no_segments {
        config.trail.record_segments = false;
    }
    config.validate()?;

    let rt = runtime()?;
    rt.block_on(async move {
        let network = Arc::new(UdpTransport::listener(args.port).await.map_err(NodeError::from)?);
        let node = SlaveNode::new(TokioContext::shared(), network, config.clone());

        let mut renderer: Box<dyn Renderer> = if args.rerun {
            Box::new(RerunRenderer::new("gesture_trails"))
        } else {
            Box::new(StatsRenderer::new(config.render.stats_every))
        };

        let end = node.run_until(renderer.as_mut(), shutdown_signal()).await?;
        info!("slave exiting: {:?}", end);

        if let Some(path) = &args.export {
            node.snapshot().write_to_file(path).await?;
        }
        Ok::<_, SimError>(ExitCode::SUCCESS)
    })
}

fn run_sim(config: NodeConfig, args: SimArgs) -> Result<ExitCode, SimError> {
    if !args.json {
        info!("Gesture Trails Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                error!("{}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(ScenarioId::name).collect();
                error!("Available scenarios: {}, all", names.join(", "));
                return Ok(ExitCode::FAILURE);
            }
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    } else {
        args.seed
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut rerun = args.rerun.then(|| RerunRenderer::new("gesture_trails_sim"));

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed).with_config(config.clone());

        for scenario in &scenarios {
            let result = match rerun.as_mut() {
                Some(renderer) => runner.run_with_renderer(*scenario, renderer)?,
                None => runner.run(*scenario)?,
            };

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "session_end": r.session_end,
                    "counters": r.counters,
                    "link": r.link,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        let text = serde_json::to_string_pretty(&summary).map_err(|e| NodeError::Export(e.to_string()))?;
        println!("{}", text);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if let Some(path) = &args.export {
        export_results(path, &all_results)?;
    }

    // Exit with proper code for CI
    Ok(if failed_count > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn export_results(path: &Path, results: &[ScenarioResult]) -> Result<(), SimError> {
    let text = serde_json::to_string_pretty(results).map_err(|e| NodeError::Export(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| NodeError::Export(format!("{}: {}", path.display(), e)))?;
    info!("results written to {}", path.display());
    Ok(())
}
