//! Skeld simulator CLI
//!
//! Connects the simulation to a live controller over TCP, or runs the
//! scripted scenarios offline on a virtual clock.

use clap::Parser;
use skeld_core::{Game, GameRuntime, RuntimeConfig, RuntimeStats, SceneConfig, SceneError};
use skeld_env::{EnvError, GameContext, TcpTransport, TokioContext};
use skeld_sim::scenarios::ScenarioId;
use skeld_sim::{ScenarioResult, ScenarioRunner};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Stream used for the task shuffle, shared with the scenario harness.
const TASK_STREAM: u64 = 1;

/// Skeld hidden-role simulation
#[derive(Parser, Debug)]
#[command(name = "skeld-sim")]
#[command(about = "Run the Skeld simulation against a controller or offline scenarios", long_about = None)]
struct Args {
    /// Controller address for live mode
    #[arg(long, default_value = "127.0.0.1:12345")]
    connect: String,

    /// Run scripted scenarios instead of connecting to a controller
    #[arg(long)]
    offline: bool,

    /// Scenario to run offline (round_trip_kill, vent_travel, reactor_meltdown,
    /// emergency_meeting, electrical_blackout, link_loss, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Master seed for task assignment (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Simulation tick rate in Hz
    #[arg(long, default_value = "30")]
    tick_rate: u32,

    /// Batch window for ordinary events, in milliseconds
    #[arg(long, default_value = "100")]
    batch_window_ms: u64,

    /// Keep the clock running while a response is outstanding
    #[arg(long)]
    no_lockstep: bool,

    /// Resume the clock if the controller stays silent this long
    #[arg(long)]
    response_timeout_ms: Option<u64>,

    /// Scene file (JSON); defaults to the built-in Skeld map
    #[arg(long)]
    scene: Option<String>,

    /// Override which agent is the impostor
    #[arg(long)]
    impostor: Option<String>,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Write the controller transcript of a single offline scenario to JSON
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum LiveError {
    #[error("scene: {0}")]
    Scene(#[from] SceneError),

    #[error("controller link: {0}")]
    Link(#[from] EnvError),

    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if args.offline {
        run_offline(&args, seed);
        return;
    }

    match run_live(&args, seed) {
        Ok(stats) => {
            if args.json {
                match serde_json::to_string_pretty(&stats) {
                    Ok(text) => println!("{}", text),
                    Err(e) => error!("Failed to encode stats: {}", e),
                }
            }
        }
        Err(e) => {
            error!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn runtime_config(args: &Args) -> RuntimeConfig {
    RuntimeConfig::default()
        .with_tick_rate(args.tick_rate.max(1))
        .with_batch_window(Duration::from_millis(args.batch_window_ms))
        .with_lockstep(!args.no_lockstep)
        .with_response_timeout(args.response_timeout_ms.map(Duration::from_millis))
        .with_max_ticks(args.max_ticks)
}

fn load_scene(args: &Args) -> Result<SceneConfig, SceneError> {
    let scene = match &args.scene {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::skeld(),
    };
    match &args.impostor {
        Some(id) => scene.with_impostor(id),
        None => Ok(scene),
    }
}

// -------------------------------------------------------------------------
// Live mode
// -------------------------------------------------------------------------

fn run_live(args: &Args, seed: u64) -> Result<RuntimeStats, LiveError> {
    let scene = load_scene(args)?;
    let config = runtime_config(args);

    if !args.json {
        info!("Skeld Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Scene: {} waypoints, {} agents", scene.waypoints.len(), scene.agents.len());
    }

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(async move {
        let ctx = Arc::new(TokioContext::seeded(seed));
        let game = Game::from_scene(&scene, &mut ctx.derive_rng(TASK_STREAM))?;

        info!("Connecting to controller at {}", args.connect);
        let network = Arc::new(TcpTransport::connect(args.connect.as_str()).await?);

        let mut runtime = GameRuntime::new(ctx, network, game, config);
        runtime.start_receiver();
        let stats = runtime.run().await;

        match runtime.game().outcome() {
            Some(outcome) => info!("✓ Round over: {} after {:.1}s", outcome, runtime.game().time()),
            None => info!("Stopped after {} ticks without a winner", stats.ticks),
        }
        Ok::<_, LiveError>(stats)
    })
}

// -------------------------------------------------------------------------
// Offline scenarios
// -------------------------------------------------------------------------

fn run_offline(args: &Args, seed: u64) {
    if !args.json {
        info!("Skeld Scenario Harness v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: round_trip_kill, vent_travel, reactor_meltdown, emergency_meeting, electrical_blackout, link_loss, all");
            std::process::exit(1);
        })]
    };

    let mut runner = ScenarioRunner::new(seed)
        .with_tick_rate(args.tick_rate)
        .with_batch_window(Duration::from_millis(args.batch_window_ms))
        .with_lockstep(!args.no_lockstep);
    if let Some(max_ticks) = args.max_ticks {
        runner = runner.with_max_ticks(max_ticks);
    }

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let (result, transcript) = runner.run_with_transcript(scenarios[0]);
        match transcript.write_to_file(export_path) {
            Ok(()) => info!("Exported {} events to {}", transcript.entries.len(), export_path),
            Err(e) => error!("Failed to write export: {:?}", e),
        }
        report(&result, args.json);
        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        let result = runner.run(*scenario);
        if !args.json {
            report(&result, false);
        }
        all_results.push(result);
    }

    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} scenarios passed!", total);
        } else {
            error!("❌ {}/{} scenarios failed!", failed_count, total);
        }
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn report(result: &ScenarioResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode result: {}", e),
        }
        return;
    }
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED in {} ticks, {:.1}s game time",
            result.scenario.name(),
            result.seed,
            result.total_ticks,
            result.final_time_secs
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}
