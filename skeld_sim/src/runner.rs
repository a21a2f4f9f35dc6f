//! Scenario runner - executes scripted controller scenarios.
//!
//! Each scenario drives a real [`GameRuntime`] over a [`SimNetwork`] link on
//! a virtual clock. The controller end answers every flush (so lockstep never
//! stalls), and scripted actions ride on the next answer.

use crate::context::SimContext;
use crate::exporter::Transcript;
use crate::network::{SimLinkController, SimNetwork, SimPeer};
use crate::scenarios::ScenarioId;

use serde::Serialize;
use skeld_core::{ActionRecord, Agent, Game, GameOutcome, GameRuntime, RuntimeConfig, SceneConfig, SceneError};
use skeld_env::{GameContext, NetworkController};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// RNG stream used for task shuffling.
const TASK_STREAM: u64 = 1;

/// Receiver hand-off: yields per step so the spawned receiver can forward.
const RECEIVER_YIELDS: usize = 4;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    #[serde(serialize_with = "serialize_scenario")]
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final game time in seconds
    pub final_time_secs: f64,

    /// How the round ended, if it did
    pub outcome: Option<GameOutcome>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

fn serialize_scenario<S: serde::Serializer>(id: &ScenarioId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(id.name())
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Event frames read by the controller end
    pub frames_received: u64,

    /// Events inside those frames
    pub events_received: u64,

    /// Actions the controller sent
    pub actions_sent: u64,

    /// Actions the game rejected
    pub actions_rejected: u64,

    /// Ticks spent waiting on a lockstep response
    pub frozen_ticks: u64,

    /// Flushes triggered by meeting events
    pub priority_flushes: u64,

    /// Events dropped after the link went down
    pub events_discarded: u64,
}

/// Runs controller scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Runtime settings (tick rate, batching, lockstep)
    config: RuntimeConfig,

    /// Tick budget per scenario
    max_ticks: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: RuntimeConfig::default(),
            max_ticks: 3_000,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz.max(1);
        self
    }

    /// Sets the batch window.
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.config.batch_window = window;
        self
    }

    /// Turns lockstep freezing on or off.
    pub fn with_lockstep(mut self, lockstep: bool) -> Self {
        self.config.lockstep = lockstep;
        self
    }

    /// Sets the tick budget per scenario.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_with_transcript(scenario).0
    }

    /// Runs a scenario and also returns everything the controller received.
    pub fn run_with_transcript(&self, scenario: ScenarioId) -> (ScenarioResult, Transcript) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                return (
                    self.failed(scenario, format!("failed to build runtime: {}", e)),
                    Transcript::new(scenario.name(), self.seed),
                )
            }
        };
        rt.block_on(self.run_async(scenario))
    }

    async fn run_async(&self, scenario: ScenarioId) -> (ScenarioResult, Transcript) {
        let mut harness = match Harness::new(self.seed, self.config.clone(), self.max_ticks) {
            Ok(h) => h,
            Err(e) => {
                return (
                    self.failed(scenario, format!("scene failed to load: {}", e)),
                    Transcript::new(scenario.name(), self.seed),
                )
            }
        };
        harness.transcript.scenario = scenario.name().to_string();

        let verdict = match scenario {
            ScenarioId::RoundTripKill => round_trip_kill(&mut harness).await,
            ScenarioId::VentTravel => vent_travel(&mut harness).await,
            ScenarioId::ReactorMeltdown => reactor_meltdown(&mut harness).await,
            ScenarioId::EmergencyMeeting => emergency_meeting(&mut harness).await,
            ScenarioId::ElectricalBlackout => electrical_blackout(&mut harness).await,
            ScenarioId::LinkLoss => link_loss(&mut harness).await,
        };
        harness.finish().await;

        let game = harness.runtime.game();
        let stats = harness.runtime.stats();
        let outcome = game.outcome();
        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: verdict.is_ok(),
            total_ticks: harness.runtime.tick_count(),
            final_time_secs: game.time(),
            outcome,
            failure_reason: verdict.err(),
            metrics: ScenarioMetrics {
                frames_received: harness.transcript.frames,
                events_received: harness.transcript.entries.len() as u64,
                actions_sent: harness.actions_sent,
                actions_rejected: stats.actions_rejected,
                frozen_ticks: stats.frozen_ticks,
                priority_flushes: stats.priority_flushes,
                events_discarded: stats.events_discarded,
            },
        };

        let mut transcript = harness.transcript;
        transcript.finalize(result.passed, outcome.map(|o| o.to_string()));
        (result, transcript)
    }

    fn failed(&self, scenario: ScenarioId, reason: String) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            outcome: None,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HARNESS - scripted controller on the far end of the link
// ═══════════════════════════════════════════════════════════════════════════

struct Harness {
    ctx: Arc<SimContext>,
    runtime: GameRuntime<SimContext, SimNetwork>,
    peer: SimPeer,
    link: SimLinkController,
    transcript: Transcript,
    pending: Vec<ActionRecord>,
    actions_sent: u64,
    max_ticks: u64,
}

impl Harness {
    fn new(seed: u64, config: RuntimeConfig, max_ticks: u64) -> Result<Self, SceneError> {
        let ctx = SimContext::shared(seed);
        let mut rng = ctx.derive_rng(TASK_STREAM);
        let game = Game::from_scene(&SceneConfig::skeld(), &mut rng)?;

        let (network, peer, link) = SimNetwork::pair();
        let mut runtime = GameRuntime::new(Arc::clone(&ctx), Arc::new(network), game, config);
        runtime.start_receiver();

        Ok(Self {
            ctx,
            runtime,
            peer,
            link,
            transcript: Transcript::new("", seed),
            pending: Vec::new(),
            actions_sent: 0,
            max_ticks,
        })
    }

    fn game(&self) -> &Game {
        self.runtime.game()
    }

    fn agent(&self, id: &str) -> Result<&Agent, String> {
        self.game()
            .agent(id)
            .ok_or_else(|| format!("no agent '{}' in scene", id))
    }

    fn location_of(&self, id: &str) -> Option<String> {
        let game = self.game();
        let room = game.agent(id)?.location()?;
        Some(game.graph().name(room).to_string())
    }

    fn is_dead(&self, id: &str) -> bool {
        self.game().agent(id).is_some_and(|a| !a.is_alive())
    }

    /// Scenario setup: teleports an agent before the script starts.
    fn place(&mut self, id: &str, room: &str) -> Result<(), String> {
        self.runtime
            .game_mut()
            .place_agent(id, room)
            .map_err(|e| format!("cannot place {} in {}: {}", id, room, e))
    }

    /// Queues an action for the controller's next answer.
    fn queue(&mut self, agent: &str, kind: &str, details: &str) {
        self.pending.push(ActionRecord::new(agent, kind, details));
    }

    /// One runtime tick followed by the controller's turn.
    async fn step(&mut self) {
        let tick = self.runtime.tick_once().await;
        self.ctx.advance_time(self.runtime.config.tick_interval());

        let mut flushed = false;
        while let Some(frame) = self.peer.try_next() {
            self.transcript.record_frame(tick, frame.as_str());
            flushed = true;
        }

        let answer_due = flushed || (!self.pending.is_empty() && !self.runtime.clock().is_awaiting());
        if answer_due && !self.link.is_severed() {
            let batch = std::mem::take(&mut self.pending);
            match self.peer.send_actions(&batch) {
                Ok(()) => self.actions_sent += batch.len() as u64,
                Err(e) => debug!("Controller answer not delivered: {}", e),
            }
        }

        for _ in 0..RECEIVER_YIELDS {
            tokio::task::yield_now().await;
        }
    }

    /// Steps until `done` holds, at most `budget` ticks (capped by the
    /// runner's limit). Returns whether it held.
    async fn run_until<F>(&mut self, budget: u64, done: F) -> bool
    where
        F: Fn(&Harness) -> bool,
    {
        for _ in 0..budget.min(self.max_ticks) {
            self.step().await;
            if done(self) {
                return true;
            }
        }
        false
    }

    /// Pushes out whatever is still queued and records it.
    async fn finish(&mut self) {
        self.runtime.flush_pending().await;
        let tick = self.runtime.tick_count();
        while let Some(frame) = self.peer.try_next() {
            self.transcript.record_frame(tick, frame.as_str());
        }
    }
}

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

/// SKD-001: kill in Storage, cooldown restarts, Green reports, vote skips.
async fn round_trip_kill(h: &mut Harness) -> Result<(), String> {
    info!("SKD-001: RoundTripKill");
    h.place("Pink", "Storage")?;
    h.place("Blue", "Storage")?;
    h.step().await;

    h.queue("Pink", "kill", "");
    let killed = h
        .run_until(60, |h| h.is_dead("Blue") && h.transcript.contains("completeKill", Some("Pink")))
        .await;
    ensure(killed, || "Blue was not killed within 60 ticks".to_string())?;
    ensure(!h.agent("Pink")?.kill_cooldown.is_ready(), || {
        "kill cooldown did not restart".to_string()
    })?;

    h.place("Green", "Storage")?;
    h.queue("Green", "report", "");
    let reported = h
        .run_until(60, |h| h.transcript.contains("bodyFound", Some("Green")))
        .await;
    ensure(reported, || "report did not open a meeting".to_string())?;

    h.queue("Green", "vote", "skip");
    let ended = h
        .run_until(60, |h| h.transcript.contains("meetingEnd", Some("Green")))
        .await;
    ensure(ended, || "meeting never ended".to_string())?;

    let blue_room = h.location_of("Blue");
    ensure(blue_room.as_deref() == Some("Dead Drop"), || {
        format!("Blue's body left in {:?}", blue_room)
    })?;
    ensure(h.location_of("Pink").as_deref() == Some("Cafeteria"), || {
        "Pink not back in the cafeteria".to_string()
    })
}

/// SKD-002: Pink vents Electrical → MedBay past two witnesses.
async fn vent_travel(h: &mut Harness) -> Result<(), String> {
    info!("SKD-002: VentTravel");
    h.place("Pink", "Electrical")?;
    h.place("Blue", "Electrical")?;
    h.place("Yellow", "MedBay")?;
    h.step().await;

    h.queue("Pink", "vent", "MedBay");
    let vented = h.run_until(30, |h| h.transcript.contains("vent", Some("Pink"))).await;
    ensure(vented, || "vent event never arrived".to_string())?;

    let room = h.location_of("Pink");
    ensure(room.as_deref() == Some("MedBay"), || format!("Pink ended in {:?}", room))?;
    ensure(h.transcript.contains("seeEnterVent", Some("Blue")), || {
        "Blue did not see Pink enter the vent".to_string()
    })?;
    ensure(h.transcript.contains("seeExitVent", Some("Yellow")), || {
        "Yellow did not see Pink leave the vent".to_string()
    })
}

/// SKD-003: reactor sabotage nobody fixes.
async fn reactor_meltdown(h: &mut Harness) -> Result<(), String> {
    info!("SKD-003: ReactorMeltdown");
    h.step().await;
    h.queue("Pink", "sabotage", "reactor");

    let over = h.run_until(3_000, |h| h.game().is_over()).await;
    ensure(over, || "reactor never expired".to_string())?;
    ensure(h.game().outcome() == Some(GameOutcome::ImpostorWin), || {
        format!("unexpected outcome {:?}", h.game().outcome())
    })?;

    h.finish().await;
    let notified = h.transcript.find("gameOver", None).count();
    ensure(notified == h.game().agents().len(), || {
        format!("gameOver reached {} agents", notified)
    })
}

/// SKD-004: Blue hits the button, the meeting flushes at once, Pink is voted out.
async fn emergency_meeting(h: &mut Harness) -> Result<(), String> {
    info!("SKD-004: EmergencyMeeting");
    h.step().await;
    h.queue("Blue", "callMeeting", "");

    let called = h
        .run_until(10, |h| h.transcript.contains("emergencyMeeting", Some("Blue")))
        .await;
    ensure(called, || "emergencyMeeting never arrived".to_string())?;
    ensure(h.runtime.stats().priority_flushes >= 1, || {
        "meeting did not take the priority path".to_string()
    })?;

    let frozen_at = h.game().time();
    h.run_until(5, |_| false).await;
    ensure(h.game().time() == frozen_at, || "clock ran during the meeting".to_string())?;

    h.queue("Blue", "vote", "I vote Pink");
    let over = h.run_until(30, |h| h.game().is_over()).await;
    ensure(over, || "vote did not end the round".to_string())?;
    ensure(h.game().outcome() == Some(GameOutcome::CrewmateWin), || {
        format!("unexpected outcome {:?}", h.game().outcome())
    })
}

/// SKD-005: lights out until Green walks to Electrical.
async fn electrical_blackout(h: &mut Harness) -> Result<(), String> {
    info!("SKD-005: ElectricalBlackout");
    h.step().await;
    h.queue("Pink", "sabotage", "Electrical");
    h.queue("Green", "move", "Electrical");

    let started = h.run_until(10, |h| h.game().sabotage().is_electrical_active()).await;
    ensure(started, || "electrical sabotage never started".to_string())?;

    let fixed = h
        .run_until(2_000, |h| {
            !h.game().sabotage().is_active() && h.transcript.contains("sabotageEnd", Some("Green"))
        })
        .await;
    ensure(fixed, || "lights were never fixed".to_string())?;
    ensure(h.location_of("Green").as_deref() == Some("Electrical"), || {
        "Green is not in Electrical".to_string()
    })
}

/// SKD-006: link severed while Blue walks to Admin.
async fn link_loss(h: &mut Harness) -> Result<(), String> {
    info!("SKD-006: LinkLoss");
    h.step().await;
    h.queue("Blue", "move", "Admin");
    h.run_until(30, |_| false).await;

    let before = h.game().time();
    h.link.sever();

    let detected = h.run_until(30, |h| h.runtime.clock().is_link_lost()).await;
    ensure(detected, || "link loss not detected".to_string())?;

    let arrived = h
        .run_until(900, |h| h.location_of("Blue").as_deref() == Some("Admin"))
        .await;
    ensure(h.game().time() > before, || "clock stopped after link loss".to_string())?;
    ensure(arrived, || "Blue never reached Admin after the link dropped".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_kill_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::RoundTripKill);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.frames_received > 0);
    }

    #[test]
    fn test_vent_travel_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::VentTravel);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_reactor_meltdown_scenario() {
        let result = ScenarioRunner::new(7).run(ScenarioId::ReactorMeltdown);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.outcome, Some(GameOutcome::ImpostorWin));
        assert!(result.final_time_secs >= 30.0);
    }

    #[test]
    fn test_emergency_meeting_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::EmergencyMeeting);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.outcome, Some(GameOutcome::CrewmateWin));
    }

    #[test]
    fn test_electrical_blackout_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::ElectricalBlackout);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_link_loss_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::LinkLoss);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_same_seed_same_transcript() {
        let runner = ScenarioRunner::new(1234);
        let (_, first) = runner.run_with_transcript(ScenarioId::VentTravel);
        let (_, second) = runner.run_with_transcript(ScenarioId::VentTravel);
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn test_without_lockstep_nothing_freezes() {
        let result = ScenarioRunner::new(42)
            .with_lockstep(false)
            .run(ScenarioId::RoundTripKill);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.frozen_ticks, 0);
    }
}
