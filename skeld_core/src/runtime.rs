//! Game Runtime - drives a [`Game`] against an environment context and a
//! controller link.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       GameRuntime                           │
//! │                                                             │
//! │   receiver task ──(parsed batches, mpsc)──┐                 │
//! │     net.recv()                            ▼                 │
//! │                               ┌──────────────────────┐      │
//! │   ctx.sleep(1/tick_rate) ───► │ tick_once            │      │
//! │                               │  1. apply batches    │      │
//! │                               │  2. game.tick(dt)    │      │
//! │                               │  3. flush if due     │──► net.send()
//! │                               │  4. freeze (lockstep)│      │
//! │                               └──────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use skeld_core::{Game, GameRuntime, RuntimeConfig, SceneConfig};
//! use skeld_env::{TcpTransport, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let net = Arc::new(TcpTransport::connect("127.0.0.1:12345").await?);
//! let game = Game::from_scene(&SceneConfig::skeld(), &mut ctx.derive_rng(0))?;
//!
//! let mut runtime = GameRuntime::new(ctx, net, game, RuntimeConfig::default());
//! runtime.start_receiver();
//! runtime.run().await;
//! ```

use crate::game::Game;
use crate::lockstep::{FlushReason, LockstepClock, LockstepConfig};
use crate::protocol::{encode_batch, parse_actions, ActionRecord};
use serde::Serialize;
use skeld_env::{GameContext, NetworkTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

/// Configuration for a game runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Tick rate in Hz (default: 30)
    pub tick_rate_hz: u32,

    /// How long ordinary events accumulate before a flush (default: 100ms)
    pub batch_window: Duration,

    /// Freeze game time after each flush until a response arrives (default: on)
    pub lockstep: bool,

    /// Resume the clock if no response arrives within this long (default: wait forever)
    pub response_timeout: Option<Duration>,

    /// Leave the run loop once the round is decided (default: true)
    pub stop_on_game_over: bool,

    /// Hard stop after this many ticks (default: none)
    pub max_ticks: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30,
            batch_window: Duration::from_millis(100),
            lockstep: true,
            response_timeout: None,
            stop_on_game_over: true,
            max_ticks: None,
        }
    }
}

impl RuntimeConfig {
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    pub fn with_lockstep(mut self, lockstep: bool) -> Self {
        self.lockstep = lockstep;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Seconds of game time per tick.
    pub fn tick_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz.max(1) as f64
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_dt())
    }

    fn lockstep_config(&self) -> LockstepConfig {
        LockstepConfig {
            batch_window: self.batch_window,
            lockstep: self.lockstep,
            response_timeout: self.response_timeout,
        }
    }
}

/// Counters collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub frozen_ticks: u64,
    pub frames_sent: u64,
    pub events_sent: u64,
    pub priority_flushes: u64,
    pub batches_received: u64,
    pub actions_applied: u64,
    pub actions_rejected: u64,
    pub events_discarded: u64,
    pub send_failures: u64,
    pub response_timeouts: u64,
}

/// Drives one game over one controller link.
///
/// Generic over the context and network implementations, so the same loop
/// runs against a live TCP controller or inside the deterministic harness.
pub struct GameRuntime<Ctx, Net>
where
    Ctx: GameContext,
    Net: NetworkTransport,
{
    /// Environment context
    pub context: Arc<Ctx>,

    /// Controller link
    pub network: Arc<Net>,

    /// Configuration
    pub config: RuntimeConfig,

    game: Game,
    clock: LockstepClock,
    inbound: Option<mpsc::UnboundedReceiver<Vec<ActionRecord>>>,
    tick_count: u64,
    stats: RuntimeStats,
}

impl<Ctx, Net> GameRuntime<Ctx, Net>
where
    Ctx: GameContext,
    Net: NetworkTransport,
{
    pub fn new(context: Arc<Ctx>, network: Arc<Net>, game: Game, config: RuntimeConfig) -> Self {
        let clock = LockstepClock::new(config.lockstep_config());
        Self {
            context,
            network,
            config,
            game,
            clock,
            inbound: None,
            tick_count: 0,
            stats: RuntimeStats::default(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn into_game(self) -> Game {
        self.game
    }

    pub fn clock(&self) -> &LockstepClock {
        &self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    /// Spawns the receiver loop. Calling it twice replaces the first channel.
    pub fn start_receiver(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inbound = Some(rx);
        self.context
            .spawn("skeld-receiver", receive_loop(Arc::clone(&self.network), tx));
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Runs one tick and returns the new tick count.
    pub async fn tick_once(&mut self) -> u64 {
        self.tick_count += 1;
        self.stats.ticks += 1;

        self.apply_inbound();

        let now = self.context.now();
        if self.clock.poll_timeout(now) {
            self.stats.response_timeouts += 1;
        }

        let dt = if self.clock.is_frozen() {
            self.stats.frozen_ticks += 1;
            0.0
        } else {
            self.config.tick_dt()
        };
        self.game.tick(dt);

        self.flush_if_due(now).await;
        self.tick_count
    }

    /// Ticks at the configured rate until the round ends or `max_ticks`.
    pub async fn run(&mut self) -> RuntimeStats {
        let interval = self.config.tick_interval();
        info!(
            "Runtime starting: {} Hz, batch window {}ms, lockstep {}",
            self.config.tick_rate_hz,
            self.config.batch_window.as_millis(),
            if self.config.lockstep { "on" } else { "off" }
        );

        loop {
            self.tick_once().await;

            if self.config.stop_on_game_over && self.game.is_over() {
                self.flush_pending().await;
                info!("Round decided after {} ticks, stopping", self.tick_count);
                break;
            }
            if self.config.max_ticks.is_some_and(|max| self.tick_count >= max) {
                info!("Reached max ticks ({}), stopping", self.tick_count);
                break;
            }
            self.context.sleep(interval).await;
        }
        self.stats.clone()
    }

    /// Applies every batch the receiver has forwarded. Each one counts as a
    /// lockstep response, empty batches included.
    fn apply_inbound(&mut self) {
        let Some(rx) = self.inbound.as_mut() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(batch) => {
                    self.stats.batches_received += 1;
                    let report = self.game.dispatch(&batch);
                    self.stats.actions_applied += report.applied as u64;
                    self.stats.actions_rejected += report.rejected.len() as u64;
                    self.clock.on_response();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Controller link lost; simulation continues without lockstep");
                    self.clock.on_link_lost();
                    self.inbound = None;
                    break;
                }
            }
        }
    }

    async fn flush_if_due(&mut self, now: Duration) {
        let outbox = self.game.outbox().clone();
        let Some(reason) = self.clock.should_flush(now, outbox.len(), outbox.has_priority()) else {
            return;
        };
        if reason == FlushReason::Priority {
            self.stats.priority_flushes += 1;
        }
        self.send_batch().await;
        self.clock.on_flushed(now);
    }

    /// Sends whatever is queued, ignoring the batch window.
    pub async fn flush_pending(&mut self) {
        if !self.game.outbox().is_empty() {
            self.send_batch().await;
        }
    }

    async fn send_batch(&mut self) {
        let batch = self.game.outbox().take_batch();
        if batch.is_empty() {
            return;
        }
        if self.clock.is_link_lost() {
            self.stats.events_discarded += batch.len() as u64;
            debug!("Link lost, discarding {} events", batch.len());
            return;
        }

        let frame = match encode_batch(&batch) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} events: {}", batch.len(), e);
                self.stats.events_discarded += batch.len() as u64;
                return;
            }
        };

        debug!("Flushing {} events ({} bytes) to {}", batch.len(), frame.size(), self.network.peer());
        match self.network.send(frame).await {
            Ok(()) => {
                self.stats.frames_sent += 1;
                self.stats.events_sent += batch.len() as u64;
            }
            Err(e) => {
                error!("Failed to send events to {}: {}", self.network.peer(), e);
                self.stats.send_failures += 1;
                self.stats.events_discarded += batch.len() as u64;
                self.clock.on_link_lost();
            }
        }
    }
}

/// Reads frames until the link closes, forwarding each parsed batch.
async fn receive_loop<Net: NetworkTransport>(
    network: Arc<Net>,
    tx: mpsc::UnboundedSender<Vec<ActionRecord>>,
) {
    while let Some(frame) = network.recv().await {
        match parse_actions(frame.as_str()) {
            Ok(batch) => {
                debug!("Received {} actions from {}", batch.len(), network.peer());
                if tx.send(batch).is_err() {
                    debug!("Runtime gone, receiver exiting");
                    return;
                }
            }
            Err(e) => warn!("Dropping frame from {}: {}", network.peer(), e),
        }
    }
    info!("Link to {} closed, receiver exiting", network.peer());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::small_game;
    use async_trait::async_trait;
    use skeld_env::{EnvError, Frame, TokioContext};
    use std::sync::Mutex;

    /// In-memory link: frames pushed through `inject` come out of `recv`.
    struct MockLink {
        sent: Mutex<Vec<Frame>>,
        inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
    }

    fn mock_link() -> (Arc<MockLink>, mpsc::UnboundedSender<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = MockLink {
            sent: Mutex::new(Vec::new()),
            inbound: tokio::sync::Mutex::new(rx),
        };
        (Arc::new(link), tx)
    }

    impl MockLink {
        fn sent(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|f| f.as_str().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl NetworkTransport for MockLink {
        async fn send(&self, frame: Frame) -> Result<(), EnvError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&self) -> Option<Frame> {
            self.inbound.lock().await.recv().await
        }

        fn peer(&self) -> String {
            "mock".to_string()
        }
    }

    fn runtime(link: Arc<MockLink>) -> GameRuntime<TokioContext, MockLink> {
        let config = RuntimeConfig::default().with_batch_window(Duration::ZERO);
        GameRuntime::new(TokioContext::shared(), link, small_game(), config)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[test]
    fn test_runtime_config_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.tick_rate_hz, 30);
        assert_eq!(config.batch_window, Duration::from_millis(100));
        assert!(config.lockstep);
        assert!(config.response_timeout.is_none());
        assert!(config.stop_on_game_over);
    }

    #[tokio::test]
    async fn test_lockstep_freezes_until_response() {
        let (link, inject) = mock_link();
        let mut rt = runtime(Arc::clone(&link));
        rt.start_receiver();

        rt.game_mut().dispatch(&[ActionRecord::new("Blue", "move", "Cafeteria")]);
        rt.tick_once().await;
        assert_eq!(link.sent().len(), 1);
        assert!(link.sent()[0].contains("reachLocation"));
        assert!(rt.clock().is_frozen());

        let frozen_at = rt.game().time();
        rt.tick_once().await;
        rt.tick_once().await;
        assert_eq!(rt.game().time(), frozen_at);

        inject.send(Frame::new("[]")).unwrap();
        settle().await;
        rt.tick_once().await;
        assert!(rt.game().time() > frozen_at);
        assert_eq!(rt.stats().batches_received, 1);
    }

    #[tokio::test]
    async fn test_response_timeout_resumes_and_late_reply_is_absorbed() {
        let (link, inject) = mock_link();
        let config = RuntimeConfig::default()
            .with_batch_window(Duration::ZERO)
            .with_response_timeout(Some(Duration::from_millis(200)));
        let mut rt = GameRuntime::new(TokioContext::shared(), Arc::clone(&link), small_game(), config);
        rt.start_receiver();

        rt.game_mut().dispatch(&[ActionRecord::new("Blue", "move", "Cafeteria")]);
        rt.tick_once().await;
        assert!(rt.clock().is_frozen());
        let frozen_at = rt.game().time();

        // Controller stays silent past the timeout.
        tokio::time::sleep(Duration::from_millis(250)).await;
        rt.tick_once().await;
        assert_eq!(rt.stats().response_timeouts, 1);
        assert!(rt.game().time() > frozen_at);

        rt.game_mut().dispatch(&[ActionRecord::new("Blue", "move", "Cafeteria")]);
        rt.tick_once().await;
        assert_eq!(link.sent().len(), 2);
        assert!(rt.clock().is_frozen());
        let frozen_at = rt.game().time();

        // The reply to the first batch arrives late and must not resume.
        inject.send(Frame::new("[]")).unwrap();
        settle().await;
        rt.tick_once().await;
        assert!(rt.clock().is_frozen());
        assert_eq!(rt.game().time(), frozen_at);

        inject.send(Frame::new("[]")).unwrap();
        settle().await;
        rt.tick_once().await;
        assert!(!rt.clock().is_frozen());
        assert!(rt.game().time() > frozen_at);
        assert_eq!(rt.stats().batches_received, 2);
    }

    #[tokio::test]
    async fn test_inbound_actions_are_applied() {
        let (link, inject) = mock_link();
        let mut rt = runtime(Arc::clone(&link));
        rt.start_receiver();

        inject
            .send(Frame::new(r#"[{"agent":"Blue","type":"move","details":"Hallway"},{"agent":"Blue","type":"kill","details":""}]"#))
            .unwrap();
        settle().await;
        rt.tick_once().await;

        assert_eq!(rt.stats().actions_applied, 1);
        assert_eq!(rt.stats().actions_rejected, 1);
        assert!(rt.game().agent("Blue").unwrap().follower.is_moving());
    }

    #[tokio::test]
    async fn test_meeting_flushes_at_once() {
        let (link, inject) = mock_link();
        let config = RuntimeConfig::default();
        let mut rt = GameRuntime::new(TokioContext::shared(), Arc::clone(&link), small_game(), config);
        rt.start_receiver();

        inject
            .send(Frame::new(r#"{"agent":"Blue","type":"callmeeting","details":""}"#))
            .unwrap();
        settle().await;
        rt.tick_once().await;

        let sent = link.sent();
        assert_eq!(sent.len(), 1, "priority events skip the 100ms window");
        assert!(sent[0].contains("emergencyMeeting"));
        assert_eq!(rt.stats().priority_flushes, 1);
    }

    #[tokio::test]
    async fn test_link_loss_keeps_ticking() {
        let (link, inject) = mock_link();
        let mut rt = runtime(Arc::clone(&link));
        rt.start_receiver();

        inject.send(Frame::new("definitely not json")).unwrap();
        drop(inject);
        settle().await;

        rt.game_mut().dispatch(&[ActionRecord::new("Blue", "move", "Cafeteria")]);
        for _ in 0..5 {
            rt.tick_once().await;
        }
        assert!(rt.clock().is_link_lost());
        assert!(!rt.clock().is_frozen());
        assert!(rt.game().time() > 0.1);
        assert_eq!(rt.stats().batches_received, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_max_ticks() {
        let (link, _inject) = mock_link();
        let config = RuntimeConfig::default()
            .with_tick_rate(1000)
            .with_lockstep(false)
            .with_max_ticks(Some(10));
        let mut rt = GameRuntime::new(TokioContext::shared(), link, small_game(), config);

        let stats = rt.run().await;
        assert_eq!(stats.ticks, 10);
        assert_eq!(stats.frozen_ticks, 0);
    }
}
