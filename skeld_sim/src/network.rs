//! Simulated controller link with fault injection.
//!
//! [`SimNetwork::pair`] returns the simulation end (a `NetworkTransport`),
//! the controller end ([`SimPeer`]) and a [`SimLinkController`] that can
//! sever the link mid-run.

use async_trait::async_trait;
use skeld_core::ActionRecord;
use skeld_env::{EnvError, Frame, NetworkController, NetworkTransport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// State shared by both ends and the controller.
struct LinkState {
    severed: watch::Sender<bool>,
    dropped: AtomicU64,
}

impl LinkState {
    fn is_severed(&self) -> bool {
        *self.severed.borrow()
    }
}

/// Simulation end of an in-process link.
pub struct SimNetwork {
    /// Frames to the controller
    outbound: mpsc::UnboundedSender<Frame>,

    /// Frames from the controller (behind tokio mutex for async)
    inbound: Mutex<mpsc::UnboundedReceiver<Frame>>,

    link: Arc<LinkState>,
}

/// Controller end: reads event frames, writes action batches.
pub struct SimPeer {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Frame>,
    link: Arc<LinkState>,
}

/// Fault injection for a simulated link.
#[derive(Clone)]
pub struct SimLinkController {
    link: Arc<LinkState>,
}

impl SimNetwork {
    /// Creates a connected link.
    pub fn pair() -> (SimNetwork, SimPeer, SimLinkController) {
        let (to_peer, from_sim) = mpsc::unbounded_channel();
        let (to_sim, from_peer) = mpsc::unbounded_channel();
        let (severed, _) = watch::channel(false);
        let link = Arc::new(LinkState {
            severed,
            dropped: AtomicU64::new(0),
        });

        let network = SimNetwork {
            outbound: to_peer,
            inbound: Mutex::new(from_peer),
            link: Arc::clone(&link),
        };
        let peer = SimPeer {
            outbound: to_sim,
            inbound: from_sim,
            link: Arc::clone(&link),
        };
        (network, peer, SimLinkController { link })
    }
}

#[async_trait]
impl NetworkTransport for SimNetwork {
    async fn send(&self, frame: Frame) -> Result<(), EnvError> {
        if self.link.is_severed() {
            self.link.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(EnvError::closed("link severed"));
        }
        self.outbound
            .send(frame)
            .map_err(|_| EnvError::closed("controller hung up"))
    }

    async fn recv(&self) -> Option<Frame> {
        let mut severed = self.link.severed.subscribe();
        if *severed.borrow_and_update() {
            return None;
        }
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            frame = inbound.recv() => frame,
            _ = severed.wait_for(|s| *s) => None,
        }
    }

    fn peer(&self) -> String {
        "sim-controller".to_string()
    }
}

impl SimPeer {
    /// Sends an action batch as a JSON array.
    pub fn send_actions(&self, actions: &[ActionRecord]) -> Result<(), EnvError> {
        let text = serde_json::to_string(actions)
            .map_err(|e| EnvError::SerializationError(e.to_string()))?;
        self.send_raw(&text)
    }

    /// Sends an arbitrary frame, well-formed or not.
    pub fn send_raw(&self, text: &str) -> Result<(), EnvError> {
        if self.link.is_severed() {
            self.link.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(EnvError::closed("link severed"));
        }
        self.outbound
            .send(Frame::new(text))
            .map_err(|_| EnvError::closed("simulation hung up"))
    }

    /// Next event frame if one is already waiting.
    pub fn try_next(&mut self) -> Option<Frame> {
        self.inbound.try_recv().ok()
    }

    /// Waits for the next event frame; `None` once the simulation hangs up.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }
}

impl NetworkController for SimLinkController {
    fn sever(&self) {
        self.link.severed.send_replace(true);
        tracing::warn!("Simulated link severed");
    }

    fn is_severed(&self) -> bool {
        self.link.is_severed()
    }

    fn dropped(&self) -> u64 {
        self.link.dropped.load(Ordering::Relaxed)
    }
}
