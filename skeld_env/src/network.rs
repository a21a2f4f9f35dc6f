//! Network transport abstraction for the controller link.

use crate::error::EnvError;
use crate::types::Frame;
use async_trait::async_trait;

/// Abstraction for the streaming link between the simulation and its
/// external decision-maker.
///
/// # Implementations
///
/// - **Production**: `TcpTransport` over a tokio `TcpStream`
/// - **Simulation**: `SimNetwork` (skeld_sim), channel-based
///
/// # Frame Flow
///
/// ```text
/// Simulation                 Link                  Controller
///   |                          |                        |
///   |-- send(events frame) --->|----------------------->|
///   |                          |                        |-- decide
///   |<-------------------------|<-- action batch line --|
///   |-- recv() -> frame        |                        |
/// ```
#[async_trait]
pub trait NetworkTransport: Send + Sync + 'static {
    /// Sends one complete frame; the delimiter is appended by the transport.
    ///
    /// # Returns
    /// * `Ok(())` - Frame written and flushed
    /// * `Err(EnvError)` - Write failure or closed link
    async fn send(&self, frame: Frame) -> Result<(), EnvError>;

    /// Receives the next complete frame.
    ///
    /// # Returns
    /// * `Some(frame)` - A frame was received
    /// * `None` - The link was closed (remote shutdown or read failure)
    ///
    /// # Blocking
    /// This method blocks until a frame arrives or the link closes. Only one
    /// receiver loop is expected to call it.
    async fn recv(&self) -> Option<Frame>;

    /// Human-readable description of the remote end (for logging).
    fn peer(&self) -> String;
}

/// Fault injection for simulated links.
pub trait NetworkController: Send + Sync {
    /// Severs the link; subsequent sends fail and the receiver sees `None`.
    fn sever(&self);

    /// Returns true once the link has been severed.
    fn is_severed(&self) -> bool;

    /// Number of frames dropped because the link was down.
    fn dropped(&self) -> u64;
}
