//! Core environment context trait for the Skeld runtime.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// This trait abstracts the "real world" so that the game runtime can run
/// against a live controller (tokio) or inside a deterministic harness.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, OS entropy
/// - **Simulation**: `SimContext` (skeld_sim) - manual virtual clock, seeded RNG
///
/// # Note
///
/// `now()` is the *runtime* clock used for batch windows and response
/// timeouts. It is not the game clock: the game clock freezes during lockstep
/// waits while this one keeps running.
#[async_trait]
pub trait GameContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock and yields
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Derives an RNG stream for one subsystem (task shuffling, etc.).
    ///
    /// Implementations combine their seed with `stream` so that separate
    /// subsystems draw from independent but reproducible sequences.
    fn derive_rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
