//! Production implementation of GameContext using Tokio.

use crate::GameContext;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by Tokio and OS entropy.
///
/// Time comes from the system monotonic clock. When constructed with a seed
/// the derived RNG streams are reproducible; otherwise they are drawn from
/// OS entropy.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Optional seed for reproducible task assignment in live runs
    seed: Option<u64>,
}

impl TokioContext {
    /// Creates a new unseeded TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            seed: None,
        }
    }

    /// Creates a context whose RNG streams derive from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            start: Instant::now(),
            seed: Some(seed),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.to_string();
        tokio::spawn(async move {
            future.await;
            tracing::debug!("[{}] task finished", name);
        });
    }

    fn derive_rng(&self, stream: u64) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_mul(0x517cc1b727220a95) ^ stream),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn seed(&self) -> u64 {
        self.seed.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = TokioContext::seeded(7);
        let b = TokioContext::seeded(7);

        let x: u64 = a.derive_rng(1).gen();
        let y: u64 = b.derive_rng(1).gen();
        assert_eq!(x, y);

        let z: u64 = a.derive_rng(2).gen();
        assert_ne!(x, z);
    }

    #[test]
    fn test_tokio_context_seed() {
        assert_eq!(TokioContext::new().seed(), 0);
        assert_eq!(TokioContext::seeded(99).seed(), 99);
    }
}
