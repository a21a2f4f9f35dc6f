//! Skeld Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the Skeld simulation run
//! against either a **live** controller (tokio clock + TCP link) or a
//! **simulated** one (virtual clock + in-process channels).
//!
//! # Core Concept
//!
//! The simulation core never touches a socket or the wall clock directly:
//! - Time (`now()`, `sleep()`)
//! - Network (`send()`, `recv()` of newline-delimited text frames)
//! - Randomness (`derive_rng()`)
//!
//! All three are reached through the traits exported here, so a whole round
//! can be replayed from a single 64-bit seed.
//!
//! # Example
//!
//! ```ignore
//! use skeld_env::{GameContext, NetworkTransport};
//!
//! async fn pump<Ctx: GameContext, Net: NetworkTransport>(ctx: &Ctx, net: &Net) {
//!     loop {
//!         tokio::select! {
//!             frame = net.recv() => handle(frame),
//!             _ = ctx.sleep(Duration::from_millis(33)) => tick(),
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod network;
mod tcp;
mod tokio_impl;
mod types;

pub use context::GameContext;
pub use error::EnvError;
pub use network::{NetworkController, NetworkTransport};
pub use tcp::TcpTransport;
pub use tokio_impl::TokioContext;
pub use types::{Frame, FRAME_DELIMITER, MAX_FRAME_LEN};
