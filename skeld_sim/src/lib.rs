//! Skeld Deterministic Scenario Harness
//!
//! This crate runs the Skeld game runtime against a scripted controller on a
//! virtual clock, so whole rounds replay identically from one seed.
//!
//! # Core Principle
//!
//! Every source of non-determinism is routed through the environment traits:
//! - **Time**: a virtual clock the harness advances one tick at a time
//! - **Network**: in-process channels that can be severed mid-run
//! - **Randomness**: task shuffles drawn from seed-derived ChaCha8 streams
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Harness                              │
//! │                                                             │
//! │  ┌──────────────┐   events frames   ┌──────────────────┐    │
//! │  │ GameRuntime  │ ────────────────► │ SimPeer          │    │
//! │  │ (SimContext, │                   │ (scripted        │    │
//! │  │  SimNetwork) │ ◄──────────────── │  controller)     │    │
//! │  └──────────────┘   action batches  └────────┬─────────┘    │
//! │         ▲                                    │              │
//! │         │ sever()                            ▼              │
//! │  SimLinkController                      Transcript          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use skeld_sim::ScenarioRunner;
//! use skeld_sim::scenarios::ScenarioId;
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::VentTravel);
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod network;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use exporter::{Transcript, TranscriptEntry};
pub use network::{SimLinkController, SimNetwork, SimPeer};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
