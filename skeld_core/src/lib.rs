//! Skeld Core - Tick-driven hidden-role crew simulation
//!
//! A handful of agents walk a waypoint map. Crewmates do timed tasks,
//! impostors kill, vent and sabotage, and either side can call a meeting.
//! Every decision comes from an external controller over a lockstep link:
//! 1. **Simulation**: movement, proximity, tasks, sabotage and meetings advance per tick
//! 2. **Briefings**: each event carries the agent's full state block
//! 3. **Lockstep**: batched events go out, the clock freezes until actions come back

pub mod agent;
pub mod error;
pub mod events;
pub mod game;
pub mod information;
pub mod lockstep;
pub mod meeting;
pub mod movement;
pub mod outbox;
pub mod pathfinding;
pub mod protocol;
pub mod proximity;
pub mod runtime;
pub mod sabotage;
pub mod scene;
pub mod tasks;
pub mod vents;
pub mod waypoint;

mod actions;
mod briefing;
mod flow;
mod perception;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use agent::{Activity, Agent, AgentId, Cooldown, LifeState, Role};
pub use error::{ActionRejected, ProtocolError, SceneError};
pub use game::{ChatMessage, DispatchReport, Game, GameOutcome, RejectedAction};
pub use lockstep::{FlushReason, LockstepClock, LockstepConfig};
pub use outbox::EventQueue;
pub use protocol::{ActionKind, ActionRecord, AgentStateSnapshot, EventEnvelope};
pub use runtime::{GameRuntime, RuntimeConfig, RuntimeStats};
pub use sabotage::SabotageKind;
pub use scene::{SceneConfig, Tuning};
pub use waypoint::{WaypointGraph, WaypointId};
