//! Agent aggregate: role, life and activity state, cooldowns, tasks.
//!
//! Agents are plain data owned by [`Game`](crate::game::Game). State
//! transitions happen in the action handlers and in `Game::tick`, never here.

use crate::movement::PathFollower;
use crate::tasks::{TaskAssignment, TaskCategory};
use crate::waypoint::WaypointId;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique agent identifier (the colour name on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hidden role, fixed for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Crewmate,
    #[serde(alias = "imposter")]
    Impostor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Crewmate => f.write_str("crewmate"),
            Role::Impostor => f.write_str("impostor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Moving,
    DoingTask,
    Venting,
}

/// Impostor cooldown that recovers toward `max` at real-time rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Cooldown {
    timer: f64,
    max: f64,
    ready_latch: bool,
}

impl Cooldown {
    /// Starts full, with the latch already set so no "ended" edge fires on
    /// the first tick.
    pub fn ready(max: f64) -> Self {
        Self {
            timer: max,
            max,
            ready_latch: true,
        }
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_ready(&self) -> bool {
        self.timer >= self.max
    }

    /// Empties the timer after use.
    pub fn reset(&mut self) {
        self.set(0.0);
    }

    pub fn set(&mut self, timer: f64) {
        self.timer = timer.clamp(0.0, self.max);
        self.ready_latch = self.is_ready();
    }

    /// Recovers by `dt`; returns true exactly once per not-ready → ready edge.
    pub fn recover(&mut self, dt: f64) -> bool {
        if self.timer < self.max {
            self.timer = (self.timer + dt).min(self.max);
        }
        let was_ready = self.ready_latch;
        self.ready_latch = self.is_ready();
        self.ready_latch && !was_ready
    }
}

/// A task in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTask {
    pub location: WaypointId,
    pub category: TaskCategory,
    pub remaining: f64,
}

/// Read-only view of one agent used by the per-tick services.
#[derive(Debug, Clone, PartialEq)]
pub struct Occupant {
    pub role: Role,
    pub alive: bool,
    pub location: Option<WaypointId>,
    pub position: Vector2<f64>,
    pub near_radius: f64,
    pub closest_radius: f64,
}

impl Occupant {
    pub fn is_living_crewmate(&self) -> bool {
        self.alive && self.role == Role::Crewmate
    }
}

/// One simulated entity.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub role: Role,
    pub life: LifeState,
    pub activity: Activity,
    pub follower: PathFollower,
    pub kill_cooldown: Cooldown,
    pub sabotage_cooldown: Cooldown,
    pub tasks: TaskAssignment,
    pub active_task: Option<ActiveTask>,
    pub near_radius: f64,
    pub closest_radius: f64,
}

impl Agent {
    pub fn new(
        id: AgentId,
        role: Role,
        follower: PathFollower,
        cooldown_max: (f64, f64),
        radii: (f64, f64),
    ) -> Self {
        Self {
            id,
            role,
            life: LifeState::Alive,
            activity: Activity::Idle,
            follower,
            kill_cooldown: Cooldown::ready(cooldown_max.0),
            sabotage_cooldown: Cooldown::ready(cooldown_max.1),
            tasks: TaskAssignment::empty(),
            active_task: None,
            near_radius: radii.0,
            closest_radius: radii.1,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_impostor(&self) -> bool {
        self.role == Role::Impostor
    }

    pub fn is_venting(&self) -> bool {
        self.activity == Activity::Venting
    }

    /// Current waypoint, as tracked by the path follower.
    pub fn location(&self) -> Option<WaypointId> {
        self.follower.current_node()
    }

    pub fn position(&self) -> Vector2<f64> {
        self.follower.position()
    }

    pub fn can_kill(&self) -> bool {
        self.is_impostor() && self.kill_cooldown.is_ready()
    }

    pub fn can_sabotage(&self) -> bool {
        self.is_impostor() && self.sabotage_cooldown.is_ready()
    }

    /// Cancels the running task without completing it. Returns the task if
    /// there was one.
    pub fn stop_task(&mut self) -> Option<ActiveTask> {
        let task = self.active_task.take()?;
        if self.activity == Activity::DoingTask {
            self.activity = Activity::Idle;
        }
        Some(task)
    }

    pub fn occupant(&self) -> Occupant {
        Occupant {
            role: self.role,
            alive: self.is_alive(),
            location: self.location(),
            position: self.position(),
            near_radius: self.near_radius,
            closest_radius: self.closest_radius,
        }
    }
}
