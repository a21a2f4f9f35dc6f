//! Simulation root.
//!
//! `Game` owns the map, the services and the roster. One call to
//! [`Game::tick`] runs path followers, cooldown recovery, task timers,
//! proximity and the sabotage check to completion; [`Game::dispatch`] applies
//! an inbound action batch between ticks. Events land in the shared
//! [`EventQueue`].

use crate::agent::{Activity, Agent, AgentId, Occupant};
use crate::error::{ActionRejected, SceneError};
use crate::events::{Details, EventKind};
use crate::information::InformationService;
use crate::meeting::MeetingEngine;
use crate::movement::{MoveIntent, PathFollower};
use crate::outbox::EventQueue;
use crate::protocol::{ActionKind, ActionRecord};
use crate::proximity::ProximityTracker;
use crate::sabotage::{SabotageEngine, SabotageRooms, SabotageUpdate};
use crate::scene::{SceneConfig, Tuning};
use crate::tasks::{TaskAssignment, TaskRegistry};
use crate::vents::VentTopology;
use crate::waypoint::{WaypointGraph, WaypointId};
use nalgebra::Vector2;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{info, warn};

/// How the round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    CrewmateWin,
    ImpostorWin,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::CrewmateWin => f.write_str("crewmates win"),
            GameOutcome::ImpostorWin => f.write_str("impostors win"),
        }
    }
}

/// Special rooms resolved to waypoint ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rooms {
    pub cafeteria: WaypointId,
    pub electrical: WaypointId,
    pub reactor: WaypointId,
    pub oxygen: WaypointId,
    pub admin: WaypointId,
    pub security: WaypointId,
    pub dead_drop: WaypointId,
}

/// An inbound record that was not applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedAction {
    pub agent: String,
    pub action: String,
    pub reason: ActionRejected,
}

/// Outcome of applying one action batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub applied: usize,
    pub rejected: Vec<RejectedAction>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
    pub time: f64,
}

pub struct Game {
    pub(crate) graph: WaypointGraph,
    pub(crate) vents: VentTopology,
    pub(crate) proximity: ProximityTracker,
    pub(crate) sabotage: SabotageEngine,
    pub(crate) meeting: MeetingEngine,
    pub(crate) info: InformationService,
    pub(crate) agents: Vec<Agent>,
    /// Lower-cased id → roster index.
    pub(crate) index: HashMap<String, usize>,
    pub(crate) rooms: Rooms,
    pub(crate) tuning: Tuning,
    pub(crate) time: f64,
    pub(crate) outbox: EventQueue,
    pub(crate) chat: VecDeque<ChatMessage>,
    pub(crate) outcome: Option<GameOutcome>,
}

impl Game {
    /// Builds the map, services and roster described by `scene`.
    ///
    /// `rng` shuffles the task pools and draws each crewmate's tasks.
    pub fn from_scene<R: Rng + ?Sized>(scene: &SceneConfig, rng: &mut R) -> Result<Self, SceneError> {
        let mut graph = WaypointGraph::new();
        for wp in &scene.waypoints {
            graph.add(&wp.name, Vector2::new(wp.x, wp.y))?;
        }
        for (a, b) in &scene.edges {
            graph.connect_named(a, b)?;
        }

        let mut vents = VentTopology::new();
        for network in &scene.vents {
            let members = resolve_all(&graph, &network.members)?;
            vents.register(&network.name, &members);
        }

        let registry = TaskRegistry::new(
            &resolve_all(&graph, &scene.tasks.common)?,
            &resolve_all(&graph, &scene.tasks.short)?,
            &resolve_all(&graph, &scene.tasks.long)?,
            rng,
        );

        let r = &scene.rooms;
        let rooms = Rooms {
            cafeteria: graph.require(&r.cafeteria)?,
            electrical: graph.require(&r.electrical)?,
            reactor: graph.require(&r.reactor)?,
            oxygen: graph.require(&r.oxygen)?,
            admin: graph.require(&r.admin)?,
            security: graph.require(&r.security)?,
            dead_drop: graph.require(&r.dead_drop)?,
        };
        let cameras = resolve_all(&graph, &r.cameras)?;

        let tuning = scene.tuning.clone();
        let mut agents = Vec::with_capacity(scene.agents.len());
        let mut index = HashMap::new();

        for spec in &scene.agents {
            let key = spec.id.to_ascii_lowercase();
            if index.contains_key(&key) {
                return Err(SceneError::DuplicateAgent(spec.id.clone()));
            }
            let spawn = graph.require(&spec.spawn)?;

            let mut follower = PathFollower::new(tuning.walk_speed, tuning.waypoint_tolerance);
            follower.snap_to_node(spawn, &graph);

            let mut agent = Agent::new(
                AgentId::new(spec.id.clone()),
                spec.role,
                follower,
                (tuning.kill_cooldown, tuning.sabotage_cooldown),
                (
                    spec.near_radius.unwrap_or(tuning.near_radius),
                    spec.closest_radius.unwrap_or(tuning.closest_radius),
                ),
            );
            agent.tasks = if agent.is_impostor() {
                TaskAssignment::empty()
            } else {
                registry.assign(scene.tasks.draw, rng)
            };

            index.insert(key, agents.len());
            agents.push(agent);
        }

        info!(
            "Scene ready: {} waypoints, {} vent networks, {} agents",
            graph.len(),
            vents.networks().len(),
            agents.len()
        );

        Ok(Self {
            sabotage: SabotageEngine::new(
                SabotageRooms {
                    electrical: rooms.electrical,
                    reactor: rooms.reactor,
                    oxygen: rooms.oxygen,
                    admin: rooms.admin,
                },
                tuning.sabotage_duration,
            ),
            meeting: MeetingEngine::new(rooms.cafeteria),
            info: InformationService::new(rooms.security, rooms.admin, cameras),
            proximity: ProximityTracker::new(),
            chat: VecDeque::with_capacity(tuning.chat_capacity),
            outbox: EventQueue::new(),
            time: 0.0,
            outcome: None,
            graph,
            vents,
            agents,
            index,
            rooms,
            tuning,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Game time in seconds. Frozen during meetings and lockstep waits.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn graph(&self) -> &WaypointGraph {
        &self.graph
    }

    pub fn vents(&self) -> &VentTopology {
        &self.vents
    }

    pub fn sabotage(&self) -> &SabotageEngine {
        &self.sabotage
    }

    pub fn meeting(&self) -> &MeetingEngine {
        &self.meeting
    }

    pub fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Roster index of `id` (case-insensitive).
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(&id.trim().to_ascii_lowercase()).copied()
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.index_of(id).map(|i| &self.agents[i])
    }

    pub fn agent_mut(&mut self, id: &str) -> Option<&mut Agent> {
        let i = self.index_of(id)?;
        self.agents.get_mut(i)
    }

    /// Handle to the outbound queue, shared with the runtime.
    pub fn outbox(&self) -> &EventQueue {
        &self.outbox
    }

    pub fn chat_log(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.iter()
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn occupants(&self) -> Vec<Occupant> {
        self.agents.iter().map(Agent::occupant).collect()
    }

    /// Teleports an agent to a room, dropping any route in progress.
    pub fn place_agent(&mut self, id: &str, room: &str) -> Result<(), ActionRejected> {
        let target = self
            .graph
            .find_by_name(room)
            .ok_or_else(|| ActionRejected::UnknownWaypoint(room.to_string()))?;
        let i = self
            .index_of(id)
            .ok_or_else(|| ActionRejected::UnknownAgent(id.to_string()))?;
        let agent = &mut self.agents[i];
        agent.follower.clear_path();
        agent.follower.snap_to_node(target, &self.graph);
        if agent.activity == Activity::Moving {
            agent.activity = Activity::Idle;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Advances the simulation by `dt` seconds.
    ///
    /// While a meeting is active `dt` is treated as zero. Nothing runs after
    /// the outcome is decided.
    pub fn tick(&mut self, dt: f64) {
        if self.outcome.is_some() {
            return;
        }
        let dt = if self.meeting.is_active() { 0.0 } else { dt.max(0.0) };
        self.time += dt;

        self.advance_followers(dt);
        self.recover_cooldowns(dt);
        self.advance_tasks(dt);
        self.update_proximity();
        self.update_sabotage(dt);
    }

    fn advance_followers(&mut self, dt: f64) {
        let mut arrivals = Vec::new();
        for (i, agent) in self.agents.iter_mut().enumerate() {
            let step = agent.follower.advance(dt, &self.graph);
            if let Some(intent) = step.completed {
                if agent.activity == Activity::Moving {
                    agent.activity = Activity::Idle;
                }
                if intent == MoveIntent::Command {
                    arrivals.push(i);
                }
            }
        }
        for i in arrivals {
            self.announce_arrival(i);
        }
    }

    fn recover_cooldowns(&mut self, dt: f64) {
        let mut edges = Vec::new();
        for (i, agent) in self.agents.iter_mut().enumerate() {
            if !agent.is_impostor() || !agent.is_alive() {
                continue;
            }
            if agent.kill_cooldown.recover(dt) {
                edges.push((i, EventKind::KillCooldownEnd, "your kill cooldown has ended, you can kill again"));
            }
            if agent.sabotage_cooldown.recover(dt) {
                edges.push((
                    i,
                    EventKind::SabotageCooldownEnd,
                    "your sabotage cooldown has ended, you can sabotage again",
                ));
            }
        }
        for (i, kind, text) in edges {
            self.emit(i, kind, Details::text(text));
        }
    }

    fn advance_tasks(&mut self, dt: f64) {
        let mut finished = Vec::new();
        for (i, agent) in self.agents.iter_mut().enumerate() {
            let Some(task) = agent.active_task.as_mut() else {
                continue;
            };
            task.remaining -= dt;
            if task.remaining > 0.0 {
                continue;
            }
            if let Some(task) = agent.active_task.take() {
                agent.activity = Activity::Idle;
                agent.tasks.complete(task.location);
                finished.push((i, task));
            }
        }
        for (i, task) in finished {
            let room = self.graph.name(task.location).to_string();
            info!("[{}] Completed {} task at '{}'", self.agents[i].id, task.category, room);
            self.emit(i, EventKind::CompleteTask, Details::text(format!("you have completed {}", room)));
        }
    }

    fn update_proximity(&mut self) {
        let occupants = self.occupants();
        let transitions = self.proximity.update(&occupants);
        for transition in transitions {
            self.on_transition(transition);
        }
    }

    fn update_sabotage(&mut self, dt: f64) {
        let occupants = self.occupants();
        match self.sabotage.update(dt, &occupants) {
            Some(SabotageUpdate::Resolved(kind)) => {
                self.broadcast_living(
                    EventKind::SabotageEnd,
                    Details::text(format!("the {} sabotage has been resolved", kind)),
                );
            }
            Some(SabotageUpdate::Expired(kind)) => {
                self.declare_outcome(
                    GameOutcome::ImpostorWin,
                    &format!("the {} sabotage was not fixed in time", kind),
                );
            }
            None => {}
        }
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Applies a batch of inbound actions in order.
    ///
    /// Rejections are logged against the acting agent and collected in the
    /// report; they never stop the rest of the batch.
    pub fn dispatch(&mut self, records: &[ActionRecord]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for record in records {
            match self.apply(record) {
                Ok(()) => report.applied += 1,
                Err(reason) => {
                    warn!("[{}] {}: {}", record.agent, record.kind, reason);
                    report.rejected.push(RejectedAction {
                        agent: record.agent.clone(),
                        action: record.kind.clone(),
                        reason,
                    });
                }
            }
        }
        report
    }

    /// Applies one inbound action.
    pub fn apply(&mut self, record: &ActionRecord) -> Result<(), ActionRejected> {
        let kind: ActionKind = record.kind.parse()?;
        if self.outcome.is_some() {
            return Err(ActionRejected::GameOver);
        }
        let idx = self
            .index_of(&record.agent)
            .ok_or_else(|| ActionRejected::UnknownAgent(record.agent.clone()))?;
        let details = record.details.as_str();

        match kind {
            ActionKind::Chat => self.chat(idx, details),
            ActionKind::Vote => self.vote(details),
            _ if !self.agents[idx].is_alive() => Err(ActionRejected::Dead),
            _ if self.meeting.is_active() => Err(ActionRejected::MeetingActive),
            ActionKind::Move => self.act_move(idx, details),
            ActionKind::Kill => self.act_kill(idx),
            ActionKind::Vent => self.act_vent(idx, details),
            ActionKind::Report => self.act_report(idx),
            ActionKind::CallMeeting => self.act_call_meeting(idx),
            ActionKind::Security => self.act_security(idx),
            ActionKind::Admin => self.act_admin(idx),
            ActionKind::Sabotage => self.act_sabotage(idx, details),
            ActionKind::Task => self.act_task(idx),
            ActionKind::StopTask => self.act_stop_task(idx),
        }
    }
}

fn resolve_all(graph: &WaypointGraph, names: &[String]) -> Result<Vec<WaypointId>, SceneError> {
    names.iter().map(|name| graph.require(name)).collect()
}
