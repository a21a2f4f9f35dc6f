//! Event emission and per-agent state snapshots.
//!
//! Every event goes through [`Game::emit`]: the details get the room-company
//! suffix, the emitting agent's state is attached and the envelope is queued
//! (as priority for meeting events).

use crate::agent::{Agent, Cooldown};
use crate::events::{Details, EventKind};
use crate::game::Game;
use crate::protocol::{
    AgentStateSnapshot, AvailableAction, CooldownInfo, EventEnvelope, EventRecord, ImposterInformation,
    TaskEntry,
};
use crate::sabotage::SabotageKind;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

const SABOTAGE_KINDS: [SabotageKind; 3] = [
    SabotageKind::Electrical,
    SabotageKind::Reactor,
    SabotageKind::Oxygen,
];

impl Game {
    /// Queues one event for agent `idx`.
    pub(crate) fn emit(&self, idx: usize, kind: EventKind, details: Details) {
        self.emit_with(idx, kind, details, Map::new());
    }

    /// Queues one event with extra fields merged into the state block.
    pub(crate) fn emit_with(&self, idx: usize, kind: EventKind, details: Details, extras: Map<String, Value>) {
        let Some(agent) = self.agents.get(idx) else {
            return;
        };

        // Crewmates lose track of the room while the lights are out.
        let details = if !agent.is_impostor() && self.sabotage.is_electrical_active() {
            details
        } else {
            details.with_roommates(&self.roommates(idx))
        };

        let mut state = self.snapshot(idx);
        state.extras = extras;

        let envelope = EventEnvelope {
            agent: agent.id.to_string(),
            event: EventRecord {
                kind: kind.to_string(),
                details: details.render(),
                time: self.time,
            },
            state,
        };

        if let Ok(json) = serde_json::to_string(&envelope) {
            debug!("[{}] Briefing JSON: {}", agent.id, json);
        }

        if kind.is_priority() {
            self.outbox.push_priority(envelope);
        } else {
            self.outbox.push(envelope);
        }
    }

    /// Emits the same event to every living agent.
    pub(crate) fn broadcast_living(&self, kind: EventKind, details: Details) {
        for i in self.living() {
            self.emit(i, kind.clone(), details.clone());
        }
    }

    /// Roster indices of living agents.
    pub(crate) fn living(&self) -> Vec<usize> {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_alive())
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn living_ids(&self) -> Vec<String> {
        self.agents
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| a.id.to_string())
            .collect()
    }

    /// Everyone else standing on the same waypoint, bodies included.
    fn roommates(&self, idx: usize) -> Vec<String> {
        let Some(room) = self.agents[idx].location() else {
            return Vec::new();
        };
        self.agents
            .iter()
            .enumerate()
            .filter(|(i, a)| *i != idx && a.location() == Some(room))
            .map(|(_, a)| a.id.to_string())
            .collect()
    }

    /// Kill range for agent `idx`: its near radius plus the fixed margin.
    pub(crate) fn kill_range(&self, idx: usize) -> f64 {
        self.agents[idx].near_radius + self.tuning.kill_range_margin
    }

    /// Nearest living crewmate within kill range of `idx`.
    pub(crate) fn kill_target(&self, idx: usize) -> Option<usize> {
        let killer = &self.agents[idx];
        let range = self.kill_range(idx);
        self.agents
            .iter()
            .enumerate()
            .filter(|(i, a)| *i != idx && a.is_alive() && !a.is_impostor())
            .map(|(i, a)| (i, (a.position() - killer.position()).norm()))
            .filter(|(_, d)| *d <= range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// State block for agent `idx`, without extras.
    pub fn snapshot(&self, idx: usize) -> AgentStateSnapshot {
        let agent = &self.agents[idx];
        let location = agent
            .location()
            .map(|wp| self.graph.name(wp).to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let current = self.sabotage.current();
        let sabotage: BTreeMap<String, bool> = SABOTAGE_KINDS
            .iter()
            .map(|kind| (kind.name().to_string(), current == Some(*kind)))
            .collect();

        let mut tasks: Vec<TaskEntry> = agent
            .tasks
            .outstanding()
            .map(|(wp, category)| TaskEntry {
                location: self.graph.name(wp).to_string(),
                category: category.to_string(),
                status: "incomplete".to_string(),
            })
            .collect();
        tasks.extend(agent.tasks.completed().iter().map(|(wp, category)| TaskEntry {
            location: self.graph.name(*wp).to_string(),
            category: category.to_string(),
            status: "complete".to_string(),
        }));

        AgentStateSnapshot {
            location,
            sabotage,
            tasks,
            imposter_information: self.imposter_information(agent),
            available_actions: self.available_actions(idx),
            extras: Map::new(),
        }
    }

    fn imposter_information(&self, agent: &Agent) -> ImposterInformation {
        if !agent.is_impostor() {
            return ImposterInformation::default();
        }
        let alive_crewmates = self
            .agents
            .iter()
            .filter(|a| a.is_alive() && !a.is_impostor())
            .count();
        let connected_vents = agent
            .location()
            .and_then(|wp| self.vents.connected_vents(wp))
            .map(|vents| vents.into_iter().map(|v| self.graph.name(v).to_string()).collect());

        ImposterInformation {
            alive_crewmates: Some(alive_crewmates),
            kill_cooldown: Some(cooldown_info(&agent.kill_cooldown)),
            sabotage_cooldown: Some(cooldown_info(&agent.sabotage_cooldown)),
            is_venting: Some(agent.is_venting()),
            connected_vents,
        }
    }

    /// Actions agent `idx` may legally take right now.
    ///
    /// Mirrors the dispatcher: nothing once the round is decided, and only
    /// chat and vote while a meeting runs (dead agents included).
    pub fn available_actions(&self, idx: usize) -> Vec<AvailableAction> {
        let agent = &self.agents[idx];
        let mut actions = Vec::new();
        if self.outcome.is_some() {
            return actions;
        }
        if self.meeting.is_active() {
            actions.extend([AvailableAction::Chat, AvailableAction::Vote]);
            return actions;
        }
        if !agent.is_alive() {
            return actions;
        }

        let location = agent.location();

        if !agent.is_venting() {
            actions.push(AvailableAction::Move);
            if location.is_some_and(|wp| agent.tasks.category_of(wp).is_some()) {
                actions.push(AvailableAction::Task);
            }
        }
        if self.meeting.body_near(idx, &self.occupants()).is_some() {
            actions.push(AvailableAction::Report);
        }
        if location == Some(self.rooms.cafeteria) {
            actions.push(AvailableAction::CallMeeting);
        }
        if location == Some(self.rooms.security) {
            actions.push(AvailableAction::Security);
        }
        if location == Some(self.rooms.admin) {
            actions.push(AvailableAction::Admin);
        }

        if agent.is_impostor() {
            if agent.can_kill() && self.kill_target(idx).is_some() {
                actions.push(AvailableAction::Kill);
            }
            if location
                .and_then(|wp| self.vents.connected_vents(wp))
                .is_some_and(|v| !v.is_empty())
            {
                actions.push(AvailableAction::Vent);
            }
            if agent.can_sabotage() && !self.sabotage.is_active() {
                actions.push(AvailableAction::Sabotage);
            }
        }
        actions
    }
}

fn cooldown_info(cooldown: &Cooldown) -> CooldownInfo {
    CooldownInfo {
        current: cooldown.timer(),
        max: cooldown.max(),
        ready: cooldown.is_ready(),
    }
}
