//! Game flow: meeting chat, vote resolution and the win check.

use crate::agent::{Activity, LifeState};
use crate::error::ActionRejected;
use crate::events::{Details, EventKind};
use crate::game::{ChatMessage, Game, GameOutcome};
use serde_json::{Map, Value};
use tracing::{info, warn};

impl Game {
    /// Appends a line to the bounded chat log. Chat only runs during a meeting.
    pub(crate) fn chat(&mut self, idx: usize, message: &str) -> Result<(), ActionRejected> {
        if !self.meeting.is_active() {
            return Err(ActionRejected::NoMeeting);
        }
        let sender = self.agents[idx].id.to_string();
        info!("[{}]: {}", sender, message);

        self.chat.push_back(ChatMessage {
            sender,
            content: message.to_string(),
            time: self.time,
        });
        while self.chat.len() > self.tuning.chat_capacity {
            self.chat.pop_front();
        }
        Ok(())
    }

    /// Resolves the active meeting with the ballot in `details`.
    pub(crate) fn vote(&mut self, details: &str) -> Result<(), ActionRejected> {
        if !self.meeting.is_active() {
            return Err(ActionRejected::NoMeeting);
        }

        let label = match self.resolve_ballot(details) {
            Some(i) => {
                let agent = &mut self.agents[i];
                agent.life = LifeState::Dead;
                agent.stop_task();
                agent.follower.clear_path();
                agent.activity = Activity::Idle;
                if agent.is_impostor() {
                    info!("{} was voted out and was the impostor", agent.id);
                } else {
                    info!("{} was voted out and was not the impostor", agent.id);
                }
                agent.id.to_string()
            }
            None => {
                info!("Vote skipped, nobody was ejected");
                "skip".to_string()
            }
        };

        self.end_meeting(&label);
        self.check_win();
        Ok(())
    }

    /// Living agent named by a ballot, or `None` for a skip.
    ///
    /// An exact id wins over a substring match, so "I vote Blue" still
    /// ejects Blue.
    fn resolve_ballot(&self, details: &str) -> Option<usize> {
        let ballot = details.trim().to_ascii_lowercase();
        if ballot.is_empty() || ballot.contains("skip") {
            return None;
        }

        let exact = self.index.get(&ballot).copied();
        let found = exact.or_else(|| {
            self.agents
                .iter()
                .position(|a| ballot.contains(&a.id.as_str().to_ascii_lowercase()))
        });

        match found {
            Some(i) if self.agents[i].is_alive() => Some(i),
            Some(i) => {
                warn!("Ballot '{}' names {}, who is already dead; skipping", details, self.agents[i].id);
                None
            }
            None => {
                warn!("Ballot '{}' matches no agent; skipping", details);
                None
            }
        }
    }

    /// Closes the meeting and puts everyone back on the map.
    ///
    /// The dead go to the dead-drop, the living to the cafeteria. Impostors
    /// come back with a partly recovered kill timer and a spent sabotage.
    fn end_meeting(&mut self, label: &str) {
        self.meeting.end_meeting();

        let post_vote_kill = self.tuning.post_vote_kill_timer;
        for agent in &mut self.agents {
            agent.follower.clear_path();
            agent.stop_task();
            if agent.is_alive() {
                agent.follower.snap_to_node(self.rooms.cafeteria, &self.graph);
                agent.activity = Activity::Idle;
                if agent.is_impostor() {
                    agent.kill_cooldown.set(post_vote_kill);
                    agent.sabotage_cooldown.set(0.0);
                }
            } else {
                agent.follower.snap_to_node(self.rooms.dead_drop, &self.graph);
            }
        }

        self.broadcast_living(
            EventKind::MeetingEnd,
            Details::text(format!("the meeting has ended with {} being voted", label)),
        );
    }

    /// Decides the round once one side can no longer lose.
    pub(crate) fn check_win(&mut self) {
        let impostors = self
            .agents
            .iter()
            .filter(|a| a.is_alive() && a.is_impostor())
            .count();
        let crewmates = self
            .agents
            .iter()
            .filter(|a| a.is_alive() && !a.is_impostor())
            .count();

        if impostors == 0 {
            self.declare_outcome(GameOutcome::CrewmateWin, "every impostor has been ejected");
        } else if impostors >= crewmates {
            self.declare_outcome(
                GameOutcome::ImpostorWin,
                "impostors equal or outnumber the remaining crew",
            );
        }
    }

    /// Records the outcome once and tells every agent, living or not.
    pub(crate) fn declare_outcome(&mut self, outcome: GameOutcome, reason: &str) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        info!("Game over at t={:.1}s: {} ({})", self.time, outcome, reason);

        let mut payload = Map::new();
        payload.insert("winner".to_string(), Value::from(outcome.to_string()));
        payload.insert("reason".to_string(), Value::from(reason));
        for i in 0..self.agents.len() {
            self.emit(i, EventKind::GameOver, Details::Json(payload.clone()));
        }
    }
}
