//! Turns proximity transitions into perception events.

use crate::events::{Details, EventKind};
use crate::game::Game;
use crate::proximity::{Edge, Relation, Transition};
use tracing::debug;

impl Game {
    pub(crate) fn on_transition(&self, t: Transition) {
        match (t.relation, t.edge) {
            (Relation::SameRoom, Edge::Entered) => {
                debug!(
                    "{} and {} are in the same room",
                    self.agents[t.a].id, self.agents[t.b].id
                );
            }
            (Relation::Near, Edge::Entered) => {
                self.on_near_enter(t.a, t.b);
                self.on_near_enter(t.b, t.a);
            }
            (Relation::Closest, Edge::Entered) => {
                self.on_closest_enter(t.a, t.b);
                self.on_closest_enter(t.b, t.a);
            }
            (Relation::Near, Edge::Exited) => {
                self.on_near_exit(t.a, t.b);
                self.on_near_exit(t.b, t.a);
            }
            (Relation::SameRoom, Edge::Exited) | (Relation::Closest, Edge::Exited) => {}
        }
    }

    /// Dead observers see nothing; crewmates are blind while the lights are out.
    fn perceives(&self, observer: usize) -> bool {
        let agent = &self.agents[observer];
        agent.is_alive() && (agent.is_impostor() || !self.sabotage.is_electrical_active())
    }

    fn may_kill(&self, observer: usize, other: usize) -> bool {
        self.agents[observer].can_kill() && !self.agents[other].is_impostor()
    }

    fn on_near_enter(&self, observer: usize, other: usize) {
        if !self.perceives(observer) {
            return;
        }
        let id = self.agents[other].id.to_string();

        if !self.agents[other].is_alive() {
            self.emit(
                observer,
                EventKind::SeeBody(id.clone()),
                Details::text(format!("you see the dead body of {}", id)),
            );
            return;
        }

        self.emit(
            observer,
            EventKind::SeePlayer(id.clone()),
            Details::text(format!("you are near {}", id)),
        );
        if self.may_kill(observer, other) {
            self.emit(
                observer,
                EventKind::KillRange(id.clone()),
                Details::text(format!("{} is within your kill range", id)),
            );
        }
    }

    fn on_closest_enter(&self, observer: usize, other: usize) {
        if !self.perceives(observer) {
            return;
        }
        let id = self.agents[other].id.to_string();

        if !self.agents[other].is_alive() {
            self.emit(
                observer,
                EventKind::SeeBody(id.clone()),
                Details::text(format!("the dead body of {} is right next to you", id)),
            );
            return;
        }

        self.emit(
            observer,
            EventKind::SeePlayer(id.clone()),
            Details::text(format!("{} is right next to you", id)),
        );
        if self.may_kill(observer, other) {
            self.emit(
                observer,
                EventKind::KillRange(id.clone()),
                Details::text(format!("{} is right next to you and within kill range", id)),
            );
        }
    }

    fn on_near_exit(&self, observer: usize, other: usize) {
        if !self.perceives(observer) {
            return;
        }
        let id = self.agents[other].id.to_string();

        if !self.agents[other].is_alive() {
            self.emit(
                observer,
                EventKind::SeeBody(id.clone()),
                Details::text(format!("the dead body of {} is right next to you", id)),
            );
            return;
        }

        self.emit(
            observer,
            EventKind::SeePlayerEnd(id.clone()),
            Details::text(format!("{} is no longer near you", id)),
        );
        if self.agents[observer].is_impostor() && !self.agents[other].is_impostor() {
            self.emit(
                observer,
                EventKind::KillRangeEnd(id.clone()),
                Details::text(format!("{} has left your kill range", id)),
            );
        }
    }
}
