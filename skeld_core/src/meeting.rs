//! Meeting arbitration.
//!
//! Decides whether a report or emergency-button press may start a meeting and
//! records who called it. Vote resolution lives in the game-flow layer.

use crate::agent::Occupant;
use crate::error::ActionRejected;
use crate::waypoint::WaypointId;
use tracing::info;

/// An active meeting (roster indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meeting {
    pub caller: usize,
    pub body: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct MeetingEngine {
    cafeteria: WaypointId,
    active: Option<Meeting>,
}

impl MeetingEngine {
    pub fn new(cafeteria: WaypointId) -> Self {
        Self {
            cafeteria,
            active: None,
        }
    }

    pub fn cafeteria(&self) -> WaypointId {
        self.cafeteria
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current(&self) -> Option<Meeting> {
        self.active
    }

    /// Dead agent sharing the caller's room, if any.
    pub fn body_near(&self, caller: usize, occupants: &[Occupant]) -> Option<usize> {
        let room = occupants.get(caller)?.location?;
        occupants
            .iter()
            .enumerate()
            .find(|(i, o)| *i != caller && !o.alive && o.location == Some(room))
            .map(|(i, _)| i)
    }

    /// Starts a meeting if a dead body shares the caller's room.
    pub fn try_report(&mut self, caller: usize, occupants: &[Occupant]) -> Result<Meeting, ActionRejected> {
        if self.is_active() {
            return Err(ActionRejected::MeetingActive);
        }
        let body = self
            .body_near(caller, occupants)
            .ok_or(ActionRejected::NoBody)?;
        info!("Agent #{} reported agent #{}'s body", caller, body);
        Ok(self.begin(caller, Some(body)))
    }

    /// Starts a meeting if the caller stands in the cafeteria.
    pub fn try_button(&mut self, caller: usize, occupants: &[Occupant]) -> Result<Meeting, ActionRejected> {
        if self.is_active() {
            return Err(ActionRejected::MeetingActive);
        }
        if occupants.get(caller).and_then(|o| o.location) != Some(self.cafeteria) {
            return Err(ActionRejected::WrongRoom {
                required: "the cafeteria".to_string(),
            });
        }
        info!("Agent #{} hit the emergency button", caller);
        Ok(self.begin(caller, None))
    }

    /// Clears the meeting unconditionally.
    pub fn end_meeting(&mut self) {
        if self.active.take().is_some() {
            info!("Meeting ended");
        }
    }

    fn begin(&mut self, caller: usize, body: Option<usize>) -> Meeting {
        let meeting = Meeting { caller, body };
        self.active = Some(meeting);
        meeting
    }
}
