//! Sabotage engine: a single active slot polled once per tick.
//!
//! - **Electrical**: no countdown; fixed when any living crewmate stands in
//!   the electrical room. Crewmate perception is suppressed while active.
//! - **Reactor**: countdown; fixed by two living crewmates in the reactor.
//! - **Oxygen**: countdown; fixed by living crewmates in both the oxygen and
//!   admin rooms at once.
//!
//! Countdown expiry is an impostor win.

use crate::agent::Occupant;
use crate::error::ActionRejected;
use crate::waypoint::WaypointId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Countdown value while no timed sabotage is running.
pub const NO_COUNTDOWN: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SabotageKind {
    Electrical,
    Reactor,
    Oxygen,
}

impl SabotageKind {
    pub fn is_timed(&self) -> bool {
        !matches!(self, SabotageKind::Electrical)
    }

    /// Wire name used as the key of the `sabotage` state map.
    pub fn name(&self) -> &'static str {
        match self {
            SabotageKind::Electrical => "Electrical",
            SabotageKind::Reactor => "Reactor",
            SabotageKind::Oxygen => "Oxygen",
        }
    }
}

impl fmt::Display for SabotageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SabotageKind {
    type Err = ActionRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ELECTRICAL" => Ok(SabotageKind::Electrical),
            "REACTOR" => Ok(SabotageKind::Reactor),
            "O2" | "OXYGEN" => Ok(SabotageKind::Oxygen),
            _ => Err(ActionRejected::UnknownSabotage(s.to_string())),
        }
    }
}

/// Rooms that resolve sabotages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SabotageRooms {
    pub electrical: WaypointId,
    pub reactor: WaypointId,
    pub oxygen: WaypointId,
    pub admin: WaypointId,
}

/// What happened to the active sabotage this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SabotageUpdate {
    Resolved(SabotageKind),
    Expired(SabotageKind),
}

#[derive(Debug, Clone)]
pub struct SabotageEngine {
    rooms: SabotageRooms,
    duration: f64,
    active: Option<SabotageKind>,
    time_remaining: f64,
}

impl SabotageEngine {
    pub fn new(rooms: SabotageRooms, duration: f64) -> Self {
        Self {
            rooms,
            duration,
            active: None,
            time_remaining: NO_COUNTDOWN,
        }
    }

    pub fn current(&self) -> Option<SabotageKind> {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_electrical_active(&self) -> bool {
        self.active == Some(SabotageKind::Electrical)
    }

    /// Seconds left on a timed sabotage, [`NO_COUNTDOWN`] otherwise.
    pub fn time_remaining(&self) -> f64 {
        self.time_remaining
    }

    /// Claims the slot. Fails if any sabotage is already running.
    pub fn start(&mut self, kind: SabotageKind) -> Result<(), ActionRejected> {
        if let Some(current) = self.active {
            debug!("Cannot trigger {} - {} already active", kind, current);
            return Err(ActionRejected::SabotageActive(current));
        }
        self.active = Some(kind);
        self.time_remaining = if kind.is_timed() {
            self.duration
        } else {
            NO_COUNTDOWN
        };
        match kind {
            SabotageKind::Electrical => info!("ELECTRICAL sabotaged - crewmate near-vision disabled"),
            SabotageKind::Reactor => info!("REACTOR meltdown! {}s - need 2 crewmates at Reactor", self.duration),
            SabotageKind::Oxygen => info!("OXYGEN depleted! {}s - need 1 in Oxygen + 1 in Admin", self.duration),
        }
        Ok(())
    }

    /// Checks the resolution condition, then runs the countdown.
    pub fn update(&mut self, dt: f64, occupants: &[Occupant]) -> Option<SabotageUpdate> {
        let kind = self.active?;

        if self.is_resolved(kind, occupants) {
            info!("{} sabotage fixed", kind);
            self.clear();
            return Some(SabotageUpdate::Resolved(kind));
        }

        if kind.is_timed() {
            self.time_remaining -= dt;
            if self.time_remaining <= 0.0 {
                info!("{} sabotage not stopped - impostors win", kind);
                self.clear();
                return Some(SabotageUpdate::Expired(kind));
            }
        }
        None
    }

    fn is_resolved(&self, kind: SabotageKind, occupants: &[Occupant]) -> bool {
        let living_in = |room: WaypointId| {
            occupants
                .iter()
                .filter(|o| o.is_living_crewmate() && o.location == Some(room))
                .count()
        };
        match kind {
            SabotageKind::Electrical => living_in(self.rooms.electrical) >= 1,
            SabotageKind::Reactor => living_in(self.rooms.reactor) >= 2,
            SabotageKind::Oxygen => {
                living_in(self.rooms.oxygen) >= 1 && living_in(self.rooms.admin) >= 1
            }
        }
    }

    fn clear(&mut self) {
        self.active = None;
        self.time_remaining = NO_COUNTDOWN;
    }
}
