//! Security cameras and the admin map.

use crate::agent::Occupant;
use crate::error::ActionRejected;
use crate::waypoint::{WaypointGraph, WaypointId};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct InformationService {
    security_room: WaypointId,
    admin_room: WaypointId,
    camera_rooms: Vec<WaypointId>,
}

impl InformationService {
    pub fn new(security_room: WaypointId, admin_room: WaypointId, camera_rooms: Vec<WaypointId>) -> Self {
        Self {
            security_room,
            admin_room,
            camera_rooms,
        }
    }

    pub fn security_room(&self) -> WaypointId {
        self.security_room
    }

    pub fn admin_room(&self) -> WaypointId {
        self.admin_room
    }

    /// Roster indices of everyone standing in a camera-covered room.
    ///
    /// The caller must be in the security room.
    pub fn security_feed(
        &self,
        caller: usize,
        occupants: &[Occupant],
        graph: &WaypointGraph,
    ) -> Result<Vec<usize>, ActionRejected> {
        self.require_room(caller, occupants, self.security_room, graph)?;
        Ok(occupants
            .iter()
            .enumerate()
            .filter(|(_, o)| o.location.is_some_and(|wp| self.camera_rooms.contains(&wp)))
            .map(|(i, _)| i)
            .collect())
    }

    /// Room name → number of agents there, for every occupied room.
    ///
    /// The caller must be in the admin room. Dead agents count; the map shows
    /// bodies, not names.
    pub fn admin_map(
        &self,
        caller: usize,
        occupants: &[Occupant],
        graph: &WaypointGraph,
    ) -> Result<BTreeMap<String, usize>, ActionRejected> {
        self.require_room(caller, occupants, self.admin_room, graph)?;
        let mut counts = BTreeMap::new();
        for wp in occupants.iter().filter_map(|o| o.location) {
            *counts.entry(graph.name(wp).to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn require_room(
        &self,
        caller: usize,
        occupants: &[Occupant],
        room: WaypointId,
        graph: &WaypointGraph,
    ) -> Result<(), ActionRejected> {
        if occupants.get(caller).and_then(|o| o.location) == Some(room) {
            Ok(())
        } else {
            Err(ActionRejected::WrongRoom {
                required: graph.name(room).to_string(),
            })
        }
    }
}
