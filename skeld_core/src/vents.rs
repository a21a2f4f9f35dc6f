//! Vent topology: groups of waypoints joined by the vent mechanic.
//!
//! Every network is a complete subgraph. Vents are independent of the
//! movement graph; travel between them is a teleport.

use crate::waypoint::WaypointId;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One named group of mutually connected vents.
#[derive(Debug, Clone)]
pub struct VentNetwork {
    pub name: String,
    pub vents: Vec<WaypointId>,
}

/// All vent networks plus a waypoint → network lookup.
#[derive(Debug, Clone, Default)]
pub struct VentTopology {
    networks: Vec<VentNetwork>,
    membership: HashMap<WaypointId, usize>,
}

impl VentTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a network.
    ///
    /// A waypoint already registered elsewhere stays with its first network
    /// and is left out of this one; that is a configuration warning, not an
    /// error.
    pub fn register(&mut self, name: &str, vents: &[WaypointId]) {
        let index = self.networks.len();
        let mut members = Vec::with_capacity(vents.len());

        for &vent in vents {
            if let Some(&existing) = self.membership.get(&vent) {
                if existing != index {
                    warn!(
                        "Vent {:?} appears in networks '{}' and '{}', using first",
                        vent, self.networks[existing].name, name
                    );
                }
                continue;
            }
            self.membership.insert(vent, index);
            members.push(vent);
        }

        debug!("Registered vent network '{}' with {} vents", name, members.len());
        self.networks.push(VentNetwork {
            name: name.to_string(),
            vents: members,
        });
    }

    pub fn is_vent(&self, waypoint: WaypointId) -> bool {
        self.membership.contains_key(&waypoint)
    }

    /// Vents reachable from `vent`, excluding itself; `None` if it is not a vent.
    pub fn connected_vents(&self, vent: WaypointId) -> Option<Vec<WaypointId>> {
        let network = self.membership.get(&vent)?;
        Some(
            self.networks[*network]
                .vents
                .iter()
                .copied()
                .filter(|v| *v != vent)
                .collect(),
        )
    }

    /// True if both are vents of the same network and distinct.
    pub fn are_connected(&self, a: WaypointId, b: WaypointId) -> bool {
        if a == b {
            return false;
        }
        match (self.membership.get(&a), self.membership.get(&b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn networks(&self) -> &[VentNetwork] {
        &self.networks
    }
}
