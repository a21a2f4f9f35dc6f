//! Waypoint graph: the static map every other component walks on.
//!
//! Nodes are named 2D locations; edges are undirected. The graph is built once
//! at scene setup and never mutated afterwards, so agents and services refer to
//! nodes by [`WaypointId`] rather than holding references.

use crate::error::SceneError;
use nalgebra::Vector2;
use std::collections::HashMap;

/// Index of a waypoint inside its [`WaypointGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub usize);

/// A named location node.
#[derive(Debug, Clone)]
pub struct Waypoint {
    /// Unique name (also the room name reported to the controller)
    pub name: String,

    /// World position
    pub position: Vector2<f64>,

    neighbors: Vec<WaypointId>,
}

impl Waypoint {
    /// Adjacent waypoints.
    pub fn neighbors(&self) -> &[WaypointId] {
        &self.neighbors
    }
}

/// Undirected graph of named waypoints.
#[derive(Debug, Clone, Default)]
pub struct WaypointGraph {
    nodes: Vec<Waypoint>,
    by_name: HashMap<String, WaypointId>,
}

impl WaypointGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a waypoint; names must be unique.
    pub fn add(&mut self, name: &str, position: Vector2<f64>) -> Result<WaypointId, SceneError> {
        if self.by_name.contains_key(name) {
            return Err(SceneError::DuplicateWaypoint(name.to_string()));
        }
        let id = WaypointId(self.nodes.len());
        self.nodes.push(Waypoint {
            name: name.to_string(),
            position,
            neighbors: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Connects two waypoints in both directions. Repeated edges are ignored.
    pub fn connect(&mut self, a: WaypointId, b: WaypointId) -> Result<(), SceneError> {
        if a == b {
            return Err(SceneError::SelfLoop(self.name(a).to_string()));
        }
        for id in [a, b] {
            if id.0 >= self.nodes.len() {
                return Err(SceneError::UnknownWaypoint(format!("#{}", id.0)));
            }
        }
        if !self.nodes[a.0].neighbors.contains(&b) {
            self.nodes[a.0].neighbors.push(b);
        }
        if !self.nodes[b.0].neighbors.contains(&a) {
            self.nodes[b.0].neighbors.push(a);
        }
        Ok(())
    }

    /// Connects two waypoints by name.
    pub fn connect_named(&mut self, a: &str, b: &str) -> Result<(), SceneError> {
        let a = self.require(a)?;
        let b = self.require(b)?;
        self.connect(a, b)
    }

    /// Looks a waypoint up by name.
    ///
    /// Exact matches win; otherwise a case-insensitive match is accepted,
    /// since controllers are loose about capitalisation.
    pub fn find_by_name(&self, name: &str) -> Option<WaypointId> {
        let name = name.trim();
        if let Some(id) = self.by_name.get(name) {
            return Some(*id);
        }
        self.nodes
            .iter()
            .position(|n| n.name.eq_ignore_ascii_case(name))
            .map(WaypointId)
    }

    /// Like [`find_by_name`](Self::find_by_name) but reports the miss as a scene error.
    pub fn require(&self, name: &str) -> Result<WaypointId, SceneError> {
        self.find_by_name(name)
            .ok_or_else(|| SceneError::UnknownWaypoint(name.to_string()))
    }

    pub fn get(&self, id: WaypointId) -> Option<&Waypoint> {
        self.nodes.get(id.0)
    }

    /// Name of a waypoint, or `"Unknown"` for a foreign id.
    pub fn name(&self, id: WaypointId) -> &str {
        self.nodes.get(id.0).map(|n| n.name.as_str()).unwrap_or("Unknown")
    }

    pub fn position(&self, id: WaypointId) -> Vector2<f64> {
        self.nodes
            .get(id.0)
            .map(|n| n.position)
            .unwrap_or_else(Vector2::zeros)
    }

    pub fn neighbors(&self, id: WaypointId) -> &[WaypointId] {
        self.nodes
            .get(id.0)
            .map(|n| n.neighbors.as_slice())
            .unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: WaypointId, b: WaypointId) -> bool {
        self.neighbors(a).contains(&b)
    }

    /// Euclidean distance between two waypoints.
    pub fn distance(&self, a: WaypointId, b: WaypointId) -> f64 {
        (self.position(a) - self.position(b)).norm()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates all waypoints with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (WaypointId, &Waypoint)> {
        self.nodes.iter().enumerate().map(|(i, n)| (WaypointId(i), n))
    }
}
