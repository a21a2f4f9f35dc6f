//! Per-agent path follower.
//!
//! Walks an installed route at fixed speed, one waypoint at a time. The
//! follower's current node is the agent's authoritative location; nothing
//! else writes it.

use crate::error::ActionRejected;
use crate::pathfinding::find_path;
use crate::waypoint::{WaypointGraph, WaypointId};
use nalgebra::Vector2;
use tracing::warn;

/// What the owner should do when a route finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveIntent {
    /// Movement ordered by the controller; arrival is reported back.
    Command,
    /// Movement started by the simulation itself; arrival is silent.
    Internal,
}

/// Result of installing a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStart {
    /// Route installed; completion fires from a later `advance`.
    Installed,
    /// Nothing to walk; completion fired immediately.
    Completed(MoveIntent),
}

/// Waypoints reached during one `advance`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowerStep {
    pub reached: Vec<WaypointId>,
    pub completed: Option<MoveIntent>,
}

/// Walks a waypoint route at a fixed speed.
#[derive(Debug, Clone)]
pub struct PathFollower {
    speed: f64,
    tolerance: f64,
    position: Vector2<f64>,
    current: Option<WaypointId>,
    path: Vec<WaypointId>,
    cursor: usize,
    on_complete: Option<MoveIntent>,
}

impl PathFollower {
    /// Creates an idle follower with no location.
    pub fn new(speed: f64, tolerance: f64) -> Self {
        Self {
            speed,
            tolerance,
            position: Vector2::zeros(),
            current: None,
            path: Vec::new(),
            cursor: 0,
            on_complete: None,
        }
    }

    pub fn current_node(&self) -> Option<WaypointId> {
        self.current
    }

    pub fn position(&self) -> Vector2<f64> {
        self.position
    }

    pub fn is_moving(&self) -> bool {
        !self.path.is_empty()
    }

    /// Remaining route, starting at the waypoint currently targeted.
    pub fn remaining(&self) -> &[WaypointId] {
        self.path.get(self.cursor..).unwrap_or(&[])
    }

    /// Teleports onto a node, bypassing pathing. Does not touch the route.
    pub fn snap_to_node(&mut self, node: WaypointId, graph: &WaypointGraph) {
        self.current = Some(node);
        self.position = graph.position(node);
    }

    /// Replaces any route in progress.
    ///
    /// An empty route is a no-op that completes immediately.
    pub fn set_path(&mut self, path: Vec<WaypointId>, intent: MoveIntent) -> PathStart {
        if path.is_empty() {
            warn!("set_path called with an empty path");
            self.clear_path();
            return PathStart::Completed(intent);
        }
        self.path = path;
        self.cursor = 0;
        self.on_complete = Some(intent);
        PathStart::Installed
    }

    /// Routes from the current node to `target` and installs the route.
    ///
    /// On error the follower is left as it was.
    pub fn move_to(
        &mut self,
        target: WaypointId,
        graph: &WaypointGraph,
        intent: MoveIntent,
    ) -> Result<PathStart, ActionRejected> {
        let current = self.current.ok_or(ActionRejected::NoLocation)?;
        if current == target {
            self.clear_path();
            return Ok(PathStart::Completed(intent));
        }

        let path = find_path(graph, current, target).ok_or_else(|| ActionRejected::NoPath {
            from: graph.name(current).to_string(),
            to: graph.name(target).to_string(),
        })?;
        Ok(self.set_path(path, intent))
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.cursor = 0;
        self.on_complete = None;
    }

    /// Moves toward the targeted waypoint for `dt` seconds.
    pub fn advance(&mut self, dt: f64, graph: &WaypointGraph) -> FollowerStep {
        let mut step = FollowerStep::default();
        let Some(&target) = self.path.get(self.cursor) else {
            return step;
        };

        let target_pos = graph.position(target);
        self.position = move_towards(self.position, target_pos, self.speed * dt);

        if (self.position - target_pos).norm() <= self.tolerance {
            self.current = Some(target);
            step.reached.push(target);
            self.cursor += 1;

            if self.cursor >= self.path.len() {
                self.path.clear();
                self.cursor = 0;
                step.completed = self.on_complete.take();
            }
        }
        step
    }
}

fn move_towards(from: Vector2<f64>, to: Vector2<f64>, max_delta: f64) -> Vector2<f64> {
    let delta = to - from;
    let dist = delta.norm();
    if dist <= max_delta || dist == 0.0 {
        to
    } else {
        from + delta / dist * max_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line() -> (WaypointGraph, WaypointId, WaypointId, WaypointId) {
        let mut g = WaypointGraph::new();
        let a = g.add("A", Vector2::new(0.0, 0.0)).unwrap();
        let b = g.add("B", Vector2::new(1.0, 0.0)).unwrap();
        let c = g.add("C", Vector2::new(2.0, 0.0)).unwrap();
        g.connect(a, b).unwrap();
        g.connect(b, c).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn test_walks_route_and_completes_once() {
        let (g, a, b, c) = line();
        let mut f = PathFollower::new(2.0, 0.1);
        f.snap_to_node(a, &g);

        assert_eq!(f.move_to(c, &g, MoveIntent::Command), Ok(PathStart::Installed));

        let mut reached = Vec::new();
        let mut completions = 0;
        for _ in 0..100 {
            let step = f.advance(0.05, &g);
            reached.extend(step.reached);
            if step.completed.is_some() {
                completions += 1;
            }
        }

        assert_eq!(reached, vec![a, b, c]);
        assert_eq!(completions, 1);
        assert_eq!(f.current_node(), Some(c));
        assert!(!f.is_moving());
        assert_relative_eq!(f.position().x, 2.0, epsilon = 0.1 + 1e-9);
    }

    #[test]
    fn test_empty_path_completes_immediately() {
        let (g, a, _, _) = line();
        let mut f = PathFollower::new(2.0, 0.1);
        f.snap_to_node(a, &g);

        assert_eq!(
            f.set_path(Vec::new(), MoveIntent::Internal),
            PathStart::Completed(MoveIntent::Internal)
        );
        assert_eq!(f.current_node(), Some(a));
    }

    #[test]
    fn test_move_to_requires_location_and_path() {
        let (mut g, a, _, _) = line();
        let island = g.add("Island", Vector2::new(9.0, 9.0)).unwrap();
        let mut f = PathFollower::new(2.0, 0.1);

        assert_eq!(
            f.move_to(a, &g, MoveIntent::Command),
            Err(ActionRejected::NoLocation)
        );

        f.snap_to_node(a, &g);
        assert!(matches!(
            f.move_to(island, &g, MoveIntent::Command),
            Err(ActionRejected::NoPath { .. })
        ));
        assert_eq!(
            f.move_to(a, &g, MoveIntent::Command),
            Ok(PathStart::Completed(MoveIntent::Command))
        );
    }

    #[test]
    fn test_new_route_replaces_old() {
        let (g, a, b, c) = line();
        let mut f = PathFollower::new(2.0, 0.1);
        f.snap_to_node(a, &g);
        f.set_path(vec![a, b, c], MoveIntent::Command);
        f.set_path(vec![a], MoveIntent::Internal);

        let step = f.advance(0.05, &g);
        assert_eq!(step.reached, vec![a]);
        assert_eq!(step.completed, Some(MoveIntent::Internal));
    }
}
