//! Edge-triggered proximity tracking.
//!
//! Each tick every agent pair is classified as same-room, near and closest.
//! Comparing the frame's pairs against the retained active sets yields exactly
//! one enter and one exit per continuous overlap. Same-room has no exit edge.
//!
//! The scan is O(n²) over the roster, fine for a handful of agents; a spatial
//! index could replace it without changing the enter/exit contract.

use crate::agent::Occupant;
use std::collections::BTreeSet;

/// Order-independent pair key (lower index first).
pub type PairKey = (usize, usize);

fn pair_key(a: usize, b: usize) -> PairKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    SameRoom,
    Near,
    Closest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Entered,
    Exited,
}

/// One relation change between two agents (roster indices, `a < b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub relation: Relation,
    pub edge: Edge,
    pub a: usize,
    pub b: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProximityTracker {
    same_room: BTreeSet<PairKey>,
    near: BTreeSet<PairKey>,
    closest: BTreeSet<PairKey>,
}

impl ProximityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies all pairs for this tick and returns the transitions.
    ///
    /// Order: same-room enters, then near, then closest; within a relation
    /// enters precede exits and pairs are in index order.
    pub fn update(&mut self, occupants: &[Occupant]) -> Vec<Transition> {
        let mut frame_room = BTreeSet::new();
        let mut frame_near = BTreeSet::new();
        let mut frame_closest = BTreeSet::new();

        for i in 0..occupants.len() {
            for j in (i + 1)..occupants.len() {
                let a = &occupants[i];
                let b = &occupants[j];
                let pair = pair_key(i, j);

                if let (Some(la), Some(lb)) = (a.location, b.location) {
                    if la == lb {
                        frame_room.insert(pair);
                    }
                }

                let dist = (a.position - b.position).norm();
                // The more cautious agent's radius governs.
                if dist <= a.near_radius.min(b.near_radius) {
                    frame_near.insert(pair);
                }
                if dist <= a.closest_radius.min(b.closest_radius) {
                    frame_closest.insert(pair);
                }
            }
        }

        let mut transitions = Vec::new();
        diff(Relation::SameRoom, &mut self.same_room, frame_room, false, &mut transitions);
        diff(Relation::Near, &mut self.near, frame_near, true, &mut transitions);
        diff(Relation::Closest, &mut self.closest, frame_closest, true, &mut transitions);
        transitions
    }

    pub fn is_active(&self, relation: Relation, a: usize, b: usize) -> bool {
        let key = pair_key(a, b);
        match relation {
            Relation::SameRoom => self.same_room.contains(&key),
            Relation::Near => self.near.contains(&key),
            Relation::Closest => self.closest.contains(&key),
        }
    }
}

fn diff(
    relation: Relation,
    retained: &mut BTreeSet<PairKey>,
    frame: BTreeSet<PairKey>,
    report_exits: bool,
    out: &mut Vec<Transition>,
) {
    for &(a, b) in frame.difference(retained) {
        out.push(Transition {
            relation,
            edge: Edge::Entered,
            a,
            b,
        });
    }
    if report_exits {
        for &(a, b) in retained.difference(&frame) {
            out.push(Transition {
                relation,
                edge: Edge::Exited,
                a,
                b,
            });
        }
    }
    *retained = frame;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::waypoint::WaypointId;
    use nalgebra::Vector2;
    use proptest::prelude::*;

    fn occupant(x: f64, room: usize, near: f64) -> Occupant {
        Occupant {
            role: Role::Crewmate,
            alive: true,
            location: Some(WaypointId(room)),
            position: Vector2::new(x, 0.0),
            near_radius: near,
            closest_radius: 1.5,
        }
    }

    #[test]
    fn test_minimum_radius_governs() {
        let mut tracker = ProximityTracker::new();
        // 3 apart: inside A's radius 4, outside B's radius 2.
        let frame = vec![occupant(0.0, 0, 4.0), occupant(3.0, 1, 2.0)];

        let t = tracker.update(&frame);
        assert!(t.is_empty());
        assert!(!tracker.is_active(Relation::Near, 0, 1));
    }

    #[test]
    fn test_same_room_has_no_exit() {
        let mut tracker = ProximityTracker::new();
        let together = vec![occupant(0.0, 0, 4.0), occupant(20.0, 0, 4.0)];
        let apart = vec![occupant(0.0, 0, 4.0), occupant(20.0, 1, 4.0)];

        let t = tracker.update(&together);
        assert_eq!(
            t,
            vec![Transition {
                relation: Relation::SameRoom,
                edge: Edge::Entered,
                a: 0,
                b: 1
            }]
        );
        assert!(tracker.update(&apart).is_empty());
        assert!(!tracker.is_active(Relation::SameRoom, 1, 0));
    }

    #[test]
    fn test_near_and_closest_enter_and_exit() {
        let mut tracker = ProximityTracker::new();
        let close = vec![occupant(0.0, 0, 4.0), occupant(1.0, 1, 4.0)];
        let far = vec![occupant(0.0, 0, 4.0), occupant(10.0, 1, 4.0)];

        let entered = tracker.update(&close);
        assert_eq!(entered.len(), 2);
        assert!(entered.iter().all(|t| t.edge == Edge::Entered));

        let exited = tracker.update(&far);
        assert_eq!(
            exited.iter().map(|t| t.relation).collect::<Vec<_>>(),
            vec![Relation::Near, Relation::Closest]
        );
        assert!(exited.iter().all(|t| t.edge == Edge::Exited));
    }

    proptest! {
        /// A pair held in range for N ticks yields one enter and one exit.
        #[test]
        fn test_single_enter_single_exit(before in 0usize..5, held in 1usize..40, after in 1usize..5) {
            let mut tracker = ProximityTracker::new();
            let far = vec![occupant(0.0, 0, 4.0), occupant(10.0, 1, 4.0)];
            let near = vec![occupant(0.0, 0, 4.0), occupant(3.0, 1, 4.0)];

            let mut enters = 0;
            let mut exits = 0;
            let frames = std::iter::repeat(&far).take(before)
                .chain(std::iter::repeat(&near).take(held))
                .chain(std::iter::repeat(&far).take(after));
            for frame in frames {
                for t in tracker.update(frame) {
                    if t.relation == Relation::Near {
                        match t.edge {
                            Edge::Entered => enters += 1,
                            Edge::Exited => exits += 1,
                        }
                    }
                }
            }
            prop_assert_eq!(enters, 1);
            prop_assert_eq!(exits, 1);
        }
    }
}
