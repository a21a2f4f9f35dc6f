//! A* pathfinding over the waypoint graph.
//!
//! Edge cost is Euclidean distance between waypoint positions and the
//! heuristic is straight-line distance to the goal, which is admissible and
//! consistent on this embedding.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::waypoint::{WaypointGraph, WaypointId};

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    id: WaypointId,
    f_cost: f64, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds the shortest route from `start` to `goal`, both ends included.
///
/// Returns `Some(vec![start])` when `start == goal` and `None` when the goal
/// lies in a different component. The graph is only read.
pub fn find_path(
    graph: &WaypointGraph,
    start: WaypointId,
    goal: WaypointId,
) -> Option<Vec<WaypointId>> {
    graph.get(start)?;
    graph.get(goal)?;

    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set = BinaryHeap::new();
    let mut closed: HashSet<WaypointId> = HashSet::new();
    let mut came_from: HashMap<WaypointId, WaypointId> = HashMap::new();
    let mut g_scores: HashMap<WaypointId, f64> = HashMap::new();

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        id: start,
        f_cost: graph.distance(start, goal),
    });

    while let Some(current) = open_set.pop() {
        if current.id == goal {
            return Some(reconstruct_path(&came_from, current.id));
        }
        if !closed.insert(current.id) {
            continue;
        }

        let current_g = *g_scores.get(&current.id).unwrap_or(&f64::INFINITY);

        for &neighbor in graph.neighbors(current.id) {
            if closed.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g + graph.distance(current.id, neighbor);
            if tentative_g < *g_scores.get(&neighbor).unwrap_or(&f64::INFINITY) {
                came_from.insert(neighbor, current.id);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    id: neighbor,
                    f_cost: tentative_g + graph.distance(neighbor, goal),
                });
            }
        }
    }

    None
}

/// Total Euclidean length of a route.
pub fn path_length(graph: &WaypointGraph, path: &[WaypointId]) -> f64 {
    path.windows(2).map(|w| graph.distance(w[0], w[1])).sum()
}

fn reconstruct_path(
    came_from: &HashMap<WaypointId, WaypointId>,
    mut current: WaypointId,
) -> Vec<WaypointId> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use proptest::prelude::*;

    /// Square A-B-C-D plus a disconnected island.
    fn square() -> (WaypointGraph, Vec<WaypointId>) {
        let mut g = WaypointGraph::new();
        let a = g.add("A", Vector2::new(0.0, 0.0)).unwrap();
        let b = g.add("B", Vector2::new(10.0, 0.0)).unwrap();
        let c = g.add("C", Vector2::new(10.0, 10.0)).unwrap();
        let d = g.add("D", Vector2::new(0.0, 10.0)).unwrap();
        let island = g.add("Island", Vector2::new(50.0, 50.0)).unwrap();
        g.connect(a, b).unwrap();
        g.connect(b, c).unwrap();
        g.connect(c, d).unwrap();
        g.connect(d, a).unwrap();
        (g, vec![a, b, c, d, island])
    }

    #[test]
    fn test_same_start_and_goal() {
        let (g, ids) = square();
        assert_eq!(find_path(&g, ids[0], ids[0]), Some(vec![ids[0]]));
    }

    #[test]
    fn test_unreachable_goal() {
        let (g, ids) = square();
        assert_eq!(find_path(&g, ids[0], ids[4]), None);
    }

    #[test]
    fn test_prefers_shorter_route() {
        let (mut g, ids) = square();
        let (a, c) = (ids[0], ids[2]);
        let mid = g.add("Mid", Vector2::new(5.0, 5.0)).unwrap();
        g.connect(a, mid).unwrap();
        g.connect(mid, c).unwrap();

        let path = find_path(&g, a, c).unwrap();
        assert_eq!(path, vec![a, mid, c]);
        assert_relative_eq!(path_length(&g, &path), 2.0 * 50f64.sqrt(), epsilon = 1e-9);
    }

    /// Reference shortest distances via Dijkstra over a dense scan.
    fn dijkstra(g: &WaypointGraph, start: WaypointId) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; g.len()];
        let mut done = vec![false; g.len()];
        dist[start.0] = 0.0;
        for _ in 0..g.len() {
            let next = (0..g.len())
                .filter(|&i| !done[i] && dist[i].is_finite())
                .min_by(|&x, &y| dist[x].partial_cmp(&dist[y]).unwrap());
            let Some(u) = next else { break };
            done[u] = true;
            for &v in g.neighbors(WaypointId(u)) {
                let alt = dist[u] + g.distance(WaypointId(u), v);
                if alt < dist[v.0] {
                    dist[v.0] = alt;
                }
            }
        }
        dist
    }

    fn arb_graph() -> impl Strategy<Value = WaypointGraph> {
        (2usize..10)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0), n),
                    prop::collection::vec((0..n, 0..n), 0..(n * 2)),
                )
            })
            .prop_map(|(points, edges)| {
                let mut g = WaypointGraph::new();
                for (i, (x, y)) in points.iter().enumerate() {
                    g.add(&format!("W{}", i), Vector2::new(*x, *y)).unwrap();
                }
                for (a, b) in edges {
                    if a != b {
                        g.connect(WaypointId(a), WaypointId(b)).unwrap();
                    }
                }
                g
            })
    }

    proptest! {
        #[test]
        fn test_paths_are_adjacent_and_minimal(g in arb_graph()) {
            for s in 0..g.len() {
                let reference = dijkstra(&g, WaypointId(s));
                for t in 0..g.len() {
                    let found = find_path(&g, WaypointId(s), WaypointId(t));
                    match found {
                        None => prop_assert!(reference[t].is_infinite()),
                        Some(path) => {
                            prop_assert_eq!(path.first().copied(), Some(WaypointId(s)));
                            prop_assert_eq!(path.last().copied(), Some(WaypointId(t)));
                            for w in path.windows(2) {
                                prop_assert!(g.are_adjacent(w[0], w[1]));
                            }
                            prop_assert!((path_length(&g, &path) - reference[t]).abs() < 1e-6);
                        }
                    }
                }
            }
        }
    }
}
