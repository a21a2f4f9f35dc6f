//! Task pools and per-agent task assignment.

use crate::waypoint::WaypointId;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Task category; decides the task's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Common,
    Short,
    Long,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Common => "common",
            TaskCategory::Short => "short",
            TaskCategory::Long => "long",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many tasks of each category every crewmate draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraw {
    pub common: usize,
    pub short: usize,
    pub long: usize,
}

impl Default for TaskDraw {
    fn default() -> Self {
        Self {
            common: 3,
            short: 3,
            long: 1,
        }
    }
}

/// Shuffled, de-duplicated task pools.
///
/// A waypoint appears in at most one category: pools are filtered in the
/// order common, short, long and later duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    common: Vec<WaypointId>,
    short: Vec<WaypointId>,
    long: Vec<WaypointId>,
}

impl TaskRegistry {
    /// Builds the pools, shuffling each with `rng`.
    pub fn new<R: Rng + ?Sized>(
        common: &[WaypointId],
        short: &[WaypointId],
        long: &[WaypointId],
        rng: &mut R,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut common = dedup(common, &mut seen);
        let mut short = dedup(short, &mut seen);
        let mut long = dedup(long, &mut seen);
        common.shuffle(rng);
        short.shuffle(rng);
        long.shuffle(rng);
        Self { common, short, long }
    }

    pub fn pool(&self, category: TaskCategory) -> &[WaypointId] {
        match category {
            TaskCategory::Common => &self.common,
            TaskCategory::Short => &self.short,
            TaskCategory::Long => &self.long,
        }
    }

    /// Draws a fresh assignment. Pools are never consumed, so every agent
    /// draws from the full pool; within one assignment there are no repeats.
    pub fn assign<R: Rng + ?Sized>(&self, draw: TaskDraw, rng: &mut R) -> TaskAssignment {
        TaskAssignment {
            common: draw_from(&self.common, draw.common, rng),
            short: draw_from(&self.short, draw.short, rng),
            long: draw_from(&self.long, draw.long, rng),
            completed: Vec::new(),
        }
    }
}

fn dedup(source: &[WaypointId], seen: &mut HashSet<WaypointId>) -> Vec<WaypointId> {
    source.iter().copied().filter(|wp| seen.insert(*wp)).collect()
}

fn draw_from<R: Rng + ?Sized>(pool: &[WaypointId], count: usize, rng: &mut R) -> Vec<WaypointId> {
    if count > pool.len() {
        warn!(
            "Not enough unique tasks in pool ({} requested, {} available)",
            count,
            pool.len()
        );
    }
    pool.choose_multiple(rng, count.min(pool.len()))
        .copied()
        .collect()
}

/// One agent's outstanding and finished tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskAssignment {
    pub common: Vec<WaypointId>,
    pub short: Vec<WaypointId>,
    pub long: Vec<WaypointId>,
    completed: Vec<(WaypointId, TaskCategory)>,
}

impl TaskAssignment {
    /// An assignment with nothing to do (impostors).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Category of an outstanding task at `waypoint`.
    ///
    /// Checked short, common, long; the registry keeps categories disjoint
    /// so the order only matters for hand-built assignments.
    pub fn category_of(&self, waypoint: WaypointId) -> Option<TaskCategory> {
        if self.short.contains(&waypoint) {
            Some(TaskCategory::Short)
        } else if self.common.contains(&waypoint) {
            Some(TaskCategory::Common)
        } else if self.long.contains(&waypoint) {
            Some(TaskCategory::Long)
        } else {
            None
        }
    }

    /// Marks the task at `waypoint` done. It leaves exactly one list and is
    /// never re-added.
    pub fn complete(&mut self, waypoint: WaypointId) -> Option<TaskCategory> {
        let category = self.category_of(waypoint)?;
        let list = match category {
            TaskCategory::Common => &mut self.common,
            TaskCategory::Short => &mut self.short,
            TaskCategory::Long => &mut self.long,
        };
        if let Some(pos) = list.iter().position(|wp| *wp == waypoint) {
            list.remove(pos);
        }
        self.completed.push((waypoint, category));
        debug!("Task at {:?} ({}) completed", waypoint, category);
        Some(category)
    }

    pub fn has_remaining(&self) -> bool {
        !(self.common.is_empty() && self.short.is_empty() && self.long.is_empty())
    }

    pub fn remaining(&self) -> usize {
        self.common.len() + self.short.len() + self.long.len()
    }

    /// Outstanding tasks in report order: common, short, long.
    pub fn outstanding(&self) -> impl Iterator<Item = (WaypointId, TaskCategory)> + '_ {
        self.common
            .iter()
            .map(|wp| (*wp, TaskCategory::Common))
            .chain(self.short.iter().map(|wp| (*wp, TaskCategory::Short)))
            .chain(self.long.iter().map(|wp| (*wp, TaskCategory::Long)))
    }

    pub fn completed(&self) -> &[(WaypointId, TaskCategory)] {
        &self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ids(range: std::ops::Range<usize>) -> Vec<WaypointId> {
        range.map(WaypointId).collect()
    }

    #[test]
    fn test_registry_dedups_across_categories() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let registry = TaskRegistry::new(
            &ids(0..4),
            &[WaypointId(2), WaypointId(5), WaypointId(5)],
            &[WaypointId(0), WaypointId(6)],
            &mut rng,
        );

        assert_eq!(registry.pool(TaskCategory::Common).len(), 4);
        assert_eq!(registry.pool(TaskCategory::Short), &[WaypointId(5)]);
        assert_eq!(registry.pool(TaskCategory::Long), &[WaypointId(6)]);
    }

    #[test]
    fn test_assignment_has_no_repeats() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let registry = TaskRegistry::new(&ids(0..7), &ids(7..10), &ids(10..13), &mut rng);

        let a = registry.assign(TaskDraw::default(), &mut rng);
        assert_eq!(a.common.len(), 3);
        assert_eq!(a.short.len(), 3);
        assert_eq!(a.long.len(), 1);

        let unique: HashSet<_> = a.outstanding().map(|(wp, _)| wp).collect();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_short_pool_is_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let registry = TaskRegistry::new(&ids(0..2), &[], &ids(2..3), &mut rng);

        let a = registry.assign(TaskDraw::default(), &mut rng);
        assert_eq!(a.common.len(), 2);
        assert!(a.short.is_empty());
        assert_eq!(a.long.len(), 1);
    }

    #[test]
    fn test_complete_removes_from_one_list() {
        let mut a = TaskAssignment {
            common: vec![WaypointId(1), WaypointId(2)],
            short: vec![WaypointId(3)],
            long: vec![WaypointId(4)],
            completed: Vec::new(),
        };

        assert_eq!(a.complete(WaypointId(3)), Some(TaskCategory::Short));
        assert_eq!(a.complete(WaypointId(3)), None);
        assert_eq!(a.remaining(), 3);
        assert_eq!(a.completed(), &[(WaypointId(3), TaskCategory::Short)]);
        assert_eq!(a.category_of(WaypointId(4)), Some(TaskCategory::Long));
    }
}
