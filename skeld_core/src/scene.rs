//! Scene description: map, vents, task pools, special rooms, roster, tuning.
//!
//! A `SceneConfig` is plain data (JSON-loadable). [`Game::from_scene`]
//! resolves the names into waypoint ids and builds the services.
//!
//! [`Game::from_scene`]: crate::game::Game::from_scene

use crate::agent::Role;
use crate::error::SceneError;
use crate::tasks::{TaskCategory, TaskDraw};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Gameplay constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Walk speed in units per second.
    pub walk_speed: f64,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_tolerance: f64,
    pub near_radius: f64,
    pub closest_radius: f64,
    /// Added to the killer's near radius to get the kill range.
    pub kill_range_margin: f64,
    pub kill_cooldown: f64,
    pub sabotage_cooldown: f64,
    /// Countdown for reactor and oxygen.
    pub sabotage_duration: f64,
    pub short_task_secs: f64,
    pub common_task_secs: f64,
    pub long_task_secs: f64,
    /// Impostor kill timer after a vote.
    pub post_vote_kill_timer: f64,
    pub chat_capacity: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            walk_speed: 2.0,
            waypoint_tolerance: 0.1,
            near_radius: 4.0,
            closest_radius: 1.5,
            kill_range_margin: 3.0,
            kill_cooldown: 30.0,
            sabotage_cooldown: 30.0,
            sabotage_duration: 30.0,
            short_task_secs: 4.0,
            common_task_secs: 6.0,
            long_task_secs: 12.0,
            post_vote_kill_timer: 15.0,
            chat_capacity: 50,
        }
    }
}

impl Tuning {
    /// Seconds a task of `category` takes.
    pub fn task_duration(&self, category: TaskCategory) -> f64 {
        match category {
            TaskCategory::Short => self.short_task_secs,
            TaskCategory::Common => self.common_task_secs,
            TaskCategory::Long => self.long_task_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointSpec {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentSpec {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPools {
    pub common: Vec<String>,
    pub short: Vec<String>,
    pub long: Vec<String>,
    #[serde(default)]
    pub draw: TaskDraw,
}

/// Rooms with special meaning, by waypoint name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialRooms {
    pub cafeteria: String,
    pub electrical: String,
    pub reactor: String,
    pub oxygen: String,
    pub admin: String,
    pub security: String,
    pub cameras: Vec<String>,
    /// Where dead agents are parked after a vote.
    pub dead_drop: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub role: Role,
    pub spawn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub waypoints: Vec<WaypointSpec>,
    pub edges: Vec<(String, String)>,
    #[serde(default)]
    pub vents: Vec<VentSpec>,
    pub tasks: TaskPools,
    pub rooms: SpecialRooms,
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub tuning: Tuning,
}

const SKELD_WAYPOINTS: &[(&str, f64, f64)] = &[
    ("Cafeteria", 2.0, 10.0),
    ("Weapons", 20.0, 10.0),
    ("O2", 14.0, 4.0),
    ("Navigation", 28.0, 0.0),
    ("Shields", 20.0, -10.0),
    ("Communications", 10.0, -20.0),
    ("Storage", 2.0, -10.0),
    ("Electrical", -10.0, -4.0),
    ("Lower Engine", -20.0, -8.0),
    ("Reactor", -28.0, 0.0),
    ("Security", -14.0, 0.0),
    ("Upper Engine", -20.0, 8.0),
    ("MedBay", -8.0, 4.0),
    ("Admin", 10.0, 0.0),
    ("Hallway A", -8.0, 10.0),
    ("Hallway B", 12.0, 10.0),
    ("Hallway C", -20.0, 0.0),
    ("Hallway D", 2.0, 0.0),
    ("Hallway E", 20.0, 0.0),
    ("Hallway F", -10.0, -10.0),
    ("Hallway G", 10.0, -14.0),
    ("Dead Drop", 100.0, 100.0),
];

const SKELD_HALLWAYS: &[(&str, &[&str])] = &[
    ("Hallway A", &["Upper Engine", "MedBay", "Cafeteria"]),
    ("Hallway B", &["Cafeteria", "Weapons"]),
    ("Hallway C", &["Upper Engine", "Reactor", "Security", "Lower Engine"]),
    ("Hallway D", &["Cafeteria", "Admin", "Storage"]),
    ("Hallway E", &["Weapons", "O2", "Navigation", "Shields"]),
    ("Hallway F", &["Lower Engine", "Electrical", "Storage"]),
    ("Hallway G", &["Storage", "Communications", "Shields"]),
];

const SKELD_VENTS: &[&[&str]] = &[
    &["Upper Engine", "Reactor"],
    &["Cafeteria", "Hallway E", "Admin"],
    &["MedBay", "Security", "Electrical"],
    &["Reactor", "Lower Engine"],
    &["Navigation", "Shields"],
];

const SKELD_COMMON: &[&str] = &[
    "Electrical",
    "Lower Engine",
    "Storage",
    "Shields",
    "Navigation",
    "O2",
    "Security",
];
const SKELD_SHORT: &[&str] = &[
    "Cafeteria",
    "Upper Engine",
    "Lower Engine",
    "Electrical",
    "Reactor",
    "Shields",
    "Navigation",
];
const SKELD_LONG: &[&str] = &["MedBay", "Reactor", "Storage", "Communications", "Weapons"];

const SKELD_PLAYERS: &[&str] = &["Red", "Yellow", "Green", "Blue", "Purple", "Pink"];
const SKELD_IMPOSTOR: &str = "Pink";

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl SceneConfig {
    /// The built-in ship: 14 rooms joined by 7 hallways, five vent networks,
    /// six players with "Pink" as the impostor.
    pub fn skeld() -> Self {
        let waypoints = SKELD_WAYPOINTS
            .iter()
            .map(|&(name, x, y)| WaypointSpec {
                name: name.to_string(),
                x,
                y,
            })
            .collect();

        let edges = SKELD_HALLWAYS
            .iter()
            .flat_map(|&(hall, rooms)| rooms.iter().map(move |room| (hall.to_string(), room.to_string())))
            .collect();

        let vents = SKELD_VENTS
            .iter()
            .map(|members| VentSpec {
                name: members.join(" - "),
                members: strings(members),
            })
            .collect();

        let agents = SKELD_PLAYERS
            .iter()
            .map(|&id| AgentSpec {
                id: id.to_string(),
                role: if id == SKELD_IMPOSTOR {
                    Role::Impostor
                } else {
                    Role::Crewmate
                },
                spawn: "Cafeteria".to_string(),
                near_radius: None,
                closest_radius: None,
            })
            .collect();

        Self {
            waypoints,
            edges,
            vents,
            tasks: TaskPools {
                common: strings(SKELD_COMMON),
                short: strings(SKELD_SHORT),
                long: strings(SKELD_LONG),
                draw: TaskDraw::default(),
            },
            rooms: SpecialRooms {
                cafeteria: "Cafeteria".to_string(),
                electrical: "Electrical".to_string(),
                reactor: "Reactor".to_string(),
                oxygen: "O2".to_string(),
                admin: "Admin".to_string(),
                security: "Security".to_string(),
                cameras: strings(&["Hallway A", "Hallway C", "Hallway D", "Hallway E"]),
                dead_drop: "Dead Drop".to_string(),
            },
            agents,
            tuning: Tuning::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Makes `id` the only impostor.
    pub fn with_impostor(mut self, id: &str) -> Result<Self, SceneError> {
        if !self.agents.iter().any(|a| a.id.eq_ignore_ascii_case(id)) {
            return Err(SceneError::UnknownAgent(id.to_string()));
        }
        for agent in &mut self.agents {
            agent.role = if agent.id.eq_ignore_ascii_case(id) {
                Role::Impostor
            } else {
                Role::Crewmate
            };
        }
        Ok(self)
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Changes one agent's spawn point.
    pub fn with_spawn(mut self, id: &str, spawn: &str) -> Result<Self, SceneError> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| SceneError::UnknownAgent(id.to_string()))?;
        agent.spawn = spawn.to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeld_shape() {
        let scene = SceneConfig::skeld();
        assert_eq!(scene.waypoints.len(), 22);
        assert_eq!(scene.edges.len(), 22);
        assert_eq!(scene.vents.len(), 5);
        assert_eq!(
            scene.tasks.common.len() + scene.tasks.short.len() + scene.tasks.long.len(),
            19
        );
        assert_eq!(scene.agents.len(), 6);
        let impostors: Vec<_> = scene
            .agents
            .iter()
            .filter(|a| a.role == Role::Impostor)
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(impostors, vec!["Pink"]);
    }

    #[test]
    fn test_with_impostor() {
        let scene = SceneConfig::skeld().with_impostor("red").unwrap();
        let red = scene.agents.iter().find(|a| a.id == "Red").unwrap();
        let pink = scene.agents.iter().find(|a| a.id == "Pink").unwrap();
        assert_eq!(red.role, Role::Impostor);
        assert_eq!(pink.role, Role::Crewmate);

        assert!(matches!(
            SceneConfig::skeld().with_impostor("Orange"),
            Err(SceneError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let json = r#"{
            "waypoints": [{"name": "A", "x": 0, "y": 0}, {"name": "B", "x": 3, "y": 4}],
            "edges": [["A", "B"]],
            "tasks": {"common": ["A"], "short": [], "long": ["B"]},
            "rooms": {
                "cafeteria": "A", "electrical": "B", "reactor": "B", "oxygen": "A",
                "admin": "B", "security": "A", "cameras": [], "dead_drop": "B"
            },
            "agents": [{"id": "Red", "role": "imposter", "spawn": "A"}]
        }"#;
        let scene = SceneConfig::from_json_str(json).unwrap();
        assert!(scene.vents.is_empty());
        assert_eq!(scene.tasks.draw, TaskDraw::default());
        assert_eq!(scene.tuning, Tuning::default());
        assert_eq!(scene.agents[0].role, Role::Impostor);

        assert!(matches!(
            SceneConfig::from_json_str("{"),
            Err(SceneError::Json(_))
        ));
    }
}
