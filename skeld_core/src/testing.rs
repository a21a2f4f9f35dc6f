//! Small deterministic scene shared by the unit tests.
//!
//! ```text
//!   Security(-10,10) ── Cafeteria(0,10)       O2(10,10)
//!                            │                   │
//!   Reactor(-20,0) ── Electrical(-10,0) ── Hallway(0,0) ── Admin(10,0)
//!                                            │
//!                                       Storage(0,-10)
//! ```
//!
//! Every pair of rooms is at least 10 units apart, outside both the near
//! radius and the kill range. `Dead Drop` has no edges.

use crate::agent::Role;
use crate::game::Game;
use crate::protocol::EventEnvelope;
use crate::scene::{AgentSpec, SceneConfig, SpecialRooms, TaskPools, Tuning, VentSpec, WaypointSpec};
use crate::tasks::TaskDraw;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub(crate) fn small_scene() -> SceneConfig {
    let waypoints = [
        ("Cafeteria", 0.0, 10.0),
        ("Hallway", 0.0, 0.0),
        ("Admin", 10.0, 0.0),
        ("Storage", 0.0, -10.0),
        ("Electrical", -10.0, 0.0),
        ("Reactor", -20.0, 0.0),
        ("O2", 10.0, 10.0),
        ("Security", -10.0, 10.0),
        ("Dead Drop", 100.0, 100.0),
    ];
    let edges = [
        ("Hallway", "Cafeteria"),
        ("Hallway", "Admin"),
        ("Hallway", "Storage"),
        ("Hallway", "Electrical"),
        ("Electrical", "Reactor"),
        ("Admin", "O2"),
        ("Cafeteria", "Security"),
    ];
    let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    SceneConfig {
        waypoints: waypoints
            .iter()
            .map(|&(name, x, y)| WaypointSpec {
                name: name.to_string(),
                x,
                y,
            })
            .collect(),
        edges: edges
            .iter()
            .map(|&(a, b)| (a.to_string(), b.to_string()))
            .collect(),
        vents: vec![
            VentSpec {
                name: "Electrical - Admin".to_string(),
                members: names(&["Electrical", "Admin"]),
            },
            VentSpec {
                name: "Reactor - Security".to_string(),
                members: names(&["Reactor", "Security"]),
            },
        ],
        tasks: TaskPools {
            common: names(&["Storage", "Admin"]),
            short: names(&["Electrical", "Reactor"]),
            long: names(&["O2"]),
            draw: TaskDraw {
                common: 1,
                short: 1,
                long: 1,
            },
        },
        rooms: SpecialRooms {
            cafeteria: "Cafeteria".to_string(),
            electrical: "Electrical".to_string(),
            reactor: "Reactor".to_string(),
            oxygen: "O2".to_string(),
            admin: "Admin".to_string(),
            security: "Security".to_string(),
            cameras: names(&["Hallway"]),
            dead_drop: "Dead Drop".to_string(),
        },
        agents: [
            ("Red", Role::Impostor),
            ("Blue", Role::Crewmate),
            ("Green", Role::Crewmate),
            ("Yellow", Role::Crewmate),
        ]
        .iter()
        .map(|&(id, role)| AgentSpec {
            id: id.to_string(),
            role,
            spawn: "Cafeteria".to_string(),
            near_radius: None,
            closest_radius: None,
        })
        .collect(),
        tuning: Tuning::default(),
    }
}

pub(crate) fn small_game() -> Game {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    Game::from_scene(&small_scene(), &mut rng).expect("small scene is valid")
}

/// Takes everything queued so far.
pub(crate) fn drain(game: &Game) -> Vec<EventEnvelope> {
    game.outbox().take_batch()
}
