//! Error types for the simulation core.

use crate::agent::Role;
use crate::sabotage::SabotageKind;
use thiserror::Error;

/// Why an inbound action was not applied.
///
/// Every variant is non-fatal: the action is skipped, engine state is left
/// untouched and the reason is logged against the acting agent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionRejected {
    #[error("only {required}s can {action}")]
    WrongRole { action: &'static str, required: Role },

    #[error("agent is dead")]
    Dead,

    #[error("cannot act while venting")]
    Venting,

    #[error("on cooldown ({timer:.1}s / {max}s)")]
    Cooldown { timer: f64, max: f64 },

    #[error("must be in {required}")]
    WrongRoom { required: String },

    #[error("waypoint '{0}' not found")]
    UnknownWaypoint(String),

    #[error("agent has no current location")]
    NoLocation,

    #[error("no path from '{from}' to '{to}'")]
    NoPath { from: String, to: String },

    #[error("'{0}' is not a vent")]
    NotAVent(String),

    #[error("'{from}' and '{to}' are not connected")]
    VentsNotConnected { from: String, to: String },

    #[error("already at '{0}'")]
    SameVent(String),

    #[error("{0} sabotage already active")]
    SabotageActive(SabotageKind),

    #[error("a meeting is already in progress")]
    MeetingActive,

    #[error("no meeting is in progress")]
    NoMeeting,

    #[error("no dead body found in this room")]
    NoBody,

    #[error("no crewmate within range ({range}u)")]
    NoTarget { range: f64 },

    #[error("unknown sabotage type '{0}', use Electrical / Reactor / O2")]
    UnknownSabotage(String),

    #[error("unknown action type '{0}'")]
    UnknownAction(String),

    #[error("no agent with id '{0}'")]
    UnknownAgent(String),

    #[error("{0} is null or empty")]
    MissingParameter(&'static str),

    #[error("'{0}' is not an assigned task")]
    NotAssignedTask(String),

    #[error("no task is currently running")]
    NoActiveTask,

    #[error("the game is over")]
    GameOver,
}

/// Errors raised while building a game from a scene description.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unknown waypoint '{0}'")]
    UnknownWaypoint(String),

    #[error("duplicate waypoint '{0}'")]
    DuplicateWaypoint(String),

    #[error("duplicate agent '{0}'")]
    DuplicateAgent(String),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("waypoint '{0}' cannot neighbor itself")]
    SelfLoop(String),

    #[error("failed to read scene: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scene: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors on the wire protocol boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("frame is not an action array or record")]
    UnexpectedShape,

    #[error("failed to encode batch: {0}")]
    Encode(String),
}

impl From<ProtocolError> for skeld_env::EnvError {
    fn from(err: ProtocolError) -> Self {
        skeld_env::EnvError::SerializationError(err.to_string())
    }
}
