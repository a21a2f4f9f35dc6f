//! Wire format between the simulation and the external controller.
//!
//! Outbound, one frame per flush:
//!
//! ```text
//! {"type":"events","events":[{"agent":"Red","event":{...},"state":{...}}, ...]}
//! ```
//!
//! Inbound, one frame per decision round: a bare array of action records
//! `[{"agent":"Red","type":"move","details":"Admin"}, ...]`.

use crate::error::{ActionRejected, ProtocolError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skeld_env::Frame;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// `event` block of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
    pub time: f64,
}

/// One entry of the `tasks` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub location: String,
    #[serde(rename = "type")]
    pub category: String,
    pub status: String,
}

/// Current/max/ready triple for a cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownInfo {
    pub current: f64,
    pub max: f64,
    pub ready: bool,
}

/// Impostor-only block; serialises to `{}` for crewmates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImposterInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alive_crewmates: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_cooldown: Option<CooldownInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sabotage_cooldown: Option<CooldownInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_venting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_vents: Option<Vec<String>>,
}

/// Actions the agent may legally take right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailableAction {
    Move,
    Task,
    Report,
    CallMeeting,
    Security,
    Admin,
    Kill,
    Vent,
    Sabotage,
    Chat,
    Vote,
}

/// `state` block of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStateSnapshot {
    pub location: String,
    pub sabotage: BTreeMap<String, bool>,
    pub tasks: Vec<TaskEntry>,
    pub imposter_information: ImposterInformation,
    pub available_actions: Vec<AvailableAction>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// One outbound event with the emitting agent's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub agent: String,
    pub event: EventRecord,
    pub state: AgentStateSnapshot,
}

#[derive(Debug, Serialize)]
struct OutboundBatch<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    events: &'a [EventEnvelope],
}

/// Encodes a flushed queue into one `events` frame.
pub fn encode_batch(events: &[EventEnvelope]) -> Result<Frame, ProtocolError> {
    let batch = OutboundBatch {
        kind: "events",
        events,
    };
    serde_json::to_string(&batch)
        .map(Frame::new)
        .map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// One inbound action record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub agent: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub details: String,
}

impl ActionRecord {
    pub fn new(agent: &str, kind: &str, details: &str) -> Self {
        Self {
            agent: agent.to_string(),
            kind: kind.to_string(),
            details: details.to_string(),
        }
    }
}

/// Parses an inbound frame into action records.
///
/// Accepts a bare array or, leniently, a single record object. Records
/// missing `agent` or `type` are skipped with a warning; non-string `details`
/// are stringified.
pub fn parse_actions(text: &str) -> Result<Vec<ActionRecord>, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let entries = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(ProtocolError::UnexpectedShape),
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        match record_from_value(&entry) {
            Some(record) => records.push(record),
            None => warn!("Skipping action record without agent/type: {}", entry),
        }
    }
    Ok(records)
}

fn record_from_value(value: &Value) -> Option<ActionRecord> {
    let obj = value.as_object()?;
    let agent = string_field(obj.get("agent")?)?;
    let kind = string_field(obj.get("type")?)?;
    if agent.is_empty() || kind.is_empty() {
        return None;
    }
    let details = match obj.get("details") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Some(ActionRecord {
        agent,
        kind,
        details,
    })
}

fn string_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Action names understood by the dispatcher (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Move,
    Kill,
    Vent,
    Report,
    CallMeeting,
    Security,
    Admin,
    Sabotage,
    Task,
    StopTask,
    Chat,
    Vote,
}

impl ActionKind {
    /// Chat and vote go to the game-flow layer rather than an agent handler.
    pub fn is_flow(&self) -> bool {
        matches!(self, ActionKind::Chat | ActionKind::Vote)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Move => "move",
            ActionKind::Kill => "kill",
            ActionKind::Vent => "vent",
            ActionKind::Report => "report",
            ActionKind::CallMeeting => "callMeeting",
            ActionKind::Security => "security",
            ActionKind::Admin => "admin",
            ActionKind::Sabotage => "sabotage",
            ActionKind::Task => "task",
            ActionKind::StopTask => "stopTask",
            ActionKind::Chat => "chat",
            ActionKind::Vote => "vote",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = ActionRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(ActionKind::Move),
            "kill" => Ok(ActionKind::Kill),
            "vent" => Ok(ActionKind::Vent),
            "report" => Ok(ActionKind::Report),
            "callmeeting" => Ok(ActionKind::CallMeeting),
            "security" => Ok(ActionKind::Security),
            "admin" => Ok(ActionKind::Admin),
            "sabotage" => Ok(ActionKind::Sabotage),
            "task" => Ok(ActionKind::Task),
            "stoptask" => Ok(ActionKind::StopTask),
            "chat" => Ok(ActionKind::Chat),
            "vote" => Ok(ActionKind::Vote),
            _ => Err(ActionRejected::UnknownAction(s.to_string())),
        }
    }
}
