//! Outbound event kinds and their wire type tags.

use std::fmt;

/// Something an agent noticed or caused.
///
/// `Display` renders the wire `type` tag; perception events carry the other
/// agent's id as a `:<id>` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    SeePlayer(String),
    SeePlayerEnd(String),
    SeeBody(String),
    KillRange(String),
    KillRangeEnd(String),
    SeeKill,
    CompleteKill,
    SeeEnterVent,
    SeeExitVent,
    Vent,
    CompleteTask,
    Sabotage,
    SabotageEnd,
    BodyFound,
    EmergencyMeeting,
    MeetingEnd,
    KillCooldownEnd,
    SabotageCooldownEnd,
    Security,
    Admin,
    ReachLocation,
    GameOver,
}

impl EventKind {
    /// Priority events bypass the batch window and flush at once.
    pub fn is_priority(&self) -> bool {
        matches!(
            self,
            EventKind::BodyFound | EventKind::EmergencyMeeting | EventKind::MeetingEnd
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::SeePlayer(id) => write!(f, "seePlayer:{}", id),
            EventKind::SeePlayerEnd(id) => write!(f, "seePlayerEnd:{}", id),
            EventKind::SeeBody(id) => write!(f, "seeBody:{}", id),
            EventKind::KillRange(id) => write!(f, "killRange:{}", id),
            EventKind::KillRangeEnd(id) => write!(f, "killRangeEnd:{}", id),
            EventKind::SeeKill => f.write_str("seeKill"),
            EventKind::CompleteKill => f.write_str("completeKill"),
            EventKind::SeeEnterVent => f.write_str("seeEnterVent"),
            EventKind::SeeExitVent => f.write_str("seeExitVent"),
            EventKind::Vent => f.write_str("vent"),
            EventKind::CompleteTask => f.write_str("completeTask"),
            EventKind::Sabotage => f.write_str("sabotage"),
            EventKind::SabotageEnd => f.write_str("sabotageEnd"),
            EventKind::BodyFound => f.write_str("bodyFound"),
            EventKind::EmergencyMeeting => f.write_str("emergencyMeeting"),
            EventKind::MeetingEnd => f.write_str("meetingEnd"),
            EventKind::KillCooldownEnd => f.write_str("killCooldownEnd"),
            EventKind::SabotageCooldownEnd => f.write_str("sabotageCooldownEnd"),
            EventKind::Security => f.write_str("security"),
            EventKind::Admin => f.write_str("admin"),
            EventKind::ReachLocation => f.write_str("reachLocation"),
            EventKind::GameOver => f.write_str("gameOver"),
        }
    }
}

/// Event details: free text, or a JSON object for structured payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Text(String),
    Json(serde_json::Map<String, serde_json::Value>),
}

impl Details {
    pub fn text(s: impl Into<String>) -> Self {
        Details::Text(s.into())
    }

    /// Appends room company: a sentence for text, an `alsoInRoom` array for JSON.
    pub fn with_roommates(self, roommates: &[String]) -> Self {
        match self {
            Details::Text(mut s) => {
                if roommates.is_empty() {
                    s.push_str("; you are alone in this room");
                } else {
                    s.push_str("; also in this room: ");
                    s.push_str(&roommates.join(", "));
                }
                Details::Text(s)
            }
            Details::Json(mut map) => {
                map.insert(
                    "alsoInRoom".to_string(),
                    serde_json::Value::from(roommates.to_vec()),
                );
                Details::Json(map)
            }
        }
    }

    /// Renders to the wire string. JSON payloads are embedded compact.
    pub fn render(&self) -> String {
        match self {
            Details::Text(s) => s.clone(),
            Details::Json(map) => serde_json::Value::Object(map.clone()).to_string(),
        }
    }
}
