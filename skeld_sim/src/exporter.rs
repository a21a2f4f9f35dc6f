//! JSON transcript exporter.
//!
//! Records every event the controller end received during a scenario, for
//! offline inspection or replay comparisons between seeds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::Write;

/// One event as the controller saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Runtime tick at which the frame was read
    pub tick: u64,

    /// Game time stamped on the event
    pub time_sec: f64,

    pub agent: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub details: String,
}

/// Complete scenario transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Final game time in seconds
    pub duration_sec: f64,

    /// Frames received by the controller end
    pub frames: u64,

    pub entries: Vec<TranscriptEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,

    pub passed: bool,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: 0,
            entries: Vec::new(),
            outcome: None,
            passed: false,
        }
    }

    /// Records one outbound `events` frame. Returns how many events it held.
    ///
    /// Frames that are not an events batch are ignored.
    pub fn record_frame(&mut self, tick: u64, frame: &str) -> usize {
        let Ok(value) = serde_json::from_str::<Value>(frame) else {
            return 0;
        };
        let Some(events) = value.get("events").and_then(Value::as_array) else {
            return 0;
        };
        self.frames += 1;

        for envelope in events {
            let event = &envelope["event"];
            let time_sec = event["time"].as_f64().unwrap_or(0.0);
            self.duration_sec = self.duration_sec.max(time_sec);
            self.entries.push(TranscriptEntry {
                tick,
                time_sec,
                agent: envelope["agent"].as_str().unwrap_or_default().to_string(),
                kind: event["type"].as_str().unwrap_or_default().to_string(),
                details: event["details"].as_str().unwrap_or_default().to_string(),
            });
        }
        events.len()
    }

    /// Entries of one event type, optionally for one agent.
    pub fn find<'a>(&'a self, kind: &'a str, agent: Option<&'a str>) -> impl Iterator<Item = &'a TranscriptEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind && agent.map_or(true, |a| e.agent == a))
    }

    pub fn contains(&self, kind: &str, agent: Option<&str>) -> bool {
        self.find(kind, agent).next().is_some()
    }

    /// Finalizes the transcript.
    pub fn finalize(&mut self, passed: bool, outcome: Option<String>) {
        self.passed = passed;
        self.outcome = outcome;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
