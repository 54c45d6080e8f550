use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a generate action currently is.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    FetchingSource,
    Generating,
}

impl TurnPhase {
    /// True while a turn's asynchronous work is outstanding.
    pub fn is_in_flight(self) -> bool {
        self != TurnPhase::Idle
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::FetchingSource => "fetching_source",
            TurnPhase::Generating => "generating",
        };
        f.write_str(s)
    }
}

/// A diagnostic record emitted at each step of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub turn: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: TurnEventKind,
    pub payload: serde_json::Value,
}

/// Categories of events that can occur during a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnEventKind {
    TurnStarted,
    SourceFetched,
    SourceReused,
    ReplyGenerated,
    TurnFailed,
}

impl TurnEvent {
    pub fn new(session_id: Uuid, turn: u64, kind: TurnEventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            turn,
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }
}

impl std::fmt::Display for TurnEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
