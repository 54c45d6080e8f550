//! Turn Event Logger
//!
//! Writes one structured record per turn step to the `turn_events` target,
//! which the file layer serializes as NDJSON.

use codecontext_core::{TurnEvent, TurnEventKind};
use serde_json::Value;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

pub struct TurnEventLogger;

impl TurnEventLogger {
    /// Redact the event payload and emit it through `tracing`.
    pub fn log_event(event: &TurnEvent) -> Value {
        let payload = redact_value(&event.payload);

        if event.kind == TurnEventKind::TurnFailed {
            warn!(
                target: "turn_events",
                event_id = %event.id,
                session_id = %event.session_id,
                turn = event.turn,
                kind = %event.kind,
                timestamp = %event.timestamp.to_rfc3339(),
                payload = %payload,
                "Turn event"
            );
        } else {
            info!(
                target: "turn_events",
                event_id = %event.id,
                session_id = %event.session_id,
                turn = event.turn,
                kind = %event.kind,
                timestamp = %event.timestamp.to_rfc3339(),
                payload = %payload,
                "Turn event"
            );
        }

        payload
    }
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn payload_is_redacted() {
        let key = format!("AIza{}", "z".repeat(35));
        let event = TurnEvent::new(
            Uuid::new_v4(),
            1,
            TurnEventKind::TurnFailed,
            serde_json::json!({ "detail": format!("request to ?key={key} failed"), "status": 400 }),
        );
        let logged = TurnEventLogger::log_event(&event);
        assert!(!logged.to_string().contains(&key));
        assert_eq!(logged["status"], 400);
    }
}
