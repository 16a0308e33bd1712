use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Producer-reported processing phase for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Processing,
    Idle,
}

/// One capture event as pushed by the OCR/watcher side. Producers deliver
/// these at-least-once and in no particular cross-path order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub path: String,
    pub status: EventStatus,
    pub text: Option<String>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub urls: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
}

impl CaptureEvent {
    pub fn idle(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: EventStatus::Idle,
            text: None,
            error: None,
            created_at: None,
            tags: None,
            urls: None,
            emails: None,
        }
    }

    pub fn processing(path: impl Into<String>) -> Self {
        Self {
            status: EventStatus::Processing,
            ..Self::idle(path)
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Parses a loosely-typed producer payload. Producers are not trusted to
    /// send well-formed fields: timestamps arrive as RFC 3339 strings or
    /// stringified epoch seconds/milliseconds, and list fields arrive either
    /// as JSON arrays or as JSON-array-encoded strings. Anything malformed
    /// decays to its default rather than poisoning the event. Returns `None`
    /// only when the payload has no usable path.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let path = payload.get("path")?.as_str()?.trim();
        if path.is_empty() {
            return None;
        }
        let status = match payload.get("status").and_then(Value::as_str) {
            Some("processing") => EventStatus::Processing,
            _ => EventStatus::Idle,
        };

        Some(Self {
            path: path.to_string(),
            status,
            text: payload
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string),
            error: payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string),
            created_at: payload.get("created_at").and_then(parse_timestamp),
            tags: payload.get("tags").map(parse_string_list),
            urls: payload.get("urls").map(parse_string_list),
            emails: payload.get("emails").map(parse_string_list),
        })
    }
}

/// Advisory ingestion-batch counters, passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
    pub eta_seconds: u64,
    pub in_progress: bool,
}

/// Everything the single-consumer engine loop accepts on its channel.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Capture(CaptureEvent),
    TagsUpdated { path: String, tags: Vec<String> },
    Batch(BatchProgress),
}

const MILLIS_CUTOVER: i64 = 100_000_000_000;

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    // Values too large to be seconds are read as milliseconds.
    if raw >= MILLIS_CUTOVER {
        DateTime::<Utc>::from_timestamp_millis(raw)
    } else {
        DateTime::<Utc>::from_timestamp(raw, 0)
    }
}

/// Accepts RFC 3339, epoch seconds, or epoch milliseconds. Producers and the
/// legacy store both emit stringified numbers.
pub(crate) fn parse_flexible_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    raw.parse::<i64>().ok().and_then(from_epoch)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => parse_flexible_timestamp(s),
        _ => None,
    }
}

fn parse_string_list(value: &Value) -> Vec<String> {
    let collect = |items: &[Value]| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    match value {
        Value::Array(items) => collect(items),
        // JSON-array-encoded string, the way the legacy store serialized
        // list columns.
        Value::String(raw) => serde_json::from_str::<Vec<String>>(raw).unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_payload() {
        let event = CaptureEvent::from_payload(&json!({
            "path": "/shots/a.png",
            "status": "idle",
            "text": "hello",
            "created_at": "2026-03-01T10:00:00Z",
            "tags": ["Messages"],
        }))
        .unwrap();

        assert_eq!(event.path, "/shots/a.png");
        assert_eq!(event.status, EventStatus::Idle);
        assert_eq!(event.text.as_deref(), Some("hello"));
        assert_eq!(event.tags.as_deref(), Some(&["Messages".to_string()][..]));
        assert!(event.error.is_none());
    }

    #[test]
    fn missing_or_blank_path_is_rejected() {
        assert!(CaptureEvent::from_payload(&json!({"status": "idle"})).is_none());
        assert!(CaptureEvent::from_payload(&json!({"path": "  "})).is_none());
    }

    #[test]
    fn timestamp_accepts_epoch_seconds_and_millis_strings() {
        let secs = CaptureEvent::from_payload(&json!({
            "path": "/a.png", "created_at": "1700000000"
        }))
        .unwrap();
        let millis = CaptureEvent::from_payload(&json!({
            "path": "/a.png", "created_at": "1700000000000"
        }))
        .unwrap();

        assert_eq!(secs.created_at, millis.created_at);
        assert!(secs.created_at.is_some());
    }

    #[test]
    fn malformed_timestamp_decays_to_none() {
        let event = CaptureEvent::from_payload(&json!({
            "path": "/a.png", "created_at": "not a date"
        }))
        .unwrap();
        assert!(event.created_at.is_none());
    }

    #[test]
    fn list_fields_accept_json_encoded_strings() {
        let event = CaptureEvent::from_payload(&json!({
            "path": "/a.png",
            "tags": "[\"Code\",\"Errors\"]",
            "urls": "not json",
        }))
        .unwrap();

        assert_eq!(
            event.tags.as_deref(),
            Some(&["Code".to_string(), "Errors".to_string()][..])
        );
        assert_eq!(event.urls.as_deref(), Some(&[][..]));
    }

    #[test]
    fn unknown_status_defaults_to_idle() {
        let event = CaptureEvent::from_payload(&json!({
            "path": "/a.png", "status": "???"
        }))
        .unwrap();
        assert_eq!(event.status, EventStatus::Idle);
    }
}
