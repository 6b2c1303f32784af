use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "H")]
    High,
    #[default]
    #[serde(rename = "L")]
    Low,
}

impl Priority {
    /// Parse the wire form (`"H"` / `"L"`)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "H" => Some(Priority::High),
            "L" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// A message as stored in one queue.
///
/// Every target queue receives its own copy with its own `id`; copies of
/// one publish share nothing a consumer can correlate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    /// Publish time, milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Message {
    pub fn new(payload: serde_json::Value, priority: Priority, callback: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            priority,
            callback,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Fresh copy for another target queue
    pub fn copy_for_target(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    /// Decode a stored list element.
    ///
    /// Elements written by other producers (plain text rather than an
    /// encoded message) become a message whose payload is that text.
    pub fn from_stored(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            id: Uuid::nil(),
            payload: serde_json::Value::String(raw.to_string()),
            priority: Priority::Low,
            callback: None,
            timestamp: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_wire_form() {
        assert_eq!(Priority::parse("H"), Some(Priority::High));
        assert_eq!(Priority::parse("L"), Some(Priority::Low));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), json!("H"));
    }

    #[test]
    fn test_copies_get_distinct_ids() {
        let message = Message::new(json!("hi"), Priority::High, None);
        let copy = message.copy_for_target();
        assert_ne!(message.id, copy.id);
        assert_eq!(message.payload, copy.payload);
        assert_eq!(message.timestamp, copy.timestamp);
    }

    #[test]
    fn test_foreign_elements_decode_as_payload() {
        let message = Message::from_stored("plain text");
        assert_eq!(message.payload, json!("plain text"));
        assert!(message.id.is_nil());
    }

    #[test]
    fn test_stored_form_decodes() {
        let original = Message::new(json!({"k": 1}), Priority::Low, Some("http://cb".to_string()));
        let raw = serde_json::to_string(&original).unwrap();
        assert_eq!(Message::from_stored(&raw), original);
    }
}
