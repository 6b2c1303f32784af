use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    StateChanged,
    ActionTaken,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::StateChanged => "state_changed",
            AuditKind::ActionTaken => "action_taken",
        }
    }
}

/// Delivery state of a message in one queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Pending,
    Delivered,
}

impl MessageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Pending => "pending",
            MessageState::Delivered => "delivered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TagMerged,
    TagDeleted,
    Published,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TagMerged => "tag_merged",
            AuditAction::TagDeleted => "tag_deleted",
            AuditAction::Published => "published",
        }
    }
}

/// One audit record.
///
/// `name` is the state or action, `subject` the scoped queue id, tag name or
/// transaction id it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub kind: AuditKind,
    pub name: String,
    pub subject: String,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn state_changed(
        subject: impl Into<String>,
        state: MessageState,
        detail: serde_json::Value,
    ) -> Self {
        Self::new(AuditKind::StateChanged, state.as_str(), subject, detail)
    }

    pub fn action_taken(
        action: AuditAction,
        subject: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self::new(AuditKind::ActionTaken, action.as_str(), subject, detail)
    }

    fn new(
        kind: AuditKind,
        name: &str,
        subject: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.to_string(),
            subject: subject.into(),
            detail,
            occurred_at: Utc::now(),
        }
    }
}
