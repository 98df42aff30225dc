use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as persisted per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel_id: i64,
    pub message_id: i64,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Sender's username when known, otherwise `user-<sender_id>`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.sender_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("user-{}", self.sender_id),
        }
    }
}

/// Half-open `[from, to)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryRequest {
    pub channel_id: i64,
    /// Text following the bot mention, e.g. `last 3 hours` or
    /// `2024-01-01 to 2024-01-02`. Blank means the default window.
    pub raw_range: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged unit of model input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}
