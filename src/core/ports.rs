//! Seams between the summarization pipeline and its collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::models::{ChatMessage, ChatTurn};
use crate::errors::{LlmError, StoreError, TelegramError};

/// Append-only per-channel message log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store a message; a repeated `(channel_id, message_id)` is ignored.
    async fn insert_message(&self, msg: &ChatMessage) -> Result<(), StoreError>;

    /// Messages of `channel_id` with `from <= timestamp < to`, oldest first,
    /// at most `limit` of them (a non-positive limit selects the store default).
    async fn query(
        &self,
        channel_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChatMessage>, StoreError>;
}

/// Stateless text generation. Implementations prepend their own system turn.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<String, LlmError>;
}

/// Outbound chat messages.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), TelegramError>;
}
