use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::models::ChatMessage;
use crate::core::ports::MessageStore;
use crate::errors::StoreError;

/// Limit applied when a caller passes a non-positive one.
pub const DEFAULT_QUERY_LIMIT: i64 = 1000;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    channel_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    sender_id  INTEGER NOT NULL,
    username   TEXT,
    text       TEXT NOT NULL,
    ts_utc     INTEGER NOT NULL,
    PRIMARY KEY(channel_id, message_id)
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_ts
    ON messages(channel_id, ts_utc);
";

#[derive(Debug, FromRow)]
struct MessageRow {
    channel_id: i64,
    message_id: i64,
    sender_id: i64,
    username: Option<String>,
    text: String,
    ts_utc: i64,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let timestamp = DateTime::from_timestamp(row.ts_utc, 0).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "message {}/{} has out-of-range timestamp {}",
                row.channel_id, row.message_id, row.ts_utc
            ))
        })?;
        Ok(ChatMessage {
            channel_id: row.channel_id,
            message_id: row.message_id,
            sender_id: row.sender_id,
            sender_name: row.username,
            text: row.text,
            timestamp,
        })
    }
}

/// Message log backed by SQLite. Timestamps are stored as UTC epoch seconds.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file at `path` and make sure
    /// the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist yet. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn select_range(
        &self,
        channel_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let limit = if limit <= 0 { DEFAULT_QUERY_LIMIT } else { limit };

        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT channel_id, message_id, sender_id, username, text, ts_utc
             FROM messages
             WHERE channel_id = ? AND ts_utc >= ? AND ts_utc < ?
             ORDER BY ts_utc ASC, message_id ASC
             LIMIT ?",
        )
        .bind(channel_id)
        .bind(from.timestamp())
        .bind(to.timestamp())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(channel_id, rows = rows.len(), "Fetched message range");
        rows.into_iter().map(ChatMessage::try_from).collect()
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn insert_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
        let username = msg.sender_name.as_deref().filter(|name| !name.is_empty());
        sqlx::query(
            "INSERT OR IGNORE INTO messages(channel_id, message_id, sender_id, username, text, ts_utc)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(msg.channel_id)
        .bind(msg.message_id)
        .bind(msg.sender_id)
        .bind(username)
        .bind(msg.text.as_str())
        .bind(msg.timestamp.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        channel_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(StoreError::Cancelled),
            result = self.select_range(channel_id, from, to, limit) => result,
        }
    }
}
