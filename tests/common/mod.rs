#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use summary_bot::core::models::{ChatMessage, ChatTurn};
use summary_bot::core::ports::{LlmGateway, MessageSender, MessageStore};
use summary_bot::errors::{LlmError, StoreError, TelegramError};
use tokio_util::sync::CancellationToken;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
}

pub fn message(
    channel_id: i64,
    message_id: i64,
    sender_id: i64,
    sender_name: Option<&str>,
    text: &str,
    timestamp: DateTime<Utc>,
) -> ChatMessage {
    ChatMessage {
        channel_id,
        message_id,
        sender_id,
        sender_name: sender_name.map(str::to_string),
        text: text.to_string(),
        timestamp,
    }
}

/// In-memory message log with call counting.
#[derive(Default)]
pub struct FakeStore {
    pub msgs: Mutex<Vec<ChatMessage>>,
    pub queries: AtomicUsize,
    pub last_limit: Mutex<Option<i64>>,
    pub fail: bool,
    /// Ignore the limit, like a misbehaving backend.
    pub ignore_limit: bool,
}

impl FakeStore {
    pub fn with_messages(msgs: Vec<ChatMessage>) -> Self {
        Self {
            msgs: Mutex::new(msgs),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<ChatMessage> {
        self.msgs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn insert_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
        let mut msgs = self.msgs.lock().unwrap();
        if !msgs
            .iter()
            .any(|m| m.channel_id == msg.channel_id && m.message_id == msg.message_id)
        {
            msgs.push(msg.clone());
        }
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
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_limit.lock().unwrap() = Some(limit);
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.fail {
            return Err(StoreError::Corrupt("disk on fire".to_string()));
        }

        let mut out: Vec<ChatMessage> = self
            .msgs
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel_id == channel_id && m.timestamp >= from && m.timestamp < to)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.timestamp);
        if !self.ignore_limit && limit > 0 {
            out.truncate(usize::try_from(limit).unwrap());
        }
        Ok(out)
    }
}

#[derive(Default)]
pub struct FakeLlm {
    pub calls: Mutex<Vec<Vec<ChatTurn>>>,
    pub response: String,
    pub fail: bool,
    /// Block until cancelled.
    pub hang: bool,
}

impl FakeLlm {
    pub fn responding(response: &str) -> Self {
        Self {
            response: response.to_string(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_turns(&self) -> Option<Vec<ChatTurn>> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmGateway for FakeLlm {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        if self.hang {
            cancel.cancelled().await;
            return Err(LlmError::Cancelled);
        }
        if self.fail {
            return Err(LlmError::ApiError("llm fail".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[derive(Default)]
pub struct FakeSender {
    pub sent: Mutex<Vec<(i64, String, Option<i64>)>>,
}

impl FakeSender {
    pub fn sent(&self) -> Vec<(i64, String, Option<i64>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), TelegramError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), reply_to));
        Ok(())
    }
}
