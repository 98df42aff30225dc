//! Telegram Bot API client module
//!
//! Only `sendMessage` is needed: summaries and error notices are posted back
//! as replies to the message that mentioned the bot.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::ports::MessageSender;
use crate::errors::TelegramError;

/// Telegram's per-message text limit, in characters.
pub const TELEGRAM_TEXT_LIMIT: usize = 4096;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_PREVIEW: usize = 1024;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

pub struct TelegramClient {
    http: Client,
    bot_token: String,
    base_url: String,
}

impl TelegramClient {
    /// # Errors
    ///
    /// Returns `TelegramError::HttpError` if the HTTP client cannot be built.
    pub fn new(bot_token: String, base_url: String) -> Result<Self, TelegramError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                TelegramError::HttpError(format!("Failed to build Telegram HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            bot_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }

    async fn send_chunk(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), TelegramError> {
        let payload = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };

        let response = self
            .http
            .post(self.api_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(TelegramError::ApiError(format!(
                "sendMessage failed: {status}: {preview}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), TelegramError> {
        let chunks = plan_chunks(text, TELEGRAM_TEXT_LIMIT, reply_to);
        if chunks.len() > 1 {
            warn!(chat_id, chunks = chunks.len(), "Reply exceeds Telegram limit, splitting");
        }
        for (chunk, reply) in &chunks {
            self.send_chunk(chat_id, chunk, *reply).await?;
        }
        debug!(chat_id, "Message delivered");
        Ok(())
    }
}

/// Split `text` for sending and pair each piece with the message it replies
/// to. Only the first piece is threaded as a reply.
#[must_use]
pub fn plan_chunks(text: &str, limit: usize, reply_to: Option<i64>) -> Vec<(String, Option<i64>)> {
    split_message(text, limit)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| (chunk, if i == 0 { reply_to } else { None }))
        .collect()
}

/// Split `text` into pieces of at most `limit` characters, preferring to
/// break after a newline. Never returns an empty vector.
#[must_use]
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(idx, _)| idx);
        let cut = rest[..hard_end]
            .rfind('\n')
            .map_or(hard_end, |idx| idx + 1);
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
        assert_eq!(split_message("", 10), vec![""]);
    }

    #[test]
    fn test_split_prefers_line_breaks() {
        let text = "line one\nline two\nline three";
        let chunks = split_message(text, 12);
        assert_eq!(chunks, vec!["line one\n", "line two\n", "line three"]);
    }

    #[test]
    fn test_split_hard_cuts_long_lines() {
        let chunks = split_message(&"a".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), "a".repeat(25));
    }

    #[test]
    fn test_split_respects_multibyte_characters() {
        let text = "ü".repeat(9);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks, vec!["üüüü", "üüüü", "ü"]);
    }

    #[test]
    fn test_only_first_chunk_is_a_reply() {
        let plan = plan_chunks("one\ntwo\nthree", 5, Some(42));
        assert_eq!(
            plan,
            vec![
                ("one\n".to_string(), Some(42)),
                ("two\n".to_string(), None),
                ("three".to_string(), None),
            ]
        );

        let plan = plan_chunks("short", TELEGRAM_TEXT_LIMIT, Some(7));
        assert_eq!(plan, vec![("short".to_string(), Some(7))]);

        let plan = plan_chunks(&"x".repeat(TELEGRAM_TEXT_LIMIT + 1), TELEGRAM_TEXT_LIMIT, None);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|(_, reply)| reply.is_none()));
    }

    #[test]
    fn test_send_payload_omits_missing_reply() {
        let payload = SendMessageRequest {
            chat_id: -100,
            text: "hi",
            reply_to_message_id: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["chat_id"], -100);
        assert!(value.get("reply_to_message_id").is_none());
    }

    #[test]
    fn test_api_url() {
        let client =
            TelegramClient::new("123:abc".to_string(), "https://api.telegram.org/".to_string())
                .unwrap();
        assert_eq!(
            client.api_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }
}
