use chrono::DateTime;
use serde::Deserialize;

use crate::core::models::ChatMessage;
use crate::errors::TelegramError;

/// The subset of Telegram's `Update` object the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
    #[serde(default)]
    pub channel_post: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub date: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl TelegramUpdate {
    /// The carried message, whether posted in a group or a broadcast channel.
    #[must_use]
    pub fn into_message(self) -> Option<TelegramMessage> {
        self.message.or(self.channel_post)
    }
}

impl TelegramMessage {
    /// Id of the sender; channel posts without an author map to 0.
    #[must_use]
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map_or(0, |u| u.id)
    }

    /// Convert into the stored representation. `None` for updates without
    /// text or with an unrepresentable date.
    #[must_use]
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        let text = self.text.as_deref()?;
        let timestamp = DateTime::from_timestamp(self.date, 0)?;
        Some(ChatMessage {
            channel_id: self.chat.id,
            message_id: self.message_id,
            sender_id: self.sender_id(),
            sender_name: self
                .from
                .as_ref()
                .and_then(|u| u.username.clone())
                .filter(|name| !name.is_empty()),
            text: text.to_string(),
            timestamp,
        })
    }
}

/// Decode a webhook body.
///
/// # Errors
///
/// Returns `TelegramError::ParseError` for malformed JSON.
pub fn parse_update(body: &[u8]) -> Result<TelegramUpdate, TelegramError> {
    Ok(serde_json::from_slice(body)?)
}

fn mention_tag(bot_username: &str) -> String {
    format!("@{}", bot_username.trim_start_matches('@')).to_ascii_lowercase()
}

/// Whether `text` mentions the bot, ignoring ASCII case. Telegram usernames
/// are ASCII, so look-alike Unicode letters never count as a mention.
#[must_use]
pub fn mentions_bot(text: &str, bot_username: &str) -> bool {
    find_ascii_case_insensitive(text, &mention_tag(bot_username)).is_some()
}

/// Extract the range expression that follows the bot mention, dropping an
/// optional leading `summarize` keyword:
///
/// - `"@summary_bot"` → `""`
/// - `"@summary_bot summarize last 3 hours"` → `"last 3 hours"`
/// - `"@summary_bot 2024-01-01 to 2024-01-02"` → `"2024-01-01 to 2024-01-02"`
#[must_use]
pub fn parse_range_from_text(text: &str, bot_username: &str) -> String {
    let tag = mention_tag(bot_username);
    let Some(idx) = find_ascii_case_insensitive(text, &tag) else {
        return String::new();
    };

    let after = text[idx + tag.len()..].trim();
    let keyword = "summarize";
    let after = match after.get(..keyword.len()) {
        Some(head) if head.eq_ignore_ascii_case(keyword) => after[keyword.len()..].trim(),
        _ => after,
    };
    after.to_string()
}

/// Byte offset of `needle` (already lowercase) in `haystack`, comparing ASCII
/// case-insensitively so offsets stay valid in the original string.
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() || pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len())
        .filter(|&i| haystack.is_char_boundary(i))
        .find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}
