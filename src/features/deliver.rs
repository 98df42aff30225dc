use tracing::{error, info};

use crate::core::ports::MessageSender;
use crate::errors::{SummarizeError, TimeRangeError, format_window};

/// Reply sent when the range text could not be used.
pub const RANGE_HELP_MESSAGE: &str = "Could not parse requested time range. \
    Use e.g. 'last 6 hours' or '2024-01-01 to 2024-01-02'.";

/// Canonical failure message shown to users when summarization fails.
pub const CANONICAL_FAILURE_MESSAGE: &str = "Failed to generate summary. Please try again later.";

/// Text shown to the channel for a failed summary, or `None` when the failure
/// should stay silent.
#[must_use]
pub fn user_facing_error(err: &SummarizeError) -> Option<String> {
    match err {
        SummarizeError::AccessDenied(_) => None,
        SummarizeError::Parse(TimeRangeError::WindowTooLarge { max }) => Some(format!(
            "{RANGE_HELP_MESSAGE} The maximum window is {}.",
            format_window(*max)
        )),
        SummarizeError::Parse(_) => Some(RANGE_HELP_MESSAGE.to_string()),
        SummarizeError::Store(_) | SummarizeError::Generation(_) => {
            Some(CANONICAL_FAILURE_MESSAGE.to_string())
        }
    }
}

/// Post a finished summary as a reply to the triggering message.
pub async fn deliver_summary(
    sender: &dyn MessageSender,
    chat_id: i64,
    reply_to: i64,
    summary: &str,
) {
    match sender.send_message(chat_id, summary, Some(reply_to)).await {
        Ok(()) => info!(chat_id, "Summary delivered"),
        Err(e) => error!(chat_id, "Failed to deliver summary: {}", e),
    }
}

/// Tell the channel that its request failed. Delivery problems are logged only.
pub async fn deliver_error(
    sender: &dyn MessageSender,
    chat_id: i64,
    reply_to: i64,
    err: &SummarizeError,
) {
    let Some(text) = user_facing_error(err) else {
        return;
    };
    if let Err(e) = sender.send_message(chat_id, &text, Some(reply_to)).await {
        error!(chat_id, "Failed to deliver error notice: {}", e);
    }
}
