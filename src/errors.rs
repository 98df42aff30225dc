use chrono::Duration;
use thiserror::Error;

/// Why a time range expression could not be turned into a window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    #[error("could not parse time range expression")]
    UnrecognizedExpression,

    #[error("invalid quantity in time range")]
    InvalidQuantity,

    #[error("unsupported time unit: {0}")]
    UnsupportedUnit(String),

    #[error("invalid date/time in time range: {0}")]
    InvalidTimestamp(String),

    #[error("end of time range must be after its start")]
    OrderViolation,

    #[error("requested window exceeds maximum of {}", format_window(.max.to_owned()))]
    WindowTooLarge { max: Duration },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),

    #[error("store query cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to access OpenAI API: {0}")]
    ApiError(String),

    #[error("OpenAI returned no choices")]
    EmptyResponse,

    #[error("generation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        LlmError::HttpError(error.to_string())
    }
}

/// Failure of a single summarization request.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("channel {0} is not allowed")]
    AccessDenied(i64),

    #[error(transparent)]
    Parse(#[from] TimeRangeError),

    #[error("fetch messages: {0}")]
    Store(#[source] StoreError),

    #[error("llm summarize: {0}")]
    Generation(#[source] LlmError),
}

impl SummarizeError {
    /// True when the request was abandoned because its cancellation token fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SummarizeError::Store(StoreError::Cancelled)
                | SummarizeError::Generation(LlmError::Cancelled)
        )
    }
}

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Failed to parse Telegram update: {0}")]
    ParseError(String),

    #[error("Failed to access Telegram API: {0}")]
    ApiError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(error: reqwest::Error) -> Self {
        TelegramError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for TelegramError {
    fn from(error: serde_json::Error) -> Self {
        TelegramError::ParseError(error.to_string())
    }
}

/// Render a window length the way operators write it in config: `7d`, `36h`, `90m`.
#[must_use]
pub fn format_window(window: Duration) -> String {
    let secs = window.num_seconds();
    if secs != 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs != 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
