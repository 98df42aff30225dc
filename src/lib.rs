//! summary-bot - a Telegram bot that summarizes channel history with an LLM.
//!
//! The bot records every message posted in whitelisted chats and, when
//! mentioned, summarizes a requested time window of that history:
//!
//! 1. A webhook server (axum) receives Telegram updates, stores messages and
//!    detects `@summary_bot` mentions
//! 2. A summary job resolves the requested window, loads the messages and asks
//!    the language model for a summary, then replies in the chat
//!
//! # Architecture
//!
//! The system uses:
//! - axum for the webhook endpoint
//! - sqlx (SQLite) for the per-channel message log
//! - reqwest for the Telegram Bot API and OpenAI Chat Completions
//! - Tokio for async runtime
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use summary_bot::adapters::persistence::SqliteStore;
//! use summary_bot::clients::LlmClient;
//! use summary_bot::core::ChannelAccessPolicy;
//! use summary_bot::core::config::SummaryConfig;
//! use summary_bot::core::models::SummaryRequest;
//! use summary_bot::features::SummaryEngine;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     summary_bot::setup_logging();
//!
//!     let store = Arc::new(SqliteStore::open("summary_bot.db").await?);
//!     let llm = Arc::new(LlmClient::new(
//!         "sk-...".to_string(),
//!         "https://api.openai.com/v1".to_string(),
//!         "gpt-4.1-mini".to_string(),
//!     )?);
//!     let policy = Arc::new(ChannelAccessPolicy::new([-1001234567890]));
//!     let engine = SummaryEngine::new(store, llm, policy, SummaryConfig::default());
//!
//!     let request = SummaryRequest {
//!         channel_id: -1001234567890,
//!         raw_range: "last 6 hours".to_string(),
//!     };
//!     let summary = engine
//!         .summarize(chrono::Utc::now(), &request, &CancellationToken::new())
//!         .await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod api;
pub mod clients;
pub mod core;
pub mod errors;
pub mod features;
pub mod prompt;

pub use errors::{LlmError, StoreError, SummarizeError, TelegramError, TimeRangeError};
pub use features::SummaryEngine;
pub use prompt::estimate_tokens;

/// Configure structured logging with JSON output.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// summary_bot::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
