//! Client modules for external API interactions

pub mod llm_client;
pub mod telegram_client;

pub use llm_client::LlmClient;
pub use telegram_client::TelegramClient;
