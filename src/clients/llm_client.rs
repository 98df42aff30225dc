//! LLM (OpenAI) API client module
//!
//! Sends summarization prompts to the Chat Completions endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::models::ChatTurn;
use crate::core::ports::LlmGateway;
use crate::errors::LlmError;
use crate::prompt::{SYSTEM_PROMPT, estimate_tokens};

const MAX_OUTPUT_TOKENS: u32 = 512;
const TEMPERATURE: f32 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// LLM API client for generating summaries
pub struct LlmClient {
    http: Client,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns `LlmError::HttpError` if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: String, model_name: String) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::HttpError(format!("Failed to build OpenAI HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name,
        })
    }

    /// Prepend the fixed system turn to the caller's turns.
    #[must_use]
    pub fn build_messages(turns: &[ChatTurn]) -> Vec<ChatTurn> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatTurn::system(SYSTEM_PROMPT));
        messages.extend_from_slice(turns);
        messages
    }

    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, LlmError> {
        let messages = Self::build_messages(turns);

        #[cfg(feature = "debug-logs")]
        info!("Using ChatGPT prompt:\n{:?}", messages);

        let estimated_input_tokens = messages
            .iter()
            .map(|turn| estimate_tokens(&turn.content))
            .sum::<usize>();
        info!(
            model = %self.model_name,
            turns = messages.len(),
            estimated_input_tokens,
            "Requesting summary"
        );

        let body = ChatCompletionRequest {
            model: &self.model_name,
            messages,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::HttpError(format!("OpenAI API request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::HttpError(format!("Failed to read OpenAI response: {e}")))?;

        parse_completion(status.is_success(), status.as_u16(), &text)
    }
}

/// Extract the first choice's text from a Chat Completions response body.
///
/// # Errors
///
/// Fails on non-2xx statuses, on an `error` object, on malformed JSON and when
/// no choice carries content.
pub fn parse_completion(success: bool, status: u16, body: &str) -> Result<String, LlmError> {
    let parsed: Result<ChatCompletionResponse, _> = serde_json::from_str(body);

    if let Ok(ChatCompletionResponse {
        error: Some(err), ..
    }) = &parsed
    {
        return Err(LlmError::ApiError(format!("OpenAI error: {}", err.message)));
    }
    if !success {
        return Err(LlmError::ApiError(format!("OpenAI API error ({status}): {body}")));
    }

    let parsed = parsed
        .map_err(|e| LlmError::ApiError(format!("Failed to parse OpenAI response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::EmptyResponse)
}

#[async_trait]
impl LlmGateway for LlmClient {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LlmError::Cancelled),
            result = self.complete(turns) => result,
        }
    }
}
