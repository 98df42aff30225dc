use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::config::SummaryConfig;
use crate::core::models::SummaryRequest;
use crate::core::ports::{LlmGateway, MessageStore};
use crate::core::{ChannelAccessPolicy, TimeRangeParser};
use crate::errors::SummarizeError;
use crate::prompt::{NO_MESSAGES_SUMMARY, build_summary_prompt};

/// Coordinates access control, range parsing, history retrieval and the
/// model call for one summarization request.
///
/// Holds only shared read-only handles, so one engine serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct SummaryEngine {
    store: Arc<dyn MessageStore>,
    llm: Arc<dyn LlmGateway>,
    parser: TimeRangeParser,
    policy: Arc<ChannelAccessPolicy>,
    max_messages: i64,
}

impl SummaryEngine {
    pub fn new(
        store: Arc<dyn MessageStore>,
        llm: Arc<dyn LlmGateway>,
        policy: Arc<ChannelAccessPolicy>,
        config: SummaryConfig,
    ) -> Self {
        Self {
            store,
            llm,
            parser: TimeRangeParser::new(config.default_window, config.max_window),
            policy,
            max_messages: config.max_messages.max(1),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &ChannelAccessPolicy {
        &self.policy
    }

    #[must_use]
    pub fn parser(&self) -> &TimeRangeParser {
        &self.parser
    }

    /// Summarize the requested window of a channel's history.
    ///
    /// Blank range text selects the default window. A window without messages
    /// yields [`NO_MESSAGES_SUMMARY`] without calling the model.
    ///
    /// # Errors
    ///
    /// `AccessDenied` for channels outside the policy, `Parse` for rejected
    /// range text, `Store`/`Generation` for collaborator failures (including
    /// cancellation through `cancel`).
    pub async fn summarize<Tz: TimeZone>(
        &self,
        now: DateTime<Tz>,
        request: &SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizeError> {
        let channel_id = request.channel_id;
        if !self.policy.is_allowed(channel_id) {
            warn!(channel_id, "Summary requested for channel outside whitelist");
            return Err(SummarizeError::AccessDenied(channel_id));
        }

        let range = self.parser.parse(&now, &request.raw_range)?;

        let mut messages = self
            .store
            .query(channel_id, range.from, range.to, self.max_messages, cancel)
            .await
            .map_err(SummarizeError::Store)?;
        // Cap regardless of what the store handed back.
        messages.truncate(usize::try_from(self.max_messages).unwrap_or(usize::MAX));

        info!(
            channel_id,
            from = %range.from,
            to = %range.to,
            messages = messages.len(),
            "Fetched history for summary"
        );

        if messages.is_empty() {
            return Ok(NO_MESSAGES_SUMMARY.to_string());
        }

        let prompt = build_summary_prompt(&messages);
        let summary = self
            .llm
            .generate(std::slice::from_ref(&prompt), cancel)
            .await
            .map_err(SummarizeError::Generation)?;

        Ok(summary.trim().to_string())
    }
}
