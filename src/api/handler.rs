//! Webhook server - receives Telegram updates, records history and kicks off
//! summaries for messages that mention the bot.
//!
//! Every well-formed update is acknowledged with 200, whatever happens to the
//! summary it may trigger: Telegram redelivers updates that are not
//! acknowledged, and a failed summary is not a failed delivery.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use chrono::Utc;
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::parsing::{TelegramUpdate, mentions_bot, parse_range_from_text, parse_update};
use super::signature::{SECRET_TOKEN_HEADER, verify_secret_token};
use crate::core::models::SummaryRequest;
use crate::core::ports::{MessageSender, MessageStore};
use crate::errors::SummarizeError;
use crate::features::SummaryEngine;
use crate::features::deliver::{deliver_error, deliver_summary};

/// Largest webhook body accepted.
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Shared, read-only state of the webhook server.
#[derive(Clone)]
pub struct AppState {
    pub engine: SummaryEngine,
    pub store: Arc<dyn MessageStore>,
    pub sender: Arc<dyn MessageSender>,
    pub bot_username: String,
    pub webhook_secret: Option<String>,
    /// Zone in which explicit dates in range expressions are read.
    pub timezone: Tz,
    pub summary_timeout: Duration,
    /// Cancelled on process shutdown; every summary job derives from it.
    pub shutdown: CancellationToken,
    /// In-flight summary jobs, drained before the process exits.
    pub jobs: TaskTracker,
}

/// A summary to produce and post back as a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryJob {
    pub chat_id: i64,
    pub reply_to: i64,
    pub request: SummaryRequest,
}

pub fn create_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(webhook_path, post(webhook))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let correlation_id = Uuid::new_v4();
    let span = info_span!("webhook", %correlation_id);

    async move {
        let received = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_secret_token(state.webhook_secret.as_deref(), received) {
            return StatusCode::UNAUTHORIZED;
        }

        let update = match parse_update(&body) {
            Ok(update) => update,
            Err(e) => {
                error!("Invalid update payload: {}", e);
                return StatusCode::BAD_REQUEST;
            }
        };

        if let Some(job) = handle_update(&state, update).await {
            state
                .jobs
                .spawn(run_summary_job(state.clone(), job).instrument(Span::current()));
        }
        StatusCode::OK
    }
    .instrument(span)
    .await
}

/// Record the update's message (whitelisted chats only) and decide whether
/// it asks for a summary.
pub async fn handle_update(state: &AppState, update: TelegramUpdate) -> Option<SummaryJob> {
    let update_id = update.update_id;
    let Some(msg) = update.into_message() else {
        debug!(update_id, "Ignoring update without message");
        return None;
    };
    let Some(chat_message) = msg.to_chat_message() else {
        debug!(update_id, "Ignoring message without text");
        return None;
    };

    let chat_id = chat_message.channel_id;
    let allowed = state.engine.policy().is_allowed(chat_id);
    if allowed && let Err(e) = state.store.insert_message(&chat_message).await {
        error!(chat_id, "Failed to store message: {}", e);
    }

    if !mentions_bot(&chat_message.text, &state.bot_username) {
        return None;
    }
    if !allowed {
        warn!(chat_id, "Mention in non-whitelisted channel");
        return None;
    }

    let raw_range = parse_range_from_text(&chat_message.text, &state.bot_username);
    info!(chat_id, raw_range = %raw_range, "Summary requested");
    Some(SummaryJob {
        chat_id,
        reply_to: chat_message.message_id,
        request: SummaryRequest {
            channel_id: chat_id,
            raw_range,
        },
    })
}

/// Produce the summary for `job` and reply with it, or with an error notice.
/// Runs until done, the per-job deadline passes, or the server shuts down.
pub async fn run_summary_job(state: AppState, job: SummaryJob) {
    let cancel = state.shutdown.child_token();
    let deadline = {
        let cancel = cancel.clone();
        let timeout = state.summary_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let now = Utc::now().with_timezone(&state.timezone);
    let result = state.engine.summarize(now, &job.request, &cancel).await;
    deadline.abort();

    let sender = state.sender.as_ref();
    match result {
        Ok(summary) => deliver_summary(sender, job.chat_id, job.reply_to, &summary).await,
        Err(e) if e.is_cancelled() && state.shutdown.is_cancelled() => {
            warn!(chat_id = job.chat_id, "Summary abandoned during shutdown");
        }
        Err(e @ SummarizeError::Parse(_)) => {
            info!(chat_id = job.chat_id, "Rejected range expression: {}", e);
            deliver_error(sender, job.chat_id, job.reply_to, &e).await;
        }
        Err(e) => {
            error!(chat_id = job.chat_id, "Summarize error: {}", e);
            deliver_error(sender, job.chat_id, job.reply_to, &e).await;
        }
    }
}

/// Stop accepting summary jobs and wait up to `grace` for running ones to
/// finish. Returns `false` if some were still running at the deadline.
pub async fn drain_summary_jobs(jobs: &TaskTracker, grace: Duration) -> bool {
    jobs.close();
    let pending = jobs.len();
    if pending > 0 {
        info!(pending, "Waiting for summary jobs to finish");
    }
    match tokio::time::timeout(grace, jobs.wait()).await {
        Ok(()) => true,
        Err(_) => {
            warn!(pending = jobs.len(), "Summary jobs still running at shutdown deadline");
            false
        }
    }
}
