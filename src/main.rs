use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use summary_bot::adapters::persistence::SqliteStore;
use summary_bot::api::{AppState, create_router, drain_summary_jobs};
use summary_bot::clients::{LlmClient, TelegramClient};
use summary_bot::core::ChannelAccessPolicy;
use summary_bot::core::config::AppConfig;
use summary_bot::errors::format_window;
use summary_bot::features::SummaryEngine;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    summary_bot::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        anyhow::anyhow!("failed to load config: {e}")
    })?;

    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .await
            .with_context(|| format!("failed to open database {}", config.database_path))?,
    );
    let llm = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_api_base_url.clone(),
        config.openai_model.clone(),
    )?);
    let telegram = Arc::new(TelegramClient::new(
        config.telegram_bot_token.clone(),
        config.telegram_api_base_url.clone(),
    )?);

    let policy = Arc::new(ChannelAccessPolicy::new(
        config.whitelisted_channels.iter().copied(),
    ));
    if policy.is_empty() {
        warn!("WHITELISTED_CHANNELS is empty; every summary request will be denied");
    }

    let engine = SummaryEngine::new(store.clone(), llm, policy.clone(), config.summary);
    let shutdown = CancellationToken::new();
    let jobs = TaskTracker::new();

    let state = AppState {
        engine,
        store,
        sender: telegram,
        bot_username: config.telegram_bot_username.clone(),
        webhook_secret: config.telegram_webhook_secret.clone(),
        timezone: config.timezone,
        summary_timeout: config.summary_timeout,
        shutdown: shutdown.clone(),
        jobs: jobs.clone(),
    };
    let app = create_router(state, &config.webhook_path);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(
        addr = %config.listen_addr,
        path = %config.webhook_path,
        channels = policy.len(),
        default_window = %format_window(config.summary.default_window),
        max_window = %format_window(config.summary.max_window),
        "Starting HTTP server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("http server error")?;

    // Cancelled jobs wind down quickly; the grace period covers a reply
    // that is already being sent.
    drain_summary_jobs(&jobs, SHUTDOWN_GRACE).await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
