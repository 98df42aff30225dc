use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;
use chrono_tz::Tz;

pub const DEFAULT_TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";
pub const DEFAULT_OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BOT_USERNAME: &str = "summary_bot";
pub const DEFAULT_MAX_SUMMARY_MESSAGES: i64 = 500;

/// Bounds applied by the summarization pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SummaryConfig {
    pub default_window: Duration,
    pub max_window: Duration,
    /// Upper bound on messages handed to the model in one prompt.
    pub max_messages: i64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            default_window: Duration::hours(24),
            max_window: Duration::days(7),
            max_messages: DEFAULT_MAX_SUMMARY_MESSAGES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub telegram_api_base_url: String,
    pub telegram_bot_username: String,
    pub telegram_webhook_secret: Option<String>,
    pub openai_api_key: String,
    pub openai_api_base_url: String,
    pub openai_model: String,
    pub whitelisted_channels: Vec<i64>,
    pub summary: SummaryConfig,
    pub timezone: Tz,
    pub summary_timeout: StdDuration,
    pub listen_addr: String,
    pub webhook_path: String,
    pub database_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).ok_or_else(|| format!("{key} is required"));

        let default_window = match get("DEFAULT_HISTORY_WINDOW") {
            Some(raw) => parse_duration(&raw)
                .map_err(|e| format!("invalid DEFAULT_HISTORY_WINDOW: {e}"))?,
            None => Duration::hours(24),
        };
        let max_window = match get("MAX_HISTORY_WINDOW") {
            Some(raw) => {
                parse_duration(&raw).map_err(|e| format!("invalid MAX_HISTORY_WINDOW: {e}"))?
            }
            None => Duration::days(7),
        };
        if default_window <= Duration::zero() {
            return Err("DEFAULT_HISTORY_WINDOW must be positive".to_string());
        }
        if max_window < default_window {
            return Err("MAX_HISTORY_WINDOW must be >= DEFAULT_HISTORY_WINDOW".to_string());
        }

        let max_messages = match get("MAX_SUMMARY_MESSAGES") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(format!("invalid MAX_SUMMARY_MESSAGES: {raw:?}")),
            },
            None => DEFAULT_MAX_SUMMARY_MESSAGES,
        };

        let timezone = match get("SUMMARY_TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|e| format!("invalid SUMMARY_TIMEZONE: {e}"))?,
            None => Tz::UTC,
        };

        let summary_timeout = match get("SUMMARY_TIMEOUT") {
            Some(raw) => parse_duration(&raw)
                .ok()
                .and_then(|d| d.to_std().ok())
                .filter(|d| !d.is_zero())
                .ok_or_else(|| format!("invalid SUMMARY_TIMEOUT: {raw:?}"))?,
            None => StdDuration::from_secs(60),
        };

        let listen_addr = match get("LISTEN_ADDR") {
            Some(addr) if addr.starts_with(':') => format!("0.0.0.0{addr}"),
            Some(addr) => addr,
            None => "0.0.0.0:8080".to_string(),
        };

        let webhook_path = get("WEBHOOK_PATH").unwrap_or_else(|| "/telegram/webhook".to_string());
        if !webhook_path.starts_with('/') {
            return Err(format!("WEBHOOK_PATH must start with '/': {webhook_path:?}"));
        }

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_api_base_url: get("TELEGRAM_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            telegram_bot_username: get("TELEGRAM_BOT_USERNAME")
                .map(|name| name.trim_start_matches('@').to_string())
                .unwrap_or_else(|| DEFAULT_BOT_USERNAME.to_string()),
            telegram_webhook_secret: get("TELEGRAM_WEBHOOK_SECRET"),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_api_base_url: get("OPENAI_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            whitelisted_channels: parse_channel_list(get("WHITELISTED_CHANNELS").as_deref())?,
            summary: SummaryConfig {
                default_window,
                max_window,
                max_messages,
            },
            timezone,
            summary_timeout,
            listen_addr,
            webhook_path,
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "summary_bot.db".to_string()),
        })
    }
}

fn parse_channel_list(raw: Option<&str>) -> Result<Vec<i64>, String> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|e| format!("invalid channel id {part:?} in WHITELISTED_CHANNELS: {e}"))
        })
        .collect()
}

/// Parse durations such as `24h`, `7d`, `90m`, `1h30m` or `45s`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let qty: i64 = digits
            .parse()
            .map_err(|_| format!("missing quantity before '{c}' in {raw:?}"))?;
        digits.clear();
        let part = match c {
            's' => Duration::try_seconds(qty),
            'm' => Duration::try_minutes(qty),
            'h' => Duration::try_hours(qty),
            'd' => Duration::try_days(qty),
            other => return Err(format!("unknown unit '{other}' in {raw:?}")),
        };
        total = part
            .and_then(|p| total.checked_add(&p))
            .ok_or_else(|| format!("duration {raw:?} is too large"))?;
    }
    if !digits.is_empty() {
        return Err(format!("missing unit in {raw:?}"));
    }
    Ok(total)
}
