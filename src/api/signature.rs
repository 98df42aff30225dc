use tracing::error;

/// Header Telegram uses to echo the `secret_token` given to `setWebhook`.
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Check the webhook secret. With no secret configured every request passes.
#[must_use]
pub fn verify_secret_token(expected: Option<&str>, received: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    let Some(received) = received else {
        error!("Missing {} header", SECRET_TOKEN_HEADER);
        return false;
    };

    if constant_time_eq(expected.as_bytes(), received.as_bytes()) {
        true
    } else {
        error!("Webhook secret token verification failed");
        false
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
