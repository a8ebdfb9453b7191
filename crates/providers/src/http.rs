//! HTTP plumbing shared by the provider implementations.

use std::time::Duration;

use docchat_core::error::CompletionError;
use tracing::warn;

/// Default timeout for one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 1024;

/// Build the reqwest client used by a provider.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, CompletionError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CompletionError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

/// Map a transport failure to a completion error.
pub(crate) fn send_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else {
        CompletionError::Network(e.to_string())
    }
}

/// Map a non-success HTTP status (plus its body) to a completion error.
pub(crate) fn status_error(provider: &str, model: &str, status: u16, body: &str) -> CompletionError {
    let body = truncate(body, MAX_ERROR_BODY);

    match status {
        429 => CompletionError::RateLimited { retry_after_secs: 5 },
        401 | 403 => CompletionError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        404 => CompletionError::ModelNotFound(model.to_string()),
        _ => {
            warn!(provider, status, body = %body, "Provider returned error");
            CompletionError::ApiError {
                status_code: status,
                message: body.to_string(),
            }
        }
    }
}

/// Cut `s` to at most `max` bytes on a char boundary.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
