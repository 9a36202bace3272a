//! HTTP plumbing shared by the provider clients.

use std::time::Duration;

use serde::Deserialize;

use mockexam_core::error::ProviderError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::NetworkError(e.to_string())
    }
}

/// `{"error": {"message": ".."}}` (Anthropic, OpenAI) or `{"error": ".."}` (Ollama).
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Nested { error: ErrorBody },
    Flat { error: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(body: String) -> String {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(ErrorEnvelope::Nested { error }) => error.message,
        Ok(ErrorEnvelope::Flat { error }) => error,
        Err(_) => body,
    }
}

/// Map non-success statuses onto `ProviderError`.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
            * 1000;
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        401 | 403 => ProviderError::AuthenticationFailed(error_message(body)),
        404 => ProviderError::ModelNotFound(model.to_string()),
        _ => ProviderError::ApiError {
            status,
            message: error_message(body),
        },
    })
}

pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response.json().await.map_err(|e| ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_error_message() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#;
        assert_eq!(error_message(body.into()), "bad");
    }

    #[test]
    fn flat_error_message() {
        assert_eq!(
            error_message(r#"{"error":"model 'x' not found"}"#.into()),
            "model 'x' not found"
        );
    }

    #[test]
    fn plain_text_error_is_kept() {
        assert_eq!(error_message("internal error".into()), "internal error");
    }
}
