// Request error taxonomy and its HTTP mapping
//
// The taxonomy follows the service contract: configuration errors are 500
// and never retried, upstream errors pass their status through with the
// diagnostic body, truncation without text is a distinct failure, and
// cancellation is benign rather than an error worth a transcript entry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing GEMINI_API_KEY")]
    MissingCredential,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("debate not found: {0}")]
    DebateNotFound(String),

    #[error("Gemini API error (status {status})")]
    Upstream { status: u16, details: Value },

    #[error("No candidates in response")]
    NoCandidates { raw: Value },

    #[error("No text generated")]
    NoText { finish_reason: Option<String> },

    #[error("generation cancelled")]
    Cancelled,

    #[error("{0}")]
    Conflict(String),

    #[error("session registry full")]
    SessionsFull,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MissingCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Missing GEMINI_API_KEY" }),
            ),
            AppError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppError::DebateNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Debate not found", "debateId": id }),
            ),
            AppError::Upstream { status, details } => {
                // Pass the upstream status through when it is a valid HTTP
                // code, 502 otherwise (e.g. transport failures report 0).
                let code =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    code,
                    json!({ "error": "Gemini API error", "status": status, "details": details }),
                )
            }
            AppError::NoCandidates { raw } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "No candidates in response", "raw": raw }),
            ),
            AppError::NoText { finish_reason } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "No text generated", "finishReason": finish_reason }),
            ),
            AppError::Cancelled => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({ "error": "generation cancelled", "cancelled": true }),
            ),
            AppError::Conflict(message) => {
                (StatusCode::CONFLICT, json!({ "error": message }))
            }
            AppError::SessionsFull => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "too many active sessions" }),
            ),
            AppError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_passthrough() {
        let response = AppError::Upstream {
            status: 429,
            details: json!({ "reason": "quota" }),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_transport_failure_maps_to_bad_gateway() {
        let response = AppError::Upstream {
            status: 0,
            details: Value::Null,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_request_is_400() {
        let response = AppError::InvalidRequest("topic required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_credential_is_500() {
        let response = AppError::MissingCredential.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
