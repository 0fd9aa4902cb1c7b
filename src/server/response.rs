//! JSON response envelope and error-to-status mapping.

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::chat::service::ChatError;

/// Client-facing text for gateway call failures.
pub const GATEWAY_FAILURE_MESSAGE: &str = "Failed to get a response from the assistant";
/// Client-facing text for an unconfigured provider.
pub const UNAVAILABLE_MESSAGE: &str = "Chat service is not configured";
/// Client-facing text for unexpected failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// `{success, message?, error?}` envelope returned by every API route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Assistant reply, on chat success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error description, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Bare success.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
        }
    }

    /// Success carrying a reply.
    #[must_use]
    pub const fn with_message(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    /// Failure carrying an error description.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Failure ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Build an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Unmatched route.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ChatError> for ApiError {
    fn from(value: ChatError) -> Self {
        match value {
            ChatError::Validation(err) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            ChatError::Unavailable => Self::new(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_MESSAGE),
            ChatError::Gateway(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, GATEWAY_FAILURE_MESSAGE)
            }
            ChatError::Internal(reason) => {
                error!(%reason, "Internal error while handling request");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(value: BytesRejection) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::BAD_REQUEST, "Request body too large");
        }
        Self::from(ChatError::Internal(value.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::failure(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::validator::ValidationError;

    #[test]
    fn test_envelope_omits_absent_fields() {
        let json = serde_json::to_value(ApiResponse::ok()).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"success": true}));

        let json = serde_json::to_value(ApiResponse::failure("Not found")).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"success": false, "error": "Not found"}));
    }

    #[test]
    fn test_chat_errors_map_to_statuses() {
        let cases = [
            (
                ChatError::Validation(ValidationError::EmptyMessage),
                StatusCode::BAD_REQUEST,
            ),
            (ChatError::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (
                ChatError::Gateway("provider returned status 502".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ChatError::Internal("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_gateway_detail_is_not_exposed() {
        let err = ApiError::from(ChatError::Gateway("secret upstream detail".to_string()));
        assert_eq!(err.message(), GATEWAY_FAILURE_MESSAGE);
    }
}
