use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data (empty chat request, malformed multipart, ...)
    #[error("{message}")]
    BadRequest { message: String },

    /// A single upload or the aggregate request body exceeded the configured ceiling
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// The server has no Gemini credential configured
    #[error("Gemini API key not configured")]
    ApiKeyMissing,

    /// Gemini rejected the configured credential
    #[error("Gemini rejected the API key: {message}")]
    Unauthorized { message: String },

    /// Gemini reported an exhausted quota
    #[error("Gemini quota exhausted: {message}")]
    QuotaExceeded { message: String },

    /// Any other upstream failure (transport error, 5xx, unparseable reply)
    #[error("Gemini generation failed: {message}")]
    Upstream { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Short, user-safe description of what went wrong
    pub error: String,
    /// Raw upstream diagnostics, present only for unclassified upstream failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::ApiKeyMissing => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::ApiKeyMissing => "Gemini API key not configured".to_string(),
            Error::Unauthorized { .. } => "Invalid API key".to_string(),
            Error::QuotaExceeded { .. } => "API quota exceeded".to_string(),
            Error::Upstream { .. } => "Failed to generate response".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    /// Raw diagnostics attached to the response body, if any.
    ///
    /// Only unclassified upstream failures carry the raw upstream message
    /// through to the caller; everything else keeps diagnostics in the logs.
    pub fn details(&self) -> Option<String> {
        match self {
            Error::Upstream { message } => Some(message.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Unauthorized { .. } | Error::QuotaExceeded { .. } | Error::Upstream { .. } => {
                tracing::warn!("Upstream error: {}", self);
            }
            Error::ApiKeyMissing | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_taxonomy() {
        let cases = [
            (
                Error::BadRequest {
                    message: "Message or files are required".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::PayloadTooLarge {
                    message: "too big".to_string(),
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (Error::ApiKeyMissing, StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::Unauthorized {
                    message: "API key revoked".to_string(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::QuotaExceeded {
                    message: "quota exceeded for project".to_string(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                Error::Upstream {
                    message: "model overloaded".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "wrong status for {error:?}");
        }
    }

    #[test]
    fn test_only_upstream_failures_expose_details() {
        let upstream = Error::Upstream {
            message: "candidate was blocked".to_string(),
        };
        assert_eq!(upstream.details().as_deref(), Some("candidate was blocked"));
        assert_eq!(upstream.user_message(), "Failed to generate response");

        let unauthorized = Error::Unauthorized {
            message: "API key revoked".to_string(),
        };
        assert_eq!(unauthorized.details(), None);
        assert_eq!(unauthorized.user_message(), "Invalid API key");
    }
}
