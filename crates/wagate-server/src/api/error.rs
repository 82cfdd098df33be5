//! API error handling with structured responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};
use wagate_client::ClientError;

/// Errors surfaced over HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The chat session has not reached the open state.
    #[error("chat session not established yet, try again later")]
    SessionNotReady,

    #[error("{0}")]
    Validation(String),

    #[error("QR code not generated yet, try again later")]
    QrUnavailable,

    /// The gateway failed to deliver. The response body stays generic;
    /// the underlying detail is logged, never echoed to callers.
    #[error("failed to send message")]
    Delivery(#[source] ClientError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotReady | Self::QrUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SessionNotReady => "SESSION_NOT_READY",
            Self::Validation(_) => "VALIDATION",
            Self::QrUnavailable => "QR_UNAVAILABLE",
            Self::Delivery(_) => "DELIVERY_FAILED",
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::Delivery(source) => {
                error!(error_code = code, error = %source, "Message delivery failed");
            }
            ApiError::SessionNotReady => {
                warn!(error_code = code, "Request rejected; session not open");
            }
            _ => {
                debug!(error_code = code, message = %message, "Client error");
            }
        }

        let body = ErrorResponse {
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}
