//! Route handlers.

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;

// ---------------------------------------------------------------------------
// Admin Number
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AdminNumberResponse {
    #[serde(rename = "adminNumber")]
    pub admin_number: String,
}

/// Static administrative contact. A pure configuration read, so it is
/// deliberately not gated behind session readiness.
pub async fn admin_number(State(state): State<AppState>) -> Json<AdminNumberResponse> {
    Json(AdminNumberResponse {
        admin_number: state.admin_number.clone(),
    })
}

// ---------------------------------------------------------------------------
// Pairing QR
// ---------------------------------------------------------------------------

/// Latest pairing QR as a minimal HTML image tag. Only gated by payload
/// presence: the challenge is issued while the session is still closed,
/// so a readiness gate here would make the route unreachable.
pub async fn qr(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    match state.session.qr_data_uri().await {
        Some(uri) => Ok(Html(format!(
            "<img src=\"{uri}\" alt=\"Scan this QR code to pair\" />"
        ))),
        None => Err(ApiError::QrUnavailable),
    }
}

// ---------------------------------------------------------------------------
// Send Message
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub status: &'static str,
}

/// Forward a text message through the open chat session.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let phone = req.phone.as_deref().filter(|s| !s.is_empty());
    let message = req.message.as_deref().filter(|s| !s.is_empty());
    let (Some(phone), Some(message)) = (phone, message) else {
        return Err(ApiError::Validation(
            "phone and message are required".into(),
        ));
    };

    let client = state
        .session
        .client()
        .await
        .ok_or(ApiError::SessionNotReady)?;
    client
        .send_text(phone, message)
        .await
        .map_err(ApiError::Delivery)?;

    Ok(Json(SendMessageResponse {
        status: "Message sent",
    }))
}
