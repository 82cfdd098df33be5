//! Route definitions and the session-readiness guard.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::handlers;
use super::AppState;

/// Reject requests until the session reaches the open state. Applied
/// only to routes that dereference the live connection.
async fn require_open_session(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.session.is_open().await {
        return Err(ApiError::SessionNotReady);
    }
    Ok(next.run(req).await)
}

/// Create the application router.
pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/send-message", post(handlers::send_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_open_session,
        ));

    Router::new()
        .route("/admin-number", get(handlers::admin_number))
        .route("/qr", get(handlers::qr))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
