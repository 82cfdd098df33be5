//! HTTP gateway over the shared session context.

mod error;
mod handlers;
mod routes;

use std::sync::Arc;

use crate::session::SessionContext;

pub use error::{ApiError, ErrorResponse};
pub use routes::router;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionContext>,
    /// Administrative contact returned by the admin-number route.
    pub admin_number: String,
}
