use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Session endpoints. The router is wrapped in `auth_middleware`, so a request
/// without a valid session never reaches these handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET reads the session, POST re-issues it with the stored role.
        .route(
            "/api/auth/session",
            get(handlers::auth::get_session).post(handlers::auth::refresh_session),
        )
}
