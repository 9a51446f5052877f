use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Contact submissions carry at most a 5MB attachment plus form fields.
const CONTACT_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Public Router Module
///
/// Unauthenticated endpoints. Blog routes read an optional session so admins
/// can see drafts through the same URLs.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Content ---
        .route("/api/projects", get(handlers::projects::list_projects))
        .route(
            "/api/projects/{slug}",
            get(handlers::projects::get_project_by_slug),
        )
        .route("/api/blog", get(handlers::blog::list_posts))
        .route("/api/blog/{slug}", get(handlers::blog::get_post_by_slug))
        .route("/api/cv", get(handlers::cv::get_active_cv))
        .route("/api/cv/download", get(handlers::cv::download_cv))
        // POST is admin-only; enforced by the handler's AdminUser extractor.
        .route(
            "/api/about",
            get(handlers::about::get_about).post(handlers::about::upsert_about),
        )
        // --- Inbound ---
        .route(
            "/api/contact",
            post(handlers::contact::submit_contact).layer(DefaultBodyLimit::max(CONTACT_BODY_LIMIT)),
        )
        .route(
            "/api/webhooks/automation",
            post(handlers::webhooks::receive_automation_webhook),
        )
        // --- Magic-link sign-in ---
        .route(
            "/api/auth/signin/email",
            post(handlers::auth::request_sign_in),
        )
        .route(
            "/api/auth/callback/email",
            get(handlers::auth::email_callback),
        )
        .route("/api/auth/signout", post(handlers::auth::sign_out))
}
