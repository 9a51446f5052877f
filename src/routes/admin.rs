use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

const MB: usize = 1024 * 1024;

/// Admin Router Module
///
/// Content management and dashboard endpoints, nested under `/api/admin`.
/// The admin gate rejects non-admins before routing; each handler also takes
/// `AdminUser`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(handlers::admin::get_admin_stats))
        // --- Projects ---
        .route(
            "/projects",
            get(handlers::projects::admin_list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/projects/{id}",
            put(handlers::projects::update_project)
                .patch(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        // --- Blog ---
        .route(
            "/blog",
            get(handlers::blog::admin_list_posts).post(handlers::blog::create_post),
        )
        .route(
            "/blog/{id}",
            put(handlers::blog::update_post)
                .patch(handlers::blog::update_post)
                .delete(handlers::blog::delete_post),
        )
        // --- Contact inbox ---
        .route("/contact", get(handlers::contact::admin_list_contact))
        .route("/contact/{id}", patch(handlers::contact::set_contact_processed))
        // --- CV ---
        .route(
            "/cv",
            get(handlers::cv::admin_list_cvs).post(handlers::cv::create_cv),
        )
        .route(
            "/cv/upload",
            post(handlers::cv::upload_cv).layer(DefaultBodyLimit::max(6 * MB)),
        )
        .route("/cv/{id}/activate", post(handlers::cv::activate_cv))
        // --- Media ---
        .route(
            "/upload",
            post(handlers::admin::upload_file).layer(DefaultBodyLimit::max(11 * MB)),
        )
}
