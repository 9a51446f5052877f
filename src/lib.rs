use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{Next, from_fn_with_state},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod rate_limit;
pub mod repository;
pub mod storage;
pub mod validation;
pub mod webhooks;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiResponse, AppError, AppResult};
pub use mailer::MailerState;
pub use notifier::NotifierState;
pub use rate_limit::{RateLimiter, RateLimiterState};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalStorage, MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every handler annotated with `#[utoipa::path]`, served
/// at `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::projects::list_projects, handlers::projects::get_project_by_slug,
        handlers::projects::admin_list_projects, handlers::projects::create_project,
        handlers::projects::update_project, handlers::projects::delete_project,
        handlers::blog::list_posts, handlers::blog::get_post_by_slug,
        handlers::blog::admin_list_posts, handlers::blog::create_post,
        handlers::blog::update_post, handlers::blog::delete_post,
        handlers::contact::submit_contact, handlers::contact::admin_list_contact,
        handlers::contact::set_contact_processed,
        handlers::cv::get_active_cv, handlers::cv::download_cv, handlers::cv::admin_list_cvs,
        handlers::cv::create_cv, handlers::cv::upload_cv, handlers::cv::activate_cv,
        handlers::about::get_about, handlers::about::upsert_about,
        handlers::admin::get_admin_stats, handlers::admin::upload_file,
        handlers::webhooks::receive_automation_webhook,
        handlers::auth::request_sign_in, handlers::auth::email_callback,
        handlers::auth::get_session, handlers::auth::refresh_session, handlers::auth::sign_out,
    ),
    components(
        schemas(
            models::Project, models::Screenshot, models::CreateProjectRequest,
            models::UpdateProjectRequest, models::ProjectList,
            models::BlogPost, models::CreateBlogPostRequest, models::UpdateBlogPostRequest,
            models::BlogPostList,
            models::ContactMessage, models::FileAttachment, models::ContactMessageList,
            models::ContactReceipt, models::SetProcessedRequest,
            models::Cv, models::CreateCvRequest, models::CvList,
            models::About, models::UpsertAboutRequest,
            models::AdminDashboardStats, models::StatCounts, models::ActivityItem,
            models::ActivityKind, models::MessageResponse, models::Role, models::User,
            storage::StoredObject, webhooks::WebhookAck,
            auth::SessionResponse, auth::SessionUser, handlers::auth::SignInRequest,
        )
    ),
    tags(
        (name = "portfolio-cms", description = "Portfolio CMS API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    /// Background webhook and e-mail delivery.
    pub notifier: NotifierState,
    /// Direct mail for flows that must be attempted inline (sign-in links).
    pub mailer: MailerState,
    pub rate_limiter: RateLimiterState,
    /// Outbound HTTP client (CV download proxy).
    pub http: reqwest::Client,
    pub config: AppConfig,
}

impl AppState {
    /// Assembles the state, deriving the rate limiter from the configuration.
    pub fn new(
        repo: RepositoryState,
        storage: StorageState,
        notifier: NotifierState,
        mailer: MailerState,
        config: AppConfig,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        ));
        Self {
            repo,
            storage,
            notifier,
            mailer,
            rate_limiter,
            http: reqwest::Client::new(),
            config,
        }
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Route layer for `authenticated_routes`. Extracting `AuthUser` is the check:
/// a missing or invalid session is rejected with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles all routes, the admin gate, static uploads (local storage only)
/// and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let mut base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest("/api/admin", admin::admin_routes());

    // Files written by the local storage provider are served back as-is.
    if state.config.s3.is_none() {
        base_router =
            base_router.nest_service("/uploads", ServeDir::new(&state.config.local_upload_dir));
    }

    let base_router = base_router
        // Runs for every request, matched or not, before any handler.
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_gate,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, URI and the `x-request-id` so every log line
/// of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
