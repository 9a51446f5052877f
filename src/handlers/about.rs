use axum::extract::State;

use crate::{
    AppState,
    auth::AdminUser,
    error::{ApiResponse, AppError, AppResult},
    models::{About, UpsertAboutRequest},
    validation::ValidJson,
};

#[utoipa::path(
    get,
    path = "/api/about",
    responses(
        (status = 200, description = "About content", body = About),
        (status = 404, description = "Not set yet")
    )
)]
pub async fn get_about(State(state): State<AppState>) -> AppResult<ApiResponse<About>> {
    let about = state
        .repo
        .get_about()
        .await?
        .ok_or_else(|| AppError::NotFound("About content not found".to_string()))?;
    Ok(ApiResponse::ok(about))
}

/// upsert_about
///
/// [Admin Route] Replaces the single about record, creating it on first use.
#[utoipa::path(
    post,
    path = "/api/about",
    request_body = UpsertAboutRequest,
    responses(
        (status = 201, description = "Saved", body = About),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn upsert_about(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UpsertAboutRequest>,
) -> AppResult<ApiResponse<About>> {
    let about = state.repo.upsert_about(payload, admin.id).await?;
    tracing::info!(admin = %admin.id, "about content updated");
    Ok(ApiResponse::created(about))
}
