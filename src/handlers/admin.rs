use axum::extract::{Multipart, State};

use crate::{
    AppState,
    auth::AdminUser,
    error::{ApiResponse, AppResult},
    models::AdminDashboardStats,
    storage::{StorageError, StoredObject, UploadPolicy, store_upload},
};

const UPLOAD_FOLDER: &str = "uploads";

/// get_admin_stats
///
/// [Admin Route] Collection counts plus the five newest items across projects,
/// posts and messages.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard Stats", body = AdminDashboardStats),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_admin_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AdminDashboardStats>> {
    Ok(ApiResponse::ok(state.repo.get_stats().await?))
}

/// upload_file
///
/// [Admin Route] Server-side media upload: multipart field `file`, image or
/// PDF, at most 10MB. Returns the public URL and storage id.
#[utoipa::path(
    post,
    path = "/api/admin/upload",
    request_body(content_type = "multipart/form-data", description = "file: image or PDF up to 10MB"),
    responses(
        (status = 200, description = "Stored", body = StoredObject),
        (status = 400, description = "Missing, oversized or unsupported file")
    )
)]
pub async fn upload_file(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<StoredObject>> {
    let form = super::read_multipart(multipart, "file").await?;
    let upload = form.file.ok_or(StorageError::Empty)?;

    let stored = store_upload(
        state.storage.as_ref(),
        UploadPolicy::GENERAL,
        UPLOAD_FOLDER,
        upload,
    )
    .await?;
    tracing::info!(admin = %admin.id, public_id = %stored.public_id, "file uploaded");
    Ok(ApiResponse::ok(stored))
}
