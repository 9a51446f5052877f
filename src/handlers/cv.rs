use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::Response,
};

use crate::{
    AppState,
    auth::AdminUser,
    error::{ApiResponse, AppError, AppResult},
    models::{CreateCvRequest, Cv, CvList, DownloadQuery, NewCv},
    storage::{DownloadSource, StorageError, UploadPolicy, store_upload},
    validation::{ValidJson, ValidQuery, parse_id},
};

const CV_FOLDER: &str = "cv";

fn no_cv() -> AppError {
    AppError::NotFound("No CV found".to_string())
}

#[utoipa::path(
    get,
    path = "/api/cv",
    responses(
        (status = 200, description = "Active CV", body = Cv),
        (status = 404, description = "No CV uploaded")
    )
)]
pub async fn get_active_cv(State(state): State<AppState>) -> AppResult<ApiResponse<Cv>> {
    let cv = state.repo.current_cv().await?.ok_or_else(no_cv)?;
    Ok(ApiResponse::ok(cv))
}

/// fetch_first_available
///
/// Tries each source in order and returns the body of the first that answers.
/// A remote 401/404, a network error or a missing local file moves on to the
/// next source; any other remote failure stops the search.
pub async fn fetch_first_available(
    http: &reqwest::Client,
    sources: &[DownloadSource],
) -> AppResult<Option<Body>> {
    for source in sources {
        match source {
            DownloadSource::Remote(url) => {
                let response = match http.get(url).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(error = %e, "cv source unreachable, trying next");
                        continue;
                    }
                };
                let status = response.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
                    tracing::debug!(%status, "cv source refused, trying next");
                    continue;
                }
                if !status.is_success() {
                    return Err(AppError::Internal(format!(
                        "cv source answered {status}"
                    )));
                }
                return Ok(Some(Body::from_stream(response.bytes_stream())));
            }
            DownloadSource::Local(path) => match tokio::fs::read(path).await {
                Ok(bytes) => return Ok(Some(Body::from(bytes))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "cv file missing on disk, trying next");
                }
                Err(e) => return Err(AppError::from(StorageError::Io(e))),
            },
        }
    }
    Ok(None)
}

fn content_disposition(file_name: &str, download: bool) -> String {
    let kind = if download { "attachment" } else { "inline" };
    let name: String = file_name
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();
    format!("{kind}; filename=\"{name}\"")
}

/// download_cv
///
/// [Public Route] Streams the active CV as a PDF. `download=true` asks the
/// browser to save instead of display.
#[utoipa::path(
    get,
    path = "/api/cv/download",
    params(DownloadQuery),
    responses(
        (status = 200, description = "PDF stream", content_type = "application/pdf"),
        (status = 404, description = "No CV or file unavailable")
    )
)]
pub async fn download_cv(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<DownloadQuery>,
) -> AppResult<Response> {
    let cv = state.repo.current_cv().await?.ok_or_else(no_cv)?;

    let sources = state
        .storage
        .download_sources(&cv.storage_id, &cv.file_url)
        .await;
    let body = fetch_first_available(&state.http, &sources)
        .await?
        .ok_or_else(|| {
            tracing::warn!(cv = %cv.id, sources = sources.len(), "no cv source available");
            AppError::NotFound("CV file not available".to_string())
        })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&cv.file_name, query.as_attachment()),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("failed to build cv response: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/admin/cv",
    responses((status = 200, description = "All CVs", body = CvList))
)]
pub async fn admin_list_cvs(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CvList>> {
    let cvs = state.repo.list_cvs().await?;
    let total = cvs.len();
    Ok(ApiResponse::ok(CvList { cvs, total }))
}

/// create_cv
///
/// [Admin Route] Registers a CV that already lives at a URL. The new record
/// becomes the active CV.
#[utoipa::path(
    post,
    path = "/api/admin/cv",
    request_body = CreateCvRequest,
    responses(
        (status = 201, description = "Registered", body = Cv),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_cv(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateCvRequest>,
) -> AppResult<ApiResponse<Cv>> {
    let storage_id = payload
        .storage_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| payload.file_url.clone());

    let cv = state
        .repo
        .create_cv(NewCv {
            file_url: payload.file_url,
            storage_id,
            file_name: payload.file_name,
            uploaded_by: admin.id,
        })
        .await?;
    tracing::info!(cv = %cv.id, admin = %admin.id, "cv registered");
    Ok(ApiResponse::created(cv))
}

/// upload_cv
///
/// [Admin Route] Multipart PDF (field `file`, at most 5MB). Stored under `cv/`
/// and registered as the active CV.
#[utoipa::path(
    post,
    path = "/api/admin/cv/upload",
    request_body(content_type = "multipart/form-data", description = "file: PDF up to 5MB"),
    responses(
        (status = 201, description = "Uploaded", body = Cv),
        (status = 400, description = "Missing, oversized or non-PDF file")
    )
)]
pub async fn upload_cv(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<Cv>> {
    let form = super::read_multipart(multipart, "file").await?;
    let upload = form.file.ok_or(StorageError::Empty)?;
    let file_name = upload.file_name.clone();

    let stored = store_upload(state.storage.as_ref(), UploadPolicy::CV, CV_FOLDER, upload).await?;
    let cv = state
        .repo
        .create_cv(NewCv {
            file_url: stored.url,
            storage_id: stored.public_id,
            file_name,
            uploaded_by: admin.id,
        })
        .await?;
    tracing::info!(cv = %cv.id, admin = %admin.id, "cv uploaded");
    Ok(ApiResponse::created(cv))
}

#[utoipa::path(
    post,
    path = "/api/admin/cv/{id}/activate",
    params(("id" = String, Path, description = "CV id")),
    responses(
        (status = 200, description = "Activated", body = Cv),
        (status = 404, description = "Not Found")
    )
)]
pub async fn activate_cv(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Cv>> {
    let id = parse_id(&id, "CV")?;
    let cv = state
        .repo
        .activate_cv(id)
        .await?
        .ok_or_else(|| AppError::NotFound("CV not found".to_string()))?;
    tracing::info!(cv = %cv.id, admin = %admin.id, "cv activated");
    Ok(ApiResponse::ok(cv))
}
