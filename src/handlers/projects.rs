use axum::extract::{Path, State};

use crate::{
    AppState,
    auth::AdminUser,
    error::{ApiResponse, AppError, AppResult},
    models::{
        CreateProjectRequest, MessageResponse, Project, ProjectFilter, ProjectList, ProjectQuery,
        UpdateProjectRequest,
    },
    validation::{ValidJson, ValidQuery, parse_id},
};

fn duplicate_slug() -> AppError {
    AppError::Conflict("A project with this slug already exists".to_string())
}

fn not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

async fn list(state: &AppState, query: ProjectQuery) -> AppResult<ProjectList> {
    let filter = ProjectFilter {
        featured: query.featured,
        limit: query.limit,
        skip: query.skip,
    };
    let (projects, total) = state.repo.list_projects(&filter).await?;
    Ok(ProjectList {
        projects,
        total,
        limit: filter.limit,
        skip: filter.skip,
    })
}

/// list_projects
///
/// [Public Route] Paginated project listing, newest first. `featured` narrows
/// the list only when supplied.
#[utoipa::path(
    get,
    path = "/api/projects",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Projects", body = ProjectList),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn list_projects(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ProjectQuery>,
) -> AppResult<ApiResponse<ProjectList>> {
    Ok(ApiResponse::ok(list(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/projects/{slug}",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_project_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<Project>> {
    let project = state
        .repo
        .get_project_by_slug(&slug.to_lowercase())
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok(project))
}

/// admin_list_projects
///
/// [Admin Route] Same listing as the public one. Projects have no drafts, so
/// the result sets are identical; the route exists for the dashboard.
#[utoipa::path(
    get,
    path = "/api/admin/projects",
    params(ProjectQuery),
    responses((status = 200, description = "Projects", body = ProjectList))
)]
pub async fn admin_list_projects(
    _admin: AdminUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ProjectQuery>,
) -> AppResult<ApiResponse<ProjectList>> {
    Ok(ApiResponse::ok(list(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Created", body = Project),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn create_project(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateProjectRequest>,
) -> AppResult<ApiResponse<Project>> {
    if state.repo.project_slug_taken(&payload.slug, None).await? {
        return Err(duplicate_slug());
    }

    let project = state.repo.create_project(payload).await?;
    tracing::info!(project = %project.id, slug = %project.slug, admin = %admin.id, "project created");
    Ok(ApiResponse::created(project))
}

/// update_project
///
/// [Admin Route] Partial update. A slug change is refused when another project
/// already owns the slug. Serves both PUT and PATCH.
#[utoipa::path(
    put,
    path = "/api/admin/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated", body = Project),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn update_project(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateProjectRequest>,
) -> AppResult<ApiResponse<Project>> {
    let id = parse_id(&id, "Project")?;

    if let Some(slug) = &payload.slug {
        if state.repo.project_slug_taken(slug, Some(id)).await? {
            return Err(duplicate_slug());
        }
    }

    let project = state
        .repo
        .update_project(id, payload)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(project = %project.id, admin = %admin.id, "project updated");
    Ok(ApiResponse::ok(project))
}

#[utoipa::path(
    delete,
    path = "/api/admin/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_project(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let id = parse_id(&id, "Project")?;
    if !state.repo.delete_project(id).await? {
        return Err(not_found());
    }
    tracing::info!(project = %id, admin = %admin.id, "project deleted");
    Ok(ApiResponse::ok(MessageResponse::new(
        "Project deleted successfully",
    )))
}
