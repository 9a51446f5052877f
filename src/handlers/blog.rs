use axum::extract::{Path, State};

use crate::{
    AppState,
    auth::{AdminUser, MaybeAuthUser},
    error::{ApiResponse, AppError, AppResult},
    models::{
        BlogPost, BlogPostList, BlogQuery, CreateBlogPostRequest, MessageResponse, PostFilter,
        UpdateBlogPostRequest,
    },
    validation::{ValidJson, ValidQuery, parse_id},
};

fn duplicate_slug() -> AppError {
    AppError::Conflict("A blog post with this slug already exists".to_string())
}

fn not_found() -> AppError {
    AppError::NotFound("Blog post not found".to_string())
}

async fn list(state: &AppState, query: BlogQuery, is_admin: bool) -> AppResult<BlogPostList> {
    // Only an admin can ask for drafts.
    let published_only = !(is_admin && query.published == Some(false));
    let filter = PostFilter {
        tag: query.tag,
        published_only,
        limit: query.limit,
        skip: query.skip,
    };
    let (posts, total) = state.repo.list_posts(&filter).await?;
    Ok(BlogPostList {
        posts,
        total,
        limit: filter.limit,
        skip: filter.skip,
    })
}

/// list_posts
///
/// [Public Route] Published posts, newest first, optionally by tag. An admin
/// session may pass `published=false` to include drafts and scheduled posts;
/// for everyone else the flag is ignored.
#[utoipa::path(
    get,
    path = "/api/blog",
    params(BlogQuery),
    responses((status = 200, description = "Posts", body = BlogPostList))
)]
pub async fn list_posts(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<BlogQuery>,
) -> AppResult<ApiResponse<BlogPostList>> {
    let is_admin = user.as_ref().is_some_and(|u| u.is_admin());
    Ok(ApiResponse::ok(list(&state, query, is_admin).await?))
}

/// get_post_by_slug
///
/// [Public Route] A draft is indistinguishable from a missing post unless the
/// caller is an admin.
#[utoipa::path(
    get,
    path = "/api/blog/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = BlogPost),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_by_slug(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<BlogPost>> {
    let include_drafts = user.as_ref().is_some_and(|u| u.is_admin());
    let post = state
        .repo
        .get_post_by_slug(&slug.to_lowercase(), include_drafts)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok(post))
}

/// admin_list_posts
///
/// [Admin Route] Every post including drafts unless `published=true` is passed.
#[utoipa::path(
    get,
    path = "/api/admin/blog",
    params(BlogQuery),
    responses((status = 200, description = "Posts", body = BlogPostList))
)]
pub async fn admin_list_posts(
    _admin: AdminUser,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<BlogQuery>,
) -> AppResult<ApiResponse<BlogPostList>> {
    let filter = PostFilter {
        tag: query.tag,
        published_only: query.published == Some(true),
        limit: query.limit,
        skip: query.skip,
    };
    let (posts, total) = state.repo.list_posts(&filter).await?;
    Ok(ApiResponse::ok(BlogPostList {
        posts,
        total,
        limit: filter.limit,
        skip: filter.skip,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/blog",
    request_body = CreateBlogPostRequest,
    responses(
        (status = 201, description = "Created", body = BlogPost),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn create_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateBlogPostRequest>,
) -> AppResult<ApiResponse<BlogPost>> {
    if state.repo.post_slug_taken(&payload.slug, None).await? {
        return Err(duplicate_slug());
    }

    let post = state.repo.create_post(payload).await?;
    tracing::info!(post = %post.id, slug = %post.slug, admin = %admin.id, "blog post created");
    Ok(ApiResponse::created(post))
}

#[utoipa::path(
    put,
    path = "/api/admin/blog/{id}",
    params(("id" = String, Path, description = "Post id")),
    request_body = UpdateBlogPostRequest,
    responses(
        (status = 200, description = "Updated", body = BlogPost),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Duplicate slug")
    )
)]
pub async fn update_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateBlogPostRequest>,
) -> AppResult<ApiResponse<BlogPost>> {
    let id = parse_id(&id, "Blog post")?;

    if let Some(slug) = &payload.slug {
        if state.repo.post_slug_taken(slug, Some(id)).await? {
            return Err(duplicate_slug());
        }
    }

    let post = state
        .repo
        .update_post(id, payload)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(post = %post.id, admin = %admin.id, "blog post updated");
    Ok(ApiResponse::ok(post))
}

#[utoipa::path(
    delete,
    path = "/api/admin/blog/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let id = parse_id(&id, "Blog post")?;
    if !state.repo.delete_post(id).await? {
        return Err(not_found());
    }
    tracing::info!(post = %id, admin = %admin.id, "blog post deleted");
    Ok(ApiResponse::ok(MessageResponse::new(
        "Blog post deleted successfully",
    )))
}
