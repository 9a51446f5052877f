use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    About, AdminDashboardStats, BlogPost, ContactMessage, CreateBlogPostRequest,
    CreateProjectRequest, Cv, NewContactMessage, NewCv, PostFilter, Project, ProjectFilter, Role,
    UpdateBlogPostRequest, UpdateProjectRequest, UpsertAboutRequest, User, UserLookup,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository
///
/// Persistence contract for every entity. Handlers only talk to this trait, so
/// Postgres in production and the in-memory store in tests are interchangeable.
///
/// `Option` means "no such row"; errors are reserved for storage failures and
/// uniqueness violations (`AppError::Conflict`).
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Projects ---
    /// Newest first. Returns the page and the total matching the filter.
    async fn list_projects(&self, filter: &ProjectFilter) -> AppResult<(Vec<Project>, i64)>;
    async fn get_project_by_slug(&self, slug: &str) -> AppResult<Option<Project>>;
    /// Whether `slug` belongs to a project other than `exclude`.
    async fn project_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> AppResult<bool>;
    async fn create_project(&self, req: CreateProjectRequest) -> AppResult<Project>;
    async fn update_project(&self, id: Uuid, req: UpdateProjectRequest) -> AppResult<Option<Project>>;
    async fn delete_project(&self, id: Uuid) -> AppResult<bool>;

    // --- Blog ---
    async fn list_posts(&self, filter: &PostFilter) -> AppResult<(Vec<BlogPost>, i64)>;
    /// Drafts and scheduled posts are only returned when `include_drafts` is set.
    async fn get_post_by_slug(&self, slug: &str, include_drafts: bool) -> AppResult<Option<BlogPost>>;
    async fn post_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> AppResult<bool>;
    async fn create_post(&self, req: CreateBlogPostRequest) -> AppResult<BlogPost>;
    async fn update_post(&self, id: Uuid, req: UpdateBlogPostRequest) -> AppResult<Option<BlogPost>>;
    async fn delete_post(&self, id: Uuid) -> AppResult<bool>;

    // --- Contact ---
    async fn create_contact_message(&self, msg: NewContactMessage) -> AppResult<ContactMessage>;
    /// Newest first, optionally filtered on the processed flag.
    async fn list_contact_messages(&self, processed: Option<bool>) -> AppResult<Vec<ContactMessage>>;
    async fn set_contact_processed(&self, id: Uuid, processed: bool) -> AppResult<Option<ContactMessage>>;

    // --- CV ---
    /// Stores a CV and makes it the active one.
    async fn create_cv(&self, cv: NewCv) -> AppResult<Cv>;
    /// The active CV, or the most recent upload when none is marked.
    async fn current_cv(&self) -> AppResult<Option<Cv>>;
    async fn list_cvs(&self) -> AppResult<Vec<Cv>>;
    async fn activate_cv(&self, id: Uuid) -> AppResult<Option<Cv>>;

    // --- About ---
    async fn get_about(&self) -> AppResult<Option<About>>;
    async fn upsert_about(&self, req: UpsertAboutRequest, updated_by: Uuid) -> AppResult<About>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Creates a viewer on first sign-in; marks the email verified either way.
    /// Never changes an existing user's role.
    async fn upsert_user_on_sign_in(&self, email: &str, name: &str) -> AppResult<User>;
    async fn set_user_role(&self, lookup: &UserLookup, role: Role) -> AppResult<Option<User>>;

    // --- Magic-link tokens ---
    async fn store_verification_token(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Deletes the token and reports whether it existed and had not expired.
    async fn consume_verification_token(&self, identifier: &str, token_hash: &str) -> AppResult<bool>;

    // --- Dashboard ---
    async fn get_stats(&self) -> AppResult<AdminDashboardStats>;
}

pub type RepositoryState = Arc<dyn Repository>;
