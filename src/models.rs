use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{
    Normalize, deserialize_flexible_datetime, lower_trim, not_blank, optional_url, validate_slug,
};

// --- Identity ---

/// Role
///
/// RBAC level stored on the user record. Only `Admin` passes the admin gate;
/// `Editor` is reserved for delegated content editing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// Created by the sign-in flow on first login. The role is only ever raised
/// out-of-band (see the `promote-admin` binary).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub email_verified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How the maintenance tooling addresses a user.
#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    Id(Uuid),
    Email(String),
}

impl UserLookup {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => UserLookup::Id(id),
            Err(_) => UserLookup::Email(raw.to_lowercase()),
        }
    }
}

// --- Projects ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct Screenshot {
    #[validate(url(message = "Invalid screenshot URL"))]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Project
///
/// Portfolio case study. Projects have no draft state: every stored project is
/// publicly readable.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub problem: String,
    pub solution: String,
    /// The author's role on the project, not an RBAC role.
    pub role: String,
    pub tech_stack: Vec<String>,
    pub key_decisions: Vec<String>,
    #[sqlx(json)]
    pub screenshots: Vec<Screenshot>,
    pub live_link: Option<String>,
    pub github_link: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateProjectRequest {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    #[serde(default)]
    pub title: String,
    #[validate(custom(function = "validate_slug"))]
    #[serde(default)]
    pub slug: String,
    #[validate(
        custom(function = "not_blank", message = "Short description is required"),
        length(max = 300, message = "Short description cannot exceed 300 characters")
    )]
    #[serde(default)]
    pub short_description: String,
    #[validate(custom(function = "not_blank", message = "Problem statement is required"))]
    #[serde(default)]
    pub problem: String,
    #[validate(custom(function = "not_blank", message = "Solution description is required"))]
    #[serde(default)]
    pub solution: String,
    #[validate(custom(function = "not_blank", message = "Role is required"))]
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub key_decisions: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub screenshots: Vec<Screenshot>,
    #[validate(custom(function = "optional_url", message = "Invalid live link URL"))]
    pub live_link: Option<String>,
    #[validate(custom(function = "optional_url", message = "Invalid GitHub link URL"))]
    pub github_link: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Normalize for CreateProjectRequest {
    fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.slug = lower_trim(&self.slug);
        // An empty link on creation means "no link".
        self.live_link = self.live_link.filter(|link| !link.trim().is_empty());
        self.github_link = self.github_link.filter(|link| !link.trim().is_empty());
        self
    }
}

/// UpdateProjectRequest
///
/// Partial update: absent fields keep their stored value. An empty string for
/// a link clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "not_blank", message = "Short description is required"),
        length(max = 300, message = "Short description cannot exceed 300 characters")
    )]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Problem statement is required"))]
    pub problem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Solution description is required"))]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Role is required"))]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_decisions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub screenshots: Option<Vec<Screenshot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "optional_url", message = "Invalid live link URL"))]
    pub live_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "optional_url", message = "Invalid GitHub link URL"))]
    pub github_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl Normalize for UpdateProjectRequest {
    fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.slug = self.slug.as_deref().map(lower_trim);
        self.live_link = self.live_link.map(|l| l.trim().to_string());
        self.github_link = self.github_link.map(|l| l.trim().to_string());
        self
    }
}

impl UpdateProjectRequest {
    /// Applies the provided fields to a stored project.
    pub fn apply_to(self, project: &mut Project) {
        if let Some(v) = self.title {
            project.title = v;
        }
        if let Some(v) = self.slug {
            project.slug = v;
        }
        if let Some(v) = self.short_description {
            project.short_description = v;
        }
        if let Some(v) = self.problem {
            project.problem = v;
        }
        if let Some(v) = self.solution {
            project.solution = v;
        }
        if let Some(v) = self.role {
            project.role = v;
        }
        if let Some(v) = self.tech_stack {
            project.tech_stack = v;
        }
        if let Some(v) = self.key_decisions {
            project.key_decisions = v;
        }
        if let Some(v) = self.screenshots {
            project.screenshots = v;
        }
        if let Some(v) = self.live_link {
            project.live_link = Some(v).filter(|l| !l.is_empty());
        }
        if let Some(v) = self.github_link {
            project.github_link = Some(v).filter(|l| !l.is_empty());
        }
        if let Some(v) = self.featured {
            project.featured = v;
        }
        project.updated_at = Utc::now();
    }
}

// --- Blog ---

/// BlogPost
///
/// A post is a draft until `published_at` is set and not in the future.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content_markdown: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn is_published_at(&self, now: DateTime<Utc>) -> bool {
        self.published_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBlogPostRequest {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    #[serde(default)]
    pub title: String,
    #[validate(custom(function = "validate_slug"))]
    #[serde(default)]
    pub slug: String,
    #[validate(
        custom(function = "not_blank", message = "Excerpt is required"),
        length(max = 500, message = "Excerpt cannot exceed 500 characters")
    )]
    #[serde(default)]
    pub excerpt: String,
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    #[serde(default)]
    pub content_markdown: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "optional_url", message = "Invalid cover image URL"))]
    pub cover_image: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_datetime")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Normalize for CreateBlogPostRequest {
    fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.slug = lower_trim(&self.slug);
        self.cover_image = self.cover_image.filter(|c| !c.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateBlogPostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "not_blank", message = "Excerpt is required"),
        length(max = 500, message = "Excerpt cannot exceed 500 characters")
    )]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content_markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "optional_url", message = "Invalid cover image URL"))]
    pub cover_image: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_flexible_datetime"
    )]
    pub published_at: Option<DateTime<Utc>>,
}

impl Normalize for UpdateBlogPostRequest {
    fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.slug = self.slug.as_deref().map(lower_trim);
        self.cover_image = self.cover_image.map(|c| c.trim().to_string());
        self
    }
}

impl UpdateBlogPostRequest {
    pub fn apply_to(self, post: &mut BlogPost) {
        if let Some(v) = self.title {
            post.title = v;
        }
        if let Some(v) = self.slug {
            post.slug = v;
        }
        if let Some(v) = self.excerpt {
            post.excerpt = v;
        }
        if let Some(v) = self.content_markdown {
            post.content_markdown = v;
        }
        if let Some(v) = self.tags {
            post.tags = v;
        }
        if let Some(v) = self.cover_image {
            post.cover_image = Some(v).filter(|c| !c.is_empty());
        }
        if let Some(v) = self.published_at {
            post.published_at = Some(v);
        }
        post.updated_at = Utc::now();
    }
}

// --- Contact ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FileAttachment {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub project_budget: Option<String>,
    pub file: Option<FileAttachment>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ContactSubmission
///
/// The text fields of the public contact form. `website` is the honeypot; it
/// carries no validation since a filled honeypot is dropped, not rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(
        custom(function = "not_blank", message = "Message is required"),
        length(max = 5000, message = "Message cannot exceed 5000 characters")
    )]
    pub message: String,
    pub project_budget: Option<String>,
    pub website: Option<String>,
}

impl Normalize for ContactSubmission {
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = lower_trim(&self.email);
        self.project_budget = self
            .project_budget
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        self
    }
}

impl ContactSubmission {
    pub fn is_bot(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    pub project_budget: Option<String>,
    pub file: Option<FileAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct SetProcessedRequest {
    pub processed: bool,
}

impl Normalize for SetProcessedRequest {}

// --- CV ---

/// Cv
///
/// An uploaded CV file. Exactly one record is marked active; a new upload
/// becomes the active one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cv {
    pub id: Uuid,
    pub file_url: String,
    pub storage_id: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCvRequest {
    #[validate(url(message = "Invalid file URL"))]
    #[serde(default)]
    pub file_url: String,
    #[validate(custom(function = "not_blank", message = "File name is required"))]
    #[serde(default)]
    pub file_name: String,
    /// Storage identifier; defaults to the file URL when the file lives elsewhere.
    pub storage_id: Option<String>,
}

impl Normalize for CreateCvRequest {
    fn normalized(mut self) -> Self {
        self.file_url = self.file_url.trim().to_string();
        self.file_name = self.file_name.trim().to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewCv {
    pub file_url: String,
    pub storage_id: String,
    pub file_name: String,
    pub uploaded_by: Uuid,
}

// --- About ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct About {
    pub id: Uuid,
    pub title: String,
    pub bio: String,
    pub image_url: Option<String>,
    pub skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpsertAboutRequest {
    #[validate(custom(function = "not_blank", message = "Title and bio are required"))]
    #[serde(default)]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Title and bio are required"))]
    #[serde(default)]
    pub bio: String,
    #[validate(custom(function = "optional_url", message = "Invalid image URL"))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Normalize for UpsertAboutRequest {
    fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.image_url = self.image_url.filter(|u| !u.trim().is_empty());
        self
    }
}

// --- Query schemas ---

fn default_limit() -> i64 {
    20
}

/// ProjectQuery
///
/// `GET /api/projects` parameters. `featured` is only applied when present.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    pub featured: Option<bool>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "skip cannot be negative"))]
    pub skip: i64,
}

impl Normalize for ProjectQuery {}

/// BlogQuery
///
/// `published=false` is only honoured for admin callers.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BlogQuery {
    pub tag: Option<String>,
    pub published: Option<bool>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "skip cannot be negative"))]
    pub skip: i64,
}

impl Normalize for BlogQuery {
    fn normalized(mut self) -> Self {
        self.tag = self.tag.filter(|t| !t.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactQuery {
    pub processed: Option<bool>,
}

impl Normalize for ContactQuery {}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Only the literal `true` asks for an attachment; anything else is inline.
    pub download: Option<String>,
}

impl DownloadQuery {
    pub fn as_attachment(&self) -> bool {
        self.download.as_deref() == Some("true")
    }
}

impl Normalize for DownloadQuery {}

/// Repository-level project filter.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    pub featured: Option<bool>,
    pub limit: i64,
    pub skip: i64,
}

/// Repository-level post filter.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub tag: Option<String>,
    pub published_only: bool,
    pub limit: i64,
    pub skip: i64,
}

// --- Response payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub total: i64,
    pub limit: i64,
    pub skip: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BlogPostList {
    pub posts: Vec<BlogPost>,
    pub total: i64,
    pub limit: i64,
    pub skip: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContactMessageList {
    pub messages: Vec<ContactMessage>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CvList {
    pub cvs: Vec<Cv>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContactReceipt {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatCounts {
    pub projects: i64,
    pub posts: i64,
    pub messages: i64,
    pub unread: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ActivityKind {
    Project,
    Post,
    Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    pub date: DateTime<Utc>,
    /// Slug for projects and posts, message id for messages.
    pub id: String,
}

impl ActivityItem {
    pub fn message(id: Uuid, sender: &str, date: DateTime<Utc>) -> Self {
        Self {
            kind: ActivityKind::Message,
            title: format!("Message from {sender}"),
            date,
            id: id.to_string(),
        }
    }
}

/// AdminDashboardStats
///
/// Output of `GET /api/admin/stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminDashboardStats {
    pub counts: StatCounts,
    pub recent_activity: Vec<ActivityItem>,
}

/// Number of recent items pulled per collection, and kept overall.
pub const RECENT_PER_COLLECTION: usize = 3;
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

impl AdminDashboardStats {
    /// Merges per-collection recents into one newest-first feed.
    pub fn with_recent(counts: StatCounts, mut items: Vec<ActivityItem>) -> Self {
        items.sort_by(|a, b| b.date.cmp(&a.date));
        items.truncate(RECENT_ACTIVITY_LIMIT);
        Self {
            counts,
            recent_activity: items,
        }
    }
}
