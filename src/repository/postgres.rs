use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use uuid::Uuid;

use super::Repository;
use crate::error::AppResult;
use crate::models::{
    About, ActivityItem, ActivityKind, AdminDashboardStats, BlogPost, ContactMessage,
    CreateBlogPostRequest, CreateProjectRequest, Cv, FileAttachment, NewContactMessage, NewCv,
    PostFilter, Project, ProjectFilter, RECENT_PER_COLLECTION, Role, StatCounts,
    UpdateBlogPostRequest, UpdateProjectRequest, UpsertAboutRequest, User, UserLookup,
};

const PROJECT_COLUMNS: &str = "id, title, slug, short_description, problem, solution, role, \
     tech_stack, key_decisions, screenshots, live_link, github_link, featured, created_at, updated_at";

const POST_COLUMNS: &str =
    "id, title, slug, excerpt, content_markdown, tags, cover_image, published_at, created_at, updated_at";

const CONTACT_COLUMNS: &str =
    "id, name, email, message, project_budget, file, processed, created_at, updated_at";

const CV_COLUMNS: &str = "id, file_url, storage_id, file_name, uploaded_at, uploaded_by, is_active";

const ABOUT_COLUMNS: &str = "id, title, bio, image_url, skills, updated_at, updated_by";

const USER_COLUMNS: &str = "id, name, email, role, email_verified, created_at, updated_at";

/// Contact rows carry the attachment as nullable JSONB.
#[derive(FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    email: String,
    message: String,
    project_budget: Option<String>,
    file: Option<Json<FileAttachment>>,
    processed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for ContactMessage {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            message: row.message,
            project_budget: row.project_budget,
            file: row.file.map(|Json(file)| file),
            processed: row.processed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime, not at
/// compile time, so the crate builds without a reachable database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_project_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProjectFilter) {
    if let Some(featured) = filter.featured {
        builder.push(" WHERE featured = ").push_bind(featured);
    }
}

fn push_post_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    let mut separator = " WHERE ";
    if filter.published_only {
        builder
            .push(separator)
            .push("published_at IS NOT NULL AND published_at <= NOW()");
        separator = " AND ";
    }
    if let Some(tag) = &filter.tag {
        builder.push(separator).push_bind(tag.clone()).push(" = ANY(tags)");
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_projects
    ///
    /// Uses QueryBuilder so the optional `featured` filter stays parameterised and
    /// is shared by the page query and the count query.
    async fn list_projects(&self, filter: &ProjectFilter) -> AppResult<(Vec<Project>, i64)> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PROJECT_COLUMNS} FROM projects"));
        push_project_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);
        let projects = builder
            .build_query_as::<Project>()
            .fetch_all(&self.pool)
            .await?;

        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM projects");
        push_project_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((projects, total))
    }

    async fn get_project_by_slug(&self, slug: &str) -> AppResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn project_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create_project(&self, req: CreateProjectRequest) -> AppResult<Project> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (id, title, slug, short_description, problem, solution, role,
                                  tech_stack, key_decisions, screenshots, live_link, github_link, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.slug)
        .bind(&req.short_description)
        .bind(&req.problem)
        .bind(&req.solution)
        .bind(&req.role)
        .bind(&req.tech_stack)
        .bind(&req.key_decisions)
        .bind(Json(&req.screenshots))
        .bind(&req.live_link)
        .bind(&req.github_link)
        .bind(req.featured)
        .fetch_one(&self.pool)
        .await?;
        Ok(project)
    }

    /// update_project
    ///
    /// Partial update via `COALESCE`: a NULL parameter keeps the stored value.
    /// Links go through `NULLIF` so an empty string clears them.
    async fn update_project(&self, id: Uuid, req: UpdateProjectRequest) -> AppResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                short_description = COALESCE($4, short_description),
                problem = COALESCE($5, problem),
                solution = COALESCE($6, solution),
                role = COALESCE($7, role),
                tech_stack = COALESCE($8, tech_stack),
                key_decisions = COALESCE($9, key_decisions),
                screenshots = COALESCE($10, screenshots),
                live_link = NULLIF(COALESCE($11, live_link), ''),
                github_link = NULLIF(COALESCE($12, github_link), ''),
                featured = COALESCE($13, featured),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.slug)
        .bind(req.short_description)
        .bind(req.problem)
        .bind(req.solution)
        .bind(req.role)
        .bind(req.tech_stack)
        .bind(req.key_decisions)
        .bind(req.screenshots.map(Json))
        .bind(req.live_link)
        .bind(req.github_link)
        .bind(req.featured)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(&self, filter: &PostFilter) -> AppResult<(Vec<BlogPost>, i64)> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM blog_posts"));
        push_post_filter(&mut builder, filter);
        builder
            .push(" ORDER BY published_at DESC NULLS LAST, created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);
        let posts = builder
            .build_query_as::<BlogPost>()
            .fetch_all(&self.pool)
            .await?;

        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM blog_posts");
        push_post_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((posts, total))
    }

    async fn get_post_by_slug(&self, slug: &str, include_drafts: bool) -> AppResult<Option<BlogPost>> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM blog_posts
            WHERE slug = $1
              AND ($2 OR (published_at IS NOT NULL AND published_at <= NOW()))
            "#
        ))
        .bind(slug)
        .bind(include_drafts)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn post_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM blog_posts WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create_post(&self, req: CreateBlogPostRequest) -> AppResult<BlogPost> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            INSERT INTO blog_posts (id, title, slug, excerpt, content_markdown, tags, cover_image, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.slug)
        .bind(&req.excerpt)
        .bind(&req.content_markdown)
        .bind(&req.tags)
        .bind(&req.cover_image)
        .bind(req.published_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, req: UpdateBlogPostRequest) -> AppResult<Option<BlogPost>> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            UPDATE blog_posts
            SET title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                excerpt = COALESCE($4, excerpt),
                content_markdown = COALESCE($5, content_markdown),
                tags = COALESCE($6, tags),
                cover_image = NULLIF(COALESCE($7, cover_image), ''),
                published_at = COALESCE($8, published_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.slug)
        .bind(req.excerpt)
        .bind(req.content_markdown)
        .bind(req.tags)
        .bind(req.cover_image)
        .bind(req.published_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_contact_message(&self, msg: NewContactMessage) -> AppResult<ContactMessage> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            INSERT INTO contact_messages (id, name, email, message, project_budget, file)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&msg.name)
        .bind(&msg.email)
        .bind(&msg.message)
        .bind(&msg.project_budget)
        .bind(msg.file.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_contact_messages(&self, processed: Option<bool>) -> AppResult<Vec<ContactMessage>> {
        let rows = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            SELECT {CONTACT_COLUMNS} FROM contact_messages
            WHERE ($1::boolean IS NULL OR processed = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(processed)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ContactMessage::from).collect())
    }

    async fn set_contact_processed(&self, id: Uuid, processed: bool) -> AppResult<Option<ContactMessage>> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            UPDATE contact_messages SET processed = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(processed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ContactMessage::from))
    }

    /// create_cv
    ///
    /// Deactivates the previous CV and inserts the new one in a single
    /// transaction; a partial unique index keeps at most one row active.
    async fn create_cv(&self, cv: NewCv) -> AppResult<Cv> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE cvs SET is_active = FALSE WHERE is_active")
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, Cv>(&format!(
            r#"
            INSERT INTO cvs (id, file_url, storage_id, file_name, uploaded_by, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {CV_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&cv.file_url)
        .bind(&cv.storage_id)
        .bind(&cv.file_name)
        .bind(cv.uploaded_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn current_cv(&self) -> AppResult<Option<Cv>> {
        let cv = sqlx::query_as::<_, Cv>(&format!(
            "SELECT {CV_COLUMNS} FROM cvs ORDER BY is_active DESC, uploaded_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(cv)
    }

    async fn list_cvs(&self) -> AppResult<Vec<Cv>> {
        let cvs = sqlx::query_as::<_, Cv>(&format!(
            "SELECT {CV_COLUMNS} FROM cvs ORDER BY uploaded_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(cvs)
    }

    async fn activate_cv(&self, id: Uuid) -> AppResult<Option<Cv>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE cvs SET is_active = FALSE WHERE is_active AND id <> $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let activated = sqlx::query_as::<_, Cv>(&format!(
            "UPDATE cvs SET is_active = TRUE WHERE id = $1 RETURNING {CV_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        // Unknown id: leave the current active CV alone.
        if activated.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;
        Ok(activated)
    }

    async fn get_about(&self) -> AppResult<Option<About>> {
        let about = sqlx::query_as::<_, About>(&format!("SELECT {ABOUT_COLUMNS} FROM about LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;
        Ok(about)
    }

    /// upsert_about
    ///
    /// The `singleton` column is unique and always TRUE, so there is at most one
    /// row and the conflict branch keeps its id.
    async fn upsert_about(&self, req: UpsertAboutRequest, updated_by: Uuid) -> AppResult<About> {
        let about = sqlx::query_as::<_, About>(&format!(
            r#"
            INSERT INTO about (id, singleton, title, bio, image_url, skills, updated_at, updated_by)
            VALUES ($1, TRUE, $2, $3, $4, $5, NOW(), $6)
            ON CONFLICT (singleton) DO UPDATE
            SET title = EXCLUDED.title,
                bio = EXCLUDED.bio,
                image_url = EXCLUDED.image_url,
                skills = EXCLUDED.skills,
                updated_at = NOW(),
                updated_by = EXCLUDED.updated_by
            RETURNING {ABOUT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.bio)
        .bind(&req.image_url)
        .bind(&req.skills)
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(about)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn upsert_user_on_sign_in(&self, email: &str, name: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, role, email_verified)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (email) DO UPDATE
            SET email_verified = COALESCE(users.email_verified, EXCLUDED.email_verified),
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email.to_lowercase())
        .bind(Role::Viewer.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_role(&self, lookup: &UserLookup, role: Role) -> AppResult<Option<User>> {
        let query = match lookup {
            UserLookup::Id(_) => "UPDATE users SET role = $1, updated_at = NOW() WHERE id::text = $2",
            UserLookup::Email(_) => "UPDATE users SET role = $1, updated_at = NOW() WHERE email = $2",
        };
        let key = match lookup {
            UserLookup::Id(id) => id.to_string(),
            UserLookup::Email(email) => email.to_lowercase(),
        };

        let user = sqlx::query_as::<_, User>(&format!("{query} RETURNING {USER_COLUMNS}"))
            .bind(role.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn store_verification_token(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let purged = sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= NOW()")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if purged > 0 {
            tracing::debug!(purged, "expired verification tokens removed");
        }

        sqlx::query(
            "INSERT INTO verification_tokens (identifier, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(identifier)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn consume_verification_token(&self, identifier: &str, token_hash: &str) -> AppResult<bool> {
        let expires_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "DELETE FROM verification_tokens WHERE identifier = $1 AND token_hash = $2 RETURNING expires_at",
        )
        .bind(identifier)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expires_at.is_some_and(|at| at > Utc::now()))
    }

    /// get_stats
    ///
    /// Counts in one round trip, then the three newest items per collection,
    /// merged and cut to the five newest overall.
    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let (projects, posts, messages, unread) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects),
                (SELECT COUNT(*) FROM blog_posts),
                (SELECT COUNT(*) FROM contact_messages),
                (SELECT COUNT(*) FROM contact_messages WHERE NOT processed)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let limit = RECENT_PER_COLLECTION as i64;
        let mut items = Vec::new();

        let recent_projects = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT title, slug, created_at FROM projects ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        items.extend(recent_projects.into_iter().map(|(title, slug, date)| ActivityItem {
            kind: ActivityKind::Project,
            title,
            date,
            id: slug,
        }));

        let recent_posts = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT title, slug, created_at FROM blog_posts ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        items.extend(recent_posts.into_iter().map(|(title, slug, date)| ActivityItem {
            kind: ActivityKind::Post,
            title,
            date,
            id: slug,
        }));

        let recent_messages = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
            "SELECT id, name, created_at FROM contact_messages ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        items.extend(
            recent_messages
                .into_iter()
                .map(|(id, name, date)| ActivityItem::message(id, &name, date)),
        );

        Ok(AdminDashboardStats::with_recent(
            StatCounts {
                projects,
                posts,
                messages,
                unread,
            },
            items,
        ))
    }
}
