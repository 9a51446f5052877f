use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::error::{AppError, AppResult};
use crate::models::{
    About, ActivityItem, ActivityKind, AdminDashboardStats, BlogPost, ContactMessage,
    CreateBlogPostRequest, CreateProjectRequest, Cv, NewContactMessage, NewCv, PostFilter, Project,
    ProjectFilter, RECENT_PER_COLLECTION, Role, StatCounts, UpdateBlogPostRequest,
    UpdateProjectRequest, UpsertAboutRequest, User, UserLookup,
};

#[derive(Default)]
struct Store {
    projects: Vec<Project>,
    posts: Vec<BlogPost>,
    messages: Vec<ContactMessage>,
    cvs: Vec<Cv>,
    about: Option<About>,
    users: Vec<User>,
    tokens: Vec<(String, String, DateTime<Utc>)>,
}

/// InMemoryRepository
///
/// `Repository` kept in process memory. Mirrors the Postgres semantics (unique
/// slugs and emails, newest-first ordering, single active CV) and backs the
/// handler and router tests.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

fn page<T: Clone>(items: &[T], skip: i64, limit: i64) -> Vec<T> {
    items
        .iter()
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

fn slug_conflict(entity: &str) -> AppError {
    AppError::Conflict(format!("A {entity} with this slug already exists"))
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user directly, bypassing the sign-in flow.
    pub async fn insert_user(&self, email: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_lowercase(),
            role,
            email_verified: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.users.push(user.clone());
        user
    }

    /// Verification tokens currently stored, expired ones included.
    pub async fn token_count(&self) -> usize {
        self.store.read().await.tokens.len()
    }

    pub async fn remove_user(&self, id: Uuid) {
        self.store.write().await.users.retain(|u| u.id != id);
    }

    /// Seeds a post with an explicit publication date.
    pub async fn insert_post(&self, slug: &str, published_at: Option<DateTime<Utc>>) -> BlogPost {
        let now = Utc::now();
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: format!("Post {slug}"),
            slug: slug.to_string(),
            excerpt: "Excerpt".to_string(),
            content_markdown: "# Content".to_string(),
            tags: Vec::new(),
            cover_image: None,
            published_at,
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.posts.insert(0, post.clone());
        post
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_projects(&self, filter: &ProjectFilter) -> AppResult<(Vec<Project>, i64)> {
        let store = self.store.read().await;
        let matching: Vec<Project> = store
            .projects
            .iter()
            .filter(|p| filter.featured.is_none_or(|f| p.featured == f))
            .cloned()
            .collect();
        Ok((
            page(&matching, filter.skip, filter.limit),
            matching.len() as i64,
        ))
    }

    async fn get_project_by_slug(&self, slug: &str) -> AppResult<Option<Project>> {
        let store = self.store.read().await;
        Ok(store.projects.iter().find(|p| p.slug == slug).cloned())
    }

    async fn project_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let store = self.store.read().await;
        Ok(store
            .projects
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn create_project(&self, req: CreateProjectRequest) -> AppResult<Project> {
        let mut store = self.store.write().await;
        if store.projects.iter().any(|p| p.slug == req.slug) {
            return Err(slug_conflict("project"));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: req.title,
            slug: req.slug,
            short_description: req.short_description,
            problem: req.problem,
            solution: req.solution,
            role: req.role,
            tech_stack: req.tech_stack,
            key_decisions: req.key_decisions,
            screenshots: req.screenshots,
            live_link: req.live_link,
            github_link: req.github_link,
            featured: req.featured,
            created_at: now,
            updated_at: now,
        };
        store.projects.insert(0, project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, req: UpdateProjectRequest) -> AppResult<Option<Project>> {
        let mut store = self.store.write().await;
        if let Some(slug) = &req.slug {
            if store.projects.iter().any(|p| &p.slug == slug && p.id != id) {
                return Err(slug_conflict("project"));
            }
        }
        let Some(project) = store.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        req.apply_to(project);
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let before = store.projects.len();
        store.projects.retain(|p| p.id != id);
        Ok(store.projects.len() < before)
    }

    async fn list_posts(&self, filter: &PostFilter) -> AppResult<(Vec<BlogPost>, i64)> {
        let store = self.store.read().await;
        let now = Utc::now();
        let mut matching: Vec<BlogPost> = store
            .posts
            .iter()
            .filter(|p| !filter.published_only || p.is_published_at(now))
            .filter(|p| filter.tag.as_ref().is_none_or(|t| p.tags.contains(t)))
            .cloned()
            .collect();
        // Published first (newest first), drafts last.
        matching.sort_by(|a, b| match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        });
        Ok((
            page(&matching, filter.skip, filter.limit),
            matching.len() as i64,
        ))
    }

    async fn get_post_by_slug(&self, slug: &str, include_drafts: bool) -> AppResult<Option<BlogPost>> {
        let store = self.store.read().await;
        let now = Utc::now();
        Ok(store
            .posts
            .iter()
            .find(|p| p.slug == slug && (include_drafts || p.is_published_at(now)))
            .cloned())
    }

    async fn post_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let store = self.store.read().await;
        Ok(store
            .posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn create_post(&self, req: CreateBlogPostRequest) -> AppResult<BlogPost> {
        let mut store = self.store.write().await;
        if store.posts.iter().any(|p| p.slug == req.slug) {
            return Err(slug_conflict("post"));
        }

        let now = Utc::now();
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: req.title,
            slug: req.slug,
            excerpt: req.excerpt,
            content_markdown: req.content_markdown,
            tags: req.tags,
            cover_image: req.cover_image,
            published_at: req.published_at,
            created_at: now,
            updated_at: now,
        };
        store.posts.insert(0, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, req: UpdateBlogPostRequest) -> AppResult<Option<BlogPost>> {
        let mut store = self.store.write().await;
        if let Some(slug) = &req.slug {
            if store.posts.iter().any(|p| &p.slug == slug && p.id != id) {
                return Err(slug_conflict("post"));
            }
        }
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        req.apply_to(post);
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let before = store.posts.len();
        store.posts.retain(|p| p.id != id);
        Ok(store.posts.len() < before)
    }

    async fn create_contact_message(&self, msg: NewContactMessage) -> AppResult<ContactMessage> {
        let now = Utc::now();
        let message = ContactMessage {
            id: Uuid::new_v4(),
            name: msg.name,
            email: msg.email,
            message: msg.message,
            project_budget: msg.project_budget,
            file: msg.file,
            processed: false,
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.messages.insert(0, message.clone());
        Ok(message)
    }

    async fn list_contact_messages(&self, processed: Option<bool>) -> AppResult<Vec<ContactMessage>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .filter(|m| processed.is_none_or(|p| m.processed == p))
            .cloned()
            .collect())
    }

    async fn set_contact_processed(&self, id: Uuid, processed: bool) -> AppResult<Option<ContactMessage>> {
        let mut store = self.store.write().await;
        let Some(message) = store.messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        message.processed = processed;
        message.updated_at = Utc::now();
        Ok(Some(message.clone()))
    }

    async fn create_cv(&self, cv: NewCv) -> AppResult<Cv> {
        let mut store = self.store.write().await;
        for existing in store.cvs.iter_mut() {
            existing.is_active = false;
        }
        let created = Cv {
            id: Uuid::new_v4(),
            file_url: cv.file_url,
            storage_id: cv.storage_id,
            file_name: cv.file_name,
            uploaded_at: Utc::now(),
            uploaded_by: cv.uploaded_by,
            is_active: true,
        };
        store.cvs.insert(0, created.clone());
        Ok(created)
    }

    async fn current_cv(&self) -> AppResult<Option<Cv>> {
        let store = self.store.read().await;
        Ok(store
            .cvs
            .iter()
            .find(|cv| cv.is_active)
            .or_else(|| store.cvs.first())
            .cloned())
    }

    async fn list_cvs(&self) -> AppResult<Vec<Cv>> {
        Ok(self.store.read().await.cvs.clone())
    }

    async fn activate_cv(&self, id: Uuid) -> AppResult<Option<Cv>> {
        let mut store = self.store.write().await;
        if !store.cvs.iter().any(|cv| cv.id == id) {
            return Ok(None);
        }
        for cv in store.cvs.iter_mut() {
            cv.is_active = cv.id == id;
        }
        Ok(store.cvs.iter().find(|cv| cv.id == id).cloned())
    }

    async fn get_about(&self) -> AppResult<Option<About>> {
        Ok(self.store.read().await.about.clone())
    }

    async fn upsert_about(&self, req: UpsertAboutRequest, updated_by: Uuid) -> AppResult<About> {
        let mut store = self.store.write().await;
        let id = store.about.as_ref().map(|a| a.id).unwrap_or_else(Uuid::new_v4);
        let about = About {
            id,
            title: req.title,
            bio: req.bio,
            image_url: req.image_url,
            skills: req.skills,
            updated_at: Utc::now(),
            updated_by,
        };
        store.about = Some(about.clone());
        Ok(about)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn upsert_user_on_sign_in(&self, email: &str, name: &str) -> AppResult<User> {
        let email = email.to_lowercase();
        let now = Utc::now();
        let mut store = self.store.write().await;

        if let Some(user) = store.users.iter_mut().find(|u| u.email == email) {
            user.email_verified.get_or_insert(now);
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role: Role::Viewer,
            email_verified: Some(now),
            created_at: now,
            updated_at: now,
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_role(&self, lookup: &UserLookup, role: Role) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        let found = store.users.iter_mut().find(|u| match lookup {
            UserLookup::Id(id) => u.id == *id,
            UserLookup::Email(email) => u.email == email.to_lowercase(),
        });
        Ok(found.map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn store_verification_token(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        store.tokens.retain(|(_, _, expires_at)| *expires_at > now);
        store.tokens.push((
            identifier.to_string(),
            token_hash.to_string(),
            expires_at,
        ));
        Ok(())
    }

    async fn consume_verification_token(&self, identifier: &str, token_hash: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let position = store
            .tokens
            .iter()
            .position(|(id, hash, _)| id == identifier && hash == token_hash);
        Ok(position
            .map(|i| store.tokens.remove(i))
            .is_some_and(|(_, _, expires_at)| expires_at > Utc::now()))
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let store = self.store.read().await;
        let counts = StatCounts {
            projects: store.projects.len() as i64,
            posts: store.posts.len() as i64,
            messages: store.messages.len() as i64,
            unread: store.messages.iter().filter(|m| !m.processed).count() as i64,
        };

        let mut projects: Vec<&Project> = store.projects.iter().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut posts: Vec<&BlogPost> = store.posts.iter().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut messages: Vec<&ContactMessage> = store.messages.iter().collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let items = projects
            .into_iter()
            .take(RECENT_PER_COLLECTION)
            .map(|p| ActivityItem {
                kind: ActivityKind::Project,
                title: p.title.clone(),
                date: p.created_at,
                id: p.slug.clone(),
            })
            .chain(posts.into_iter().take(RECENT_PER_COLLECTION).map(|p| ActivityItem {
                kind: ActivityKind::Post,
                title: p.title.clone(),
                date: p.created_at,
                id: p.slug.clone(),
            }))
            .chain(
                messages
                    .into_iter()
                    .take(RECENT_PER_COLLECTION)
                    .map(|m| ActivityItem::message(m.id, &m.name, m.created_at)),
            )
            .collect();

        Ok(AdminDashboardStats::with_recent(counts, items))
    }
}
