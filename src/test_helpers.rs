//! In-memory repositories and fixtures for unit tests.

use std::cmp::Reverse;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{Duration, Utc};

use crate::app::{build_router, AppState};
use crate::auth::models::{Role, SessionClaims};
use crate::auth::password::hash_password;
use crate::config::{AppConfig, RateLimitConfig};
use crate::content::slug::slugify;
use crate::db::blog_repository::BlogRepository;
use crate::db::comment_repository::CommentRepository;
use crate::db::model_repository::ModelRepository;
use crate::db::models::{
    new_id, BlogPost, Comment, DealModel, PostStatus, PostType, Settings, User, SETTINGS_KEY,
};
use crate::db::query::{BlogListQuery, CommentListQuery, ModelListQuery, Page, Pagination};
use crate::db::settings_repository::SettingsRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn paginate<T>(items: Vec<T>, pagination: Pagination) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(pagination.skip() as usize)
        .take(pagination.limit as usize)
        .collect();
    Page::new(items, total, pagination)
}

// ---------------------------------------------------------------------------
// Blogs
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryBlogs {
    posts: Mutex<Vec<BlogPost>>,
}

impl InMemoryBlogs {
    fn duplicate() -> AppError {
        AppError::Duplicate("Blog post with this slug already exists".into())
    }
}

#[async_trait]
impl BlogRepository for InMemoryBlogs {
    async fn insert(&self, post: &BlogPost) -> Result<(), AppError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.slug == post.slug) {
            return Err(Self::duplicate());
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn replace(&self, post: &BlogPost) -> Result<bool, AppError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.slug == post.slug && p.id != post.id) {
            return Err(Self::duplicate());
        }
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<BlogPost>, AppError> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.slug == slug).cloned())
    }

    async fn list(
        &self,
        query: &BlogListQuery,
        include_unpublished: bool,
    ) -> Result<Page<BlogPost>, AppError> {
        let status = if include_unpublished { query.status()? } else { None };
        let category = non_empty(&query.category);
        let tag = non_empty(&query.tag);
        let search = non_empty(&query.search);

        let mut items: Vec<BlogPost> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| include_unpublished || p.published)
            .filter(|p| status.is_none_or(|s| p.status == s))
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| tag.is_none_or(|t| p.tags.iter().any(|pt| pt == t)))
            .filter(|p| {
                search.is_none_or(|s| {
                    contains_ci(&p.title, s)
                        || contains_ci(&p.excerpt, s)
                        || p.tags.iter().any(|t| contains_ci(t, s))
                })
            })
            .cloned()
            .collect();

        if include_unpublished {
            items.sort_by_key(|p| Reverse(p.created_at));
        } else {
            items.sort_by_key(|p| Reverse((p.published_at, p.created_at)));
        }
        Ok(paginate(items, query.pagination()))
    }

    async fn increment_views(&self, id: &str) -> Result<(), AppError> {
        if let Some(post) = self.posts.lock().unwrap().iter_mut().find(|p| p.id == id) {
            post.views += 1;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() != before)
    }

    async fn count(&self) -> Result<(u64, u64), AppError> {
        let posts = self.posts.lock().unwrap();
        let published = posts.iter().filter(|p| p.published).count();
        Ok((posts.len() as u64, published as u64))
    }
}

// ---------------------------------------------------------------------------
// Deal models
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryModels {
    models: Mutex<Vec<DealModel>>,
}

impl InMemoryModels {
    fn duplicate() -> AppError {
        AppError::Duplicate("Model with this slug already exists".into())
    }
}

#[async_trait]
impl ModelRepository for InMemoryModels {
    async fn insert(&self, model: &DealModel) -> Result<(), AppError> {
        let mut models = self.models.lock().unwrap();
        if models.iter().any(|m| m.slug == model.slug) {
            return Err(Self::duplicate());
        }
        models.push(model.clone());
        Ok(())
    }

    async fn replace(&self, model: &DealModel) -> Result<bool, AppError> {
        let mut models = self.models.lock().unwrap();
        if models.iter().any(|m| m.slug == model.slug && m.id != model.id) {
            return Err(Self::duplicate());
        }
        match models.iter_mut().find(|m| m.id == model.id) {
            Some(existing) => {
                *existing = model.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DealModel>, AppError> {
        Ok(self.models.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<DealModel>, AppError> {
        Ok(self.models.lock().unwrap().iter().find(|m| m.slug == slug).cloned())
    }

    async fn list(&self, query: &ModelListQuery) -> Result<Page<DealModel>, AppError> {
        let industry = non_empty(&query.industry);
        let deal_type = non_empty(&query.deal_type);
        let search = non_empty(&query.search);

        let mut items: Vec<DealModel> = self
            .models
            .lock()
            .unwrap()
            .iter()
            .filter(|m| industry.is_none_or(|i| m.industry == i))
            .filter(|m| deal_type.is_none_or(|d| m.deal_type == d))
            .filter(|m| query.featured.is_none_or(|f| m.featured == f))
            .filter(|m| {
                search.is_none_or(|s| {
                    contains_ci(&m.title, s)
                        || contains_ci(&m.description, s)
                        || contains_ci(&m.industry, s)
                })
            })
            .cloned()
            .collect();

        items.sort_by_key(|m| Reverse((m.featured, m.created_at)));
        Ok(paginate(items, query.pagination()))
    }

    async fn increment_views(&self, id: &str) -> Result<(), AppError> {
        if let Some(model) = self.models.lock().unwrap().iter_mut().find(|m| m.id == id) {
            model.views += 1;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut models = self.models.lock().unwrap();
        let before = models.len();
        models.retain(|m| m.id != id);
        Ok(models.len() != before)
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.models.lock().unwrap().len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    fn duplicate() -> AppError {
        AppError::Duplicate("User with this email already exists".into())
    }

    fn update(&self, user_id: &str, f: impl FnOnce(&mut User)) -> Option<User> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == user_id)?;
        f(user);
        user.updated_at = Utc::now();
        Some(user.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(Self::duplicate());
        }
        users.push(user.clone());
        Ok(())
    }

    async fn replace(&self, user: &User) -> Result<bool, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email && u.id != user.id) {
            return Err(Self::duplicate());
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, pagination: Pagination) -> Result<Page<User>, AppError> {
        let mut items = self.users.lock().unwrap().clone();
        items.sort_by_key(|u| Reverse(u.created_at));
        Ok(paginate(items, pagination))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }

    async fn add_bookmark(&self, user_id: &str, model_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.update(user_id, |user| {
            if !user.bookmarks.iter().any(|b| b == model_id) {
                user.bookmarks.push(model_id.to_string());
            }
        }))
    }

    async fn remove_bookmark(
        &self,
        user_id: &str,
        model_id: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self.update(user_id, |user| user.bookmarks.retain(|b| b != model_id)))
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.users.lock().unwrap().len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryComments {
    comments: Mutex<Vec<Comment>>,
}

#[async_trait]
impl CommentRepository for InMemoryComments {
    async fn insert(&self, comment: &Comment) -> Result<(), AppError> {
        self.comments.lock().unwrap().push(comment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>, AppError> {
        Ok(self.comments.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn list_visible(
        &self,
        post_id: &str,
        post_type: PostType,
    ) -> Result<Vec<Comment>, AppError> {
        let mut items: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id && c.post_type == post_type && c.approved)
            .cloned()
            .collect();
        items.sort_by_key(|c| c.created_at);
        Ok(items)
    }

    async fn list(&self, query: &CommentListQuery) -> Result<Page<Comment>, AppError> {
        let post_id = non_empty(&query.post_id);
        let mut items: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| query.approved.is_none_or(|a| c.approved == a))
            .filter(|c| query.post_type.is_none_or(|t| c.post_type == t))
            .filter(|c| post_id.is_none_or(|p| c.post_id == p))
            .cloned()
            .collect();
        items.sort_by_key(|c| Reverse(c.created_at));
        Ok(paginate(items, query.pagination()))
    }

    async fn set_approved(&self, id: &str, approved: bool) -> Result<Option<Comment>, AppError> {
        let mut comments = self.comments.lock().unwrap();
        Ok(comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.approved = approved;
            c.clone()
        }))
    }

    async fn increment_likes(&self, id: &str) -> Result<Option<i64>, AppError> {
        let mut comments = self.comments.lock().unwrap();
        Ok(comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.likes += 1;
            c.likes
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() != before)
    }

    async fn count_pending(&self) -> Result<u64, AppError> {
        Ok(self.comments.lock().unwrap().iter().filter(|c| !c.approved).count() as u64)
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.comments.lock().unwrap().len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemorySettings {
    document: Mutex<Option<Settings>>,
}

impl InMemorySettings {
    pub fn document_count(&self) -> usize {
        usize::from(self.document.lock().unwrap().is_some())
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettings {
    async fn get_or_create(&self) -> Result<Settings, AppError> {
        Ok(self
            .document
            .lock()
            .unwrap()
            .get_or_insert_with(Settings::default)
            .clone())
    }

    async fn update(&self, mut settings: Settings) -> Result<Settings, AppError> {
        settings.key = SETTINGS_KEY.to_string();
        settings.updated_at = Some(Utc::now());
        *self.document.lock().unwrap() = Some(settings.clone());
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A prepared post with a slug derived from `title`.
pub fn sample_post(title: &str, status: PostStatus) -> BlogPost {
    let now = Utc::now();
    let mut post = BlogPost {
        id: new_id(),
        title: title.to_string(),
        slug: slugify(title),
        excerpt: String::new(),
        content: format!("<p>Notes on {title}.</p>"),
        status,
        author: "author-1".to_string(),
        author_name: "Ada".to_string(),
        tags: vec![],
        category: "insights".to_string(),
        featured_image: None,
        published: false,
        published_at: None,
        views: 0,
        read_time: 0,
        created_at: now,
        updated_at: now,
    };
    post.prepare_for_save(now);
    post
}

pub fn user_with_password(email: &str, password: &str, role: Role) -> User {
    let now = Utc::now();
    User {
        id: new_id(),
        name: "Ada".to_string(),
        email: email.to_string(),
        password_hash: hash_password(password).unwrap(),
        role,
        bookmarks: vec![],
        created_at: now,
        updated_at: now,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        mongodb_uri: "mongodb://localhost:27017".to_string(),
        mongodb_database: "dealroom-test".to_string(),
        session_secret: "test-secret-0123456789abcdef0123456789".to_string(),
        session_ttl_hours: 1,
        cookie_secure: false,
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string(),
        rate_limit: RateLimitConfig {
            window_secs: 60,
            comment_limit: 5,
            max_tracked_clients: 1_000,
        },
    }
}

/// Application state over in-memory repositories, with handles kept for
/// seeding and inspection.
pub struct TestContext {
    pub state: AppState,
    pub static_dir: String,
    pub blogs: Arc<InMemoryBlogs>,
    pub models: Arc<InMemoryModels>,
    pub users: Arc<InMemoryUsers>,
    pub comments: Arc<InMemoryComments>,
    pub settings: Arc<InMemorySettings>,
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let blogs = Arc::new(InMemoryBlogs::default());
        let models = Arc::new(InMemoryModels::default());
        let users = Arc::new(InMemoryUsers::default());
        let comments = Arc::new(InMemoryComments::default());
        let settings = Arc::new(InMemorySettings::default());

        let state = AppState::with_repositories(
            &config,
            blogs.clone(),
            models.clone(),
            users.clone(),
            comments.clone(),
            settings.clone(),
        )
        .unwrap();

        Self {
            state,
            static_dir: config.static_dir,
            blogs,
            models,
            users,
            comments,
            settings,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.static_dir)
    }
}

/// Session claims for an arbitrary identity, valid for `ttl` from now.
pub fn claims(sub: &str, email: &str, role: Role, ttl: Duration) -> SessionClaims {
    let now = Utc::now();
    SessionClaims {
        sub: sub.to_string(),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or_default().to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    }
}
