use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tera::Tera;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{blogs, comments, models, settings, stats, users};
use crate::auth::login;
use crate::auth::session::SessionKeys;
use crate::config::AppConfig;
use crate::db::blog_repository::{BlogRepository, MongoBlogRepository};
use crate::db::comment_repository::{CommentRepository, MongoCommentRepository};
use crate::db::model_repository::{ModelRepository, MongoModelRepository};
use crate::db::settings_repository::{MongoSettingsRepository, SettingsRepository};
use crate::db::user_repository::{MongoUserRepository, UserRepository};
use crate::error::AppError;
use crate::gate::access_gate;
use crate::rate_limit::RateLimiter;
use crate::web::{pages, templates};

/// Request bodies above this size are rejected (JSON payloads only).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub blog_repo: Arc<dyn BlogRepository>,
    pub model_repo: Arc<dyn ModelRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub comment_repo: Arc<dyn CommentRepository>,
    pub settings_repo: Arc<dyn SettingsRepository>,
    pub session_keys: Arc<SessionKeys>,
    /// Throttles `POST /api/comments` per client.
    pub comment_limiter: Arc<RateLimiter>,
    /// Throttles `POST /api/auth/login` per client and account.
    pub login_limiter: Arc<RateLimiter>,
    pub comment_limit: usize,
    pub templates: Arc<Tera>,
}

impl AppState {
    /// Wire the MongoDB repositories and make sure their indexes exist.
    pub async fn from_database(
        db: &mongodb::Database,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let blog_repo = MongoBlogRepository::new(db);
        let model_repo = MongoModelRepository::new(db);
        let user_repo = MongoUserRepository::new(db);
        let comment_repo = MongoCommentRepository::new(db);
        let settings_repo = MongoSettingsRepository::new(db);

        blog_repo.ensure_indexes().await?;
        model_repo.ensure_indexes().await?;
        user_repo.ensure_indexes().await?;
        comment_repo.ensure_indexes().await?;
        settings_repo.ensure_indexes().await?;
        tracing::info!("MongoDB indexes ensured");

        Self::with_repositories(
            config,
            Arc::new(blog_repo),
            Arc::new(model_repo),
            Arc::new(user_repo),
            Arc::new(comment_repo),
            Arc::new(settings_repo),
        )
    }

    /// Build the state around arbitrary repository implementations.
    pub fn with_repositories(
        config: &AppConfig,
        blog_repo: Arc<dyn BlogRepository>,
        model_repo: Arc<dyn ModelRepository>,
        user_repo: Arc<dyn UserRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
    ) -> Result<Self, AppError> {
        let limits = &config.rate_limit;
        let window = Duration::from_secs(limits.window_secs);

        Ok(Self {
            blog_repo,
            model_repo,
            user_repo,
            comment_repo,
            settings_repo,
            session_keys: Arc::new(SessionKeys::new(
                &config.session_secret,
                chrono::Duration::hours(config.session_ttl_hours),
                config.cookie_secure,
            )),
            comment_limiter: Arc::new(RateLimiter::new(window, limits.max_tracked_clients)),
            login_limiter: Arc::new(RateLimiter::new(window, limits.max_tracked_clients)),
            comment_limit: limits.comment_limit,
            templates: Arc::new(templates::load()?),
        })
    }
}

/// JSON API routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Public content
        .route("/api/blogs", get(blogs::list_blogs_handler))
        .route("/api/blogs/{slug}", get(blogs::get_blog_handler))
        .route("/api/models", get(models::list_models_handler))
        .route("/api/models/{slug}", get(models::get_model_handler))
        .route(
            "/api/comments",
            get(comments::list_comments_handler).post(comments::submit_comment_handler),
        )
        .route("/api/comments/{id}/like", post(comments::like_comment_handler))
        .route("/api/settings", get(settings::public_settings_handler))
        // Authentication
        .route("/api/auth/login", post(login::login_handler))
        .route("/api/auth/logout", post(login::logout_handler))
        .route("/api/auth/me", get(login::me_handler))
        .route("/api/auth/register", post(login::register_handler))
        .route("/api/bookmarks", get(users::list_bookmarks_handler))
        .route(
            "/api/bookmarks/{model_id}",
            post(users::add_bookmark_handler).delete(users::remove_bookmark_handler),
        )
        // Admin
        .route(
            "/api/admin/blogs",
            get(blogs::admin_list_blogs_handler).post(blogs::admin_create_blog_handler),
        )
        .route(
            "/api/admin/blogs/{id}",
            get(blogs::admin_get_blog_handler)
                .put(blogs::admin_update_blog_handler)
                .delete(blogs::admin_delete_blog_handler),
        )
        .route(
            "/api/admin/models",
            get(models::admin_list_models_handler).post(models::admin_create_model_handler),
        )
        .route(
            "/api/admin/models/{id}",
            get(models::admin_get_model_handler)
                .put(models::admin_update_model_handler)
                .delete(models::admin_delete_model_handler),
        )
        .route(
            "/api/admin/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/api/admin/users/{id}",
            axum::routing::put(users::update_user_handler).delete(users::delete_user_handler),
        )
        .route(
            "/api/admin/comments",
            get(comments::admin_list_comments_handler),
        )
        .route(
            "/api/admin/comments/{id}",
            axum::routing::patch(comments::moderate_comment_handler)
                .delete(comments::delete_comment_handler),
        )
        .route(
            "/api/admin/settings",
            get(settings::admin_get_settings_handler).put(settings::admin_update_settings_handler),
        )
        .route("/api/admin/stats", get(stats::stats_handler))
}

/// Server-rendered pages.
pub fn page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home_page))
        .route("/blog", get(pages::blog_list_page))
        .route("/blog/{slug}", get(pages::blog_post_page))
        .route("/models", get(pages::model_list_page))
        .route("/models/{slug}", get(pages::model_detail_page))
        .route("/admin", get(pages::admin_dashboard_page))
        .route("/admin/login", get(pages::admin_login_page))
}

/// Full application: API, pages, static files, admin gate and tracing.
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    let gate = middleware::from_fn_with_state(state.session_keys.clone(), access_gate);

    Router::new()
        .merge(api_router())
        .merge(page_router())
        .fallback_service(ServeDir::new(static_dir))
        .layer(gate)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Baseline response headers for every route.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}
