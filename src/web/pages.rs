//! Server-rendered pages. They reuse the API's service functions so page and
//! JSON views stay consistent.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::api::blogs::{list_blogs, view_blog};
use crate::api::models::view_model;
use crate::api::stats::collect_stats;
use crate::app::AppState;
use crate::auth::middleware::MaybeUser;
use crate::db::models::{PostType, PublicComment, PublicSettings};
use crate::db::query::{BlogListQuery, CommentListQuery, ModelListQuery};
use crate::error::AppError;
use crate::gate::safe_callback;
use crate::web::templates::render;

const HOME_FEATURED_MODELS: u64 = 3;
const HOME_LATEST_POSTS: u64 = 5;
const DASHBOARD_LIST_SIZE: u64 = 10;

#[derive(Debug, Serialize)]
struct CommentTarget<'a> {
    post_id: &'a str,
    post_type: PostType,
}

async fn base_context(state: &AppState, viewer: &MaybeUser) -> Result<Context, AppError> {
    let settings = state.settings_repo.get_or_create().await?;
    let mut context = Context::new();
    context.insert("site", &PublicSettings::from(settings));
    context.insert("viewer", &viewer.0);
    Ok(context)
}

async fn not_found_page(
    state: &AppState,
    viewer: &MaybeUser,
    message: &str,
) -> Result<Response, AppError> {
    let mut context = base_context(state, viewer).await?;
    context.insert("message", message);
    let html = render(&state.templates, "not_found.html", &context)?;
    Ok((StatusCode::NOT_FOUND, html).into_response())
}

async fn visible_comments(
    state: &AppState,
    post_id: &str,
    post_type: PostType,
) -> Result<Vec<PublicComment>, AppError> {
    let comments = state.comment_repo.list_visible(post_id, post_type).await?;
    Ok(comments.into_iter().map(PublicComment::from).collect())
}

/// `key=value&` pairs for the non-empty filters, percent-encoded, so pager
/// links can append `page=N`.
fn pager_query(pairs: &[(&str, Option<&str>)]) -> String {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{key}={}&", urlencoding::encode(v)))
        })
        .collect()
}

/// `GET /`
pub async fn home_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> Result<Response, AppError> {
    let featured = state
        .model_repo
        .list(&ModelListQuery {
            featured: Some(true),
            limit: Some(HOME_FEATURED_MODELS),
            ..Default::default()
        })
        .await?;
    let latest = list_blogs(
        state.blog_repo.as_ref(),
        &BlogListQuery {
            limit: Some(HOME_LATEST_POSTS),
            ..Default::default()
        },
        false,
    )
    .await?;

    let mut context = base_context(&state, &viewer).await?;
    context.insert("featured_models", &featured.items);
    context.insert("latest_posts", &latest.items);
    Ok(render(&state.templates, "home.html", &context)?.into_response())
}

/// `GET /blog` — published posts only, whatever the viewer's role.
pub async fn blog_list_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(mut query): Query<BlogListQuery>,
) -> Result<Response, AppError> {
    query.status = None;
    let page = list_blogs(state.blog_repo.as_ref(), &query, false).await?;

    let mut context = base_context(&state, &viewer).await?;
    context.insert("page", &page);
    context.insert(
        "filters",
        &serde_json::json!({
            "search": query.search.clone().unwrap_or_default(),
            "category": query.category.clone().unwrap_or_default(),
            "tag": query.tag.clone().unwrap_or_default(),
        }),
    );
    context.insert(
        "pager_query",
        &pager_query(&[
            ("search", query.search.as_deref()),
            ("category", query.category.as_deref()),
            ("tag", query.tag.as_deref()),
        ]),
    );
    Ok(render(&state.templates, "blog_list.html", &context)?.into_response())
}

/// `GET /blog/{slug}` — staff may preview unpublished posts.
pub async fn blog_post_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let post = match view_blog(state.blog_repo.as_ref(), &slug, viewer.is_staff()).await {
        Ok(post) => post,
        Err(AppError::NotFound(message)) => return not_found_page(&state, &viewer, &message).await,
        Err(e) => return Err(e),
    };
    let comments = visible_comments(&state, &post.id, PostType::Blog).await?;

    let mut context = base_context(&state, &viewer).await?;
    context.insert(
        "comment_target",
        &CommentTarget {
            post_id: &post.id,
            post_type: PostType::Blog,
        },
    );
    context.insert("post", &post);
    context.insert("comments", &comments);
    Ok(render(&state.templates, "blog_post.html", &context)?.into_response())
}

/// `GET /models`
pub async fn model_list_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<ModelListQuery>,
) -> Result<Response, AppError> {
    let page = state.model_repo.list(&query).await?;

    let mut context = base_context(&state, &viewer).await?;
    context.insert("page", &page);
    context.insert(
        "filters",
        &serde_json::json!({
            "search": query.search.clone().unwrap_or_default(),
            "industry": query.industry.clone().unwrap_or_default(),
            "deal_type": query.deal_type.clone().unwrap_or_default(),
        }),
    );
    context.insert(
        "pager_query",
        &pager_query(&[
            ("search", query.search.as_deref()),
            ("industry", query.industry.as_deref()),
            ("deal_type", query.deal_type.as_deref()),
        ]),
    );
    Ok(render(&state.templates, "model_list.html", &context)?.into_response())
}

/// `GET /models/{slug}`
pub async fn model_detail_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let model = match view_model(state.model_repo.as_ref(), &slug).await {
        Ok(model) => model,
        Err(AppError::NotFound(message)) => return not_found_page(&state, &viewer, &message).await,
        Err(e) => return Err(e),
    };
    let comments = visible_comments(&state, &model.id, PostType::Model).await?;

    let mut context = base_context(&state, &viewer).await?;
    context.insert(
        "comment_target",
        &CommentTarget {
            post_id: &model.id,
            post_type: PostType::Model,
        },
    );
    context.insert("model", &model);
    context.insert("comments", &comments);
    Ok(render(&state.templates, "model_detail.html", &context)?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// `GET /admin/login`
pub async fn admin_login_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<LoginPageQuery>,
) -> Result<Response, AppError> {
    let mut context = base_context(&state, &viewer).await?;
    context.insert("callback", &safe_callback(query.callback_url.as_deref()));
    Ok(render(&state.templates, "admin_login.html", &context)?.into_response())
}

/// `GET /admin` — only reachable through the access gate.
pub async fn admin_dashboard_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> Result<Response, AppError> {
    let stats = collect_stats(&state).await?;
    let pending = state
        .comment_repo
        .list(&CommentListQuery {
            approved: Some(false),
            limit: Some(DASHBOARD_LIST_SIZE),
            ..Default::default()
        })
        .await?;
    let recent = list_blogs(
        state.blog_repo.as_ref(),
        &BlogListQuery {
            limit: Some(DASHBOARD_LIST_SIZE),
            ..Default::default()
        },
        true,
    )
    .await?;

    let mut context = base_context(&state, &viewer).await?;
    context.insert("stats", &stats);
    context.insert("pending_comments", &pending.items);
    context.insert("recent_posts", &recent.items);
    Ok(render(&state.templates, "admin_dashboard.html", &context)?.into_response())
}
