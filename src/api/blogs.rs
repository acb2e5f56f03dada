use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::app::AppState;
use crate::auth::middleware::{MaybeUser, StaffUser};
use crate::auth::models::SessionClaims;
use crate::content::slug::resolve_slug;
use crate::db::blog_repository::BlogRepository;
use crate::db::models::{new_id, BlogPost, BlogPostInput};
use crate::db::query::{BlogListQuery, Page};
use crate::error::AppError;

pub const MAX_TITLE_LEN: usize = 200;

fn not_found() -> AppError {
    AppError::NotFound("Blog post not found".into())
}

pub(crate) fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Paginated listing. Non-staff callers only ever see published posts.
pub async fn list_blogs(
    repo: &dyn BlogRepository,
    query: &BlogListQuery,
    staff: bool,
) -> Result<Page<BlogPost>, AppError> {
    repo.list(query, staff).await
}

/// Fetch a post for reading and count the view.
///
/// Unpublished posts are reported as missing to non-staff callers.
pub async fn view_blog(
    repo: &dyn BlogRepository,
    slug: &str,
    staff: bool,
) -> Result<BlogPost, AppError> {
    let mut post = repo.find_by_slug(slug).await?.ok_or_else(not_found)?;
    if !post.published && !staff {
        return Err(not_found());
    }

    repo.increment_views(&post.id).await?;
    post.views += 1;
    Ok(post)
}

pub async fn create_blog(
    repo: &dyn BlogRepository,
    input: BlogPostInput,
    author: &SessionClaims,
) -> Result<BlogPost, AppError> {
    let title = validate_title(&input.title)?;
    if input.content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is required".into()));
    }

    let now = Utc::now();
    let mut post = BlogPost {
        id: new_id(),
        slug: resolve_slug(input.slug.as_deref(), &title),
        title,
        excerpt: input.excerpt.trim().to_string(),
        content: input.content,
        status: input.status.unwrap_or_default(),
        author: author.sub.clone(),
        author_name: author.name.clone(),
        tags: normalize_tags(input.tags),
        category: input.category.trim().to_string(),
        featured_image: input.featured_image.filter(|url| !url.trim().is_empty()),
        published: false,
        published_at: None,
        views: 0,
        read_time: 0,
        created_at: now,
        updated_at: now,
    };
    post.prepare_for_save(now);

    repo.insert(&post).await?;
    tracing::info!(slug = %post.slug, author = %author.email, "Blog post created");
    Ok(post)
}

/// Apply `input` over the stored post. The slug is only changed when the
/// input carries one; the status is kept when omitted.
pub async fn update_blog(
    repo: &dyn BlogRepository,
    id: &str,
    input: BlogPostInput,
) -> Result<BlogPost, AppError> {
    let mut post = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    post.title = validate_title(&input.title)?;
    if input.content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is required".into()));
    }
    if let Some(slug) = input.slug.as_deref().filter(|s| !s.trim().is_empty()) {
        post.slug = resolve_slug(Some(slug), &post.title);
    }
    post.excerpt = input.excerpt.trim().to_string();
    post.content = input.content;
    if let Some(status) = input.status {
        post.status = status;
    }
    post.tags = normalize_tags(input.tags);
    post.category = input.category.trim().to_string();
    post.featured_image = input.featured_image.filter(|url| !url.trim().is_empty());
    post.prepare_for_save(Utc::now());

    if !repo.replace(&post).await? {
        return Err(not_found());
    }
    tracing::info!(slug = %post.slug, "Blog post updated");
    Ok(post)
}

pub async fn delete_blog(repo: &dyn BlogRepository, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(id, "Blog post deleted");
    Ok(())
}

/// `GET /api/blogs`
pub async fn list_blogs_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<Page<BlogPost>>, AppError> {
    let page = list_blogs(state.blog_repo.as_ref(), &query, viewer.is_staff()).await?;
    Ok(Json(page))
}

/// `GET /api/blogs/{slug}`
pub async fn get_blog_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, AppError> {
    let post = view_blog(state.blog_repo.as_ref(), &slug, viewer.is_staff()).await?;
    Ok(Json(post))
}

/// `GET /api/admin/blogs` — every post, drafts included.
pub async fn admin_list_blogs_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<Page<BlogPost>>, AppError> {
    let page = list_blogs(state.blog_repo.as_ref(), &query, true).await?;
    Ok(Json(page))
}

/// `GET /api/admin/blogs/{id}`
pub async fn admin_get_blog_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, AppError> {
    let post = state
        .blog_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(post))
}

/// `POST /api/admin/blogs`
pub async fn admin_create_blog_handler(
    State(state): State<AppState>,
    StaffUser(author): StaffUser,
    Json(input): Json<BlogPostInput>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    let post = create_blog(state.blog_repo.as_ref(), input, &author).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// `PUT /api/admin/blogs/{id}`
pub async fn admin_update_blog_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
    Json(input): Json<BlogPostInput>,
) -> Result<Json<BlogPost>, AppError> {
    let post = update_blog(state.blog_repo.as_ref(), &id, input).await?;
    Ok(Json(post))
}

/// `DELETE /api/admin/blogs/{id}`
pub async fn admin_delete_blog_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_blog(state.blog_repo.as_ref(), &id).await?;
    Ok(Json(serde_json::json!({ "message": "Blog post deleted" })))
}
