use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::login::validate_name;
use crate::auth::middleware::StaffUser;
use crate::content::html::strip_tags;
use crate::content::spam::find_banned_keyword;
use crate::db::blog_repository::BlogRepository;
use crate::db::comment_repository::CommentRepository;
use crate::db::model_repository::ModelRepository;
use crate::db::models::{new_id, validate_email, Comment, CommentInput, PostType, PublicComment};
use crate::db::query::{CommentListQuery, Page};
use crate::error::AppError;
use crate::rate_limit::client_identifier;

pub const MAX_COMMENT_LEN: usize = 2000;

fn not_found() -> AppError {
    AppError::NotFound("Comment not found".into())
}

#[derive(Debug, Deserialize)]
pub struct CommentThreadQuery {
    pub post_id: String,
    pub post_type: PostType,
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub approved: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitCommentResponse {
    pub message: String,
    pub approved: bool,
    pub comment: PublicComment,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub likes: i64,
}

/// Validate a submission and decide its moderation state.
///
/// Markup is stripped from the body. A banned keyword in the name or body
/// holds the comment for moderation, as does `require_approval`.
pub fn prepare_comment(input: CommentInput, require_approval: bool) -> Result<Comment, AppError> {
    let name = validate_name(&input.name)?;
    let email = validate_email(&input.email)?;

    let content = strip_tags(&input.content).trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::BadRequest(format!(
            "Comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    if input.post_id.trim().is_empty() {
        return Err(AppError::BadRequest("post_id is required".into()));
    }

    let flagged = find_banned_keyword(&content).or_else(|| find_banned_keyword(&name));
    if let Some(keyword) = flagged {
        tracing::warn!(keyword, post_id = %input.post_id, "Comment held as spam");
    }

    Ok(Comment {
        id: new_id(),
        name,
        email,
        content,
        post_id: input.post_id.trim().to_string(),
        post_type: input.post_type,
        approved: flagged.is_none() && !require_approval,
        likes: 0,
        parent_id: input.parent_id.filter(|id| !id.trim().is_empty()),
        created_at: Utc::now(),
    })
}

/// Comments may only be attached to published posts and existing models.
pub async fn ensure_target_exists(
    blogs: &dyn BlogRepository,
    models: &dyn ModelRepository,
    post_type: PostType,
    post_id: &str,
) -> Result<(), AppError> {
    let exists = match post_type {
        PostType::Blog => blogs
            .find_by_id(post_id)
            .await?
            .is_some_and(|post| post.published),
        PostType::Model => models.find_by_id(post_id).await?.is_some(),
    };
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("{} not found", post_type.as_str())))
    }
}

pub async fn submit_comment(
    comments: &dyn CommentRepository,
    blogs: &dyn BlogRepository,
    models: &dyn ModelRepository,
    input: CommentInput,
    require_approval: bool,
) -> Result<Comment, AppError> {
    let comment = prepare_comment(input, require_approval)?;
    ensure_target_exists(blogs, models, comment.post_type, &comment.post_id).await?;

    if let Some(parent_id) = &comment.parent_id {
        let parent = comments.find_by_id(parent_id).await?;
        let same_thread = parent.is_some_and(|p| {
            p.post_id == comment.post_id && p.post_type == comment.post_type
        });
        if !same_thread {
            return Err(AppError::BadRequest("Invalid parent comment".into()));
        }
    }

    comments.insert(&comment).await?;
    tracing::info!(
        id = %comment.id,
        post_id = %comment.post_id,
        approved = comment.approved,
        "Comment submitted"
    );
    Ok(comment)
}

/// `GET /api/comments?post_id=..&post_type=..` — approved comments only.
pub async fn list_comments_handler(
    State(state): State<AppState>,
    Query(query): Query<CommentThreadQuery>,
) -> Result<Json<Vec<PublicComment>>, AppError> {
    let comments = state
        .comment_repo
        .list_visible(&query.post_id, query.post_type)
        .await?;
    Ok(Json(comments.into_iter().map(PublicComment::from).collect()))
}

/// `POST /api/comments` — rate limited per client.
pub async fn submit_comment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CommentInput>,
) -> Result<(StatusCode, Json<SubmitCommentResponse>), AppError> {
    let client = client_identifier(&headers);
    if !state.comment_limiter.check(&client, state.comment_limit) {
        tracing::warn!(%client, "Comment rate limit exceeded");
        return Err(AppError::RateLimited(
            "Too many comments. Please try again later.".into(),
        ));
    }

    let settings = state.settings_repo.get_or_create().await?;
    let comment = submit_comment(
        state.comment_repo.as_ref(),
        state.blog_repo.as_ref(),
        state.model_repo.as_ref(),
        input,
        settings.security.require_comment_approval,
    )
    .await?;

    let approved = comment.approved;
    let message = if approved {
        "Comment posted"
    } else {
        "Comment submitted and awaiting moderation"
    };
    Ok((
        StatusCode::CREATED,
        Json(SubmitCommentResponse {
            message: message.to_string(),
            approved,
            comment: PublicComment::from(comment),
        }),
    ))
}

/// `POST /api/comments/{id}/like`
pub async fn like_comment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    let likes = state
        .comment_repo
        .increment_likes(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(LikeResponse { likes }))
}

/// `GET /api/admin/comments`
pub async fn admin_list_comments_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(query): Query<CommentListQuery>,
) -> Result<Json<Page<Comment>>, AppError> {
    Ok(Json(state.comment_repo.list(&query).await?))
}

/// `PATCH /api/admin/comments/{id}`
pub async fn moderate_comment_handler(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<String>,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .comment_repo
        .set_approved(&id, request.approved)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(id = %id, approved = request.approved, by = %staff.email, "Comment moderated");
    Ok(Json(comment))
}

/// `DELETE /api/admin/comments/{id}`
pub async fn delete_comment_handler(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.comment_repo.delete(&id).await? {
        return Err(not_found());
    }
    tracing::info!(id = %id, by = %staff.email, "Comment deleted");
    Ok(Json(serde_json::json!({ "message": "Comment deleted" })))
}
