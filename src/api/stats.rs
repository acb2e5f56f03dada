use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::auth::middleware::StaffUser;
use crate::error::AppError;

/// Collection counts shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub blogs: u64,
    pub published_blogs: u64,
    pub models: u64,
    pub users: u64,
    pub comments: u64,
    pub pending_comments: u64,
}

pub async fn collect_stats(state: &AppState) -> Result<Stats, AppError> {
    let ((blogs, published_blogs), models, users, comments, pending_comments) = futures::try_join!(
        state.blog_repo.count(),
        state.model_repo.count(),
        state.user_repo.count(),
        state.comment_repo.count(),
        state.comment_repo.count_pending(),
    )?;

    Ok(Stats {
        blogs,
        published_blogs,
        models,
        users,
        comments,
        pending_comments,
    })
}

/// `GET /api/admin/stats`
pub async fn stats_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
) -> Result<Json<Stats>, AppError> {
    Ok(Json(collect_stats(&state).await?))
}
