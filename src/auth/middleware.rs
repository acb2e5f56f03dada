//! Axum extractors resolving the caller from the session cookie.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::app::AppState;
use crate::auth::models::{Role, SessionClaims};
use crate::error::AppError;

fn session_from_parts(parts: &Parts, state: &AppState) -> Option<SessionClaims> {
    let jar = CookieJar::from_headers(&parts.headers);
    state.session_keys.claims_from_jar(&jar)
}

/// The caller's session, if any. Never rejects.
pub struct MaybeUser(pub Option<SessionClaims>);

impl MaybeUser {
    /// `true` when the caller is an editor or admin.
    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(|claims| claims.role.is_staff())
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_from_parts(parts, state)))
    }
}

/// Any signed-in user. Returns 401 without a valid session.
pub struct CurrentUser(pub SessionClaims);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)
            .map(CurrentUser)
            .ok_or_else(|| AppError::Auth("Authentication required".into()))
    }
}

/// Editor or admin. Returns 401 without a session, 403 for plain users.
pub struct StaffUser(pub SessionClaims);

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;
        if !claims.role.is_staff() {
            tracing::warn!(user = %claims.email, "Staff access denied");
            return Err(AppError::Forbidden("Staff access required".into()));
        }
        Ok(StaffUser(claims))
    }
}

/// Admin only.
pub struct AdminUser(pub SessionClaims);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;
        if !claims.role.has_access(Role::Admin) {
            tracing::warn!(user = %claims.email, "Admin access denied");
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(claims))
    }
}
