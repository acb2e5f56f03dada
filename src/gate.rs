//! Access gate for the server-rendered admin pages.
//!
//! API routes under `/api/admin` are protected by extractors instead; this
//! layer only decides whether a browser may see an `/admin` page.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::auth::models::{Role, SessionClaims};
use crate::auth::session::SessionKeys;

pub const ADMIN_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/admin/login";
pub const CALLBACK_PARAM: &str = "callbackUrl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Redirect to the given login URL (carrying the callback).
    RedirectToLogin(String),
    RedirectHome,
}

/// `true` for `/admin` and anything below it, segment-aware.
pub fn is_gated(path: &str) -> bool {
    let below_admin = path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'));
    let is_login = path == LOGIN_PATH || path == "/admin/login/";
    below_admin && !is_login
}

/// Decide what to do with a request for `path_and_query`.
pub fn evaluate(path_and_query: &str, claims: Option<&SessionClaims>) -> GateDecision {
    let path = path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path);

    if !is_gated(path) {
        return GateDecision::Allow;
    }

    match claims {
        None => GateDecision::RedirectToLogin(login_url(path_and_query)),
        Some(claims) if claims.role == Role::Admin => GateDecision::Allow,
        Some(_) => GateDecision::RedirectHome,
    }
}

pub fn login_url(callback: &str) -> String {
    format!(
        "{LOGIN_PATH}?{CALLBACK_PARAM}={}",
        urlencoding::encode(callback)
    )
}

/// Sanitize a post-login redirect target: only same-site absolute paths are
/// accepted, anything else falls back to the dashboard.
pub fn safe_callback(callback: Option<&str>) -> String {
    match callback {
        Some(target)
            if target.starts_with('/') && !target.starts_with("//") && !target.contains('\\') =>
        {
            target.to_string()
        }
        _ => ADMIN_PREFIX.to_string(),
    }
}

/// Middleware applying [`evaluate`] with the session cookie of the request.
pub async fn access_gate(
    State(keys): State<Arc<SessionKeys>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let claims = keys.claims_from_jar(&jar);

    match evaluate(&path_and_query, claims.as_ref()) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::RedirectToLogin(location) => {
            tracing::debug!(path = %path_and_query, "Unauthenticated admin request");
            Redirect::to(&location).into_response()
        }
        GateDecision::RedirectHome => {
            tracing::warn!(path = %path_and_query, "Non-admin user denied admin page");
            Redirect::to("/").into_response()
        }
    }
}
