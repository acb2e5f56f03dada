use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::middleware::CurrentUser;
use crate::auth::models::Role;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::auth::session::SessionKeys;
use crate::db::models::{new_id, normalize_email, validate_email, User, UserProfile};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::rate_limit::{client_identifier, RateLimiter};

pub const MAX_NAME_LEN: usize = 100;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-service registration body. New accounts always get the `user` role.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Trim and bound a display name.
pub fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Check credentials against the stored argon2 hash.
///
/// Unknown email and wrong password produce the same error.
pub async fn authenticate(
    repo: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let invalid = || AppError::Auth("Invalid email or password".into());

    let user = repo
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash) {
        return Err(invalid());
    }
    Ok(user)
}

/// Throttled login: at most `max_attempts` tries per client and account
/// within the limiter window.
pub async fn process_login(
    repo: &dyn UserRepository,
    limiter: &RateLimiter,
    max_attempts: usize,
    client: &str,
    request: &LoginRequest,
) -> Result<User, AppError> {
    let key = format!("{client}:{}", normalize_email(&request.email));
    if !limiter.check(&key, max_attempts) {
        tracing::warn!(client, "Login attempts exceeded");
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".into(),
        ));
    }

    match authenticate(repo, &request.email, &request.password).await {
        Ok(user) => {
            tracing::info!(user = %user.email, "User logged in");
            Ok(user)
        }
        Err(e) => {
            tracing::warn!(client, "Failed login attempt");
            Err(e)
        }
    }
}

/// Create a `user`-role account.
pub async fn register_user(
    repo: &dyn UserRepository,
    request: RegisterRequest,
) -> Result<User, AppError> {
    let name = validate_name(&request.name)?;
    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;

    let now = Utc::now();
    let user = User {
        id: new_id(),
        name,
        email,
        password_hash: hash_password(&request.password)?,
        role: Role::User,
        bookmarks: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    repo.insert(&user).await?;

    tracing::info!(user = %user.email, "User registered");
    Ok(user)
}

/// `POST /api/auth/login` — Verifies credentials and sets the session cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let settings = state.settings_repo.get_or_create().await?;
    let max_attempts = usize::try_from(settings.security.max_login_attempts)
        .unwrap_or(1)
        .max(1);

    let user = process_login(
        state.user_repo.as_ref(),
        &state.login_limiter,
        max_attempts,
        &client_identifier(&headers),
        &request,
    )
    .await?;

    let jar = start_session(&state.session_keys, jar, &user)?;

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: UserProfile::from(user),
        }),
    ))
}

fn start_session(keys: &SessionKeys, jar: CookieJar, user: &User) -> Result<CookieJar, AppError> {
    let token = keys.issue(&keys.claims_for(user))?;
    Ok(jar.add(keys.session_cookie(token)))
}

/// `POST /api/auth/logout` — Clears the session cookie.
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.remove(SessionKeys::removal_cookie()),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

/// `GET /api/auth/me` — Profile of the signed-in user, read fresh from the
/// database.
pub async fn me_handler(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .user_repo
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Auth("Session user no longer exists".into()))?;
    Ok(Json(UserProfile::from(user)))
}

/// `POST /api/auth/register`
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let user = register_user(state.user_repo.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{user_with_password, InMemoryUsers};
    use std::time::Duration;

    fn request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_authenticate_success_is_case_insensitive() {
        let repo = InMemoryUsers::default();
        repo.insert(&user_with_password("ada@example.com", "correct-horse", Role::Admin))
            .await
            .unwrap();

        let user = authenticate(&repo, "ADA@example.com ", "correct-horse")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_and_unknown_user() {
        let repo = InMemoryUsers::default();
        repo.insert(&user_with_password("ada@example.com", "correct-horse", Role::User))
            .await
            .unwrap();

        let wrong = authenticate(&repo, "ada@example.com", "nope").await;
        let unknown = authenticate(&repo, "bob@example.com", "correct-horse").await;
        match (wrong, unknown) {
            (Err(AppError::Auth(a)), Err(AppError::Auth(b))) => assert_eq!(a, b),
            other => panic!("Expected two Auth errors, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_throttled_after_max_attempts() {
        let repo = InMemoryUsers::default();
        repo.insert(&user_with_password("ada@example.com", "correct-horse", Role::User))
            .await
            .unwrap();
        let limiter = RateLimiter::new(Duration::from_secs(60), 100);

        for _ in 0..3 {
            let result =
                process_login(&repo, &limiter, 3, "10.0.0.1", &request("ada@example.com", "bad"))
                    .await;
            assert!(matches!(result, Err(AppError::Auth(_))));
        }

        let result = process_login(
            &repo,
            &limiter,
            3,
            "10.0.0.1",
            &request("ada@example.com", "correct-horse"),
        )
        .await;
        assert!(matches!(result, Err(AppError::RateLimited(_))));

        // Another client is unaffected.
        let result = process_login(
            &repo,
            &limiter,
            3,
            "10.0.0.2",
            &request("ada@example.com", "correct-horse"),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_successful_logins_count_towards_the_limit() {
        let repo = InMemoryUsers::default();
        repo.insert(&user_with_password("ada@example.com", "correct-horse", Role::User))
            .await
            .unwrap();
        let limiter = RateLimiter::new(Duration::from_secs(60), 100);
        let good = request("ada@example.com", "correct-horse");

        for _ in 0..2 {
            assert!(process_login(&repo, &limiter, 2, "10.0.0.1", &good).await.is_ok());
        }
        let result = process_login(&repo, &limiter, 2, "10.0.0.1", &good).await;
        assert!(matches!(result, Err(AppError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_register_user() {
        let repo = InMemoryUsers::default();
        let user = register_user(
            &repo,
            RegisterRequest {
                name: "  Grace ".to_string(),
                email: "Grace@Example.com".to_string(),
                password: "long-enough".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(user.name, "Grace");
        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.password_hash.starts_with("$argon2"));
        assert!(verify_password("long-enough", &user.password_hash));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let repo = InMemoryUsers::default();
        let make = || RegisterRequest {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password: "long-enough".to_string(),
        };
        register_user(&repo, make()).await.unwrap();

        match register_user(&repo, make()).await {
            Err(AppError::Duplicate(msg)) => assert!(msg.contains("already exists")),
            other => panic!("Expected Duplicate error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_validation() {
        let repo = InMemoryUsers::default();
        let short = register_user(
            &repo,
            RegisterRequest {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                password: "short".to_string(),
            },
        )
        .await;
        assert!(matches!(short, Err(AppError::BadRequest(_))));

        let nameless = register_user(
            &repo,
            RegisterRequest {
                name: "   ".to_string(),
                email: "grace@example.com".to_string(),
                password: "long-enough".to_string(),
            },
        )
        .await;
        assert!(matches!(nameless, Err(AppError::BadRequest(_))));
    }
}
