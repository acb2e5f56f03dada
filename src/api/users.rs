use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::login::validate_name;
use crate::auth::middleware::{AdminUser, CurrentUser};
use crate::auth::models::{Role, SessionClaims};
use crate::auth::password::{hash_password, validate_password};
use crate::db::model_repository::ModelRepository;
use crate::db::models::{new_id, validate_email, DealModel, User, UserProfile};
use crate::db::query::{Page, Pagination};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

fn not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Partial update; omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct BookmarksResponse {
    pub bookmarks: Vec<String>,
}

pub async fn create_user(
    repo: &dyn UserRepository,
    request: CreateUserRequest,
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
        role: request.role,
        bookmarks: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    repo.insert(&user).await?;

    tracing::info!(user = %user.email, role = %user.role, "User created");
    Ok(user)
}

/// Admins may not change their own role.
pub async fn update_user(
    repo: &dyn UserRepository,
    id: &str,
    request: UpdateUserRequest,
    acting: &SessionClaims,
) -> Result<User, AppError> {
    let mut user = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    if let Some(name) = request.name {
        user.name = validate_name(&name)?;
    }
    if let Some(email) = request.email {
        user.email = validate_email(&email)?;
    }
    if let Some(password) = request.password.filter(|p| !p.is_empty()) {
        validate_password(&password)?;
        user.password_hash = hash_password(&password)?;
    }
    if let Some(role) = request.role {
        if user.id == acting.sub && role != user.role {
            return Err(AppError::BadRequest("You cannot change your own role".into()));
        }
        user.role = role;
    }
    user.updated_at = Utc::now();

    if !repo.replace(&user).await? {
        return Err(not_found());
    }
    tracing::info!(user = %user.email, "User updated");
    Ok(user)
}

pub async fn delete_user(
    repo: &dyn UserRepository,
    id: &str,
    acting: &SessionClaims,
) -> Result<(), AppError> {
    if id == acting.sub {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }
    if !repo.delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(id, "User deleted");
    Ok(())
}

/// Create the admin account, or promote and reset an existing one with the
/// same email.
pub async fn ensure_admin(
    repo: &dyn UserRepository,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let name = validate_name(name)?;
    let email = validate_email(email)?;
    validate_password(password)?;

    match repo.find_by_email(&email).await? {
        Some(mut user) => {
            user.name = name;
            user.role = Role::Admin;
            user.password_hash = hash_password(password)?;
            user.updated_at = Utc::now();
            repo.replace(&user).await?;
            tracing::info!(user = %user.email, "Existing user promoted to admin");
            Ok(user)
        }
        None => {
            create_user(
                repo,
                CreateUserRequest {
                    name,
                    email,
                    password: password.to_string(),
                    role: Role::Admin,
                },
            )
            .await
        }
    }
}

/// Bookmarked models that still exist, in bookmark order.
pub async fn list_bookmarks(
    users: &dyn UserRepository,
    models: &dyn ModelRepository,
    user_id: &str,
) -> Result<Vec<DealModel>, AppError> {
    let user = users.find_by_id(user_id).await?.ok_or_else(not_found)?;
    let mut out = Vec::with_capacity(user.bookmarks.len());
    for model_id in &user.bookmarks {
        if let Some(model) = models.find_by_id(model_id).await? {
            out.push(model);
        }
    }
    Ok(out)
}

pub async fn add_bookmark(
    users: &dyn UserRepository,
    models: &dyn ModelRepository,
    user_id: &str,
    model_id: &str,
) -> Result<Vec<String>, AppError> {
    if models.find_by_id(model_id).await?.is_none() {
        return Err(AppError::NotFound("Model not found".into()));
    }
    let user = users
        .add_bookmark(user_id, model_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(user.bookmarks)
}

pub async fn remove_bookmark(
    users: &dyn UserRepository,
    user_id: &str,
    model_id: &str,
) -> Result<Vec<String>, AppError> {
    let user = users
        .remove_bookmark(user_id, model_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(user.bookmarks)
}

/// `GET /api/admin/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserProfile>>, AppError> {
    let page = state
        .user_repo
        .list(Pagination::new(query.page, query.limit))
        .await?;
    Ok(Json(page.map(UserProfile::from)))
}

/// `POST /api/admin/users`
pub async fn create_user_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let user = create_user(state.user_repo.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

/// `PUT /api/admin/users/{id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    AdminUser(acting): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let user = update_user(state.user_repo.as_ref(), &id, request, &acting).await?;
    Ok(Json(UserProfile::from(user)))
}

/// `DELETE /api/admin/users/{id}`
pub async fn delete_user_handler(
    State(state): State<AppState>,
    AdminUser(acting): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_user(state.user_repo.as_ref(), &id, &acting).await?;
    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}

/// `GET /api/bookmarks`
pub async fn list_bookmarks_handler(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<Vec<DealModel>>, AppError> {
    let models = list_bookmarks(
        state.user_repo.as_ref(),
        state.model_repo.as_ref(),
        &claims.sub,
    )
    .await?;
    Ok(Json(models))
}

/// `POST /api/bookmarks/{model_id}`
pub async fn add_bookmark_handler(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(model_id): Path<String>,
) -> Result<Json<BookmarksResponse>, AppError> {
    let bookmarks = add_bookmark(
        state.user_repo.as_ref(),
        state.model_repo.as_ref(),
        &claims.sub,
        &model_id,
    )
    .await?;
    Ok(Json(BookmarksResponse { bookmarks }))
}

/// `DELETE /api/bookmarks/{model_id}`
pub async fn remove_bookmark_handler(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(model_id): Path<String>,
) -> Result<Json<BookmarksResponse>, AppError> {
    let bookmarks = remove_bookmark(state.user_repo.as_ref(), &claims.sub, &model_id).await?;
    Ok(Json(BookmarksResponse { bookmarks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::create_model;
    use crate::auth::password::verify_password;
    use crate::db::models::DealModelInput;
    use crate::test_helpers::{claims, InMemoryModels, InMemoryUsers};
    use chrono::Duration;

    fn request(email: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            name: "Someone".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            role,
        }
    }

    fn acting(user: &User) -> SessionClaims {
        claims(&user.id, &user.email, user.role, Duration::hours(1))
    }

    #[tokio::test]
    async fn test_create_user_json_has_no_password() {
        let repo = InMemoryUsers::default();
        let user = create_user(&repo, request("ed@example.com", Role::Editor))
            .await
            .unwrap();
        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "editor");
    }

    #[tokio::test]
    async fn test_update_user_fields() {
        let repo = InMemoryUsers::default();
        let admin = create_user(&repo, request("root@example.com", Role::Admin))
            .await
            .unwrap();
        let user = create_user(&repo, request("jo@example.com", Role::User))
            .await
            .unwrap();

        let updated = update_user(
            &repo,
            &user.id,
            UpdateUserRequest {
                role: Some(Role::Editor),
                password: Some("new-password".to_string()),
                ..Default::default()
            },
            &acting(&admin),
        )
        .await
        .unwrap();

        assert_eq!(updated.role, Role::Editor);
        assert_eq!(updated.name, "Someone");
        assert!(verify_password("new-password", &updated.password_hash));
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_or_delete_self() {
        let repo = InMemoryUsers::default();
        let admin = create_user(&repo, request("root@example.com", Role::Admin))
            .await
            .unwrap();

        let demote = update_user(
            &repo,
            &admin.id,
            UpdateUserRequest {
                role: Some(Role::User),
                ..Default::default()
            },
            &acting(&admin),
        )
        .await;
        assert!(matches!(demote, Err(AppError::BadRequest(_))));

        let delete = delete_user(&repo, &admin.id, &acting(&admin)).await;
        assert!(matches!(delete, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_then_promotes() {
        let repo = InMemoryUsers::default();
        let created = ensure_admin(&repo, "Root", "Root@Example.com", "password123")
            .await
            .unwrap();
        assert_eq!(created.role, Role::Admin);
        assert_eq!(created.email, "root@example.com");

        let jo = create_user(&repo, request("jo@example.com", Role::User))
            .await
            .unwrap();
        let promoted = ensure_admin(&repo, "Jo", "jo@example.com", "another-pass")
            .await
            .unwrap();
        assert_eq!(promoted.id, jo.id);
        assert_eq!(promoted.role, Role::Admin);
        assert!(verify_password("another-pass", &promoted.password_hash));
    }

    #[tokio::test]
    async fn test_bookmarks_flow() {
        let users = InMemoryUsers::default();
        let models = InMemoryModels::default();
        let user = create_user(&users, request("jo@example.com", Role::User))
            .await
            .unwrap();
        let model = create_model(
            &models,
            DealModelInput {
                title: "Project Atlas".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let bookmarks = add_bookmark(&users, &models, &user.id, &model.id)
            .await
            .unwrap();
        assert_eq!(bookmarks, vec![model.id.clone()]);

        // Adding twice keeps a single entry.
        let bookmarks = add_bookmark(&users, &models, &user.id, &model.id)
            .await
            .unwrap();
        assert_eq!(bookmarks.len(), 1);

        let listed = list_bookmarks(&users, &models, &user.id).await.unwrap();
        assert_eq!(listed[0].slug, "project-atlas");

        let missing = add_bookmark(&users, &models, &user.id, "no-such-model").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let bookmarks = remove_bookmark(&users, &user.id, &model.id).await.unwrap();
        assert!(bookmarks.is_empty());
    }
}
