use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::middleware::AdminUser;
use crate::db::models::{PublicSettings, Settings};
use crate::db::settings_repository::SettingsRepository;
use crate::error::AppError;

/// Reject values that would break login throttling or mail delivery.
pub fn validate_settings(settings: &Settings) -> Result<(), AppError> {
    if settings.site_name.trim().is_empty() {
        return Err(AppError::BadRequest("Site name is required".into()));
    }
    if !(1..=65535).contains(&settings.smtp.port) {
        return Err(AppError::BadRequest("SMTP port must be between 1 and 65535".into()));
    }
    if settings.security.max_login_attempts < 1 {
        return Err(AppError::BadRequest(
            "max_login_attempts must be at least 1".into(),
        ));
    }
    Ok(())
}

pub async fn update_settings(
    repo: &dyn SettingsRepository,
    mut settings: Settings,
) -> Result<Settings, AppError> {
    validate_settings(&settings)?;
    settings.site_name = settings.site_name.trim().to_string();
    let saved = repo.update(settings).await?;
    tracing::info!("Site settings updated");
    Ok(saved)
}

/// Overlay a partial JSON body onto the stored settings. Nested sections
/// merge field by field; fields missing from `patch` keep their stored value.
pub fn merge_settings(current: &Settings, patch: Value) -> Result<Settings, AppError> {
    if !patch.is_object() {
        return Err(AppError::BadRequest("Settings must be a JSON object".into()));
    }
    let mut merged =
        serde_json::to_value(current).map_err(|e| AppError::Internal(e.to_string()))?;
    merge_json(&mut merged, patch);
    serde_json::from_value(merged)
        .map_err(|e| AppError::BadRequest(format!("Invalid settings: {e}")))
}

fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_json(existing, value)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// `GET /api/settings` — public subset, no SMTP or security knobs.
pub async fn public_settings_handler(
    State(state): State<AppState>,
) -> Result<Json<PublicSettings>, AppError> {
    let settings = state.settings_repo.get_or_create().await?;
    Ok(Json(PublicSettings::from(settings)))
}

/// `GET /api/admin/settings`
pub async fn admin_get_settings_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.settings_repo.get_or_create().await?))
}

/// `PUT /api/admin/settings` — accepts a partial document.
pub async fn admin_update_settings_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(patch): Json<Value>,
) -> Result<Json<Settings>, AppError> {
    let current = state.settings_repo.get_or_create().await?;
    let settings = merge_settings(&current, patch)?;
    Ok(Json(
        update_settings(state.settings_repo.as_ref(), settings).await?,
    ))
}
