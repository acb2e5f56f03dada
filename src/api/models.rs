use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::api::blogs::validate_title;
use crate::app::AppState;
use crate::auth::middleware::StaffUser;
use crate::content::slug::resolve_slug;
use crate::db::model_repository::ModelRepository;
use crate::db::models::{new_id, DealModel, DealModelInput, Slide};
use crate::db::query::{ModelListQuery, Page};
use crate::error::AppError;

fn not_found() -> AppError {
    AppError::NotFound("Model not found".into())
}

fn clean_slides(slides: Vec<Slide>) -> Result<Vec<Slide>, AppError> {
    slides
        .into_iter()
        .map(|mut slide| {
            slide.title = slide.title.trim().to_string();
            if slide.title.is_empty() {
                return Err(AppError::BadRequest("Every slide needs a title".into()));
            }
            slide.image_url = slide.image_url.filter(|url| !url.trim().is_empty());
            Ok(slide)
        })
        .collect()
}

fn apply_input(model: &mut DealModel, input: DealModelInput) -> Result<(), AppError> {
    model.title = validate_title(&input.title)?;
    model.description = input.description.trim().to_string();
    model.deal_size = input.deal_size.trim().to_string();
    model.industry = input.industry.trim().to_string();
    model.deal_type = input.deal_type.trim().to_string();
    model.completion_date = input.completion_date;
    model.slides = clean_slides(input.slides)?;
    model.key_metrics = input
        .key_metrics
        .into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect();
    model.featured = input.featured;
    Ok(())
}

pub async fn view_model(repo: &dyn ModelRepository, slug: &str) -> Result<DealModel, AppError> {
    let mut model = repo.find_by_slug(slug).await?.ok_or_else(not_found)?;
    repo.increment_views(&model.id).await?;
    model.views += 1;
    Ok(model)
}

pub async fn create_model(
    repo: &dyn ModelRepository,
    input: DealModelInput,
) -> Result<DealModel, AppError> {
    let now = Utc::now();
    let slug = input.slug.clone();
    let mut model = DealModel {
        id: new_id(),
        title: String::new(),
        slug: String::new(),
        description: String::new(),
        deal_size: String::new(),
        industry: String::new(),
        deal_type: String::new(),
        completion_date: None,
        slides: Vec::new(),
        key_metrics: Default::default(),
        featured: false,
        views: 0,
        created_at: now,
        updated_at: now,
    };
    apply_input(&mut model, input)?;
    model.slug = resolve_slug(slug.as_deref(), &model.title);
    model.prepare_for_save(now);

    repo.insert(&model).await?;
    tracing::info!(slug = %model.slug, "Model created");
    Ok(model)
}

pub async fn update_model(
    repo: &dyn ModelRepository,
    id: &str,
    input: DealModelInput,
) -> Result<DealModel, AppError> {
    let mut model = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    let slug = input.slug.clone();
    apply_input(&mut model, input)?;
    if let Some(slug) = slug.as_deref().filter(|s| !s.trim().is_empty()) {
        model.slug = resolve_slug(Some(slug), &model.title);
    }
    model.prepare_for_save(Utc::now());

    if !repo.replace(&model).await? {
        return Err(not_found());
    }
    tracing::info!(slug = %model.slug, "Model updated");
    Ok(model)
}

pub async fn delete_model(repo: &dyn ModelRepository, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(id, "Model deleted");
    Ok(())
}

/// `GET /api/models`
pub async fn list_models_handler(
    State(state): State<AppState>,
    Query(query): Query<ModelListQuery>,
) -> Result<Json<Page<DealModel>>, AppError> {
    Ok(Json(state.model_repo.list(&query).await?))
}

/// `GET /api/models/{slug}`
pub async fn get_model_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DealModel>, AppError> {
    Ok(Json(view_model(state.model_repo.as_ref(), &slug).await?))
}

/// `GET /api/admin/models`
pub async fn admin_list_models_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(query): Query<ModelListQuery>,
) -> Result<Json<Page<DealModel>>, AppError> {
    Ok(Json(state.model_repo.list(&query).await?))
}

/// `GET /api/admin/models/{id}`
pub async fn admin_get_model_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<DealModel>, AppError> {
    let model = state
        .model_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(model))
}

/// `POST /api/admin/models`
pub async fn admin_create_model_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(input): Json<DealModelInput>,
) -> Result<(StatusCode, Json<DealModel>), AppError> {
    let model = create_model(state.model_repo.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

/// `PUT /api/admin/models/{id}`
pub async fn admin_update_model_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
    Json(input): Json<DealModelInput>,
) -> Result<Json<DealModel>, AppError> {
    Ok(Json(update_model(state.model_repo.as_ref(), &id, input).await?))
}

/// `DELETE /api/admin/models/{id}`
pub async fn admin_delete_model_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    delete_model(state.model_repo.as_ref(), &id).await?;
    Ok(Json(serde_json::json!({ "message": "Model deleted" })))
}
