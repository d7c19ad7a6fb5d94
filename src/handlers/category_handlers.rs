use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::AdminUser,
    errors::{self, AppError},
    models::Category,
    repositories::category_repository,
    utils::{self, AppJson, DataResponse},
    AppState,
};

const SLUG_TAKEN: &str = "The slug has already been taken";

#[derive(Deserialize)]
pub struct CreateCategoryPayload {
    name: Option<String>,
    slug: Option<String>,
}

pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Category>>>, AppError> {
    let categories = category_repository::get_all_categories(&state.db_pool).await?;
    Ok(Json(DataResponse::new(categories)))
}

pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let category = category_repository::get_category_by_slug(&state.db_pool, &slug)
        .await?
        .ok_or(AppError::NotFound("Category"))?;
    Ok(Json(DataResponse::new(category)))
}

pub async fn create_category_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<CreateCategoryPayload>,
) -> Result<(StatusCode, Json<DataResponse<Category>>), AppError> {
    // Slug defaults to the slugified name
    let name = match payload.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return Err(AppError::validation("The name field is required")),
    };
    let slug = match payload.slug {
        Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
        _ => utils::slugify(&name),
    };

    if !utils::is_valid_slug(&slug) {
        return Err(AppError::validation("The slug may only contain lowercase letters, digits and single hyphens"));
    }
    if utils::is_reserved_slug(&slug) {
        return Err(AppError::validation(format!("The slug '{slug}' is reserved")));
    }
    if category_repository::get_category_by_slug(&state.db_pool, &slug).await?.is_some() {
        warn!(slug = %slug, "Attempted to create duplicate category");
        return Err(AppError::conflict(SLUG_TAKEN));
    }

    // The lookup above is only a fast path; the UNIQUE index is what decides
    let category = category_repository::create_category(&state.db_pool, &name, &slug)
        .await
        .map_err(|e| {
            if errors::is_unique_violation(&e) {
                warn!(slug = %slug, "Category slug taken concurrently");
                AppError::conflict(SLUG_TAKEN)
            } else {
                AppError::from(e)
            }
        })?;
    info!(category_id = category.id, created_by = admin.id, "Created category");
    Ok((StatusCode::CREATED, Json(DataResponse::new(category))))
}
