use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::{
    auth::{AuthenticatedUser, MaybeUser},
    errors::{self, AppError},
    models::{Thread, ThreadResource},
    repositories::{
        category_repository,
        thread_repository::{self, CreateThreadData},
    },
    utils::{self, AppJson, DataResponse, PaginationParams},
    AppState,
};

const MAX_THREAD_TITLE_LENGTH: usize = 255;
// Each lost race means another request took the slug, so a handful is plenty.
const MAX_SLUG_ATTEMPTS: usize = 16;

#[derive(Deserialize)]
pub struct CreateThreadPayload {
    title: Option<String>,
    body: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateThreadPayload {
    title: Option<String>,
    body: Option<String>,
}

/// Loads a thread addressed as `/{category}/{thread}`.
pub(crate) async fn find_thread(
    pool: &SqlitePool,
    category_slug: &str,
    thread_slug: &str,
    viewer_id: Option<i64>,
) -> Result<Thread, AppError> {
    thread_repository::get_thread_by_slugs(pool, category_slug, thread_slug, viewer_id)
        .await?
        .ok_or(AppError::NotFound("Thread"))
}

/// Slug derived from the title, unique across threads and clear of reserved path words.
async fn unique_thread_slug(pool: &SqlitePool, title: &str) -> Result<String, sqlx::Error> {
    let base = match utils::slugify(title) {
        slug if slug.is_empty() => "thread".to_string(),
        slug => slug,
    };
    let mut candidate = base.clone();
    let mut suffix = 2;
    while utils::is_reserved_slug(&candidate)
        || thread_repository::slug_exists(pool, &candidate).await?
    {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.is_empty() {
        return Err(AppError::validation("The title field is required"));
    }
    if title.chars().count() > MAX_THREAD_TITLE_LENGTH {
        return Err(AppError::validation("The title may not be longer than 255 characters"));
    }
    Ok(())
}

pub async fn list_threads_in_category_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(category_slug): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<DataResponse<Vec<ThreadResource>>>, AppError> {
    let category = category_repository::get_category_by_slug(&state.db_pool, &category_slug)
        .await?
        .ok_or(AppError::NotFound("Category"))?;
    let threads = thread_repository::get_threads_by_category(
        &state.db_pool,
        category.id,
        &pagination,
        viewer.id(),
    )
    .await?;
    Ok(Json(DataResponse::new(
        threads.iter().map(ThreadResource::from).collect(),
    )))
}

pub async fn create_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(category_slug): Path<String>,
    AppJson(payload): AppJson<CreateThreadPayload>,
) -> Result<(StatusCode, Json<DataResponse<ThreadResource>>), AppError> {
    // 1. The category must exist before anything is validated against it
    let category = category_repository::get_category_by_slug(&state.db_pool, &category_slug)
        .await?
        .ok_or(AppError::NotFound("Category"))?;

    // 2. Validate the payload
    let title = payload.title.unwrap_or_default().trim().to_string();
    validate_title(&title)?;
    let body = payload.body.unwrap_or_default().trim().to_string();
    if body.is_empty() {
        return Err(AppError::validation("The body field is required"));
    }

    // 3. Allocate a slug and insert. Another request may claim the same slug
    //    between the lookup and the insert; on a UNIQUE violation, look again.
    let mut attempts = 0;
    let thread = loop {
        attempts += 1;
        let slug = unique_thread_slug(&state.db_pool, &title).await?;
        let data = CreateThreadData {
            category_id: category.id,
            user_id: user.id,
            slug: &slug,
            title: &title,
            body: &body,
        };
        match thread_repository::create_thread(&state.db_pool, data).await {
            Ok(thread) => break thread,
            Err(e) if errors::is_unique_violation(&e) && attempts < MAX_SLUG_ATTEMPTS => {
                debug!(slug = %slug, attempts, "Thread slug taken concurrently, retrying");
            }
            Err(e) if errors::is_unique_violation(&e) => {
                warn!(slug = %slug, attempts, "Gave up allocating a thread slug");
                return Err(AppError::conflict("Could not allocate a unique slug for this title"));
            }
            Err(e) => return Err(e.into()),
        }
    };

    info!(thread_id = thread.id, user_id = user.id, slug = %thread.slug, "Created thread");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ThreadResource::from(&thread))),
    ))
}

pub async fn get_thread_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
) -> Result<Json<DataResponse<ThreadResource>>, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, viewer.id()).await?;
    Ok(Json(DataResponse::new(ThreadResource::from(&thread))))
}

pub async fn update_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
    body: Result<AppJson<UpdateThreadPayload>, AppError>,
) -> Result<Json<DataResponse<ThreadResource>>, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, Some(user.id)).await?;

    if !thread.is_created_by(&user) {
        warn!(thread_id = thread.id, user_id = user.id, "Unauthorized thread update attempt");
        return Err(AppError::Forbidden);
    }

    // Body problems only matter once we know the caller may edit this thread
    let AppJson(payload) = body?;

    let title = match payload.title {
        Some(title) => title.trim().to_string(),
        None => thread.title.clone(),
    };
    validate_title(&title)?;
    let body = match payload.body {
        Some(body) if body.trim().is_empty() => {
            return Err(AppError::validation("The body field is required"))
        }
        Some(body) => body.trim().to_string(),
        None => thread.body.clone(),
    };

    thread_repository::update_thread(&state.db_pool, thread.id, &title, &body).await?;
    let updated = thread_repository::get_thread_by_id(&state.db_pool, thread.id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Thread"))?;

    info!(thread_id = thread.id, "Updated thread");
    Ok(Json(DataResponse::new(ThreadResource::from(&updated))))
}

pub async fn delete_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, Some(user.id)).await?;

    if !thread.is_created_by(&user) {
        warn!(thread_id = thread.id, user_id = user.id, "Unauthorized thread delete attempt");
        return Err(AppError::Forbidden);
    }

    thread_repository::delete_thread(&state.db_pool, thread.id).await?;
    info!(thread_id = thread.id, "Deleted thread");
    Ok(StatusCode::NO_CONTENT)
}
