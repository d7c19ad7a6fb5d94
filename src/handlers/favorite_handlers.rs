use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    handlers::thread_handlers::find_thread,
    models::FavoriteStatus,
    repositories::{favorite_repository, reply_repository},
    utils::DataResponse,
    AppState,
};

pub async fn favorite_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reply_id): Path<i64>,
) -> Result<Json<DataResponse<FavoriteStatus>>, AppError> {
    let reply = reply_repository::get_reply_by_id(&state.db_pool, reply_id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Reply"))?;
    let status = favorite_repository::favorite(&state.db_pool, &reply, user.id).await?;
    debug!(reply_id, user_id = user.id, "Favorited reply");
    Ok(Json(DataResponse::new(status)))
}

pub async fn unfavorite_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reply_id): Path<i64>,
) -> Result<Json<DataResponse<FavoriteStatus>>, AppError> {
    let reply = reply_repository::get_reply_by_id(&state.db_pool, reply_id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Reply"))?;
    let status = favorite_repository::unfavorite(&state.db_pool, &reply, user.id).await?;
    debug!(reply_id, user_id = user.id, "Unfavorited reply");
    Ok(Json(DataResponse::new(status)))
}

pub async fn favorite_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
) -> Result<Json<DataResponse<FavoriteStatus>>, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, Some(user.id)).await?;
    let status = favorite_repository::favorite(&state.db_pool, &thread, user.id).await?;
    debug!(thread_id = thread.id, user_id = user.id, "Favorited thread");
    Ok(Json(DataResponse::new(status)))
}

pub async fn unfavorite_thread_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
) -> Result<Json<DataResponse<FavoriteStatus>>, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, Some(user.id)).await?;
    let status = favorite_repository::unfavorite(&state.db_pool, &thread, user.id).await?;
    debug!(thread_id = thread.id, user_id = user.id, "Unfavorited thread");
    Ok(Json(DataResponse::new(status)))
}
