//! Best-reply designation. Only the thread's creator may move the pointer,
//! and it may only point at one of the thread's own replies.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    handlers::thread_handlers::find_thread,
    models::ThreadResource,
    repositories::{reply_repository, thread_repository},
    utils::{AppJson, DataResponse},
    AppState,
};

#[derive(Deserialize)]
pub struct BestReplyPayload {
    reply_id: Option<i64>,
}

pub async fn mark_best_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
    body: Result<AppJson<BestReplyPayload>, AppError>,
) -> Result<Json<DataResponse<ThreadResource>>, AppError> {
    // 1. Resolve the thread from the path
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, Some(user.id)).await?;

    // 2. Only its creator may pick the best reply, whatever the body says
    if !thread.is_created_by(&user) {
        warn!(thread_id = thread.id, user_id = user.id, "Unauthorized best reply attempt");
        return Err(AppError::Forbidden);
    }

    // 3. The reply must exist and belong to this thread
    let AppJson(payload) = body?;
    let reply_id = payload
        .reply_id
        .ok_or_else(|| AppError::validation("The reply_id field is required"))?;
    let reply = reply_repository::get_reply_by_id(&state.db_pool, reply_id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Reply"))?;
    if reply.thread_id != thread.id {
        return Err(AppError::validation("The reply does not belong to this thread"));
    }

    // 4. Overwrite whatever was marked before
    thread_repository::set_best_reply(&state.db_pool, thread.id, Some(reply.id)).await?;
    let updated = thread_repository::get_thread_by_id(&state.db_pool, thread.id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Thread"))?;

    info!(thread_id = thread.id, reply_id = reply.id, "Marked best reply");
    Ok(Json(DataResponse::new(ThreadResource::from(&updated))))
}

/// Clears the best reply. A `{reply_id}` body is accepted and ignored.
pub async fn unmark_best_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
) -> Result<Json<DataResponse<ThreadResource>>, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, Some(user.id)).await?;

    if !thread.is_created_by(&user) {
        warn!(thread_id = thread.id, user_id = user.id, "Unauthorized best reply removal attempt");
        return Err(AppError::Forbidden);
    }

    thread_repository::set_best_reply(&state.db_pool, thread.id, None).await?;
    let updated = thread_repository::get_thread_by_id(&state.db_pool, thread.id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Thread"))?;

    info!(thread_id = thread.id, "Cleared best reply");
    Ok(Json(DataResponse::new(ThreadResource::from(&updated))))
}
