use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::{AuthenticatedUser, MaybeUser},
    errors::AppError,
    handlers::thread_handlers::find_thread,
    models::{Reply, ReplyResource},
    repositories::{reply_repository, thread_repository},
    utils::{AppJson, DataResponse},
    AppState,
};

#[derive(Deserialize)]
pub struct CreateReplyPayload {
    content: Option<String>,
    thread_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateReplyPayload {
    content: Option<String>,
}

fn required_content(content: Option<String>) -> Result<String, AppError> {
    match content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(AppError::validation("The content field is required")),
    }
}

async fn find_reply(state: &AppState, reply_id: i64, viewer_id: Option<i64>) -> Result<Reply, AppError> {
    reply_repository::get_reply_by_id(&state.db_pool, reply_id, viewer_id)
        .await?
        .ok_or(AppError::NotFound("Reply"))
}

/// Every reply of the thread, oldest first, each with its creator.
pub async fn list_replies_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((category_slug, thread_slug)): Path<(String, String)>,
) -> Result<Json<DataResponse<Vec<ReplyResource>>>, AppError> {
    let thread = find_thread(&state.db_pool, &category_slug, &thread_slug, viewer.id()).await?;
    let replies = reply_repository::get_replies_by_thread(&state.db_pool, thread.id, viewer.id()).await?;
    Ok(Json(DataResponse::new(
        replies.iter().map(ReplyResource::from).collect(),
    )))
}

pub async fn create_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppJson(payload): AppJson<CreateReplyPayload>,
) -> Result<Json<DataResponse<ReplyResource>>, AppError> {
    // 1. Validate the payload
    let content = required_content(payload.content)?;
    let thread_id = payload
        .thread_id
        .ok_or_else(|| AppError::validation("The thread_id field is required"))?;

    // 2. The thread must exist
    let thread = thread_repository::get_thread_by_id(&state.db_pool, thread_id, Some(user.id))
        .await?
        .ok_or(AppError::NotFound("Thread"))?;

    // 3. Persist with the caller as creator
    let reply = reply_repository::create_reply(&state.db_pool, thread.id, user.id, &content).await?;
    info!(reply_id = reply.id, thread_id = thread.id, user_id = user.id, "Created reply");
    Ok(Json(DataResponse::new(ReplyResource::from(&reply))))
}

pub async fn update_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reply_id): Path<i64>,
    body: Result<AppJson<UpdateReplyPayload>, AppError>,
) -> Result<Json<DataResponse<ReplyResource>>, AppError> {
    let reply = find_reply(&state, reply_id, Some(user.id)).await?;

    if !reply.is_created_by(&user) {
        warn!(reply_id, user_id = user.id, "Unauthorized reply update attempt");
        return Err(AppError::Forbidden);
    }

    let AppJson(payload) = body?;
    let content = required_content(payload.content)?;
    reply_repository::update_reply(&state.db_pool, reply_id, &content).await?;
    let updated = find_reply(&state, reply_id, Some(user.id)).await?;

    info!(reply_id, "Updated reply");
    Ok(Json(DataResponse::new(ReplyResource::from(&updated))))
}

pub async fn delete_reply_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reply_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let reply = find_reply(&state, reply_id, Some(user.id)).await?;

    if !reply.is_created_by(&user) {
        warn!(reply_id, user_id = user.id, "Unauthorized reply delete attempt");
        return Err(AppError::Forbidden);
    }

    reply_repository::delete_reply(&state.db_pool, reply_id).await?;
    info!(reply_id, thread_id = reply.thread_id, "Deleted reply");
    Ok(StatusCode::NO_CONTENT)
}
