use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::{self, AuthenticatedUser},
    errors::{self, AppError},
    models::{AuthPayload, User},
    repositories::user_repository,
    utils::{AppJson, DataResponse},
    AppState,
};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 255;
const EMAIL_TAKEN: &str = "The email has already been taken";

#[derive(Deserialize)]
pub struct RegisterPayload {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    email: Option<String>,
    password: Option<String>,
}

fn required(field: Option<String>, name: &str) -> Result<String, AppError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::validation(format!("The {name} field is required"))),
    }
}

fn issue(state: &AppState, user: User) -> Result<AuthPayload, AppError> {
    let token = state
        .tokens
        .token_by_id(user.id)
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(AuthPayload { user, token })
}

pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterPayload>,
) -> Result<(StatusCode, Json<DataResponse<AuthPayload>>), AppError> {
    // 1. Validate the payload
    let name = required(payload.name, "name")?.trim().to_string();
    let email = required(payload.email, "email")?.trim().to_string();
    let password = required(payload.password, "password")?;

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::validation("The name may not be longer than 255 characters"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("The email must be a valid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation("The password must be at least 8 characters"));
    }

    // 2. Reject taken emails early, before paying for bcrypt
    if user_repository::get_user_by_email(&state.db_pool, &email).await?.is_some() {
        return Err(AppError::conflict(EMAIL_TAKEN));
    }

    // 3. Hash and insert. A concurrent registration can still win the race,
    //    in which case the UNIQUE index answers for us.
    let password_hash = auth::hash_password(password, state.config.bcrypt_cost).await?;
    let user = user_repository::create_user(&state.db_pool, &name, &email, &password_hash)
        .await
        .map_err(|e| {
            if errors::is_unique_violation(&e) {
                warn!("Concurrent registration for the same email");
                AppError::conflict(EMAIL_TAKEN)
            } else {
                AppError::from(e)
            }
        })?;
    info!(user_id = user.id, "Registered user");

    Ok((StatusCode::CREATED, Json(DataResponse::new(issue(&state, user)?))))
}

pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginPayload>,
) -> Result<Json<DataResponse<AuthPayload>>, AppError> {
    let email = required(payload.email, "email")?;
    let password = required(payload.password, "password")?;

    let Some(user) = user_repository::get_user_by_email(&state.db_pool, email.trim()).await? else {
        warn!("Login attempt for unknown email");
        return Err(AppError::Unauthenticated);
    };
    if !auth::verify_password(password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "Login attempt with wrong password");
        return Err(AppError::Unauthenticated);
    }

    info!(user_id = user.id, "User logged in");
    Ok(Json(DataResponse::new(issue(&state, user)?)))
}

pub async fn current_user_handler(
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<DataResponse<User>> {
    Json(DataResponse::new(user))
}
