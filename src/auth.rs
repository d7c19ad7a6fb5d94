use anyhow::{anyhow, Context};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::{header, request::Parts},
};
use chrono::Utc;
use hmac_sha256::HMAC;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

use crate::{errors::AppError, models::User, repositories::user_repository, AppState};

// --- Tokens ---

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token issued in the future")]
    NotYetValid,

    #[error("Failed to encode token body")]
    Encoding,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenBody {
    user_id: i64,
    issued_at: i64,
}

/// Issues and verifies `base64url(body).base64url(hmac)` API tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Arc<Vec<u8>>,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_seconds: u64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Issues a token bound to `user_id`.
    pub fn token_by_id(&self, user_id: i64) -> Result<String, TokenError> {
        self.token_at(user_id, Utc::now().timestamp())
    }

    fn token_at(&self, user_id: i64, issued_at: i64) -> Result<String, TokenError> {
        let body = serde_json::to_vec(&TokenBody { user_id, issued_at })
            .map_err(|_| TokenError::Encoding)?;
        let mac = HMAC::mac(&body, self.secret.as_slice());
        Ok(format!(
            "{}.{}",
            base64::encode_config(&body, base64::URL_SAFE_NO_PAD),
            base64::encode_config(mac, base64::URL_SAFE_NO_PAD)
        ))
    }

    /// Returns the user id a token was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<i64, TokenError> {
        // 1. Split and decode both halves
        let (body_b64, mac_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let body = base64::decode_config(body_b64, base64::URL_SAFE_NO_PAD)
            .map_err(|_| TokenError::Malformed)?;
        let mac = base64::decode_config(mac_b64, base64::URL_SAFE_NO_PAD)
            .map_err(|_| TokenError::Malformed)?;

        // 2. Check the signature before trusting anything in the body
        let expected = HMAC::mac(&body, self.secret.as_slice());
        if !constant_time_eq::constant_time_eq(&expected, &mac) {
            return Err(TokenError::BadSignature);
        }

        // 3. Enforce the validity window
        let body: TokenBody = serde_json::from_slice(&body).map_err(|_| TokenError::Malformed)?;
        if body.issued_at > now {
            return Err(TokenError::NotYetValid);
        }
        if now - body.issued_at > self.ttl_seconds {
            return Err(TokenError::Expired);
        }
        Ok(body.user_id)
    }
}

/// Resolves a token to its user. Anything unresolvable is a guest (`None`).
pub async fn resolve_token(
    pool: &SqlitePool,
    issuer: &TokenIssuer,
    token: &str,
) -> Result<Option<User>, sqlx::Error> {
    let user_id = match issuer.verify(token) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected API token");
            return Ok(None);
        }
    };
    user_repository::get_user_by_id(pool, user_id).await
}

// --- Passwords ---

pub async fn hash_password(password: String, cost: u32) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task panicked")?
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

pub async fn verify_password(password: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task panicked")?
        .map_err(|e| anyhow!("failed to verify password: {e}"))
}

// --- Extractors ---

#[derive(Debug, Deserialize)]
struct TokenParams {
    token: Option<String>,
}

/// Token from `?token=`, falling back to `Authorization: Bearer`.
fn request_token(parts: &Parts) -> Option<String> {
    let from_query = Query::<TokenParams>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(params)| params.token)
        .filter(|t| !t.is_empty());
    if from_query.is_some() {
        return from_query;
    }
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The current user, or `None` for guests. Never rejects on a bad token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Reuse the result if another extractor already resolved this request
        if let Some(cached) = parts.extensions.get::<MaybeUser>() {
            return Ok(cached.clone());
        }

        // 2. Verify the token and load its user; no token means guest
        let app_state = AppState::from_ref(state);
        let user = match request_token(parts) {
            Some(token) => resolve_token(&app_state.db_pool, &app_state.tokens, &token).await?,
            None => None,
        };

        // 3. Cache for the extractors that run after us
        let resolved = MaybeUser(user);
        parts.extensions.insert(resolved.clone());
        Ok(resolved)
    }
}

/// A resolved user; guests are rejected with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(AuthenticatedUser(user)),
            MaybeUser(None) => {
                tracing::debug!(path = %parts.uri.path(), "Guest attempted an authenticated action");
                Err(AppError::Unauthenticated)
            }
        }
    }
}

/// An authenticated user listed in `FORUM_ADMIN_USER_IDS`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Must be signed in at all (401 otherwise)
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        // 2. Must be on the configured allow-list (403 otherwise)
        let app_state = AppState::from_ref(state);
        if app_state.admin_user_ids.contains(&user.id) {
            Ok(AdminUser(user))
        } else {
            tracing::warn!(user_id = user.id, "Admin access denied");
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 3600)
    }

    #[test]
    fn issued_token_verifies_to_same_user() {
        let issuer = issuer();
        let token = issuer.token_by_id(42).unwrap();
        assert_eq!(issuer.verify(&token), Ok(42));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenIssuer::new("other-secret", 3600).token_by_id(42).unwrap();
        assert_eq!(issuer().verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let issuer = issuer();
        let token = issuer.token_by_id(1).unwrap();
        let (_, mac) = token.split_once('.').unwrap();
        let forged_body = base64::encode_config(
            br#"{"user_id":2,"issued_at":0}"#,
            base64::URL_SAFE_NO_PAD,
        );
        let forged = format!("{forged_body}.{mac}");
        assert_eq!(issuer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn expiry_and_clock_skew() {
        let issuer = issuer();
        let token = issuer.token_at(7, 1_000).unwrap();
        assert_eq!(issuer.verify_at(&token, 1_000 + 3600), Ok(7));
        assert_eq!(issuer.verify_at(&token, 1_000 + 3601), Err(TokenError::Expired));
        assert_eq!(issuer.verify_at(&token, 999), Err(TokenError::NotYetValid));
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = issuer();
        assert_eq!(issuer.verify(""), Err(TokenError::Malformed));
        assert_eq!(issuer.verify("no-dot-here"), Err(TokenError::Malformed));
        assert_eq!(issuer.verify("!!!.???"), Err(TokenError::Malformed));
    }

    #[test]
    fn query_token_wins_over_header() {
        let (parts, _) = axum::http::Request::builder()
            .uri("/api/replies?token=from-query&limit=5")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_token(&parts).as_deref(), Some("from-query"));

        let (parts, _) = axum::http::Request::builder()
            .uri("/api/replies")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_token(&parts).as_deref(), Some("from-header"));

        let (parts, _) = axum::http::Request::builder()
            .uri("/api/replies?token=")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_token(&parts), None);
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse".into(), 4).await.unwrap();
        assert!(verify_password("correct horse".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".into(), hash).await.unwrap());
    }
}
