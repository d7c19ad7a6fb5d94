use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::{collections::HashSet, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod humanize;
pub mod models;
pub mod repositories;
pub mod seeder;
pub mod utils;

use auth::TokenIssuer;
use config::Config;
use handlers::{
    auth_handlers::{current_user_handler, login_handler, register_handler},
    best_reply_handlers::{mark_best_reply_handler, unmark_best_reply_handler},
    category_handlers::{create_category_handler, get_category_handler, list_categories_handler},
    favorite_handlers::{
        favorite_reply_handler, favorite_thread_handler, unfavorite_reply_handler,
        unfavorite_thread_handler,
    },
    reply_handlers::{
        create_reply_handler, delete_reply_handler, list_replies_handler, update_reply_handler,
    },
    thread_handlers::{
        create_thread_handler, delete_thread_handler, get_thread_handler,
        list_threads_in_category_handler, update_thread_handler,
    },
};

/// Shared application state. The current user is never stored here; it is
/// resolved per request by the extractors in [`auth`].
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub tokens: TokenIssuer,
    pub admin_user_ids: Arc<HashSet<i64>>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Arc<Config>) -> Self {
        let tokens = TokenIssuer::new(config.token_secret.clone(), config.token_ttl_seconds);
        let admin_user_ids = Arc::new(config.admin_ids());
        Self {
            db_pool,
            config,
            tokens,
            admin_user_ids,
        }
    }
}

pub fn create_router(db_pool: SqlitePool, config: Arc<Config>) -> Router {
    let max_body_bytes = config.max_body_bytes;
    let app_state = AppState::new(db_pool, config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let api = Router::new()
        // Accounts
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/user", get(current_user_handler))
        // Categories
        .route("/categories", get(list_categories_handler).post(create_category_handler))
        .route("/categories/:category", get(get_category_handler))
        // Replies are addressed by id; static segments win over `:category`
        .route("/replies", post(create_reply_handler))
        .route("/replies/:reply", put(update_reply_handler).delete(delete_reply_handler))
        .route(
            "/replies/:reply/favorites",
            post(favorite_reply_handler).delete(unfavorite_reply_handler),
        )
        // Threads and everything nested under them
        .route(
            "/:category/threads",
            get(list_threads_in_category_handler).post(create_thread_handler),
        )
        .route(
            "/:category/:thread",
            get(get_thread_handler)
                .put(update_thread_handler)
                .delete(delete_thread_handler),
        )
        .route("/:category/:thread/replies", get(list_replies_handler))
        .route(
            "/:category/:thread/best-replies",
            post(mark_best_reply_handler).delete(unmark_best_reply_handler),
        )
        .route(
            "/:category/:thread/favorites",
            post(favorite_thread_handler).delete(unfavorite_thread_handler),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(app_state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
