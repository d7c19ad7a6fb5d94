// tests/common/helpers.rs
//! Shared helper functions for integration tests

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{self, Request, StatusCode},
    Router,
};
use envconfig::Envconfig;
use forum_api::{
    auth::TokenIssuer,
    config::Config,
    create_router, db,
    models::{Category, Reply, Thread, User},
    repositories::{
        category_repository, reply_repository,
        thread_repository::{self, CreateThreadData},
        user_repository,
    },
    utils::slugify,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub tokens: TokenIssuer,
    // Keeps a file-backed database alive for the lifetime of the app
    _db_dir: Option<TempDir>,
}

pub fn test_config(admin_ids: &[i64], database_url: &str) -> Config {
    let admin_ids = admin_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let env: HashMap<String, String> = [
        ("DATABASE_URL", database_url.to_string()),
        ("FORUM_TOKEN_SECRET", TEST_SECRET.to_string()),
        ("FORUM_BCRYPT_COST", "4".to_string()),
        ("FORUM_ADMIN_USER_IDS", admin_ids),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    Config::init_from_hashmap(&env).expect("test config")
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_admins(&[]).await
    }

    /// Admin ids must be known before the router is built, so callers
    /// typically pass ids of users they create right after (ids start at 1).
    pub async fn with_admins(admin_ids: &[i64]) -> Self {
        let pool = db::connect_in_memory().await.expect("in-memory database");
        Self::build(pool, test_config(admin_ids, "sqlite::memory:"), None).await
    }

    /// Backed by a real database file and the regular multi-connection pool,
    /// so concurrent requests actually race each other.
    pub async fn with_database_file() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}", dir.path().join("forum.db").display());
        let config = test_config(&[], &url);
        let pool = db::connect(&config).await.expect("file database");
        Self::build(pool, config, Some(dir)).await
    }

    async fn build(pool: SqlitePool, config: Config, db_dir: Option<TempDir>) -> Self {
        db::run_migrations(&pool).await.expect("migrations");

        let tokens = TokenIssuer::new(config.token_secret.clone(), config.token_ttl_seconds);
        let router = create_router(pool.clone(), Arc::new(config));

        Self {
            router,
            pool,
            tokens,
            _db_dir: db_dir,
        }
    }

    /// Inserts a user directly and returns it with a valid token.
    pub async fn create_user(&self, name: &str) -> (User, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = user_repository::create_user(&self.pool, name, &email, "not-a-real-hash")
            .await
            .expect("create user");
        let token = self.tokens.token_by_id(user.id).expect("issue token");
        (user, token)
    }

    pub async fn create_category(&self, name: &str) -> Category {
        category_repository::create_category(&self.pool, name, &slugify(name))
            .await
            .expect("create category")
    }

    pub async fn create_thread(&self, category: &Category, creator: &User, title: &str) -> Thread {
        thread_repository::create_thread(
            &self.pool,
            CreateThreadData {
                category_id: category.id,
                user_id: creator.id,
                slug: &slugify(title),
                title,
                body: "Thread body",
            },
        )
        .await
        .expect("create thread")
    }

    pub async fn create_reply(&self, thread: &Thread, creator: &User, content: &str) -> Reply {
        reply_repository::create_reply(&self.pool, thread.id, creator.id, content)
            .await
            .expect("create reply")
    }

    pub async fn reload_thread(&self, thread: &Thread) -> Thread {
        thread_repository::get_thread_by_id(&self.pool, thread.id, None)
            .await
            .expect("query thread")
            .expect("thread exists")
    }

    pub async fn reply_count(&self, thread: &Thread) -> i64 {
        reply_repository::count_replies(&self.pool, thread.id)
            .await
            .expect("count replies")
    }

    /// Sends a request through the router; returns status and parsed JSON
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: http::Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send_request(self.router.clone(), method, uri, body).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(http::Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(http::Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(http::Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(http::Method::DELETE, uri, None).await
    }
}

/// Same as [`TestApp::send`], but owns its router so it can run inside `tokio::spawn`.
pub async fn send_request(
    router: Router,
    method: http::Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// `/api/{category}/{thread}` plus an optional suffix.
pub fn thread_path(thread: &Thread, suffix: &str) -> String {
    format!("/api/{}/{}{}", thread.category_slug, thread.slug, suffix)
}
