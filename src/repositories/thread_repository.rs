use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{FavoritableKind, Thread, ThreadRow};
use crate::repositories::favorite_repository;
use crate::utils::PaginationParams;

// ?1 is the viewing user's id (NULL for guests).
const THREAD_SELECT: &str = r#"
    SELECT t.id, t.category_id, c.slug AS category_slug,
           t.user_id, u.name AS creator_name,
           t.slug, t.title, t.body, t.best_reply_id,
           (SELECT COUNT(*) FROM replies r WHERE r.thread_id = t.id) AS replies_count,
           (SELECT COUNT(*) FROM favorites f
              WHERE f.favoritable_type = 'thread' AND f.favoritable_id = t.id) AS favorites_count,
           EXISTS (SELECT 1 FROM favorites f
              WHERE f.favoritable_type = 'thread' AND f.favoritable_id = t.id
                AND f.user_id = ?1) AS is_favorited,
           t.created_at, t.updated_at
    FROM threads t
    JOIN categories c ON c.id = t.category_id
    JOIN users u ON u.id = t.user_id
"#;

pub struct CreateThreadData<'a> {
    pub category_id: i64,
    pub user_id: i64,
    pub slug: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

pub async fn create_thread(
    pool: &SqlitePool,
    data: CreateThreadData<'_>,
) -> Result<Thread, sqlx::Error> {
    let now = Utc::now();
    let thread_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO threads (category_id, user_id, slug, title, body, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        RETURNING id
        "#,
    )
    .bind(data.category_id)
    .bind(data.user_id)
    .bind(data.slug)
    .bind(data.title)
    .bind(data.body)
    .bind(now)
    .fetch_one(pool)
    .await?;

    get_thread_by_id(pool, thread_id, Some(data.user_id))
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM threads WHERE slug = ?1)")
        .bind(slug)
        .fetch_one(pool)
        .await
}

pub async fn get_thread_by_id(
    pool: &SqlitePool,
    thread_id: i64,
    viewer_id: Option<i64>,
) -> Result<Option<Thread>, sqlx::Error> {
    let row = sqlx::query_as::<_, ThreadRow>(&format!("{THREAD_SELECT} WHERE t.id = ?2"))
        .bind(viewer_id)
        .bind(thread_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Thread::from))
}

/// Looks a thread up by its slug, only within the given category.
pub async fn get_thread_by_slugs(
    pool: &SqlitePool,
    category_slug: &str,
    thread_slug: &str,
    viewer_id: Option<i64>,
) -> Result<Option<Thread>, sqlx::Error> {
    let row = sqlx::query_as::<_, ThreadRow>(&format!(
        "{THREAD_SELECT} WHERE c.slug = ?2 AND t.slug = ?3"
    ))
    .bind(viewer_id)
    .bind(category_slug)
    .bind(thread_slug)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Thread::from))
}

/// Newest first.
pub async fn get_threads_by_category(
    pool: &SqlitePool,
    category_id: i64,
    pagination: &PaginationParams,
    viewer_id: Option<i64>,
) -> Result<Vec<Thread>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ThreadRow>(&format!(
        "{THREAD_SELECT} WHERE t.category_id = ?2 ORDER BY t.id DESC LIMIT ?3 OFFSET ?4"
    ))
    .bind(viewer_id)
    .bind(category_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Thread::from).collect())
}

/// Returns the number of rows affected.
pub async fn update_thread(
    pool: &SqlitePool,
    thread_id: i64,
    title: &str,
    body: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE threads
        SET title = ?1, body = ?2, updated_at = ?3
        WHERE id = ?4
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(Utc::now())
    .bind(thread_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Points `best_reply_id` at a reply, or clears it with `None`.
pub async fn set_best_reply(
    pool: &SqlitePool,
    thread_id: i64,
    reply_id: Option<i64>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE threads SET best_reply_id = ?1 WHERE id = ?2")
        .bind(reply_id)
        .bind(thread_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes a thread along with its replies and every favorite pointing at either.
pub async fn delete_thread(pool: &SqlitePool, thread_id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // 1. Clear the best-reply pointer before its target disappears
    sqlx::query("UPDATE threads SET best_reply_id = NULL WHERE id = ?1")
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

    // 2. Favorites are polymorphic, so no FK cascades them for us
    sqlx::query(
        r#"
        DELETE FROM favorites
        WHERE favoritable_type = 'reply'
          AND favoritable_id IN (SELECT id FROM replies WHERE thread_id = ?1)
        "#,
    )
    .bind(thread_id)
    .execute(&mut *tx)
    .await?;

    favorite_repository::delete_all_for(&mut *tx, FavoritableKind::Thread, thread_id).await?;

    // 3. Replies go with the thread through ON DELETE CASCADE
    let result = sqlx::query("DELETE FROM threads WHERE id = ?1")
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}
