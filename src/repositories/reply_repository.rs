use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{FavoritableKind, Reply, ReplyRow};
use crate::repositories::favorite_repository;

// ?1 is the viewing user's id (NULL for guests). The creator is always joined in.
const REPLY_SELECT: &str = r#"
    SELECT r.id, r.thread_id, r.user_id, u.name AS creator_name, r.content,
           (SELECT COUNT(*) FROM favorites f
              WHERE f.favoritable_type = 'reply' AND f.favoritable_id = r.id) AS favorites_count,
           EXISTS (SELECT 1 FROM favorites f
              WHERE f.favoritable_type = 'reply' AND f.favoritable_id = r.id
                AND f.user_id = ?1) AS is_favorited,
           COALESCE(t.best_reply_id = r.id, 0) AS is_best,
           r.created_at, r.updated_at
    FROM replies r
    JOIN users u ON u.id = r.user_id
    JOIN threads t ON t.id = r.thread_id
"#;

pub async fn create_reply(
    pool: &SqlitePool,
    thread_id: i64,
    user_id: i64,
    content: &str,
) -> Result<Reply, sqlx::Error> {
    let now = Utc::now();
    let reply_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO replies (thread_id, user_id, content, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        RETURNING id
        "#,
    )
    .bind(thread_id)
    .bind(user_id)
    .bind(content)
    .bind(now)
    .fetch_one(pool)
    .await?;

    get_reply_by_id(pool, reply_id, Some(user_id))
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_reply_by_id(
    pool: &SqlitePool,
    reply_id: i64,
    viewer_id: Option<i64>,
) -> Result<Option<Reply>, sqlx::Error> {
    let row = sqlx::query_as::<_, ReplyRow>(&format!("{REPLY_SELECT} WHERE r.id = ?2"))
        .bind(viewer_id)
        .bind(reply_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Reply::from))
}

/// All replies of a thread in the order they were created.
pub async fn get_replies_by_thread(
    pool: &SqlitePool,
    thread_id: i64,
    viewer_id: Option<i64>,
) -> Result<Vec<Reply>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReplyRow>(&format!(
        "{REPLY_SELECT} WHERE r.thread_id = ?2 ORDER BY r.id ASC"
    ))
    .bind(viewer_id)
    .bind(thread_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Reply::from).collect())
}

pub async fn count_replies(pool: &SqlitePool, thread_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM replies WHERE thread_id = ?1")
        .bind(thread_id)
        .fetch_one(pool)
        .await
}

/// Returns the number of rows affected.
pub async fn update_reply(
    pool: &SqlitePool,
    reply_id: i64,
    content: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE replies
        SET content = ?1, updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(content)
    .bind(Utc::now())
    .bind(reply_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes a reply and its favorites. A thread whose best reply this was
/// goes back to having none.
pub async fn delete_reply(pool: &SqlitePool, reply_id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE threads SET best_reply_id = NULL WHERE best_reply_id = ?1")
        .bind(reply_id)
        .execute(&mut *tx)
        .await?;

    favorite_repository::delete_all_for(&mut *tx, FavoritableKind::Reply, reply_id).await?;

    let result = sqlx::query("DELETE FROM replies WHERE id = ?1")
        .bind(reply_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}
