use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::{Favoritable, FavoritableKind, FavoriteStatus};

/// Marks `entity` as a favorite of `user_id`. Repeating it is a no-op.
pub async fn favorite<F: Favoritable>(
    pool: &SqlitePool,
    entity: &F,
    user_id: i64,
) -> Result<FavoriteStatus, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO favorites (user_id, favoritable_type, favoritable_id, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (user_id, favoritable_type, favoritable_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(F::KIND.as_str())
    .bind(entity.favoritable_id())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    status(pool, entity, user_id).await
}

/// Removes the favorite if present. Removing an absent favorite is a no-op.
pub async fn unfavorite<F: Favoritable>(
    pool: &SqlitePool,
    entity: &F,
    user_id: i64,
) -> Result<FavoriteStatus, sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM favorites
        WHERE user_id = ?1 AND favoritable_type = ?2 AND favoritable_id = ?3
        "#,
    )
    .bind(user_id)
    .bind(F::KIND.as_str())
    .bind(entity.favoritable_id())
    .execute(pool)
    .await?;

    status(pool, entity, user_id).await
}

pub async fn is_favorited<F: Favoritable>(
    pool: &SqlitePool,
    entity: &F,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM favorites
            WHERE user_id = ?1 AND favoritable_type = ?2 AND favoritable_id = ?3
        )
        "#,
    )
    .bind(user_id)
    .bind(F::KIND.as_str())
    .bind(entity.favoritable_id())
    .fetch_one(pool)
    .await
}

pub async fn favorites_count<F: Favoritable>(
    pool: &SqlitePool,
    entity: &F,
) -> Result<i64, sqlx::Error> {
    count(pool, F::KIND, entity.favoritable_id()).await
}

async fn count(pool: &SqlitePool, kind: FavoritableKind, id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM favorites WHERE favoritable_type = ?1 AND favoritable_id = ?2",
    )
    .bind(kind.as_str())
    .bind(id)
    .fetch_one(pool)
    .await
}

/// The caller's view of one entity after a toggle.
async fn status<F: Favoritable>(
    pool: &SqlitePool,
    entity: &F,
    user_id: i64,
) -> Result<FavoriteStatus, sqlx::Error> {
    Ok(FavoriteStatus {
        favorited: is_favorited(pool, entity, user_id).await?,
        favorites_count: favorites_count(pool, entity).await?,
    })
}

/// Drops every favorite pointing at one entity; used when that entity is deleted.
pub(crate) async fn delete_all_for(
    conn: &mut SqliteConnection,
    kind: FavoritableKind,
    id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE favoritable_type = ?1 AND favoritable_id = ?2")
        .bind(kind.as_str())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
