use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::Category;

pub async fn create_category(
    pool: &SqlitePool,
    name: &str,
    slug: &str,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, slug, created_at)
        VALUES (?1, ?2, ?3)
        RETURNING id, name, slug, created_at
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn get_category_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, slug, created_at
        FROM categories
        WHERE slug = ?1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn get_all_categories(pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, slug, created_at
        FROM categories
        ORDER BY name ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}
