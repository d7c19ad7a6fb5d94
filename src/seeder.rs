use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("General Discussion", "general-discussion"),
    ("Help & Support", "help-support"),
    ("Announcements", "announcements"),
];

/// Seeds the default categories.
///
/// Idempotent: it uses `ON CONFLICT DO NOTHING`, so it can run on every deploy.
/// Returns how many categories were actually inserted.
pub async fn seed_database(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for (name, slug) in DEFAULT_CATEGORIES {
        let result = sqlx::query(
            "INSERT INTO categories (name, slug, created_at) VALUES (?1, ?2, ?3) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(*name)
        .bind(*slug)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(slug = %slug, "Seeded category");
        }
        inserted += result.rows_affected();
    }
    info!(inserted, "Database seeding completed");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, repositories::category_repository};

    #[tokio::test]
    async fn seeding_twice_inserts_once() {
        let pool = db::connect_in_memory().await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        assert_eq!(seed_database(&pool).await.unwrap(), DEFAULT_CATEGORIES.len() as u64);
        assert_eq!(seed_database(&pool).await.unwrap(), 0);

        let categories = category_repository::get_all_categories(&pool).await.unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert!(categories.iter().all(|c| crate::utils::is_valid_slug(&c.slug)));
    }
}
