//! Business category lookups

use lokvaani_common::db::BusinessCategory;
use lokvaani_common::Result;
use sqlx::SqlitePool;

/// All categories ordered by name
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<BusinessCategory>> {
    let rows = sqlx::query(
        "SELECT id, name, weightage_score, category_type FROM business_categories ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(BusinessCategory::from_row).collect()
}

pub async fn get_category(pool: &SqlitePool, id: &str) -> Result<Option<BusinessCategory>> {
    let row = sqlx::query(
        "SELECT id, name, weightage_score, category_type FROM business_categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(BusinessCategory::from_row).transpose()
}

pub async fn find_category_by_name(pool: &SqlitePool, name: &str) -> Result<Option<BusinessCategory>> {
    let row = sqlx::query(
        "SELECT id, name, weightage_score, category_type FROM business_categories WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(BusinessCategory::from_row).transpose()
}
