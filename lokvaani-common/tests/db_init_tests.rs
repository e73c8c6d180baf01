//! Integration tests for database initialization and seeding

use lokvaani_common::db::init::{init_database, DEFAULT_BUSINESS_CATEGORIES};
use lokvaani_common::db::models::{BusinessCategory, CategoryType};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("lokvaani.db");
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_reopen_is_idempotent_and_does_not_duplicate_seeds() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lokvaani.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM business_categories")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, DEFAULT_BUSINESS_CATEGORIES.len() as i64);
}

#[tokio::test]
async fn test_seeded_categories_carry_weights_and_types() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lokvaani.db")).await.unwrap();

    let rows = sqlx::query("SELECT id, name, weightage_score, category_type FROM business_categories ORDER BY name")
        .fetch_all(&pool)
        .await
        .unwrap();
    let categories: Vec<BusinessCategory> = rows
        .iter()
        .map(|row| BusinessCategory::from_row(row).unwrap())
        .collect();

    let ip = categories
        .iter()
        .find(|c| c.name == "Insolvency Professional")
        .expect("Insolvency Professional seeded");
    assert_eq!(ip.weightage_score, 5.0);
    assert_eq!(ip.category_type, CategoryType::Business);

    let user = categories.iter().find(|c| c.name == "User").expect("User seeded");
    assert_eq!(user.weightage_score, 2.0);
    assert_eq!(user.category_type, CategoryType::User);
}

#[tokio::test]
async fn test_comment_status_check_constraint() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lokvaani.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO comments (id, post_id, raw_comment, status, created_at, updated_at)
         VALUES ('c1', 'p1', 'text', 'DONE', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "Unknown status must be rejected");
}

#[tokio::test]
async fn test_comment_vector_is_unique_per_comment() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lokvaani.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO comments (id, post_id, raw_comment, created_at, updated_at)
         VALUES ('c1', 'p1', 'text', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    for id in ["v1", "v2"] {
        sqlx::query(
            "INSERT INTO comment_vectors (id, comment_id, embedding) VALUES (?, 'c1', '[0.1]')
             ON CONFLICT(comment_id) DO NOTHING",
        )
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment_vectors WHERE comment_id = 'c1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
