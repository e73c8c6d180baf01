//! Consultation draft records

use chrono::Utc;
use lokvaani_common::db::{format_timestamp, Post};
use lokvaani_common::Result;
use sqlx::SqlitePool;

/// Insert or update a draft
///
/// `None` fields keep their stored value, so ingestion can record a title
/// without clobbering extracted text registered through the API.
pub async fn upsert_post(
    pool: &SqlitePool,
    id: &str,
    title: Option<&str>,
    extracted_text: Option<&str>,
) -> Result<Post> {
    let now = format_timestamp(Utc::now());

    let row = sqlx::query(
        r#"
        INSERT INTO posts (id, title, extracted_text, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = COALESCE(excluded.title, posts.title),
            extracted_text = COALESCE(excluded.extracted_text, posts.extracted_text),
            updated_at = excluded.updated_at
        RETURNING id, title, extracted_text
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(extracted_text)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    Post::from_row(&row)
}

pub async fn get_post(pool: &SqlitePool, id: &str) -> Result<Option<Post>> {
    let row = sqlx::query("SELECT id, title, extracted_text FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(Post::from_row).transpose()
}
