//! Draft chunk and comment vector storage
//!
//! Embeddings are stored as JSON arrays. Both tables are insert-only and
//! conflict tolerant: a second sync, or two syncs racing, never duplicate a
//! chunk index or a comment vector.

use lokvaani_common::db::Sentiment;
use lokvaani_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Draft passage with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChunk {
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Embedded comment with the annotations used in the grounding context
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedComment {
    pub comment_id: String,
    pub raw_comment: String,
    pub stakeholder_name: Option<String>,
    pub category_name: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub embedding: Vec<f32>,
}

/// Comment awaiting an embedding
#[derive(Debug, Clone, PartialEq)]
pub struct PendingComment {
    pub comment_id: String,
    pub raw_comment: String,
}

pub async fn count_draft_chunks(pool: &SqlitePool, post_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM draft_chunks WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert a chunk unless that index already exists; returns whether it was inserted
pub async fn insert_draft_chunk(
    pool: &SqlitePool,
    post_id: &str,
    chunk_index: i64,
    content: &str,
    embedding: &[f32],
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO draft_chunks (id, post_id, chunk_index, content, embedding)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(post_id, chunk_index) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(post_id)
    .bind(chunk_index)
    .bind(content)
    .bind(serde_json::to_string(embedding)?)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_draft_chunks(pool: &SqlitePool, post_id: &str) -> Result<Vec<DraftChunk>> {
    let rows = sqlx::query(
        "SELECT chunk_index, content, embedding FROM draft_chunks WHERE post_id = ? ORDER BY chunk_index",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<DraftChunk> {
            let embedding: String = row.try_get("embedding")?;
            Ok(DraftChunk {
                chunk_index: row.try_get("chunk_index")?,
                content: row.try_get("content")?,
                embedding: serde_json::from_str(&embedding)?,
            })
        })
        .collect()
}

/// ANALYZED, non-spam comments of a post that have no vector yet
pub async fn list_pending_comments(
    pool: &SqlitePool,
    post_id: &str,
    limit: i64,
) -> Result<Vec<PendingComment>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.raw_comment
        FROM comments c
        LEFT JOIN comment_vectors v ON v.comment_id = c.id
        WHERE c.post_id = ? AND c.status = 'ANALYZED' AND c.is_spam = 0 AND v.id IS NULL
        ORDER BY c.created_at, c.id
        LIMIT ?
        "#,
    )
    .bind(post_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<PendingComment> {
            Ok(PendingComment {
                comment_id: row.try_get("id")?,
                raw_comment: row.try_get("raw_comment")?,
            })
        })
        .collect()
}

/// Insert a comment vector; an existing vector for the comment wins
pub async fn insert_comment_vector(pool: &SqlitePool, comment_id: &str, embedding: &[f32]) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO comment_vectors (id, comment_id, embedding)
        VALUES (?, ?, ?)
        ON CONFLICT(comment_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(comment_id)
    .bind(serde_json::to_string(embedding)?)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Embedded, non-spam comments of a post with their category annotations
pub async fn load_embedded_comments(pool: &SqlitePool, post_id: &str) -> Result<Vec<EmbeddedComment>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.raw_comment, c.stakeholder_name, c.sentiment, b.name AS category_name,
               v.embedding
        FROM comment_vectors v
        JOIN comments c ON c.id = v.comment_id
        LEFT JOIN business_categories b ON b.id = c.business_category_id
        WHERE c.post_id = ? AND c.is_spam = 0
        ORDER BY c.created_at, c.id
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<EmbeddedComment> {
            let sentiment: Option<String> = row.try_get("sentiment")?;
            let embedding: String = row.try_get("embedding")?;
            Ok(EmbeddedComment {
                comment_id: row.try_get("id")?,
                raw_comment: row.try_get("raw_comment")?,
                stakeholder_name: row.try_get("stakeholder_name")?,
                category_name: row.try_get("category_name")?,
                sentiment: sentiment.as_deref().and_then(Sentiment::from_label),
                embedding: serde_json::from_str(&embedding)?,
            })
        })
        .collect()
}

/// Vectors stored for a post's non-spam comments
pub async fn count_comment_vectors(pool: &SqlitePool, post_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM comment_vectors v
        JOIN comments c ON c.id = v.comment_id
        WHERE c.post_id = ? AND c.is_spam = 0
        "#,
    )
    .bind(post_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// ANALYZED, non-spam comments of a post (the set sync embeds)
pub async fn count_embeddable_comments(pool: &SqlitePool, post_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM comments WHERE post_id = ? AND status = 'ANALYZED' AND is_spam = 0",
    )
    .bind(post_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
