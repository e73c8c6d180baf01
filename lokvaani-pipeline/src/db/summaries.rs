//! Summary snapshot persistence
//!
//! A snapshot is one `post_summaries` row plus one `category_summaries` row
//! per business category and the `overall` pseudo-category. All rows are
//! written in one transaction and never updated afterwards.

use chrono::{DateTime, Utc};
use lokvaani_common::db::{
    format_timestamp, parse_timestamp, CategorySummary, NarrativeSource, PostSummary,
};
use lokvaani_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Category row to be written as part of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategorySummary {
    pub category_id: String,
    pub category_name: String,
    pub summary: String,
    pub narrative_source: NarrativeSource,
    pub total_comments: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub neutral_count: i64,
    pub weighted_score: f64,
    pub top_keywords: Vec<String>,
}

/// Persist a snapshot atomically
///
/// Either the parent and every category row commit, or nothing does.
pub async fn insert_snapshot(
    pool: &SqlitePool,
    post_id: &str,
    generated_at: DateTime<Utc>,
    categories: &[NewCategorySummary],
) -> Result<PostSummary> {
    // Stored precision, so the returned snapshot equals a reloaded one
    let generated_at = parse_timestamp(&format_timestamp(generated_at))?;
    let summary_id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO post_summaries (id, post_id, generated_at) VALUES (?, ?, ?)")
        .bind(&summary_id)
        .bind(post_id)
        .bind(format_timestamp(generated_at))
        .execute(&mut *tx)
        .await?;

    let mut category_summaries = Vec::with_capacity(categories.len());
    for (position, category) in categories.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO category_summaries (
                id, post_summary_id, position, category_id, category_name, summary,
                narrative_source, total_comments, positive_count, negative_count,
                neutral_count, weighted_score, top_keywords
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&summary_id)
        .bind(position as i64)
        .bind(&category.category_id)
        .bind(&category.category_name)
        .bind(&category.summary)
        .bind(category.narrative_source.as_str())
        .bind(category.total_comments)
        .bind(category.positive_count)
        .bind(category.negative_count)
        .bind(category.neutral_count)
        .bind(category.weighted_score)
        .bind(serde_json::to_string(&category.top_keywords)?)
        .execute(&mut *tx)
        .await?;

        category_summaries.push(CategorySummary {
            id,
            category_id: category.category_id.clone(),
            category_name: category.category_name.clone(),
            summary: category.summary.clone(),
            narrative_source: category.narrative_source,
            total_comments: category.total_comments,
            positive_count: category.positive_count,
            negative_count: category.negative_count,
            neutral_count: category.neutral_count,
            weighted_score: category.weighted_score,
            top_keywords: category.top_keywords.clone(),
        });
    }

    tx.commit().await?;

    Ok(PostSummary {
        id: summary_id,
        post_id: post_id.to_string(),
        generated_at,
        category_summaries,
    })
}

async fn load_category_rows(pool: &SqlitePool, post_summary_id: &str) -> Result<Vec<CategorySummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, category_id, category_name, summary, narrative_source, total_comments,
               positive_count, negative_count, neutral_count, weighted_score, top_keywords
        FROM category_summaries
        WHERE post_summary_id = ?
        ORDER BY position
        "#,
    )
    .bind(post_summary_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(CategorySummary::from_row).collect()
}

async fn hydrate(pool: &SqlitePool, row: &sqlx::sqlite::SqliteRow) -> Result<PostSummary> {
    let id: String = row.try_get("id")?;
    let generated_at: String = row.try_get("generated_at")?;
    let category_summaries = load_category_rows(pool, &id).await?;

    Ok(PostSummary {
        post_id: row.try_get("post_id")?,
        generated_at: parse_timestamp(&generated_at)?,
        id,
        category_summaries,
    })
}

/// Snapshot timeline for a post, newest first
pub async fn list_snapshots(pool: &SqlitePool, post_id: &str) -> Result<Vec<PostSummary>> {
    let rows = sqlx::query(
        "SELECT id, post_id, generated_at FROM post_summaries WHERE post_id = ? ORDER BY generated_at DESC, id DESC",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for row in &rows {
        snapshots.push(hydrate(pool, row).await?);
    }
    Ok(snapshots)
}

pub async fn latest_snapshot(pool: &SqlitePool, post_id: &str) -> Result<Option<PostSummary>> {
    let row = sqlx::query(
        "SELECT id, post_id, generated_at FROM post_summaries WHERE post_id = ? ORDER BY generated_at DESC, id DESC LIMIT 1",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, &row).await?)),
        None => Ok(None),
    }
}

pub async fn get_snapshot(pool: &SqlitePool, id: &str) -> Result<Option<PostSummary>> {
    let row = sqlx::query("SELECT id, post_id, generated_at FROM post_summaries WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, &row).await?)),
        None => Ok(None),
    }
}
