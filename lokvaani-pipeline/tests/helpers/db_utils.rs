//! Database Test Utilities

use anyhow::{anyhow, Result};
use chrono::Utc;
use lokvaani_common::db::{init_database, Comment, Sentiment};
use lokvaani_pipeline::db;
use lokvaani_pipeline::db::comments::{AnalysisUpdate, NewComment};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary on-disk database with schema and seeded categories
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_lokvaani.db");
    let pool = init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Id of a seeded business category
pub async fn category_id(pool: &SqlitePool, name: &str) -> Result<String> {
    db::categories::find_category_by_name(pool, name)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| anyhow!("category {} not seeded", name))
}

/// Insert a RAW comment
pub async fn seed_comment(
    pool: &SqlitePool,
    post_id: &str,
    business_category_id: Option<&str>,
    text: &str,
) -> Result<Comment> {
    let comment = db::comments::insert_comment(
        pool,
        &NewComment {
            post_id: post_id.to_string(),
            stakeholder_name: Some("Test Stakeholder".to_string()),
            business_category_id: business_category_id.map(str::to_string),
            raw_comment: text.to_string(),
            word_count: Some(text.split_whitespace().count() as i64),
            ..Default::default()
        },
    )
    .await?;
    Ok(comment)
}

/// Move a comment straight to ANALYZED with the given sentiment and keywords
pub async fn analyze_comment(
    pool: &SqlitePool,
    comment_id: &str,
    sentiment: Option<Sentiment>,
    keywords: &[&str],
) -> Result<Comment> {
    let comment = db::comments::mark_analyzed(
        pool,
        comment_id,
        &AnalysisUpdate {
            standard_comment: None,
            language: Some("en".to_string()),
            sentiment,
            sentiment_score: None,
            summary: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            processed_at: Utc::now(),
        },
    )
    .await?;
    Ok(comment)
}
