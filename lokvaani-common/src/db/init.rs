//! Database initialization
//!
//! Opens (or creates) the SQLite store, applies pragmas and creates every
//! table idempotently. Reference business categories are seeded on every
//! start by upserting on name.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Reference stakeholder categories: (name, weightage score, category type)
pub const DEFAULT_BUSINESS_CATEGORIES: &[(&str, f64, &str)] = &[
    ("Insolvency Professional", 5.0, "BUSINESS"),
    ("Corporate Debtor", 4.5, "BUSINESS"),
    ("Creditor to a Corporate Debtor", 4.5, "BUSINESS"),
    ("Personal Guarantor to a Corporate Debtor", 4.0, "BUSINESS"),
    ("Academics", 3.5, "BUSINESS"),
    ("Partnership firms", 2.5, "BUSINESS"),
    ("Proprietorship firms", 2.5, "BUSINESS"),
    ("User", 2.0, "USER"),
    ("Others", 1.0, "BUSINESS"),
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets the broadcaster read while workers write
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;
    seed_business_categories(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_business_categories_table(pool).await?;
    create_posts_table(pool).await?;
    create_comments_table(pool).await?;
    create_post_summaries_table(pool).await?;
    create_category_summaries_table(pool).await?;
    create_draft_chunks_table(pool).await?;
    create_comment_vectors_table(pool).await?;

    info!("Database schema initialized");
    Ok(())
}

/// Upsert the reference business categories by name
pub async fn seed_business_categories(pool: &SqlitePool) -> Result<()> {
    for (name, weight, category_type) in DEFAULT_BUSINESS_CATEGORIES {
        sqlx::query(
            r#"
            INSERT INTO business_categories (id, name, weightage_score, category_type)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                weightage_score = excluded.weightage_score,
                category_type = excluded.category_type
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(weight)
        .bind(category_type)
        .execute(pool)
        .await?;
    }

    info!(
        count = DEFAULT_BUSINESS_CATEGORIES.len(),
        "Business categories seeded"
    );
    Ok(())
}

async fn create_business_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS business_categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            weightage_score REAL NOT NULL DEFAULT 1.0 CHECK (weightage_score > 0),
            category_type TEXT NOT NULL CHECK (category_type IN ('BUSINESS', 'USER'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_posts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            title TEXT,
            extracted_text TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            post_title TEXT,
            company_id TEXT,
            stakeholder_name TEXT,
            business_category_id TEXT,
            raw_comment TEXT NOT NULL,
            word_count INTEGER,
            standard_comment TEXT,
            summary TEXT,
            keywords TEXT NOT NULL DEFAULT '[]',
            language TEXT,
            comment_type TEXT,
            sentiment TEXT,
            sentiment_score REAL,
            doc_url TEXT,
            is_spam INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'RAW'
                CHECK (status IN ('RAW', 'PROCESSING', 'ANALYZED', 'FAILED')),
            processing_error TEXT,
            processing_attempts INTEGER NOT NULL DEFAULT 0,
            claimed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            processed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_comments_queue ON comments (status, processing_attempts, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_post ON comments (post_id, status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_post_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_summaries (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            generated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_post_summaries_post ON post_summaries (post_id, generated_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_category_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS category_summaries (
            id TEXT PRIMARY KEY,
            post_summary_id TEXT NOT NULL REFERENCES post_summaries(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            category_id TEXT NOT NULL,
            category_name TEXT NOT NULL,
            summary TEXT NOT NULL,
            narrative_source TEXT NOT NULL,
            total_comments INTEGER NOT NULL,
            positive_count INTEGER NOT NULL,
            negative_count INTEGER NOT NULL,
            neutral_count INTEGER NOT NULL,
            weighted_score REAL NOT NULL,
            top_keywords TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_draft_chunks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS draft_chunks (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding TEXT NOT NULL,
            UNIQUE (post_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comment_vectors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comment_vectors (
            id TEXT PRIMARY KEY,
            comment_id TEXT NOT NULL UNIQUE REFERENCES comments(id),
            embedding TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
