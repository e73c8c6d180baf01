//! Comment lifecycle queries
//!
//! The `status` column doubles as the analysis queue. Claiming moves a bounded
//! batch of eligible RAW rows to PROCESSING in one statement; every later
//! transition is a single-row `UPDATE ... WHERE id = ?`.

use crate::aggregation::{AnalyzedComment, ResolvedCategory};
use chrono::{DateTime, Utc};
use lokvaani_common::db::{format_timestamp, CategoryType, Comment, CommentStatus, Sentiment};
use lokvaani_common::{Error, Result};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const COMMENT_COLUMNS: &str = "id, post_id, post_title, company_id, stakeholder_name, \
    business_category_id, raw_comment, word_count, standard_comment, summary, keywords, \
    language, comment_type, sentiment, sentiment_score, doc_url, is_spam, status, \
    processing_error, processing_attempts, claimed_at, created_at, updated_at, processed_at";

/// Fields supplied when a comment enters the pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewComment {
    pub post_id: String,
    pub post_title: Option<String>,
    pub company_id: Option<String>,
    pub stakeholder_name: Option<String>,
    pub business_category_id: Option<String>,
    pub raw_comment: String,
    pub word_count: Option<i64>,
    pub comment_type: Option<String>,
    pub doc_url: Option<String>,
}

/// Derived fields written when analysis succeeds
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    pub standard_comment: Option<String>,
    pub language: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub sentiment_score: Option<f64>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

/// Predicate over the comments table
///
/// Unset fields do not constrain the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentFilter {
    pub post_id: Option<String>,
    pub status: Option<CommentStatus>,
    /// Membership; empty means any sentiment
    pub sentiments: Vec<Sentiment>,
    pub business_category_id: Option<String>,
    /// `processing_attempts < N`
    pub attempts_below: Option<i64>,
    /// `processing_attempts >= N`
    pub attempts_at_least: Option<i64>,
    /// `created_at >= T`
    pub created_since: Option<DateTime<Utc>>,
    /// `created_at < T`
    pub created_before: Option<DateTime<Utc>>,
    pub exclude_spam: bool,
}

impl CommentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    pub fn status(mut self, status: CommentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiments.push(sentiment);
        self
    }

    pub fn category(mut self, business_category_id: impl Into<String>) -> Self {
        self.business_category_id = Some(business_category_id.into());
        self
    }

    pub fn attempts_below(mut self, n: i64) -> Self {
        self.attempts_below = Some(n);
        self
    }

    pub fn attempts_at_least(mut self, n: i64) -> Self {
        self.attempts_at_least = Some(n);
        self
    }

    pub fn created_since(mut self, ts: DateTime<Utc>) -> Self {
        self.created_since = Some(ts);
        self
    }

    pub fn created_before(mut self, ts: DateTime<Utc>) -> Self {
        self.created_before = Some(ts);
        self
    }

    pub fn not_spam(mut self) -> Self {
        self.exclude_spam = true;
        self
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");

        if let Some(post_id) = &self.post_id {
            builder.push(" AND post_id = ").push_bind(post_id.clone());
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if !self.sentiments.is_empty() {
            builder.push(" AND sentiment IN (");
            let mut separated = builder.separated(", ");
            for sentiment in &self.sentiments {
                separated.push_bind(sentiment.as_str());
            }
            separated.push_unseparated(")");
        }
        if let Some(category_id) = &self.business_category_id {
            builder
                .push(" AND business_category_id = ")
                .push_bind(category_id.clone());
        }
        if let Some(n) = self.attempts_below {
            builder.push(" AND processing_attempts < ").push_bind(n);
        }
        if let Some(n) = self.attempts_at_least {
            builder.push(" AND processing_attempts >= ").push_bind(n);
        }
        if let Some(ts) = self.created_since {
            builder.push(" AND created_at >= ").push_bind(format_timestamp(ts));
        }
        if let Some(ts) = self.created_before {
            builder.push(" AND created_at < ").push_bind(format_timestamp(ts));
        }
        if self.exclude_spam {
            builder.push(" AND is_spam = 0");
        }
    }
}

/// Persist a new comment with status RAW
pub async fn insert_comment(pool: &SqlitePool, new: &NewComment) -> Result<Comment> {
    if new.raw_comment.trim().is_empty() {
        return Err(Error::InvalidInput("comment text is empty".to_string()));
    }

    let now = format_timestamp(Utc::now());
    let sql = format!(
        r#"
        INSERT INTO comments (
            id, post_id, post_title, company_id, stakeholder_name, business_category_id,
            raw_comment, word_count, comment_type, doc_url, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'RAW', ?, ?)
        RETURNING {}
        "#,
        COMMENT_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&new.post_id)
        .bind(&new.post_title)
        .bind(&new.company_id)
        .bind(&new.stakeholder_name)
        .bind(&new.business_category_id)
        .bind(&new.raw_comment)
        .bind(new.word_count)
        .bind(&new.comment_type)
        .bind(&new.doc_url)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await?;

    Comment::from_row(&row)
}

pub async fn get_comment(pool: &SqlitePool, id: &str) -> Result<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(Comment::from_row).transpose()
}

pub async fn count_comments(pool: &SqlitePool, filter: &CommentFilter) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM comments");
    filter.push_where(&mut builder);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Atomically claim up to `limit` eligible comments, oldest first
///
/// Eligible means `RAW` with `processing_attempts < max_attempts`. Selection
/// and the move to PROCESSING happen in one statement; SQLite serializes
/// writers, so two workers sharing a database file never claim the same row.
pub async fn claim_eligible(
    pool: &SqlitePool,
    max_attempts: i64,
    limit: usize,
) -> Result<Vec<Comment>> {
    let now = format_timestamp(Utc::now());
    let sql = format!(
        r#"
        UPDATE comments
        SET status = 'PROCESSING', claimed_at = ?, updated_at = ?
        WHERE id IN (
            SELECT id FROM comments
            WHERE status = 'RAW' AND processing_attempts < ?
            ORDER BY created_at, id
            LIMIT ?
        )
        RETURNING {}
        "#,
        COMMENT_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(&now)
        .bind(&now)
        .bind(max_attempts)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    let mut claimed = rows
        .iter()
        .map(Comment::from_row)
        .collect::<Result<Vec<_>>>()?;
    claimed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(claimed)
}

/// Return abandoned PROCESSING claims to RAW
///
/// A claim older than `cutoff` belongs to a run that crashed or was cut off
/// mid-call. The attempt counter is left alone.
pub async fn release_stale_claims(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let cutoff = format_timestamp(cutoff);
    let result = sqlx::query(
        r#"
        UPDATE comments
        SET status = 'RAW', claimed_at = NULL, updated_at = ?
        WHERE status = 'PROCESSING'
          AND ((claimed_at IS NOT NULL AND claimed_at < ?)
               OR (claimed_at IS NULL AND updated_at < ?))
        "#,
    )
    .bind(format_timestamp(Utc::now()))
    .bind(&cutoff)
    .bind(&cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Transient analyzer failure: back to RAW with one more attempt recorded
///
/// Returns the new attempt count.
pub async fn mark_transient_failure(pool: &SqlitePool, id: &str, error: &str) -> Result<i64> {
    let attempts: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE comments
        SET status = 'RAW',
            processing_attempts = processing_attempts + 1,
            processing_error = ?,
            claimed_at = NULL,
            updated_at = ?
        WHERE id = ?
        RETURNING processing_attempts
        "#,
    )
    .bind(error)
    .bind(format_timestamp(Utc::now()))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    attempts.ok_or_else(|| Error::NotFound(format!("comment {}", id)))
}

/// Logical analyzer failure: terminal FAILED with the analyzer's reason
pub async fn mark_failed(pool: &SqlitePool, id: &str, error: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE comments
        SET status = 'FAILED', processing_error = ?, claimed_at = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(error)
    .bind(format_timestamp(Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("comment {}", id)));
    }
    Ok(())
}

/// Successful analysis: overwrite derived fields and mark ANALYZED
///
/// Raw fields are never touched, so applying the same analysis twice leaves
/// the row in the same state.
pub async fn mark_analyzed(pool: &SqlitePool, id: &str, update: &AnalysisUpdate) -> Result<Comment> {
    let sql = format!(
        r#"
        UPDATE comments
        SET standard_comment = ?,
            language = ?,
            sentiment = ?,
            sentiment_score = ?,
            summary = ?,
            keywords = ?,
            status = 'ANALYZED',
            processing_error = NULL,
            claimed_at = NULL,
            processed_at = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING {}
        "#,
        COMMENT_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(&update.standard_comment)
        .bind(&update.language)
        .bind(update.sentiment.map(|s| s.as_str()))
        .bind(update.sentiment_score)
        .bind(&update.summary)
        .bind(serde_json::to_string(&update.keywords)?)
        .bind(format_timestamp(update.processed_at))
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("comment {}", id)))?;

    Comment::from_row(&row)
}

/// Flag or unflag a comment as spam (excluded from retrieval)
pub async fn set_spam(pool: &SqlitePool, id: &str, is_spam: bool) -> Result<()> {
    let result = sqlx::query("UPDATE comments SET is_spam = ?, updated_at = ? WHERE id = ?")
        .bind(is_spam)
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("comment {}", id)));
    }
    Ok(())
}

/// Load ANALYZED comments joined with their category for aggregation
///
/// `post_id = None` spans every post.
pub async fn load_analyzed(pool: &SqlitePool, post_id: Option<&str>) -> Result<Vec<AnalyzedComment>> {
    let rows = sqlx::query(
        r#"
        SELECT c.business_category_id, c.sentiment, c.comment_type, c.keywords,
               b.id AS resolved_id, b.weightage_score, b.category_type
        FROM comments c
        LEFT JOIN business_categories b ON b.id = c.business_category_id
        WHERE c.status = 'ANALYZED' AND (?1 IS NULL OR c.post_id = ?1)
        ORDER BY c.created_at, c.id
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    let mut analyzed = Vec::with_capacity(rows.len());
    for row in &rows {
        let sentiment: Option<String> = row.try_get("sentiment")?;
        let keywords: String = row.try_get("keywords")?;
        let resolved_id: Option<String> = row.try_get("resolved_id")?;

        let category = match resolved_id {
            Some(_) => {
                let category_type: String = row.try_get("category_type")?;
                Some(ResolvedCategory {
                    weight: row.try_get("weightage_score")?,
                    category_type: category_type.parse::<CategoryType>()?,
                })
            }
            None => None,
        };

        analyzed.push(AnalyzedComment {
            sentiment: sentiment.as_deref().and_then(Sentiment::from_label),
            business_category_id: row.try_get("business_category_id")?,
            category,
            comment_type: row.try_get("comment_type")?,
            keywords: serde_json::from_str(&keywords)?,
        });
    }

    Ok(analyzed)
}
