//! Row models for the comment store
//!
//! Rows are decoded by hand from `SqliteRow` so status enums, JSON columns and
//! RFC 3339 timestamps are validated in one place.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Literal clause bucket and summarizer id covering every comment
pub const OVERALL: &str = "overall";

/// Format a timestamp the way every table stores it
///
/// Fixed precision and a `Z` suffix keep lexicographic order equal to
/// chronological order, which the claim and lease queries rely on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// Comment lifecycle status
///
/// `RAW` doubles as the analysis queue: the worker claims RAW rows by moving
/// them to `PROCESSING`, then settles them as `ANALYZED`, `FAILED`, or back to
/// `RAW` after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    Raw,
    Processing,
    Analyzed,
    Failed,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Raw => "RAW",
            CommentStatus::Processing => "PROCESSING",
            CommentStatus::Analyzed => "ANALYZED",
            CommentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RAW" => Ok(CommentStatus::Raw),
            "PROCESSING" => Ok(CommentStatus::Processing),
            "ANALYZED" => Ok(CommentStatus::Analyzed),
            "FAILED" => Ok(CommentStatus::Failed),
            other => Err(Error::Internal(format!("Unknown comment status: {}", other))),
        }
    }
}

/// Sentiment label produced by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    /// Normalize an analyzer label
    ///
    /// Labels are matched case-insensitively; anything else yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stakeholder category type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryType {
    Business,
    User,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Business => "BUSINESS",
            CategoryType::User => "USER",
        }
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BUSINESS" => Ok(CategoryType::Business),
            "USER" => Ok(CategoryType::User),
            other => Err(Error::Internal(format!("Unknown category type: {}", other))),
        }
    }
}

/// Business category reference row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessCategory {
    pub id: String,
    pub name: String,
    pub weightage_score: f64,
    pub category_type: CategoryType,
}

impl BusinessCategory {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let category_type: String = row.try_get("category_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            weightage_score: row.try_get("weightage_score")?,
            category_type: category_type.parse()?,
        })
    }
}

/// Consultation draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: Option<String>,
    pub extracted_text: Option<String>,
}

impl Post {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            extracted_text: row.try_get("extracted_text")?,
        })
    }
}

/// Stakeholder comment and its derived analysis fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub post_title: Option<String>,
    pub company_id: Option<String>,
    pub stakeholder_name: Option<String>,
    pub business_category_id: Option<String>,
    pub raw_comment: String,
    pub word_count: Option<i64>,
    pub standard_comment: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub language: Option<String>,
    pub comment_type: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub sentiment_score: Option<f64>,
    pub doc_url: Option<String>,
    pub is_spam: bool,
    pub status: CommentStatus,
    pub processing_error: Option<String>,
    pub processing_attempts: i64,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let status: String = row.try_get("status")?;
        let sentiment: Option<String> = row.try_get("sentiment")?;
        let keywords: String = row.try_get("keywords")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            post_title: row.try_get("post_title")?,
            company_id: row.try_get("company_id")?,
            stakeholder_name: row.try_get("stakeholder_name")?,
            business_category_id: row.try_get("business_category_id")?,
            raw_comment: row.try_get("raw_comment")?,
            word_count: row.try_get("word_count")?,
            standard_comment: row.try_get("standard_comment")?,
            summary: row.try_get("summary")?,
            keywords: serde_json::from_str(&keywords)?,
            language: row.try_get("language")?,
            comment_type: row.try_get("comment_type")?,
            sentiment: sentiment.as_deref().and_then(Sentiment::from_label),
            sentiment_score: row.try_get("sentiment_score")?,
            doc_url: row.try_get("doc_url")?,
            is_spam: row.try_get("is_spam")?,
            status: status.parse()?,
            processing_error: row.try_get("processing_error")?,
            processing_attempts: row.try_get("processing_attempts")?,
            claimed_at: parse_optional_timestamp(row.try_get("claimed_at")?)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            processed_at: parse_optional_timestamp(row.try_get("processed_at")?)?,
        })
    }
}

/// Where a category summary's narrative text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// Returned by the summarization service
    Generated,
    /// Templated from the statistics after the service failed
    Fallback,
}

impl NarrativeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeSource::Generated => "generated",
            NarrativeSource::Fallback => "fallback",
        }
    }
}

impl FromStr for NarrativeSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generated" => Ok(NarrativeSource::Generated),
            "fallback" => Ok(NarrativeSource::Fallback),
            other => Err(Error::Internal(format!("Unknown narrative source: {}", other))),
        }
    }
}

/// One category row of a summary snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    /// Business category id, or `"overall"`
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

impl CategorySummary {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let narrative_source: String = row.try_get("narrative_source")?;
        let top_keywords: String = row.try_get("top_keywords")?;
        Ok(Self {
            id: row.try_get("id")?,
            category_id: row.try_get("category_id")?,
            category_name: row.try_get("category_name")?,
            summary: row.try_get("summary")?,
            narrative_source: narrative_source.parse()?,
            total_comments: row.try_get("total_comments")?,
            positive_count: row.try_get("positive_count")?,
            negative_count: row.try_get("negative_count")?,
            neutral_count: row.try_get("neutral_count")?,
            weighted_score: row.try_get("weighted_score")?,
            top_keywords: serde_json::from_str(&top_keywords)?,
        })
    }
}

/// Immutable timestamped snapshot of per-category statistics for a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub post_id: String,
    pub generated_at: DateTime<Utc>,
    /// Ordered: business categories by name, then `overall`
    pub category_summaries: Vec<CategorySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_column_text() {
        for status in [
            CommentStatus::Raw,
            CommentStatus::Processing,
            CommentStatus::Analyzed,
            CommentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CommentStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<CommentStatus>().is_err());
    }

    #[test]
    fn test_sentiment_label_normalization() {
        assert_eq!(Sentiment::from_label("positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label(" NEGATIVE "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("Neutral"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("mixed"), None);
    }

    #[test]
    fn test_timestamp_format_sorts_chronologically() {
        let earlier = parse_timestamp("2024-01-01T09:00:00Z").unwrap();
        let later = parse_timestamp("2024-01-01T10:00:00.5Z").unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }
}
