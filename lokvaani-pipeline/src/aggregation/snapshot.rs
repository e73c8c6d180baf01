//! Summary snapshot creation
//!
//! Statistics for every business category and the `overall` pseudo-category
//! are computed from the store; narratives are requested from the summarizer
//! concurrently. A failed narrative is replaced by a templated sentence, so a
//! snapshot always holds one row per category plus `overall`. Only a failure
//! to load the category list (or to persist) aborts.

use super::{sentiment_counts, top_keywords, weighted_score, AggregationEngine, AnalyzedComment};
use crate::db;
use crate::db::summaries::NewCategorySummary;
use chrono::Utc;
use futures::future::join_all;
use lokvaani_common::db::{NarrativeSource, PostSummary, OVERALL};
use lokvaani_common::events::SentimentCounts;
use lokvaani_common::Result;
use std::time::Instant;
use tracing::{info, warn};

/// Keywords kept per business category row
pub const CATEGORY_KEYWORDS: usize = 10;
/// Keywords kept for the `overall` row
pub const OVERALL_KEYWORDS: usize = 20;

const OVERALL_NAME: &str = "Overall";

/// Deterministic narrative used when the summarizer fails
pub fn fallback_narrative(category_name: &str, counts: &SentimentCounts, keywords: &[String]) -> String {
    let keywords = if keywords.is_empty() {
        "none".to_string()
    } else {
        keywords.join(", ")
    };
    format!(
        "{}: {} comments analyzed. Sentiment: {} positive, {} negative, {} neutral. Top keywords: {}.",
        category_name, counts.total, counts.positive, counts.negative, counts.neutral, keywords
    )
}

/// Statistics for one snapshot row, before the narrative is attached
struct RowStats {
    category_id: String,
    category_name: String,
    counts: SentimentCounts,
    top_keywords: Vec<String>,
}

impl RowStats {
    fn compute<'a, I>(category_id: &str, category_name: &str, rows: I, keyword_limit: usize) -> Self
    where
        I: IntoIterator<Item = &'a AnalyzedComment> + Clone,
    {
        Self {
            category_id: category_id.to_string(),
            category_name: category_name.to_string(),
            counts: sentiment_counts(rows.clone()),
            top_keywords: top_keywords(rows, keyword_limit)
                .into_iter()
                .map(|k| k.keyword)
                .collect(),
        }
    }
}

impl AggregationEngine {
    /// Create and persist a summary snapshot for a post
    pub async fn create_snapshot(&self, post_id: &str) -> Result<PostSummary> {
        let started = Instant::now();
        let categories = db::categories::list_categories(&self.pool).await?;
        let rows = self.load(Some(post_id)).await?;

        let mut stats: Vec<RowStats> = categories
            .iter()
            .map(|category| {
                let in_category = rows
                    .iter()
                    .filter(|r| r.business_category_id.as_deref() == Some(category.id.as_str()));
                RowStats::compute(&category.id, &category.name, in_category, CATEGORY_KEYWORDS)
            })
            .collect();
        stats.push(RowStats::compute(OVERALL, OVERALL_NAME, rows.iter(), OVERALL_KEYWORDS));

        let narratives = join_all(stats.iter().map(|row| {
            let summarizer = self.summarizer.clone();
            let policy = self.narrative_policy;
            let category_id = row.category_id.clone();
            async move {
                policy
                    .run("category narrative", || summarizer.summarize(&category_id))
                    .await
            }
        }))
        .await;

        let mut fallbacks = 0usize;
        let new_rows: Vec<NewCategorySummary> = stats
            .into_iter()
            .zip(narratives)
            .map(|(row, narrative)| {
                let (summary, narrative_source) = match narrative {
                    Ok(attempted) => (attempted.value.summary, NarrativeSource::Generated),
                    Err(e) => {
                        warn!(
                            post_id,
                            category_id = %row.category_id,
                            error = %e,
                            "Narrative generation failed, using fallback"
                        );
                        fallbacks += 1;
                        (
                            fallback_narrative(&row.category_name, &row.counts, &row.top_keywords),
                            NarrativeSource::Fallback,
                        )
                    }
                };

                NewCategorySummary {
                    weighted_score: weighted_score(
                        row.counts.positive,
                        row.counts.negative,
                        row.counts.total,
                    ),
                    category_id: row.category_id,
                    category_name: row.category_name,
                    summary,
                    narrative_source,
                    total_comments: row.counts.total,
                    positive_count: row.counts.positive,
                    negative_count: row.counts.negative,
                    neutral_count: row.counts.neutral,
                    top_keywords: row.top_keywords,
                }
            })
            .collect();

        let snapshot = db::summaries::insert_snapshot(&self.pool, post_id, Utc::now(), &new_rows).await?;

        info!(
            post_id,
            snapshot_id = %snapshot.id,
            categories = snapshot.category_summaries.len(),
            fallbacks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summary snapshot created"
        );

        Ok(snapshot)
    }

    pub async fn snapshot_timeline(&self, post_id: &str) -> Result<Vec<PostSummary>> {
        db::summaries::list_snapshots(&self.pool, post_id).await
    }

    pub async fn latest_snapshot(&self, post_id: &str) -> Result<Option<PostSummary>> {
        db::summaries::latest_snapshot(&self.pool, post_id).await
    }

    pub async fn snapshot_by_id(&self, id: &str) -> Result<Option<PostSummary>> {
        db::summaries::get_snapshot(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_narrative_template() {
        let counts = SentimentCounts {
            positive: 2,
            negative: 1,
            neutral: 0,
            total: 3,
        };
        let text = fallback_narrative("Academics", &counts, &["timeline".into(), "costs".into()]);
        assert_eq!(
            text,
            "Academics: 3 comments analyzed. Sentiment: 2 positive, 1 negative, 0 neutral. Top keywords: timeline, costs."
        );
    }

    #[test]
    fn test_fallback_narrative_without_keywords() {
        let text = fallback_narrative("Overall", &SentimentCounts::default(), &[]);
        assert!(text.ends_with("Top keywords: none."));
    }
}
