//! Aggregation engine
//!
//! Sentiment statistics are pure functions over `AnalyzedComment` rows; the
//! `AggregationEngine` loads rows from the store and feeds them through. The
//! broadcast service, the HTTP API and snapshot creation all go through the
//! same functions, so a value pushed to a dashboard equals what a direct
//! query returns for the same store state.

mod snapshot;

pub use snapshot::{fallback_narrative, OVERALL_KEYWORDS, CATEGORY_KEYWORDS};

use crate::db;
use crate::services::CategorySummarizer;
use crate::utils::RetryPolicy;
use lokvaani_common::db::{CategoryType, Sentiment, OVERALL};
use lokvaani_common::events::{
    CategoryBreakdown, CategoryTypeCounts, CategoryWeightBreakdown, SentimentCounts,
    SentimentPercentages, SentimentWeights, WeightedSentiment,
};
use lokvaani_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

/// Category attributes that matter for weighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCategory {
    pub weight: f64,
    pub category_type: CategoryType,
}

/// One ANALYZED comment, reduced to the fields aggregation reads
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzedComment {
    pub sentiment: Option<Sentiment>,
    pub business_category_id: Option<String>,
    /// `None` when the id is unset or matches no category
    pub category: Option<ResolvedCategory>,
    pub comment_type: Option<String>,
    pub keywords: Vec<String>,
}

impl AnalyzedComment {
    /// Effective stakeholder weight (1 without a resolvable category)
    pub fn weight(&self) -> f64 {
        self.category.map(|c| c.weight).unwrap_or(1.0)
    }

    /// Category id set but not found in the category table
    pub fn has_missing_category(&self) -> bool {
        self.business_category_id.is_some() && self.category.is_none()
    }

    pub fn category_type(&self) -> Option<CategoryType> {
        self.category.map(|c| c.category_type)
    }
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total * 100` rounded to two decimals, 0 when total is 0
pub fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        round2(part / total * 100.0)
    } else {
        0.0
    }
}

/// Net sentiment score: `(positive - negative) / total * 100`, 0 when total is 0
pub fn weighted_score(positive: i64, negative: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2((positive - negative) as f64 / total as f64 * 100.0)
}

/// Unweighted counts; `total` includes comments without a sentiment
pub fn sentiment_counts<'a, I>(rows: I) -> SentimentCounts
where
    I: IntoIterator<Item = &'a AnalyzedComment>,
{
    let mut counts = SentimentCounts::default();
    for row in rows {
        counts.total += 1;
        match row.sentiment {
            Some(Sentiment::Positive) => counts.positive += 1,
            Some(Sentiment::Negative) => counts.negative += 1,
            Some(Sentiment::Neutral) => counts.neutral += 1,
            None => {}
        }
    }
    counts
}

/// Unweighted counts split by category type
///
/// Comments without a resolvable category belong to neither side.
pub fn category_type_counts(rows: &[AnalyzedComment]) -> CategoryTypeCounts {
    CategoryTypeCounts {
        user: sentiment_counts(
            rows.iter()
                .filter(|r| r.category_type() == Some(CategoryType::User)),
        ),
        business: sentiment_counts(
            rows.iter()
                .filter(|r| r.category_type() == Some(CategoryType::Business)),
        ),
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct WeightSums {
    positive: f64,
    negative: f64,
    neutral: f64,
    total: f64,
}

impl WeightSums {
    fn add(&mut self, sentiment: Sentiment, weight: f64) {
        self.total += weight;
        match sentiment {
            Sentiment::Positive => self.positive += weight,
            Sentiment::Negative => self.negative += weight,
            Sentiment::Neutral => self.neutral += weight,
        }
    }

    fn percentages(&self) -> SentimentPercentages {
        SentimentPercentages {
            positive: percentage(self.positive, self.total),
            negative: percentage(self.negative, self.total),
            neutral: percentage(self.neutral, self.total),
        }
    }

    fn breakdown(&self) -> CategoryWeightBreakdown {
        let p = self.percentages();
        CategoryWeightBreakdown {
            positive: p.positive,
            negative: p.negative,
            neutral: p.neutral,
            total_weight: round2(self.total),
        }
    }
}

/// Stakeholder-influence-weighted sentiment distribution
///
/// Only comments carrying a sentiment contribute. A comment whose category id
/// is set but unresolvable is weighted as 1, counted in
/// `missing_category_lookups` and kept out of the USER/BUSINESS breakdown.
pub fn weighted_sentiment(rows: &[AnalyzedComment]) -> WeightedSentiment {
    let mut overall = WeightSums::default();
    let mut user = WeightSums::default();
    let mut business = WeightSums::default();
    let mut analyzed = 0i64;
    let mut missing = 0i64;

    for row in rows {
        let Some(sentiment) = row.sentiment else {
            continue;
        };
        analyzed += 1;

        if row.has_missing_category() {
            missing += 1;
        }

        let weight = row.weight();
        overall.add(sentiment, weight);
        match row.category_type() {
            Some(CategoryType::User) => user.add(sentiment, weight),
            Some(CategoryType::Business) => business.add(sentiment, weight),
            None => {}
        }
    }

    if missing > 0 {
        tracing::warn!(
            missing_category_lookups = missing,
            "Comments reference unknown business categories; weighted as 1"
        );
    }

    WeightedSentiment {
        total_analyzed_comments: analyzed,
        total_weight: round2(overall.total),
        weighted_percentages: overall.percentages(),
        category_breakdown: CategoryBreakdown {
            user: user.breakdown(),
            business: business.breakdown(),
        },
        raw_weights: SentimentWeights {
            positive: round2(overall.positive),
            negative: round2(overall.negative),
            neutral: round2(overall.neutral),
        },
        missing_category_lookups: missing,
    }
}

/// Sentiment distribution for one clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseBucket {
    pub clause: String,
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
}

/// Group comments by clause tag, largest bucket first
///
/// A missing or blank tag falls into `overall`. Equal totals keep the order in
/// which the clause was first seen.
pub fn clause_breakdown(rows: &[AnalyzedComment]) -> Vec<ClauseBucket> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&AnalyzedComment>> = HashMap::new();

    for row in rows {
        let clause = row
            .comment_type
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(OVERALL)
            .to_string();

        groups
            .entry(clause.clone())
            .or_insert_with(|| {
                order.push(clause);
                Vec::new()
            })
            .push(row);
    }

    let mut buckets: Vec<ClauseBucket> = order
        .into_iter()
        .map(|clause| {
            let counts = sentiment_counts(groups.get(&clause).into_iter().flatten().copied());
            let total = counts.total as f64;
            ClauseBucket {
                total: counts.total,
                positive: counts.positive,
                negative: counts.negative,
                neutral: counts.neutral,
                positive_percentage: percentage(counts.positive as f64, total),
                negative_percentage: percentage(counts.negative as f64, total),
                neutral_percentage: percentage(counts.neutral as f64, total),
                clause,
            }
        })
        .collect();

    // sort_by is stable
    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: i64,
}

/// Most frequent keywords, ties broken by first appearance
///
/// Keywords are trimmed; empty ones are ignored. Matching is case-sensitive.
pub fn top_keywords<'a, I>(rows: I, limit: usize) -> Vec<KeywordCount>
where
    I: IntoIterator<Item = &'a AnalyzedComment>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, i64> = HashMap::new();

    for row in rows {
        for keyword in row.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            let count = counts.entry(keyword).or_insert_with(|| {
                order.push(keyword);
                0
            });
            *count += 1;
        }
    }

    let mut ranked: Vec<KeywordCount> = order
        .into_iter()
        .map(|keyword| KeywordCount {
            keyword: keyword.to_string(),
            count: counts.get(keyword).copied().unwrap_or(0),
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Store-backed aggregation plus snapshot creation
#[derive(Clone)]
pub struct AggregationEngine {
    pool: SqlitePool,
    summarizer: Arc<dyn CategorySummarizer>,
    narrative_policy: RetryPolicy,
}

impl AggregationEngine {
    pub fn new(
        pool: SqlitePool,
        summarizer: Arc<dyn CategorySummarizer>,
        narrative_policy: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            summarizer,
            narrative_policy,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// ANALYZED rows for one post, or every post when `post_id` is `None`
    pub async fn load(&self, post_id: Option<&str>) -> Result<Vec<AnalyzedComment>> {
        db::comments::load_analyzed(&self.pool, post_id).await
    }

    pub async fn counts(&self, post_id: Option<&str>) -> Result<SentimentCounts> {
        Ok(sentiment_counts(&self.load(post_id).await?))
    }

    pub async fn categorized_counts(&self, post_id: Option<&str>) -> Result<CategoryTypeCounts> {
        Ok(category_type_counts(&self.load(post_id).await?))
    }

    pub async fn weightage(&self, post_id: Option<&str>) -> Result<WeightedSentiment> {
        Ok(weighted_sentiment(&self.load(post_id).await?))
    }

    pub async fn clauses(&self, post_id: &str) -> Result<Vec<ClauseBucket>> {
        Ok(clause_breakdown(&self.load(Some(post_id)).await?))
    }

    pub async fn keywords(&self, post_id: &str, limit: usize) -> Result<Vec<KeywordCount>> {
        Ok(top_keywords(&self.load(Some(post_id)).await?, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sentiment: Option<Sentiment>, category: Option<(f64, CategoryType)>) -> AnalyzedComment {
        AnalyzedComment {
            sentiment,
            business_category_id: category.map(|_| "cat".to_string()),
            category: category.map(|(weight, category_type)| ResolvedCategory {
                weight,
                category_type,
            }),
            comment_type: None,
            keywords: Vec::new(),
        }
    }

    fn clause_rows(clause: &str, n: usize) -> Vec<AnalyzedComment> {
        (0..n)
            .map(|_| AnalyzedComment {
                sentiment: Some(Sentiment::Neutral),
                comment_type: Some(clause.to_string()),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_weighted_percentages_sum_to_100() {
        let rows = vec![
            row(Some(Sentiment::Positive), Some((5.0, CategoryType::Business))),
            row(Some(Sentiment::Negative), Some((2.0, CategoryType::User))),
            row(Some(Sentiment::Negative), Some((2.0, CategoryType::User))),
            row(Some(Sentiment::Neutral), None),
            row(Some(Sentiment::Positive), Some((4.5, CategoryType::Business))),
            row(Some(Sentiment::Neutral), Some((3.5, CategoryType::Business))),
        ];

        let weighted = weighted_sentiment(&rows);
        let p = weighted.weighted_percentages;
        assert!((p.positive + p.negative + p.neutral - 100.0).abs() <= 0.02);
        assert_eq!(weighted.total_weight, 18.0);
        assert_eq!(weighted.total_analyzed_comments, 6);
    }

    #[test]
    fn test_single_high_weight_comment_outweighs_many_users() {
        let mut rows = vec![row(Some(Sentiment::Positive), Some((5.0, CategoryType::Business)))];
        rows.extend((0..2).map(|_| row(Some(Sentiment::Negative), Some((2.0, CategoryType::User)))));

        let weighted = weighted_sentiment(&rows);
        assert_eq!(weighted.weighted_percentages.positive, 55.56);
        assert_eq!(weighted.weighted_percentages.negative, 44.44);
        assert_eq!(weighted.category_breakdown.user.negative, 100.0);
        assert_eq!(weighted.category_breakdown.user.total_weight, 4.0);
        assert_eq!(weighted.category_breakdown.business.positive, 100.0);
    }

    #[test]
    fn test_empty_input_yields_zeroes() {
        let weighted = weighted_sentiment(&[]);
        assert_eq!(weighted.weighted_percentages, SentimentPercentages::default());
        assert_eq!(weighted.total_weight, 0.0);

        let only_unlabelled = vec![row(None, Some((5.0, CategoryType::Business)))];
        let weighted = weighted_sentiment(&only_unlabelled);
        assert_eq!(weighted.total_analyzed_comments, 0);
        assert_eq!(weighted.weighted_percentages.positive, 0.0);
    }

    #[test]
    fn test_missing_category_lookup_is_counted_and_weighted_as_one() {
        let rows = vec![
            AnalyzedComment {
                sentiment: Some(Sentiment::Positive),
                business_category_id: Some("deleted-category".to_string()),
                ..Default::default()
            },
            row(Some(Sentiment::Negative), None),
        ];

        let weighted = weighted_sentiment(&rows);
        assert_eq!(weighted.missing_category_lookups, 1);
        assert_eq!(weighted.total_weight, 2.0);
        assert_eq!(weighted.category_breakdown.user.total_weight, 0.0);
        assert_eq!(weighted.category_breakdown.business.total_weight, 0.0);
    }

    #[test]
    fn test_counts_total_includes_unlabelled() {
        let rows = vec![
            row(Some(Sentiment::Positive), None),
            row(Some(Sentiment::Negative), None),
            row(None, None),
        ];
        let counts = sentiment_counts(&rows);
        assert_eq!(counts, SentimentCounts { positive: 1, negative: 1, neutral: 0, total: 3 });
    }

    #[test]
    fn test_category_type_counts_split() {
        let rows = vec![
            row(Some(Sentiment::Positive), Some((2.0, CategoryType::User))),
            row(Some(Sentiment::Negative), Some((5.0, CategoryType::Business))),
            row(Some(Sentiment::Negative), Some((4.0, CategoryType::Business))),
            row(Some(Sentiment::Neutral), None),
        ];
        let split = category_type_counts(&rows);
        assert_eq!(split.user.positive, 1);
        assert_eq!(split.user.total, 1);
        assert_eq!(split.business.negative, 2);
        assert_eq!(split.business.total, 2);
    }

    #[test]
    fn test_clause_buckets_sorted_descending() {
        let mut rows = clause_rows("Section 5", 5);
        rows.extend(clause_rows("Section 12", 12));
        rows.extend(clause_rows("Section 3", 3));

        let totals: Vec<i64> = clause_breakdown(&rows).iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![12, 5, 3]);
    }

    #[test]
    fn test_clause_missing_or_blank_goes_to_overall() {
        let mut rows = clause_rows("  ", 1);
        rows.push(AnalyzedComment {
            sentiment: Some(Sentiment::Positive),
            ..Default::default()
        });

        let buckets = clause_breakdown(&rows);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].clause, OVERALL);
        assert_eq!(buckets[0].total, 2);
        assert_eq!(buckets[0].positive_percentage, 50.0);
    }

    #[test]
    fn test_clause_ties_keep_first_seen_order() {
        let mut rows = clause_rows("B", 2);
        rows.extend(clause_rows("A", 2));
        let clauses: Vec<String> = clause_breakdown(&rows).into_iter().map(|b| b.clause).collect();
        assert_eq!(clauses, vec!["B", "A"]);
    }

    #[test]
    fn test_top_keywords_frequency_then_first_seen() {
        let rows = vec![
            AnalyzedComment {
                keywords: vec!["timeline".into(), " costs ".into(), "".into()],
                ..Default::default()
            },
            AnalyzedComment {
                keywords: vec!["costs".into(), "moratorium".into(), "timeline".into()],
                ..Default::default()
            },
            AnalyzedComment {
                keywords: vec!["costs".into(), "resolution".into()],
                ..Default::default()
            },
        ];

        let top = top_keywords(&rows, 3);
        let names: Vec<&str> = top.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(names, vec!["costs", "timeline", "moratorium"]);
        assert_eq!(top[0].count, 3);
    }

    #[test]
    fn test_weighted_score_formula() {
        assert_eq!(weighted_score(3, 1, 6), 33.33);
        assert_eq!(weighted_score(0, 2, 2), -100.0);
        assert_eq!(weighted_score(0, 0, 0), 0.0);
    }
}
