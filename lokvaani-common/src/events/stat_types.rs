//! Statistic payloads carried by broadcast events
//!
//! These are the flat objects dashboard clients receive; the aggregation
//! engine produces them and the HTTP API returns the same shapes.

use serde::{Deserialize, Serialize};

/// Unweighted sentiment counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    /// All analyzed comments in scope, including those without a sentiment
    pub total: i64,
}

/// Unweighted counts split by category type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTypeCounts {
    pub user: SentimentCounts,
    pub business: SentimentCounts,
}

/// Percentages rounded to two decimals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentPercentages {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Accumulated weight per sentiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentWeights {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Weighted percentages for one category type with its own denominator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeightBreakdown {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub user: CategoryWeightBreakdown,
    pub business: CategoryWeightBreakdown,
}

/// Stakeholder-influence-weighted sentiment distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedSentiment {
    /// Analyzed comments carrying a sentiment label
    pub total_analyzed_comments: i64,
    pub total_weight: f64,
    pub weighted_percentages: SentimentPercentages,
    pub category_breakdown: CategoryBreakdown,
    pub raw_weights: SentimentWeights,
    /// Comments whose category id is set but matched no category (weighted as 1)
    pub missing_category_lookups: i64,
}
