//! Sentiment/translation analyzer client

use super::{endpoint, post_json, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    comment: &'a str,
}

/// Analyzer response body
///
/// Field casing is mixed on the wire (`language_type`, `sentimentScore`).
#[derive(Debug, Clone, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    success: bool,
    translated: Option<String>,
    language_type: Option<String>,
    sentiment: Option<String>,
    #[serde(rename = "sentimentScore")]
    sentiment_score: Option<f64>,
    summary: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    error: Option<String>,
}

/// Derived fields for one comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub translated: Option<String>,
    pub language: Option<String>,
    /// Label as returned; normalized when stored
    pub sentiment: Option<String>,
    pub sentiment_score: Option<f64>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
}

#[async_trait]
pub trait CommentAnalyzer: Send + Sync {
    /// `Rejected` carries the analyzer's own error string on `success: false`
    async fn analyze(&self, comment: &str) -> Result<Analysis, ServiceError>;
}

pub struct HttpAnalyzer {
    client: reqwest::Client,
    url: String,
}

impl HttpAnalyzer {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "analyze"),
        }
    }
}

#[async_trait]
impl CommentAnalyzer for HttpAnalyzer {
    async fn analyze(&self, comment: &str) -> Result<Analysis, ServiceError> {
        let response: AnalyzeResponse =
            post_json(&self.client, &self.url, &AnalyzeRequest { comment }).await?;
        into_analysis(response)
    }
}

fn into_analysis(response: AnalyzeResponse) -> Result<Analysis, ServiceError> {
    if !response.success {
        return Err(ServiceError::Rejected(
            response.error.unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    Ok(Analysis {
        translated: response.translated,
        language: response.language_type,
        sentiment: response.sentiment,
        sentiment_score: response.sentiment_score,
        summary: response.summary,
        keywords: response.keywords.unwrap_or_default(),
    })
}
