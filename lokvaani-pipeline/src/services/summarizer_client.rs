//! Category narrative summarizer client
//!
//! The summarizer takes a business category id (or the reserved `overall`)
//! and returns a prose summary of that category's comments. Calls can take
//! minutes.

use super::{endpoint, post_json, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeRequest<'a> {
    category_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeResponse {
    status_code: Option<u16>,
    data: Option<SummarizeData>,
}

#[derive(Debug, Deserialize)]
struct SummarizeData {
    summary: Option<String>,
    #[serde(default)]
    metadata: Option<SummarizeMetadata>,
}

#[derive(Debug, Deserialize)]
struct SummarizeMetadata {
    total_comments: Option<i64>,
    processing_time_seconds: Option<f64>,
}

/// Narrative text plus the service's own bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub summary: String,
    pub total_comments: Option<i64>,
    pub processing_time_seconds: Option<f64>,
}

#[async_trait]
pub trait CategorySummarizer: Send + Sync {
    async fn summarize(&self, category_id: &str) -> Result<Narrative, ServiceError>;
}

pub struct HttpSummarizer {
    client: reqwest::Client,
    url: String,
}

impl HttpSummarizer {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "summarize"),
        }
    }
}

#[async_trait]
impl CategorySummarizer for HttpSummarizer {
    async fn summarize(&self, category_id: &str) -> Result<Narrative, ServiceError> {
        let response: SummarizeResponse =
            post_json(&self.client, &self.url, &SummarizeRequest { category_id }).await?;
        into_narrative(response)
    }
}

fn into_narrative(response: SummarizeResponse) -> Result<Narrative, ServiceError> {
    if let Some(code) = response.status_code.filter(|c| !(200..300).contains(c)) {
        return Err(ServiceError::Rejected(format!("summarizer statusCode {}", code)));
    }

    let data = response
        .data
        .ok_or_else(|| ServiceError::Parse("summarizer response missing data".to_string()))?;
    let summary = data
        .summary
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServiceError::Rejected("summarizer returned no summary".to_string()))?;
    let metadata = data.metadata;

    Ok(Narrative {
        summary,
        total_comments: metadata.as_ref().and_then(|m| m.total_comments),
        processing_time_seconds: metadata.as_ref().and_then(|m| m.processing_time_seconds),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case_category_id() {
        let body = serde_json::to_value(SummarizeRequest { category_id: "overall" }).unwrap();
        assert_eq!(body, serde_json::json!({"categoryId": "overall"}));
    }

    #[test]
    fn test_response_with_metadata() {
        let response: SummarizeResponse = serde_json::from_str(
            r#"{"statusCode": 200, "data": {"summary": "Mostly supportive.",
                "metadata": {"total_comments": 12, "processing_time_seconds": 4.2}}}"#,
        )
        .unwrap();
        let narrative = into_narrative(response).unwrap();
        assert_eq!(narrative.summary, "Mostly supportive.");
        assert_eq!(narrative.total_comments, Some(12));
    }

    #[test]
    fn test_non_success_status_code_is_rejected() {
        let response: SummarizeResponse =
            serde_json::from_str(r#"{"statusCode": 500, "data": null}"#).unwrap();
        assert!(matches!(into_narrative(response), Err(ServiceError::Rejected(_))));
    }
}
