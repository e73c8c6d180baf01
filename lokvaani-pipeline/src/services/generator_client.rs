//! Comment generator client
//!
//! The generator produces one synthetic stakeholder comment per call. The
//! request carries no parameters.

use super::{endpoint, post_json, ServiceError};
use async_trait::async_trait;
use serde::Deserialize;

/// Generator response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratorResponse {
    #[serde(default)]
    success: bool,
    post_id: Option<String>,
    post_title: Option<String>,
    company_id: Option<String>,
    business_category_id: Option<String>,
    company_name: Option<String>,
    comment: Option<String>,
    word_count: Option<i64>,
    error: Option<String>,
}

/// A comment ready to be stored as RAW
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedComment {
    pub post_id: String,
    pub post_title: Option<String>,
    pub company_id: Option<String>,
    pub business_category_id: Option<String>,
    pub company_name: Option<String>,
    pub comment: String,
    pub word_count: Option<i64>,
}

#[async_trait]
pub trait CommentGenerator: Send + Sync {
    /// `Rejected` when the generator answers with `success: false`
    async fn generate(&self) -> Result<GeneratedComment, ServiceError>;
}

pub struct HttpGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpGenerator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "generate"),
        }
    }
}

#[async_trait]
impl CommentGenerator for HttpGenerator {
    async fn generate(&self) -> Result<GeneratedComment, ServiceError> {
        tracing::debug!(url = %self.url, "Requesting generated comment");
        let response: GeneratorResponse =
            post_json(&self.client, &self.url, &serde_json::json!({})).await?;
        into_generated(response)
    }
}

fn into_generated(response: GeneratorResponse) -> Result<GeneratedComment, ServiceError> {
    if !response.success {
        return Err(ServiceError::Rejected(
            response
                .error
                .unwrap_or_else(|| "generator reported failure".to_string()),
        ));
    }

    let post_id = response
        .post_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ServiceError::Parse("generator response missing postId".to_string()))?;
    let comment = response
        .comment
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ServiceError::Parse("generator response missing comment".to_string()))?;

    Ok(GeneratedComment {
        post_id,
        post_title: response.post_title,
        company_id: response.company_id,
        business_category_id: response.business_category_id,
        company_name: response.company_name,
        comment,
        word_count: response.word_count,
    })
}
