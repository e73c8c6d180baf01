//! Grounded answer generation client

use super::{endpoint, post_json, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// System instruction, grounding context and user question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRequest {
    pub system: String,
    pub context: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    text: String,
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, request: &AnswerRequest) -> Result<String, ServiceError>;
}

pub struct HttpAnswerGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpAnswerGenerator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "generate"),
        }
    }
}

#[async_trait]
impl AnswerGenerator for HttpAnswerGenerator {
    async fn answer(&self, request: &AnswerRequest) -> Result<String, ServiceError> {
        let response: AnswerResponse = post_json(&self.client, &self.url, request).await?;
        if response.text.trim().is_empty() {
            return Err(ServiceError::Rejected("empty answer".to_string()));
        }
        Ok(response.text)
    }
}
