//! Embedding service client
//!
//! The embedding service has a soft, undocumented rate limit, so the HTTP
//! client paces itself with a token bucket on top of the inter-batch delays
//! the RAG sync already applies.

use super::{endpoint, post_json, ServiceError};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed already-truncated text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, base_url: &str, per_second: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            client,
            url: endpoint(base_url, "embed"),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.rate_limiter.until_ready().await;

        let response: EmbedResponse =
            post_json(&self.client, &self.url, &EmbedRequest { text }).await?;

        if response.embedding.is_empty() {
            return Err(ServiceError::Parse("empty embedding".to_string()));
        }
        Ok(response.embedding)
    }
}
