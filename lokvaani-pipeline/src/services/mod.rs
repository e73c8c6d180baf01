//! External enrichment service clients
//!
//! Each service sits behind an async trait so the workers, the aggregation
//! engine and the RAG service can be driven by in-process fakes in tests.
//! The HTTP implementations share one error type and one JSON POST helper;
//! per-call timeouts are applied by the caller's `RetryPolicy`.

pub mod analyzer_client;
pub mod answer_client;
pub mod embedding_client;
pub mod generator_client;
pub mod summarizer_client;

pub use analyzer_client::{Analysis, CommentAnalyzer, HttpAnalyzer};
pub use answer_client::{AnswerGenerator, AnswerRequest, HttpAnswerGenerator};
pub use embedding_client::{Embedder, HttpEmbedder};
pub use generator_client::{CommentGenerator, GeneratedComment, HttpGenerator};
pub use summarizer_client::{CategorySummarizer, HttpSummarizer, Narrative};

use crate::utils::Retryable;
use lokvaani_common::config::{AgentSettings, ServiceEndpoints};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lokvaani-pipeline/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// External service client errors
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Connection refused, reset, DNS failure
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx HTTP response
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// 2xx response whose body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// 2xx response in which the service reports its own failure
    #[error("Service rejected request: {0}")]
    Rejected(String),
}

impl ServiceError {
    /// Timeouts, transport failures, 5xx and 429 may succeed on a later call
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Network(_) | ServiceError::Timeout(_) => true,
            ServiceError::Status { code, .. } => *code >= 500 || *code == 429,
            ServiceError::Parse(_) | ServiceError::Rejected(_) => false,
        }
    }
}

impl Retryable for ServiceError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn timed_out(after: Duration) -> Self {
        ServiceError::Timeout(after)
    }
}

/// Build the shared reqwest client
pub(crate) fn build_http_client() -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ServiceError::Network(e.to_string()))
}

/// Join a base URL and an endpoint path without doubling slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// POST a JSON body and decode a JSON response
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<R, ServiceError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| ServiceError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Status {
            code: status.as_u16(),
            body,
        });
    }

    response
        .json::<R>()
        .await
        .map_err(|e| ServiceError::Parse(e.to_string()))
}

/// The full set of external services, shared by workers and handlers
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn CommentGenerator>,
    pub analyzer: Arc<dyn CommentAnalyzer>,
    pub embedder: Arc<dyn Embedder>,
    pub answerer: Arc<dyn AnswerGenerator>,
    pub summarizer: Arc<dyn CategorySummarizer>,
}

impl Services {
    /// HTTP clients for the configured endpoints
    pub fn http(endpoints: &ServiceEndpoints, agent: &AgentSettings) -> Result<Self, ServiceError> {
        let client = build_http_client()?;
        Ok(Self {
            generator: Arc::new(HttpGenerator::new(client.clone(), &endpoints.generator_url)),
            analyzer: Arc::new(HttpAnalyzer::new(client.clone(), &endpoints.analyzer_url)),
            embedder: Arc::new(HttpEmbedder::new(
                client.clone(),
                &endpoints.embedding_url,
                agent.embeddings_per_second,
            )),
            answerer: Arc::new(HttpAnswerGenerator::new(client.clone(), &endpoints.answer_url)),
            summarizer: Arc::new(HttpSummarizer::new(client, &endpoints.summarizer_url)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Network("refused".into()).is_transient());
        assert!(ServiceError::Timeout(Duration::from_secs(60)).is_transient());
        assert!(ServiceError::Status { code: 503, body: String::new() }.is_transient());
        assert!(ServiceError::Status { code: 429, body: String::new() }.is_transient());
        assert!(!ServiceError::Status { code: 400, body: String::new() }.is_transient());
        assert!(!ServiceError::Rejected("bad input".into()).is_transient());
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("http://host:5001/", "/generate"), "http://host:5001/generate");
        assert_eq!(endpoint("http://host:5001", "analyze"), "http://host:5001/analyze");
    }
}
