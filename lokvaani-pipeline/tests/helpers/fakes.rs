//! In-process fakes for the external service traits

use async_trait::async_trait;
use lokvaani_pipeline::services::{
    Analysis, AnswerGenerator, AnswerRequest, CategorySummarizer, CommentAnalyzer, CommentGenerator,
    Embedder, GeneratedComment, Narrative, ServiceError,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Generator replaying a script; an empty script rejects every call
#[derive(Default)]
pub struct FakeGenerator {
    script: Mutex<VecDeque<Result<GeneratedComment, ServiceError>>>,
    pub calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn scripted(responses: Vec<Result<GeneratedComment, ServiceError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn comment(post_id: &str, text: &str) -> GeneratedComment {
        GeneratedComment {
            post_id: post_id.to_string(),
            post_title: Some("Draft Insolvency Amendment".to_string()),
            company_id: Some("company-1".to_string()),
            business_category_id: None,
            company_name: Some("Acme Ltd".to_string()),
            comment: text.to_string(),
            word_count: Some(text.split_whitespace().count() as i64),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentGenerator for FakeGenerator {
    async fn generate(&self) -> Result<GeneratedComment, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Rejected("script exhausted".to_string())))
    }
}

type AnalyzeFn = dyn Fn(&str) -> Result<Analysis, ServiceError> + Send + Sync;

/// Analyzer answering through a closure over the raw comment text
pub struct FakeAnalyzer {
    respond: Box<AnalyzeFn>,
    pub calls: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<Analysis, ServiceError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn analysis(sentiment: &str, keywords: &[&str]) -> Analysis {
        Analysis {
            translated: None,
            language: Some("en".to_string()),
            sentiment: Some(sentiment.to_string()),
            sentiment_score: Some(0.9),
            summary: Some("summary".to_string()),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn positive() -> Self {
        Self::new(|_| Ok(Self::analysis("positive", &[])))
    }

    /// Sentiment chosen by a word in the comment text
    pub fn by_content() -> Self {
        Self::new(|text| {
            let label = if text.contains("support") {
                "positive"
            } else if text.contains("oppose") {
                "negative"
            } else {
                "neutral"
            };
            Ok(Self::analysis(label, &["draft"]))
        })
    }

    pub fn failing(error: ServiceError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentAnalyzer for FakeAnalyzer {
    async fn analyze(&self, comment: &str) -> Result<Analysis, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(comment)
    }
}

/// Deterministic letter-frequency embeddings
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    /// Texts containing this marker fail
    pub fail_marker: Option<String>,
}

impl FakeEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_ascii_lowercase().chars() {
            if c.is_ascii_lowercase() {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        v
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(ServiceError::Status {
                    code: 503,
                    body: "unavailable".to_string(),
                });
            }
        }
        Ok(Self::vector(text))
    }
}

/// Answer generator recording every request
#[derive(Default)]
pub struct FakeAnswerer {
    pub requests: Mutex<Vec<AnswerRequest>>,
}

impl FakeAnswerer {
    pub fn last_request(&self) -> Option<AnswerRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AnswerGenerator for FakeAnswerer {
    async fn answer(&self, request: &AnswerRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("Answer to: {}", request.question))
    }
}

/// Summarizer failing for selected category ids
#[derive(Default)]
pub struct FakeSummarizer {
    pub failing: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn failing_for(category_ids: &[&str]) -> Self {
        Self {
            failing: category_ids.iter().map(|id| id.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CategorySummarizer for FakeSummarizer {
    async fn summarize(&self, category_id: &str) -> Result<Narrative, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(category_id) {
            return Err(ServiceError::Status {
                code: 500,
                body: "model error".to_string(),
            });
        }
        Ok(Narrative {
            summary: format!("Narrative for {}", category_id),
            total_comments: None,
            processing_time_seconds: None,
        })
    }
}
