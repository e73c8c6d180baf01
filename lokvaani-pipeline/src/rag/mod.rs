//! Retrieval-augmented question answering over a draft and its comments
//!
//! `sync` embeds the draft text (once) and any analyzed comments that have no
//! vector yet; `ask` ranks the stored vectors against the question, assembles
//! a grounding context and calls the answer generator.

mod chunking;
mod context;
mod similarity;

pub use chunking::{split_into_chunks, truncate_chars, ChunkingConfig};
pub use context::{build_context, statistics_context, SYSTEM_PROMPT};
pub use similarity::{cosine_similarity, top_k_by_similarity};

use crate::db;
use crate::services::{AnswerGenerator, AnswerRequest, Embedder, ServiceError};
use crate::utils::RetryPolicy;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Store(#[from] lokvaani_common::Error),
}

pub type RagResult<T> = Result<T, RagError>;

/// Tuning for sync and retrieval
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    /// Text is truncated to this many chars before embedding
    pub embed_max_chars: usize,
    pub chunk_delay: Duration,
    pub comment_batch_size: usize,
    pub batch_delay: Duration,
    pub comment_sync_limit: i64,
    pub top_k_chunks: usize,
    pub top_k_comments: usize,
    pub embedding_policy: RetryPolicy,
    pub answer_policy: RetryPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            embed_max_chars: 2000,
            chunk_delay: Duration::from_millis(300),
            comment_batch_size: 20,
            batch_delay: Duration::from_millis(500),
            comment_sync_limit: 2000,
            top_k_chunks: 3,
            top_k_comments: 10,
            embedding_policy: RetryPolicy::once(Duration::from_secs(30)),
            answer_policy: RetryPolicy::once(Duration::from_secs(120)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub processed_chunks: usize,
    pub processed_comments: usize,
    pub total_comments_in_draft: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub is_initialized: bool,
    pub draft_chunk_count: i64,
    pub comments_processed: i64,
    pub total_comments: i64,
    pub needs_sync: bool,
}

/// Retrieval counts reported alongside an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerContext {
    pub draft_chunks_found: usize,
    pub comments_found: usize,
    pub has_statistics: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub context: AnswerContext,
}

#[derive(Clone)]
pub struct RagService {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn AnswerGenerator>,
    config: RagConfig,
}

impl RagService {
    pub fn new(
        pool: SqlitePool,
        embedder: Arc<dyn Embedder>,
        answerer: Arc<dyn AnswerGenerator>,
        config: RagConfig,
    ) -> Self {
        Self {
            pool,
            embedder,
            answerer,
            config,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let text = truncate_chars(text, self.config.embed_max_chars);
        self.config
            .embedding_policy
            .run("embed", || self.embedder.embed(text))
            .await
            .map(|attempted| attempted.value)
            .map_err(|e| e.into_inner())
    }

    /// Embed the draft (first sync only) and every comment lacking a vector
    pub async fn sync(&self, post_id: &str) -> RagResult<SyncReport> {
        let post = db::posts::get_post(&self.pool, post_id)
            .await?
            .ok_or_else(|| RagError::PostNotFound(post_id.to_string()))?;

        let mut processed_chunks = 0;
        let existing_chunks = db::vectors::count_draft_chunks(&self.pool, post_id).await?;
        match post.extracted_text.as_deref() {
            Some(text) if existing_chunks == 0 => {
                let chunks = split_into_chunks(text, &self.config.chunking);
                info!(post_id, chunks = chunks.len(), "Embedding draft text");

                for (index, chunk) in chunks.iter().enumerate() {
                    match self.embed(chunk).await {
                        Ok(embedding) => {
                            if db::vectors::insert_draft_chunk(
                                &self.pool,
                                post_id,
                                index as i64,
                                chunk,
                                &embedding,
                            )
                            .await?
                            {
                                processed_chunks += 1;
                            }
                        }
                        Err(e) => warn!(post_id, chunk_index = index, error = %e, "Draft chunk embedding failed, skipping"),
                    }
                    if index + 1 < chunks.len() && !self.config.chunk_delay.is_zero() {
                        tokio::time::sleep(self.config.chunk_delay).await;
                    }
                }
            }
            Some(_) => debug!(post_id, existing_chunks, "Draft already embedded"),
            None => debug!(post_id, "Post has no extracted text to embed"),
        }

        let pending =
            db::vectors::list_pending_comments(&self.pool, post_id, self.config.comment_sync_limit)
                .await?;
        let batch_size = self.config.comment_batch_size.max(1);
        let batch_count = pending.len().div_ceil(batch_size);
        let mut processed_comments = 0;

        for (batch_index, batch) in pending.chunks(batch_size).enumerate() {
            let results = join_all(batch.iter().map(|comment| async move {
                let embedding = self.embed(&comment.raw_comment).await?;
                let inserted =
                    db::vectors::insert_comment_vector(&self.pool, &comment.comment_id, &embedding)
                        .await?;
                Ok::<bool, RagError>(inserted)
            }))
            .await;

            for (comment, result) in batch.iter().zip(results) {
                match result {
                    Ok(true) => processed_comments += 1,
                    Ok(false) => debug!(comment_id = %comment.comment_id, "Comment vector already present"),
                    Err(e) => warn!(comment_id = %comment.comment_id, error = %e, "Comment embedding failed, skipping"),
                }
            }

            if batch_index + 1 < batch_count && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        let total_comments_in_draft = db::comments::count_comments(
            &self.pool,
            &db::comments::CommentFilter::new().post(post_id).not_spam(),
        )
        .await?;

        info!(
            post_id,
            processed_chunks,
            processed_comments,
            total_comments_in_draft,
            "Agent sync complete"
        );

        Ok(SyncReport {
            processed_chunks,
            processed_comments,
            total_comments_in_draft,
        })
    }

    pub async fn status(&self, post_id: &str) -> RagResult<AgentStatus> {
        let draft_chunk_count = db::vectors::count_draft_chunks(&self.pool, post_id).await?;
        let comments_processed = db::vectors::count_comment_vectors(&self.pool, post_id).await?;
        let total_comments = db::vectors::count_embeddable_comments(&self.pool, post_id).await?;

        Ok(AgentStatus {
            is_initialized: draft_chunk_count > 0,
            draft_chunk_count,
            comments_processed,
            total_comments,
            needs_sync: total_comments > comments_processed,
        })
    }

    /// Answer a question grounded in the draft, its comments and the latest snapshot
    pub async fn ask(&self, post_id: &str, question: &str) -> RagResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".to_string()));
        }

        let query = self.embed(question).await?;

        let chunks = top_k_by_similarity(
            &query,
            db::vectors::load_draft_chunks(&self.pool, post_id).await?,
            self.config.top_k_chunks,
            |chunk| chunk.embedding.as_slice(),
        );
        let comments = top_k_by_similarity(
            &query,
            db::vectors::load_embedded_comments(&self.pool, post_id).await?,
            self.config.top_k_comments,
            |comment| comment.embedding.as_slice(),
        );
        let summary = db::summaries::latest_snapshot(&self.pool, post_id).await?;
        let title = db::posts::get_post(&self.pool, post_id)
            .await?
            .and_then(|post| post.title);

        let request = AnswerRequest {
            system: SYSTEM_PROMPT.to_string(),
            context: build_context(title.as_deref(), summary.as_ref(), &chunks, &comments),
            question: question.to_string(),
        };

        let answer = self
            .config
            .answer_policy
            .run("answer", || self.answerer.answer(&request))
            .await
            .map_err(|e| e.into_inner())?
            .value;

        debug!(
            post_id,
            chunks = chunks.len(),
            comments = comments.len(),
            "Question answered"
        );

        Ok(Answer {
            answer,
            context: AnswerContext {
                draft_chunks_found: chunks.len(),
                comments_found: comments.len(),
                has_statistics: summary.is_some(),
            },
        })
    }
}
