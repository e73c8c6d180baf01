//! Manual comment submission
//!
//! A submitted comment enters the same RAW queue the ingestion scheduler
//! feeds. The submitter waits, bounded, for the analysis worker to settle it:
//! the worker resolves a per-comment oneshot held in the `CompletionRegistry`.

use crate::db;
use crate::db::comments::NewComment;
use lokvaani_common::db::{Comment, CommentStatus};
use lokvaani_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

/// Waiters for comments currently moving through analysis, keyed by comment id
#[derive(Clone, Default)]
pub struct CompletionRegistry {
    waiters: Arc<Mutex<HashMap<String, Vec<oneshot::Sender<CommentStatus>>>>>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a comment reaching ANALYZED or FAILED
    pub async fn register(&self, comment_id: &str) -> oneshot::Receiver<CommentStatus> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .await
            .entry(comment_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Resolve every waiter for `comment_id`; returns how many were notified
    pub async fn complete(&self, comment_id: &str, status: CommentStatus) -> usize {
        let Some(senders) = self.waiters.lock().await.remove(comment_id) else {
            return 0;
        };
        senders
            .into_iter()
            .filter_map(|tx| tx.send(status).ok())
            .count()
    }

    /// Drop every waiter for `comment_id` without resolving it
    pub async fn cancel(&self, comment_id: &str) {
        self.waiters.lock().await.remove(comment_id);
    }

    /// Number of comments with at least one waiter
    pub async fn pending(&self) -> usize {
        self.waiters.lock().await.len()
    }
}

/// Registration that is withdrawn when the waiting request goes away
///
/// `release` withdraws it explicitly. Dropping an unreleased guard (the
/// submitting request was cancelled mid-wait) removes it without awaiting.
struct WaiterGuard {
    registry: CompletionRegistry,
    comment_id: Option<String>,
}

impl WaiterGuard {
    fn new(registry: &CompletionRegistry, comment_id: &str) -> Self {
        Self {
            registry: registry.clone(),
            comment_id: Some(comment_id.to_string()),
        }
    }

    async fn release(mut self) {
        if let Some(comment_id) = self.comment_id.take() {
            self.registry.cancel(&comment_id).await;
        }
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        let Some(comment_id) = self.comment_id.take() else {
            return;
        };
        if let Ok(mut waiters) = self.registry.waiters.try_lock() {
            waiters.remove(&comment_id);
            return;
        }
        // Lock is busy; finish the removal on the runtime
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let registry = self.registry.clone();
            handle.spawn(async move { registry.cancel(&comment_id).await });
        }
    }
}

/// Submitted content: typed text or text extracted from an uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionContent {
    Text {
        comment: String,
    },
    Document {
        doc_url: String,
        extracted_text: String,
    },
}

impl SubmissionContent {
    pub fn text(&self) -> &str {
        match self {
            SubmissionContent::Text { comment } => comment,
            SubmissionContent::Document { extracted_text, .. } => extracted_text,
        }
    }

    pub fn doc_url(&self) -> Option<&str> {
        match self {
            SubmissionContent::Text { .. } => None,
            SubmissionContent::Document { doc_url, .. } => Some(doc_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub post_id: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub stakeholder_name: Option<String>,
    #[serde(default)]
    pub business_category_id: Option<String>,
    #[serde(default)]
    pub comment_type: Option<String>,
    pub content: SubmissionContent,
}

/// Stored record plus whether analysis settled it before the wait expired
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeOutcome {
    pub comment: Comment,
    pub completed: bool,
}

fn is_settled(status: CommentStatus) -> bool {
    matches!(status, CommentStatus::Analyzed | CommentStatus::Failed)
}

#[derive(Clone)]
pub struct IntakeService {
    pool: SqlitePool,
    registry: CompletionRegistry,
    timeout: Duration,
}

impl IntakeService {
    pub fn new(pool: SqlitePool, registry: CompletionRegistry, timeout: Duration) -> Self {
        Self {
            pool,
            registry,
            timeout,
        }
    }

    pub fn registry(&self) -> &CompletionRegistry {
        &self.registry
    }

    /// Persist a submission as RAW and wait (bounded) for analysis to settle it
    pub async fn submit(&self, submission: Submission) -> Result<IntakeOutcome> {
        if submission.post_id.trim().is_empty() {
            return Err(Error::InvalidInput("post_id is required".to_string()));
        }
        let text = submission.content.text().trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("comment text is empty".to_string()));
        }
        if let Some(category_id) = submission.business_category_id.as_deref() {
            if db::categories::get_category(&self.pool, category_id).await?.is_none() {
                return Err(Error::InvalidInput(format!(
                    "unknown business category: {}",
                    category_id
                )));
            }
        }

        let post_title = db::posts::get_post(&self.pool, &submission.post_id)
            .await?
            .and_then(|post| post.title);

        let comment = db::comments::insert_comment(
            &self.pool,
            &NewComment {
                post_id: submission.post_id.clone(),
                post_title,
                company_id: submission.company_id.clone(),
                stakeholder_name: submission.stakeholder_name.clone(),
                business_category_id: submission.business_category_id.clone(),
                raw_comment: text.to_string(),
                word_count: Some(text.split_whitespace().count() as i64),
                comment_type: submission.comment_type.clone(),
                doc_url: submission.content.doc_url().map(str::to_string),
            },
        )
        .await?;
        info!(comment_id = %comment.id, post_id = %comment.post_id, "Manual comment submitted");

        let rx = self.registry.register(&comment.id).await;
        let guard = WaiterGuard::new(&self.registry, &comment.id);

        // The worker may have settled the comment before the waiter existed
        let current = self.reload(&comment.id).await?;
        if is_settled(current.status) {
            guard.release().await;
            return Ok(IntakeOutcome {
                comment: current,
                completed: true,
            });
        }

        let completed = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(status)) => {
                debug!(comment_id = %comment.id, %status, "Manual comment settled");
                true
            }
            Ok(Err(_)) | Err(_) => {
                debug!(comment_id = %comment.id, "Manual comment still pending after wait");
                false
            }
        };
        guard.release().await;

        Ok(IntakeOutcome {
            comment: self.reload(&comment.id).await?,
            completed,
        })
    }

    async fn reload(&self, id: &str) -> Result<Comment> {
        db::comments::get_comment(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("comment {}", id)))
    }
}
