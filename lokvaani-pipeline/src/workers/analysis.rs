//! Analysis worker
//!
//! Each run releases abandoned claims, claims a bounded batch of RAW comments
//! (oldest first) and sends them to the analyzer one at a time.
//!
//! Outcome per comment:
//! - analyzer reports `success: false` -> FAILED with its error
//! - transport error, timeout, non-2xx -> back to RAW, attempt counter +1
//! - success -> ANALYZED with derived fields overwritten
//!
//! A comment whose counter reaches the ceiling stays RAW and is never claimed
//! again.

use super::run_periodic;
use crate::db;
use crate::db::comments::AnalysisUpdate;
use crate::intake::CompletionRegistry;
use crate::services::{Analysis, CommentAnalyzer, ServiceError};
use crate::utils::RetryPolicy;
use chrono::Utc;
use lokvaani_common::db::{Comment, CommentStatus, Sentiment};
use lokvaani_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tuning for one worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub batch_size: usize,
    pub max_attempts: i64,
    pub lease_timeout: Duration,
    pub interval: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_attempts: 3,
            lease_timeout: Duration::from_secs(300),
            interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Stale PROCESSING claims returned to RAW
    pub released: u64,
    pub claimed: usize,
    pub analyzed: usize,
    pub failed: usize,
    /// Returned to RAW after a transient failure
    pub retried: usize,
    pub errors: Vec<String>,
}

enum Outcome {
    Analyzed,
    Failed,
    Retried,
}

/// Map the analyzer's derived fields onto the stored columns
pub fn analysis_update(analysis: Analysis) -> AnalysisUpdate {
    AnalysisUpdate {
        standard_comment: analysis.translated,
        language: analysis.language,
        sentiment: analysis.sentiment.as_deref().and_then(Sentiment::from_label),
        sentiment_score: analysis.sentiment_score,
        summary: analysis.summary,
        keywords: analysis.keywords,
        processed_at: Utc::now(),
    }
}

#[derive(Clone)]
pub struct AnalysisWorker {
    pool: SqlitePool,
    analyzer: Arc<dyn CommentAnalyzer>,
    policy: RetryPolicy,
    registry: CompletionRegistry,
    settings: AnalysisSettings,
}

impl AnalysisWorker {
    pub fn new(
        pool: SqlitePool,
        analyzer: Arc<dyn CommentAnalyzer>,
        policy: RetryPolicy,
        registry: CompletionRegistry,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            pool,
            analyzer,
            policy,
            registry,
            settings,
        }
    }

    /// One pass over the queue
    ///
    /// Store failures while claiming abort the run; failures while settling
    /// one comment are reported and the batch continues.
    pub async fn run_once(&self) -> Result<AnalysisReport> {
        let mut report = AnalysisReport::default();

        let lease = chrono::Duration::from_std(self.settings.lease_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        report.released = db::comments::release_stale_claims(&self.pool, Utc::now() - lease).await?;
        if report.released > 0 {
            warn!(released = report.released, "Released abandoned analysis claims");
        }

        let claimed = db::comments::claim_eligible(
            &self.pool,
            self.settings.max_attempts,
            self.settings.batch_size,
        )
        .await?;
        report.claimed = claimed.len();

        if claimed.is_empty() {
            debug!("No comments waiting for analysis");
            return Ok(report);
        }

        for comment in &claimed {
            match self.process(comment).await {
                Ok(Outcome::Analyzed) => report.analyzed += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::Retried) => report.retried += 1,
                Err(e) => {
                    error!(comment_id = %comment.id, error = %e, "Failed to record analysis outcome");
                    report.errors.push(format!("{}: {}", comment.id, e));
                }
            }
        }

        info!(
            claimed = report.claimed,
            analyzed = report.analyzed,
            failed = report.failed,
            retried = report.retried,
            "Analysis run complete"
        );
        Ok(report)
    }

    async fn process(&self, comment: &Comment) -> Result<Outcome> {
        let result = self
            .policy
            .run("analyze_comment", || self.analyzer.analyze(&comment.raw_comment))
            .await
            .map(|attempted| attempted.value)
            .map_err(|e| e.into_inner());

        match result {
            Ok(analysis) => {
                db::comments::mark_analyzed(&self.pool, &comment.id, &analysis_update(analysis)).await?;
                self.registry.complete(&comment.id, CommentStatus::Analyzed).await;
                debug!(comment_id = %comment.id, "Comment analyzed");
                Ok(Outcome::Analyzed)
            }
            Err(ServiceError::Rejected(reason)) => {
                db::comments::mark_failed(&self.pool, &comment.id, &reason).await?;
                self.registry.complete(&comment.id, CommentStatus::Failed).await;
                warn!(comment_id = %comment.id, reason = %reason, "Analyzer rejected comment");
                Ok(Outcome::Failed)
            }
            Err(e) => {
                let attempts =
                    db::comments::mark_transient_failure(&self.pool, &comment.id, &e.to_string()).await?;
                if attempts >= self.settings.max_attempts {
                    warn!(
                        comment_id = %comment.id,
                        attempts,
                        error = %e,
                        "Analysis attempts exhausted, comment quarantined"
                    );
                } else {
                    warn!(comment_id = %comment.id, attempts, error = %e, "Analysis failed, will retry");
                }
                Ok(Outcome::Retried)
            }
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let worker = &self;
        run_periodic("analysis", self.settings.interval, cancel, move || async move {
            if let Err(e) = worker.run_once().await {
                error!(error = %e, "Analysis run failed");
            }
        })
        .await;
    }
}
