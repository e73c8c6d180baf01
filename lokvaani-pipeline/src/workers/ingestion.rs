//! Ingestion scheduler
//!
//! Fills a fixed number of generator slots per run. Each slot retries the
//! generator up to the policy ceiling; a slot that never succeeds becomes an
//! error entry in the run report and the remaining slots carry on.

use super::run_periodic;
use crate::db;
use crate::db::comments::NewComment;
use crate::services::{CommentGenerator, GeneratedComment};
use crate::utils::RetryPolicy;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotError {
    /// 1-based slot number within the run
    pub slot: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub attempted: usize,
    pub successful: usize,
    pub created_comment_ids: Vec<String>,
    pub errors: Vec<SlotError>,
}

impl IngestionReport {
    /// At least one slot produced a comment
    pub fn is_success(&self) -> bool {
        self.successful > 0
    }
}

#[derive(Clone)]
pub struct IngestionScheduler {
    pool: SqlitePool,
    generator: Arc<dyn CommentGenerator>,
    policy: RetryPolicy,
    slots: usize,
    interval: Duration,
}

impl IngestionScheduler {
    pub fn new(
        pool: SqlitePool,
        generator: Arc<dyn CommentGenerator>,
        policy: RetryPolicy,
        slots: usize,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            generator,
            policy,
            slots,
            interval,
        }
    }

    /// Fill every slot once
    pub async fn run_once(&self) -> IngestionReport {
        let mut report = IngestionReport {
            attempted: self.slots,
            ..Default::default()
        };

        for slot in 1..=self.slots {
            // Every generator failure, logical or transport, spends an attempt
            let generated = self
                .policy
                .run_classified("generate_comment", |_| true, || self.generator.generate())
                .await;

            let generated = match generated {
                Ok(attempted) => attempted.value,
                Err(e) => {
                    warn!(slot, attempts = e.attempts(), error = %e, "Generator slot failed");
                    report.errors.push(SlotError {
                        slot,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match self.persist(&generated).await {
                Ok(comment_id) => {
                    report.successful += 1;
                    report.created_comment_ids.push(comment_id);
                }
                Err(e) => {
                    warn!(slot, error = %e, "Failed to store generated comment");
                    report.errors.push(SlotError {
                        slot,
                        message: e.to_string(),
                    });
                }
            }
        }

        if report.is_success() {
            info!(
                attempted = report.attempted,
                successful = report.successful,
                "Ingestion run complete"
            );
        } else {
            warn!(attempted = report.attempted, "Ingestion run produced no comments");
        }
        report
    }

    async fn persist(&self, generated: &GeneratedComment) -> lokvaani_common::Result<String> {
        let comment = db::comments::insert_comment(
            &self.pool,
            &NewComment {
                post_id: generated.post_id.clone(),
                post_title: generated.post_title.clone(),
                company_id: generated.company_id.clone(),
                stakeholder_name: generated.company_name.clone(),
                business_category_id: generated.business_category_id.clone(),
                raw_comment: generated.comment.clone(),
                word_count: generated.word_count,
                comment_type: None,
                doc_url: None,
            },
        )
        .await?;

        if let Some(title) = generated.post_title.as_deref() {
            if let Err(e) = db::posts::upsert_post(&self.pool, &generated.post_id, Some(title), None).await {
                warn!(post_id = %generated.post_id, error = %e, "Failed to record post title");
            }
        }

        Ok(comment.id)
    }

    pub async fn run(self, cancel: CancellationToken) {
        let scheduler = &self;
        run_periodic("ingestion", self.interval, cancel, move || async move {
            scheduler.run_once().await;
        })
        .await;
    }
}
