//! Pipeline health metrics

use super::run_periodic;
use crate::db::comments::{count_comments, CommentFilter};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lokvaani_common::db::CommentStatus;
use lokvaani_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const FAILED_WARN_THRESHOLD: i64 = 10;
const PROCESSING_WARN_THRESHOLD: i64 = 20;
const RECENT_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineHealth {
    /// Comments created in the last five minutes
    pub recent_comments: i64,
    pub processing: i64,
    pub failed: i64,
    /// RAW comments at the attempt ceiling, never claimed again
    pub quarantined: i64,
    pub checked_at: DateTime<Utc>,
}

impl PipelineHealth {
    pub fn is_degraded(&self) -> bool {
        self.failed > FAILED_WARN_THRESHOLD || self.processing > PROCESSING_WARN_THRESHOLD
    }
}

pub async fn pipeline_health(pool: &SqlitePool, max_attempts: i64) -> Result<PipelineHealth> {
    let now = Utc::now();
    let recent_comments = count_comments(
        pool,
        &CommentFilter::new().created_since(now - ChronoDuration::minutes(RECENT_WINDOW_MINUTES)),
    )
    .await?;
    let processing = count_comments(pool, &CommentFilter::new().status(CommentStatus::Processing)).await?;
    let failed = count_comments(pool, &CommentFilter::new().status(CommentStatus::Failed)).await?;
    let quarantined = count_comments(
        pool,
        &CommentFilter::new()
            .status(CommentStatus::Raw)
            .attempts_at_least(max_attempts),
    )
    .await?;

    Ok(PipelineHealth {
        recent_comments,
        processing,
        failed,
        quarantined,
        checked_at: now,
    })
}

/// Periodic health logger
#[derive(Clone)]
pub struct HealthMonitor {
    pool: SqlitePool,
    max_attempts: i64,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(pool: SqlitePool, max_attempts: i64, interval: Duration) -> Self {
        Self {
            pool,
            max_attempts,
            interval,
        }
    }

    pub async fn check(&self) -> Result<PipelineHealth> {
        let health = pipeline_health(&self.pool, self.max_attempts).await?;
        if health.is_degraded() {
            warn!(
                failed = health.failed,
                processing = health.processing,
                quarantined = health.quarantined,
                "Pipeline health degraded"
            );
        } else {
            info!(
                recent = health.recent_comments,
                processing = health.processing,
                failed = health.failed,
                quarantined = health.quarantined,
                "Pipeline health"
            );
        }
        Ok(health)
    }

    pub async fn run(self, cancel: CancellationToken) {
        let monitor = &self;
        run_periodic("health", self.interval, cancel, move || async move {
            if let Err(e) = monitor.check().await {
                error!(error = %e, "Health check failed");
            }
        })
        .await;
    }
}
