//! Background workers
//!
//! Each worker is a fixed-interval loop. A run always finishes before the next
//! tick is considered (`MissedTickBehavior::Delay`), so runs of one worker
//! never overlap. All loops stop on the shared `CancellationToken`.

pub mod analysis;
pub mod health;
pub mod ingestion;

pub use analysis::{AnalysisReport, AnalysisWorker};
pub use health::{pipeline_health, HealthMonitor, PipelineHealth};
pub use ingestion::{IngestionReport, IngestionScheduler, SlotError};

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run `job` every `period` until `cancel` fires
///
/// The first run happens immediately. Cancellation is observed between runs;
/// an in-flight run is allowed to finish.
pub async fn run_periodic<F, Fut>(name: &str, period: Duration, cancel: CancellationToken, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(worker = name, interval_secs = period.as_secs(), "Worker started");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(worker = name, "Worker stopping");
                break;
            }
            _ = ticker.tick() => job().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_cancelled() {
        let cancel = CancellationToken::new();
        let runs = Arc::new(AtomicU32::new(0));

        let handle = {
            let cancel = cancel.clone();
            let runs = runs.clone();
            tokio::spawn(async move {
                run_periodic("test", Duration::from_secs(10), cancel, || {
                    let runs = runs.clone();
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();
        handle.await.unwrap();

        // t = 0, 10, 20
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
