//! Realtime broadcast service
//!
//! One `BroadcastService` per process. Every tick it recomputes all statistic
//! channels from the store and publishes them on the event bus; there is no
//! incremental tracking, so a missed tick self-corrects on the next one.
//! Dashboard sessions get a fresh snapshot on connect (see `api::sse`).

use crate::aggregation::{category_type_counts, sentiment_counts, weighted_sentiment, AggregationEngine};
use crate::workers::run_periodic;
use lokvaani_common::events::{EventBus, StatChannel, StatEvent, StatPayload};
use lokvaani_common::Result;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct BroadcastService {
    engine: AggregationEngine,
    bus: EventBus,
    interval: Duration,
}

impl BroadcastService {
    pub fn new(engine: AggregationEngine, bus: EventBus, interval: Duration) -> Self {
        Self {
            engine,
            bus,
            interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatEvent> {
        self.bus.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Compute fresh payloads for `channels` from the current store state
    ///
    /// Channels are global: they aggregate ANALYZED comments across all posts.
    pub async fn snapshot(&self, channels: &[StatChannel]) -> Result<Vec<StatEvent>> {
        let rows = self.engine.load(None).await?;

        let events = channels
            .iter()
            .map(|&channel| {
                let payload = match channel {
                    StatChannel::TotalCount => StatPayload::Counts(sentiment_counts(&rows)),
                    StatChannel::WeightedTotalCount => {
                        StatPayload::Weighted(weighted_sentiment(&rows))
                    }
                    StatChannel::NormalCount => StatPayload::Counts(category_type_counts(&rows).user),
                    StatChannel::IndustrialistCount => {
                        StatPayload::Counts(category_type_counts(&rows).business)
                    }
                };
                StatEvent::new(channel, payload)
            })
            .collect();

        Ok(events)
    }

    /// Recompute every channel and publish; returns the number of events sent
    pub async fn tick(&self) -> Result<usize> {
        let events = self.snapshot(&StatChannel::ALL).await?;
        let published = events.len();
        for event in events {
            self.bus.emit_lossy(event);
        }
        debug!(
            published,
            subscribers = self.bus.subscriber_count(),
            "Broadcast tick published"
        );
        Ok(published)
    }

    /// Periodic recompute loop; exits when `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        let service = &self;
        run_periodic("broadcast", self.interval, cancel, move || async move {
            if let Err(e) = service.tick().await {
                warn!(error = %e, "Broadcast recompute failed, skipping tick");
            }
        })
        .await;
    }
}
