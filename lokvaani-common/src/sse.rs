//! Server-Sent Events (SSE) utilities
//!
//! Turns statistic events into SSE frames and builds the per-session stream:
//! an initial snapshot followed by live bus events for the subscribed channels.

use crate::events::{StatChannel, StatEvent};
use axum::response::sse::{Event, KeepAlive};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between keep-alive comments on idle connections
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Keep-alive used by every SSE endpoint
pub fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")
}

/// Encode a statistic event as one SSE frame
///
/// The SSE event name is the channel name and the data is the flat payload
/// object, so browser clients can `addEventListener(channel, ...)` directly.
pub fn stat_event_to_sse(event: &StatEvent) -> Result<Event, serde_json::Error> {
    let data = serde_json::to_string(&event.payload)?;
    Ok(Event::default()
        .event(event.channel.as_str())
        .id(crate::db::format_timestamp(event.computed_at))
        .data(data))
}

/// Build the stream for one dashboard session
///
/// `initial` is yielded first (snapshot-on-connect). Afterwards, events from
/// `rx` are forwarded when their channel is in `channels` and they were not
/// computed before that channel's snapshot. A lagged receiver skips what it
/// missed; the stream ends when the bus closes or `shutdown` fires.
pub fn stat_event_stream(
    initial: Vec<StatEvent>,
    mut rx: broadcast::Receiver<StatEvent>,
    channels: Vec<StatChannel>,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        info!(channels = channels.len(), "SSE: stat event stream started");

        let snapshot_at: HashMap<StatChannel, DateTime<Utc>> = initial
            .iter()
            .map(|event| (event.channel, event.computed_at))
            .collect();

        for event in initial {
            match stat_event_to_sse(&event) {
                Ok(frame) => yield Ok(frame),
                Err(e) => warn!("SSE: Failed to serialize snapshot {}: {}", event.channel, e),
            }
        }

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => None,
                received = rx.recv() => Some(received),
            };
            let Some(received) = received else {
                info!("SSE: Shutting down, ending stream");
                break;
            };

            match received {
                Ok(event) => {
                    if !channels.contains(&event.channel) {
                        continue;
                    }
                    if snapshot_at
                        .get(&event.channel)
                        .is_some_and(|&at| event.computed_at < at)
                    {
                        debug!("SSE: Dropping {} computed before the snapshot", event.channel);
                        continue;
                    }
                    match stat_event_to_sse(&event) {
                        Ok(frame) => {
                            debug!("SSE: Forwarding {}", event.channel);
                            yield Ok(frame);
                        }
                        Err(e) => warn!("SSE: Failed to serialize event {}: {}", event.channel, e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: Subscriber lagged, skipping missed events");
                }
                Err(RecvError::Closed) => {
                    info!("SSE: Event bus closed, ending stream");
                    break;
                }
            }
        }
    }
}
