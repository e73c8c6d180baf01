//! Server-Sent Events for realtime statistics
//!
//! Each connection receives a freshly computed snapshot of its channels, then
//! every broadcast tick for those channels, with heartbeat comments while idle.

use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use lokvaani_common::events::StatChannel;
use lokvaani_common::sse::{keep_alive, stat_event_stream};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated channel names; all channels when absent
    pub channels: Option<String>,
}

/// GET /events?channels=a,b
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let channels = StatChannel::parse_list(query.channels.as_deref())?;

    // Subscribe before computing the snapshot so no tick falls between them;
    // ticks computed before the snapshot are dropped by the stream
    let rx = state.broadcast.subscribe();
    let snapshot = state.broadcast.snapshot(&channels).await?;

    info!(
        channels = channels.len(),
        subscribers = state.broadcast.subscriber_count(),
        "New SSE client connected to statistics"
    );

    let stream = stat_event_stream(snapshot, rx, channels, state.shutdown.clone());
    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}
