//! Statistic events and the EventBus that distributes them
//!
//! The broadcast service publishes one `StatEvent` per named channel on every
//! tick; each SSE session filters the bus down to the channels it asked for.

mod stat_types;

pub use stat_types::{
    CategoryBreakdown, CategoryTypeCounts, CategoryWeightBreakdown, SentimentCounts,
    SentimentPercentages, SentimentWeights, WeightedSentiment,
};

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;

/// Logical statistic channel
///
/// Channel names form a flat namespace shared with dashboard clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatChannel {
    /// Unweighted counts over all analyzed comments
    #[serde(rename = "total-count-update")]
    TotalCount,
    /// Weighted percentages with category breakdown
    #[serde(rename = "weighted-total-count-update")]
    WeightedTotalCount,
    /// Unweighted counts for USER-type categories
    #[serde(rename = "normal-count-update")]
    NormalCount,
    /// Unweighted counts for BUSINESS-type categories
    #[serde(rename = "industrialist-count-update")]
    IndustrialistCount,
}

impl StatChannel {
    pub const ALL: [StatChannel; 4] = [
        StatChannel::TotalCount,
        StatChannel::WeightedTotalCount,
        StatChannel::NormalCount,
        StatChannel::IndustrialistCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatChannel::TotalCount => "total-count-update",
            StatChannel::WeightedTotalCount => "weighted-total-count-update",
            StatChannel::NormalCount => "normal-count-update",
            StatChannel::IndustrialistCount => "industrialist-count-update",
        }
    }

    /// Parse a comma-separated channel list
    ///
    /// An empty or absent list means every channel. Unknown names are an error
    /// so a typo does not silently produce a session that never updates.
    pub fn parse_list(list: Option<&str>) -> Result<Vec<StatChannel>, Error> {
        let Some(list) = list.map(str::trim).filter(|l| !l.is_empty()) else {
            return Ok(Self::ALL.to_vec());
        };

        let mut channels = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let channel: StatChannel = name.parse()?;
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        Ok(channels)
    }
}

impl fmt::Display for StatChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown channel: {}", s)))
    }
}

/// Payload published on a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatPayload {
    Counts(SentimentCounts),
    Weighted(WeightedSentiment),
}

/// One recomputed statistic for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEvent {
    pub channel: StatChannel,
    pub payload: StatPayload,
    pub computed_at: DateTime<Utc>,
}

impl StatEvent {
    pub fn new(channel: StatChannel, payload: StatPayload) -> Self {
        Self {
            channel,
            payload,
            computed_at: Utc::now(),
        }
    }
}

/// Central distribution bus for statistic events
///
/// Uses `tokio::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block the broadcaster)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged subscribers skip missed events rather than replaying them
///
/// # Examples
///
/// ```
/// use lokvaani_common::events::{EventBus, SentimentCounts, StatChannel, StatEvent, StatPayload};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(StatEvent::new(
///     StatChannel::TotalCount,
///     StatPayload::Counts(SentimentCounts::default()),
/// ));
///
/// assert_eq!(rx.try_recv().unwrap().channel, StatChannel::TotalCount);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StatEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StatEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StatEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
