//! Typed push event payloads and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Discriminator for push events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// New step records.
    Steps,
    /// New heart-rate samples.
    HeartRate,
}

impl EventKind {
    /// Machine-friendly discriminator used as the wire key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::HeartRate => "heartRate",
        }
    }
}

/// One step record as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsEntry {
    /// End of the counting interval.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Steps in the interval.
    pub count: u64,
    /// Identifier of the originating record.
    pub record_id: String,
}

/// One heart-rate sample as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateEntry {
    /// Sample instant.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Beats per minute.
    pub bpm: u32,
    /// Identifier of the record the sample belongs to.
    pub record_id: String,
}

/// Entries carried by a push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushPayload {
    /// Step entries, one per record.
    Steps(Vec<StepsEntry>),
    /// Heart-rate entries, one per sample.
    HeartRate(Vec<HeartRateEntry>),
}

/// Single unit of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Wall-clock time at which the event was built.
    pub emitted_at: DateTime<Utc>,
    /// Entries delivered with the event.
    pub payload: PushPayload,
}

impl PushEvent {
    /// Build a steps event.
    #[must_use]
    pub const fn steps(entries: Vec<StepsEntry>, emitted_at: DateTime<Utc>) -> Self {
        Self {
            emitted_at,
            payload: PushPayload::Steps(entries),
        }
    }

    /// Build a heart-rate event.
    #[must_use]
    pub const fn heart_rate(entries: Vec<HeartRateEntry>, emitted_at: DateTime<Utc>) -> Self {
        Self {
            emitted_at,
            payload: PushPayload::HeartRate(entries),
        }
    }

    /// Kind of the carried payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self.payload {
            PushPayload::Steps(_) => EventKind::Steps,
            PushPayload::HeartRate(_) => EventKind::HeartRate,
        }
    }

    /// Number of entries carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.payload {
            PushPayload::Steps(entries) => entries.len(),
            PushPayload::HeartRate(entries) => entries.len(),
        }
    }

    /// Whether the event carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record identifiers of the carried entries, in order.
    #[must_use]
    pub fn record_ids(&self) -> Vec<&str> {
        match &self.payload {
            PushPayload::Steps(entries) => {
                entries.iter().map(|entry| entry.record_id.as_str()).collect()
            }
            PushPayload::HeartRate(entries) => {
                entries.iter().map(|entry| entry.record_id.as_str()).collect()
            }
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum WireEntry<'a> {
    #[serde(rename = "steps")]
    Steps(&'a StepsEntry),
    #[serde(rename = "heartRate")]
    HeartRate(&'a HeartRateEntry),
}

#[derive(Serialize)]
struct WireEvent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<WireEntry<'a>>>,
    #[serde(rename = "heartRate", skip_serializing_if = "Option::is_none")]
    heart_rate: Option<Vec<WireEntry<'a>>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

impl Serialize for PushEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (steps, heart_rate): (Option<Vec<WireEntry<'_>>>, Option<Vec<WireEntry<'_>>>) =
            match &self.payload {
                PushPayload::Steps(entries) => {
                    (Some(entries.iter().map(WireEntry::Steps).collect()), None)
                }
                PushPayload::HeartRate(entries) => (
                    None,
                    Some(entries.iter().map(WireEntry::HeartRate).collect()),
                ),
            };
        WireEvent {
            steps,
            heart_rate,
            timestamp: self.emitted_at,
        }
        .serialize(serializer)
    }
}
