//! Query result shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the two read capabilities are granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionStatus {
    /// Steps can be read.
    pub steps_granted: bool,
    /// Heart rate can be read.
    pub heart_rate_granted: bool,
}

/// Most recent heart-rate sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateReading {
    /// Sample instant.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Beats per minute.
    pub bpm: u32,
    /// Record the sample came from.
    pub record_id: String,
}
