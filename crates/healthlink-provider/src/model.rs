//! Core health record types and read windows shared across the workspace.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// Metric families a provider can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Step count intervals.
    Steps,
    /// Heart-rate sample series.
    HeartRate,
}

impl RecordType {
    /// Machine-friendly label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::HeartRate => "heart_rate",
        }
    }

    /// Capability that gates reads of this record type.
    #[must_use]
    pub const fn read_capability(self) -> Capability {
        Capability::Read(self)
    }
}

impl Display for RecordType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Permission scope granted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "access", content = "record_type", rename_all = "snake_case")]
pub enum Capability {
    /// Read access to a record type.
    Read(RecordType),
    /// Write access to a record type.
    Write(RecordType),
}

impl Display for Capability {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(record_type) => write!(formatter, "read:{record_type}"),
            Self::Write(record_type) => write!(formatter, "write:{record_type}"),
        }
    }
}

/// Closed time interval bounding a provider read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, ordering the bounds if they were supplied reversed.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Window covering `span` immediately before `end`.
    #[must_use]
    pub fn lookback(end: DateTime<Utc>, span: Duration) -> Self {
        let start = TimeDelta::from_std(span)
            .ok()
            .and_then(|delta| end.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// Window from the start of the calendar day containing `now` (in `tz`) up to `now`.
    #[must_use]
    pub fn since_start_of_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Self {
        let midnight = now.with_timezone(tz).date_naive().and_time(NaiveTime::MIN);
        let start = tz
            .from_local_datetime(&midnight)
            .earliest()
            .map_or_else(|| midnight.and_utc(), |local| local.with_timezone(&Utc));
        Self::new(start, now)
    }

    /// Whether `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Step count accumulated over an interval ending at `end_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Provider-assigned identifier, stable across reads.
    pub record_id: String,
    /// End of the counting interval.
    pub end_time: DateTime<Utc>,
    /// Steps taken during the interval.
    pub count: u64,
}

/// Single heart-rate measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Measurement instant.
    pub time: DateTime<Utc>,
    /// Beats per minute.
    pub bpm: u32,
}

/// Series of heart-rate samples stored as one provider record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateRecord {
    /// Provider-assigned identifier, stable across reads.
    pub record_id: String,
    /// Samples in time order.
    pub samples: Vec<HeartRateSample>,
}

/// Any record a provider can return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricRecord {
    /// Step count record.
    Steps(StepRecord),
    /// Heart-rate record.
    HeartRate(HeartRateRecord),
}

impl MetricRecord {
    /// Identifier of the wrapped record.
    #[must_use]
    pub fn record_id(&self) -> &str {
        match self {
            Self::Steps(record) => &record.record_id,
            Self::HeartRate(record) => &record.record_id,
        }
    }

    /// Record type of the wrapped record.
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::Steps(_) => RecordType::Steps,
            Self::HeartRate(_) => RecordType::HeartRate,
        }
    }
}

impl From<StepRecord> for MetricRecord {
    fn from(record: StepRecord) -> Self {
        Self::Steps(record)
    }
}

impl From<HeartRateRecord> for MetricRecord {
    fn from(record: HeartRateRecord) -> Self {
        Self::HeartRate(record)
    }
}

/// Narrow a steps response to step records, rejecting foreign record types.
///
/// # Errors
///
/// Returns [`ProviderError::Malformed`] if the response contains a non-steps record.
pub fn collect_steps(records: Vec<MetricRecord>) -> ProviderResult<Vec<StepRecord>> {
    records
        .into_iter()
        .map(|record| match record {
            MetricRecord::Steps(steps) => Ok(steps),
            other => Err(mismatch(RecordType::Steps, &other)),
        })
        .collect()
}

/// Narrow a heart-rate response to heart-rate records, rejecting foreign record types.
///
/// # Errors
///
/// Returns [`ProviderError::Malformed`] if the response contains a non-heart-rate record.
pub fn collect_heart_rate(records: Vec<MetricRecord>) -> ProviderResult<Vec<HeartRateRecord>> {
    records
        .into_iter()
        .map(|record| match record {
            MetricRecord::HeartRate(heart_rate) => Ok(heart_rate),
            other => Err(mismatch(RecordType::HeartRate, &other)),
        })
        .collect()
}

fn mismatch(requested: RecordType, record: &MetricRecord) -> ProviderError {
    ProviderError::Malformed {
        record_type: requested,
        detail: format!(
            "record {} has type {}",
            record.record_id(),
            record.record_type()
        ),
    }
}
