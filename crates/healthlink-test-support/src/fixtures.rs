//! Record builders and a controllable clock.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use healthlink_provider::{Clock, HeartRateRecord, HeartRateSample, MetricRecord, StepRecord};

/// Steps record with the given id, end time and count.
#[must_use]
pub fn step_record(record_id: &str, end_time: DateTime<Utc>, count: u64) -> MetricRecord {
    MetricRecord::Steps(StepRecord {
        record_id: record_id.to_string(),
        end_time,
        count,
    })
}

/// Heart-rate record built from `(time, bpm)` pairs.
#[must_use]
pub fn heart_rate_record(record_id: &str, samples: &[(DateTime<Utc>, u32)]) -> MetricRecord {
    MetricRecord::HeartRate(HeartRateRecord {
        record_id: record_id.to_string(),
        samples: samples
            .iter()
            .map(|&(time, bpm)| HeartRateSample { time, bpm })
            .collect(),
    })
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `step`.
    pub fn advance(&self, step: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = TimeDelta::from_std(step)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
        {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_moves_only_when_asked() {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid instant");
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - start, TimeDelta::seconds(90));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn builders_preserve_sample_order() {
        let at = Utc::now();
        let record = heart_rate_record("h", &[(at, 1), (at, 2)]);
        let MetricRecord::HeartRate(record) = record else {
            panic!("expected heart rate record");
        };
        assert_eq!(record.samples[1].bpm, 2);
        assert_eq!(step_record("s", at, 9).record_id(), "s");
    }
}
