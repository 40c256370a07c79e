//! Synthetic provider used when no device store is wired in.
//!
//! Records are a pure function of wall-clock time: one steps record per minute and one
//! heart-rate record per five-minute bucket, each with an id that sorts in issuance order. A
//! record only appears once its interval has ended, so successive polls see new ids.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use healthlink_provider::{
    Capability, HealthProvider, HeartRateRecord, HeartRateSample, MetricRecord, ProviderResult,
    RecordType, StepRecord, TimeWindow,
};

const STEP_PERIOD_SECS: i64 = 60;
const HEART_RATE_BUCKET_SECS: i64 = 300;
const HEART_RATE_SAMPLE_SECS: i64 = 60;
/// Newest periods kept per read; older ones in a wider window are not generated.
const MAX_PERIODS_PER_READ: i64 = 7 * 24 * 60;

/// Deterministic health data derived from the requested window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedProvider;

impl SimulatedProvider {
    /// New simulated provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn steps(window: TimeWindow) -> Vec<MetricRecord> {
        periods(window, STEP_PERIOD_SECS, 0)
            .filter_map(|minute| {
                let end_time = instant(minute * STEP_PERIOD_SECS)?;
                Some(MetricRecord::Steps(StepRecord {
                    record_id: format!("steps-{minute:012}"),
                    end_time,
                    count: step_count(minute),
                }))
            })
            .collect()
    }

    fn heart_rate(window: TimeWindow) -> Vec<MetricRecord> {
        let span = HEART_RATE_BUCKET_SECS - HEART_RATE_SAMPLE_SECS;
        periods(window, HEART_RATE_BUCKET_SECS, span)
            .map(|bucket| {
                let base = bucket * HEART_RATE_BUCKET_SECS;
                let samples = (0..HEART_RATE_BUCKET_SECS / HEART_RATE_SAMPLE_SECS)
                    .filter_map(|offset| {
                        let seconds = base + offset * HEART_RATE_SAMPLE_SECS;
                        Some(HeartRateSample {
                            time: instant(seconds)?,
                            bpm: heart_rate_bpm(seconds / HEART_RATE_SAMPLE_SECS),
                        })
                    })
                    .collect();
                MetricRecord::HeartRate(HeartRateRecord {
                    record_id: format!("hr-{bucket:012}"),
                    samples,
                })
            })
            .collect()
    }
}

#[async_trait]
impl HealthProvider for SimulatedProvider {
    async fn read_records(
        &self,
        record_type: RecordType,
        window: TimeWindow,
    ) -> ProviderResult<Vec<MetricRecord>> {
        Ok(match record_type {
            RecordType::Steps => Self::steps(window),
            RecordType::HeartRate => Self::heart_rate(window),
        })
    }

    async fn granted_capabilities(&self) -> ProviderResult<BTreeSet<Capability>> {
        Ok(BTreeSet::from([
            RecordType::Steps.read_capability(),
            RecordType::HeartRate.read_capability(),
        ]))
    }
}

/// Newest period indices whose `[index * period, index * period + span]` lies inside `window`.
fn periods(window: TimeWindow, period: i64, span: i64) -> impl Iterator<Item = i64> {
    let first = window.start.timestamp().div_euclid(period)
        + i64::from(window.start.timestamp().rem_euclid(period) != 0);
    let last = (window.end.timestamp() - span).div_euclid(period);
    first.max(last - MAX_PERIODS_PER_READ + 1)..=last
}

fn instant(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::UNIX_EPOCH.checked_add_signed(TimeDelta::seconds(seconds))
}

fn step_count(minute: i64) -> u64 {
    // 40..=106 steps per minute with a repeating pattern.
    40 + u64::try_from(minute.rem_euclid(7) * 11).unwrap_or_default()
}

fn heart_rate_bpm(minute: i64) -> u32 {
    62 + u32::try_from(minute.rem_euclid(25)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, second)
            .single()
            .expect("valid instant")
    }

    #[tokio::test]
    async fn steps_are_one_per_elapsed_minute() -> anyhow::Result<()> {
        let provider = SimulatedProvider::new();
        let window = TimeWindow::new(at(10, 0, 30), at(10, 15, 10));
        let records = provider.read_records(RecordType::Steps, window).await?;

        assert_eq!(records.len(), 15);
        let ids: Vec<&str> = records.iter().map(MetricRecord::record_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        for record in &records {
            let MetricRecord::Steps(step) = record else {
                panic!("expected steps");
            };
            assert!(window.contains(step.end_time));
        }
        Ok(())
    }

    #[tokio::test]
    async fn heart_rate_buckets_only_appear_when_complete() -> anyhow::Result<()> {
        let provider = SimulatedProvider::new();
        let early = provider
            .read_records(
                RecordType::HeartRate,
                TimeWindow::new(at(9, 0, 0), at(9, 3, 0)),
            )
            .await?;
        assert!(early.is_empty());

        let later = provider
            .read_records(
                RecordType::HeartRate,
                TimeWindow::new(at(9, 0, 0), at(9, 4, 0)),
            )
            .await?;
        assert_eq!(later.len(), 1);
        let MetricRecord::HeartRate(record) = &later[0] else {
            panic!("expected heart rate");
        };
        assert_eq!(record.samples.len(), 5);
        assert_eq!(record.samples[4].time, at(9, 4, 0));
        Ok(())
    }

    #[tokio::test]
    async fn unbounded_windows_generate_a_bounded_tail() -> anyhow::Result<()> {
        let provider = SimulatedProvider::new();
        let window = TimeWindow::new(DateTime::<Utc>::MIN_UTC, at(12, 0, 0));
        let records = provider.read_records(RecordType::Steps, window).await?;

        let newest = format!("steps-{:012}", at(12, 0, 0).timestamp() / 60);
        assert_eq!(records.len(), 7 * 24 * 60);
        assert_eq!(
            records.last().map(MetricRecord::record_id),
            Some(newest.as_str())
        );
        Ok(())
    }

    #[tokio::test]
    async fn reads_are_stable_for_the_same_window() -> anyhow::Result<()> {
        let provider = SimulatedProvider::new();
        let window = TimeWindow::new(at(0, 0, 0), at(1, 0, 0));
        let first = provider.read_records(RecordType::Steps, window).await?;
        let second = provider.read_records(RecordType::Steps, window).await?;
        assert_eq!(first, second);
        assert_eq!(provider.granted_capabilities().await?.len(), 2);
        Ok(())
    }
}
