//! Query service over the shared provider handle.
//!
//! # Design
//! - An absent provider is an expected startup state: every query answers with its default.
//! - Provider failures surface to the caller as tagged [`QueryError`]s, unlike the poller.
//! - Each read is bounded by the configured timeout.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use healthlink_config::QuerySettings;
use healthlink_provider::{
    Clock, ProviderHandle, RecordType, SystemClock, TimeWindow, collect_heart_rate,
    collect_steps, read_bounded,
};
use healthlink_telemetry::Metrics;
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::model::{HeartRateReading, PermissionStatus};

const OUTCOME_OK: &str = "ok";
const OUTCOME_UNAVAILABLE: &str = "unavailable";

/// Answers one-shot questions about permissions and recent metrics.
///
/// `Tz` decides where "today" starts for [`QueryService::get_today_steps`].
pub struct QueryService<Tz = Local> {
    provider: ProviderHandle,
    settings: QuerySettings,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    time_zone: Tz,
}

impl QueryService<Local> {
    /// Service using wall-clock time and the host's local time zone.
    #[must_use]
    pub fn new(provider: ProviderHandle, settings: QuerySettings, metrics: Metrics) -> Self {
        Self {
            provider,
            settings,
            clock: Arc::new(SystemClock),
            metrics,
            time_zone: Local,
        }
    }
}

impl<Tz> QueryService<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Compute calendar days in `time_zone` instead.
    #[must_use]
    pub fn with_time_zone<Other: TimeZone + Send + Sync>(
        self,
        time_zone: Other,
    ) -> QueryService<Other> {
        QueryService {
            provider: self.provider,
            settings: self.settings,
            clock: self.clock,
            metrics: self.metrics,
            time_zone,
        }
    }

    /// Which read capabilities are currently granted.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Permission`] if the provider cannot report its grants.
    pub async fn check_permissions(&self) -> QueryResult<PermissionStatus> {
        const OPERATION: &str = "check_permissions";
        let Some(provider) = self.provider.current() else {
            self.metrics.inc_query(OPERATION, OUTCOME_UNAVAILABLE);
            return Ok(PermissionStatus::default());
        };
        let granted = provider
            .granted_capabilities()
            .await
            .map_err(|source| QueryError::Permission { source });
        let granted = self.observe(OPERATION, granted)?;
        Ok(PermissionStatus {
            steps_granted: granted.contains(&RecordType::Steps.read_capability()),
            heart_rate_granted: granted.contains(&RecordType::HeartRate.read_capability()),
        })
    }

    /// Acknowledge a permission request; the prompt itself is owned by the host.
    #[must_use]
    pub fn request_permissions(&self) -> bool {
        self.metrics.inc_query("request_permissions", OUTCOME_OK);
        debug!("permission request acknowledged");
        true
    }

    /// Total steps since the start of the current calendar day.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Read`] if the provider read fails or times out.
    pub async fn get_today_steps(&self) -> QueryResult<u64> {
        const OPERATION: &str = "get_today_steps";
        let Some(provider) = self.provider.current() else {
            self.metrics.inc_query(OPERATION, OUTCOME_UNAVAILABLE);
            return Ok(0);
        };
        let window = TimeWindow::since_start_of_day(self.clock.now(), &self.time_zone);
        let records = read_bounded(
            provider.as_ref(),
            RecordType::Steps,
            window,
            self.settings.read_timeout,
        )
        .await
        .and_then(collect_steps)
        .map_err(|source| QueryError::Read {
            operation: OPERATION,
            source,
        });
        let records = self.observe(OPERATION, records)?;
        Ok(records
            .iter()
            .fold(0_u64, |total, record| total.saturating_add(record.count)))
    }

    /// Newest heart-rate sample within the look-back window, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Read`] if the provider read fails or times out.
    pub async fn get_latest_heart_rate(&self) -> QueryResult<Option<HeartRateReading>> {
        const OPERATION: &str = "get_latest_heart_rate";
        let Some(provider) = self.provider.current() else {
            self.metrics.inc_query(OPERATION, OUTCOME_UNAVAILABLE);
            return Ok(None);
        };
        let window = TimeWindow::lookback(self.clock.now(), self.settings.heart_rate_lookback);
        let records = read_bounded(
            provider.as_ref(),
            RecordType::HeartRate,
            window,
            self.settings.read_timeout,
        )
        .await
        .and_then(collect_heart_rate)
        .map_err(|source| QueryError::Read {
            operation: OPERATION,
            source,
        });
        let records = self.observe(OPERATION, records)?;

        // Only the newest record is consulted; an empty one means no data.
        Ok(records.last().and_then(|record| {
            record.samples.last().map(|sample| HeartRateReading {
                timestamp: sample.time,
                bpm: sample.bpm,
                record_id: record.record_id.clone(),
            })
        }))
    }

    fn observe<T>(&self, operation: &'static str, result: QueryResult<T>) -> QueryResult<T> {
        match &result {
            Ok(_) => self.metrics.inc_query(operation, OUTCOME_OK),
            Err(err) => {
                self.metrics.inc_query(operation, err.code());
                warn!(operation, code = err.code(), error = %err, detail = %err.message(), "query failed");
            }
        }
        result
    }
}

impl<Tz> std::fmt::Debug for QueryService<Tz> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("QueryService")
            .field("provider", &self.provider)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
    use healthlink_provider::Capability;
    use healthlink_test_support::{
        FakeProvider, ManualClock, ScriptedFailure, heart_rate_record, step_record,
    };

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, hour, minute, 0)
            .single()
            .expect("valid instant")
    }

    fn service(provider: &Arc<FakeProvider>, now: DateTime<Utc>) -> QueryService<Utc> {
        QueryService::new(
            ProviderHandle::with_provider(provider.clone()),
            QuerySettings::default(),
            Metrics::new().expect("metrics"),
        )
        .with_clock(Arc::new(ManualClock::new(now)))
        .with_time_zone(Utc)
    }

    fn detached() -> QueryService<Utc> {
        QueryService::new(
            ProviderHandle::new(),
            QuerySettings::default(),
            Metrics::new().expect("metrics"),
        )
        .with_time_zone(Utc)
    }

    #[tokio::test]
    async fn absent_provider_degrades_to_defaults() -> anyhow::Result<()> {
        let service = detached();
        assert_eq!(service.check_permissions().await?, PermissionStatus::default());
        assert_eq!(service.get_today_steps().await?, 0);
        assert_eq!(service.get_latest_heart_rate().await?, None);
        assert!(service.request_permissions());
        assert_eq!(service.metrics.queries("get_today_steps", "unavailable"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn today_steps_sums_every_record() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::new());
        provider.set_records(
            RecordType::Steps,
            vec![
                step_record("s1", at(8, 0), 1200),
                step_record("s2", at(9, 0), 1000),
                step_record("s3", at(11, 0), 2000),
            ],
        );
        let service = service(&provider, at(12, 30));

        assert_eq!(service.get_today_steps().await?, 4200);
        assert_eq!(service.metrics.queries("get_today_steps", "ok"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn today_window_starts_at_local_midnight() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::new());
        let offset = FixedOffset::east_opt(2 * 3600).expect("valid offset");
        let service = service(&provider, at(12, 30)).with_time_zone(offset);

        service.get_today_steps().await?;

        let windows = provider.read_windows();
        assert_eq!(windows.len(), 1);
        let (record_type, window) = windows[0];
        assert_eq!(record_type, RecordType::Steps);
        // 00:00 at UTC+2 is 22:00 UTC the previous day.
        assert_eq!(window.start, at(0, 0) - TimeDelta::hours(2));
        assert_eq!(window.end, at(12, 30));
        Ok(())
    }

    #[tokio::test]
    async fn read_failures_surface_as_read_errors() {
        let provider = Arc::new(FakeProvider::new());
        provider.fail_reads(RecordType::Steps, ScriptedFailure::Unavailable);
        provider.fail_reads(RecordType::HeartRate, ScriptedFailure::PermissionDenied);
        let service = service(&provider, at(12, 0));

        let steps = service.get_today_steps().await.expect_err("steps fail");
        assert_eq!(steps.code(), "READ_ERROR");
        let heart = service
            .get_latest_heart_rate()
            .await
            .expect_err("heart rate fails");
        assert_eq!(heart.code(), "READ_ERROR");
        assert!(heart.message().contains("read:heart_rate"));
        assert_eq!(service.metrics.queries("get_today_steps", "READ_ERROR"), 1);
    }

    #[tokio::test]
    async fn slow_reads_time_out() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_delay(Duration::from_millis(200));
        let service = QueryService::new(
            ProviderHandle::with_provider(provider.clone()),
            QuerySettings {
                read_timeout: Duration::from_millis(10),
                ..QuerySettings::default()
            },
            Metrics::new().expect("metrics"),
        )
        .with_time_zone(Utc);

        let err = service.get_today_steps().await.expect_err("timeout");
        assert!(err.message().contains("timed out"));
    }

    #[tokio::test]
    async fn latest_heart_rate_takes_last_sample_of_last_record() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::new());
        provider.set_records(
            RecordType::HeartRate,
            vec![
                heart_rate_record("hr-1", &[(at(11, 10), 80)]),
                heart_rate_record("hr-2", &[(at(11, 40), 68), (at(11, 50), 72)]),
            ],
        );
        let service = service(&provider, at(12, 0));

        let reading = service.get_latest_heart_rate().await?;
        assert_eq!(
            reading,
            Some(HeartRateReading {
                timestamp: at(11, 50),
                bpm: 72,
                record_id: "hr-2".into(),
            })
        );
        let (_, window) = provider.read_windows()[0];
        assert_eq!(window.end - window.start, TimeDelta::hours(1));
        Ok(())
    }

    #[tokio::test]
    async fn latest_heart_rate_reports_no_data() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::new());
        let service = service(&provider, at(12, 0));
        assert_eq!(service.get_latest_heart_rate().await?, None);

        provider.set_records(RecordType::HeartRate, vec![heart_rate_record("empty", &[])]);
        assert_eq!(service.get_latest_heart_rate().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn permissions_reflect_granted_capabilities() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::new());
        provider.grant([
            Capability::Read(RecordType::Steps),
            Capability::Write(RecordType::HeartRate),
        ]);
        let service = service(&provider, at(12, 0));

        assert_eq!(
            service.check_permissions().await?,
            PermissionStatus {
                steps_granted: true,
                heart_rate_granted: false,
            }
        );

        provider.fail_capabilities(Some(ScriptedFailure::Unavailable));
        let err = service.check_permissions().await.expect_err("lookup fails");
        assert_eq!(err.code(), "PERMISSION_ERROR");
        Ok(())
    }
}
