//! Tick logic: two independent fetch-filter-emit passes per tick.
//!
//! # Design
//! - Each pass runs read, filter, marker update, then emit; nothing is emitted on failure.
//! - Failures are logged and counted, never forwarded to the subscriber.
//! - Each pass catches its own panics, so one metric failing never starves the other.
//! - The worker owns the markers while the loop runs and hands them back on stop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use healthlink_config::PollerSettings;
use healthlink_events::{EventSink, HeartRateEntry, PushEvent, StepsEntry};
use healthlink_provider::{
    Clock, HealthProvider, ProviderHandle, ProviderResult, RecordType, TimeWindow,
    collect_heart_rate, collect_steps, read_bounded,
};
use healthlink_telemetry::Metrics;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::dedup::{MarkerSnapshot, PollerState};
use crate::timer::{Tick, panic_message};

type PassOutcome = Result<ProviderResult<()>, Box<dyn Any + Send>>;

/// Per-attachment tick worker driven by the periodic timer.
pub struct TickWorker {
    provider: ProviderHandle,
    sink: Arc<dyn EventSink>,
    state: PollerState,
    settings: PollerSettings,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    markers: watch::Sender<MarkerSnapshot>,
}

impl TickWorker {
    /// Build a worker that emits to `sink`, starting from `state`.
    #[must_use]
    pub fn new(
        provider: ProviderHandle,
        sink: Arc<dyn EventSink>,
        state: PollerState,
        settings: PollerSettings,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
    ) -> Self {
        let (markers, _) = watch::channel(state.snapshot());
        Self {
            provider,
            sink,
            state,
            settings,
            clock,
            metrics,
            markers,
        }
    }

    /// Publish marker changes on `markers` instead of a private channel.
    #[must_use]
    pub fn with_marker_channel(self, markers: watch::Sender<MarkerSnapshot>) -> Self {
        markers.send_replace(self.state.snapshot());
        Self { markers, ..self }
    }

    /// Current markers.
    #[must_use]
    pub const fn state(&self) -> &PollerState {
        &self.state
    }

    /// Give back the markers once the loop has stopped.
    #[must_use]
    pub fn into_state(self) -> PollerState {
        self.state
    }

    /// Execute one tick.
    pub async fn run_once(&mut self) {
        self.metrics.inc_tick();
        let Some(provider) = self.provider.current() else {
            debug!("no provider installed; skipping tick");
            return;
        };
        let window = TimeWindow::lookback(self.clock.now(), self.settings.lookback);

        let steps = AssertUnwindSafe(self.poll_steps(provider.as_ref(), window))
            .catch_unwind()
            .await;
        self.finish_pass(RecordType::Steps, steps);
        let heart_rate = AssertUnwindSafe(self.poll_heart_rate(provider.as_ref(), window))
            .catch_unwind()
            .await;
        self.finish_pass(RecordType::HeartRate, heart_rate);
    }

    fn finish_pass(&self, record_type: RecordType, outcome: PassOutcome) {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.metrics.inc_read_failure(record_type.as_str());
                warn!(
                    metric = record_type.as_str(),
                    error = %err,
                    detail = %err.detail(),
                    "poll failed"
                );
            }
            Err(payload) => {
                self.metrics.inc_read_failure(record_type.as_str());
                self.metrics.inc_tick_panic();
                warn!(
                    metric = record_type.as_str(),
                    panic = %panic_message(payload.as_ref()),
                    "poll panicked"
                );
            }
        }
    }

    async fn poll_steps(
        &mut self,
        provider: &dyn HealthProvider,
        window: TimeWindow,
    ) -> ProviderResult<()> {
        let records = read_bounded(
            provider,
            RecordType::Steps,
            window,
            self.settings.read_timeout,
        )
        .await?;
        let fresh = self
            .state
            .steps
            .retain_unseen(collect_steps(records)?, |record| record.record_id.as_str());
        if fresh.is_empty() {
            return Ok(());
        }

        self.state
            .steps
            .advance(fresh.iter().map(|record| record.record_id.as_str()));
        let entries = fresh
            .into_iter()
            .map(|record| StepsEntry {
                timestamp: record.end_time,
                count: record.count,
                record_id: record.record_id,
            })
            .collect();
        self.emit(PushEvent::steps(entries, self.clock.now()));
        Ok(())
    }

    async fn poll_heart_rate(
        &mut self,
        provider: &dyn HealthProvider,
        window: TimeWindow,
    ) -> ProviderResult<()> {
        let records = read_bounded(
            provider,
            RecordType::HeartRate,
            window,
            self.settings.read_timeout,
        )
        .await?;
        let fresh = self
            .state
            .heart_rate
            .retain_unseen(collect_heart_rate(records)?, |record| record.record_id.as_str());
        if fresh.is_empty() {
            return Ok(());
        }

        self.state
            .heart_rate
            .advance(fresh.iter().map(|record| record.record_id.as_str()));
        // Sample-less records still move the marker; the event may then carry no entries.
        let entries = fresh
            .into_iter()
            .flat_map(|record| {
                let record_id = record.record_id;
                record
                    .samples
                    .into_iter()
                    .map(move |sample| HeartRateEntry {
                        timestamp: sample.time,
                        bpm: sample.bpm,
                        record_id: record_id.clone(),
                    })
            })
            .collect();
        self.emit(PushEvent::heart_rate(entries, self.clock.now()));
        Ok(())
    }

    fn emit(&self, event: PushEvent) {
        self.markers.send_replace(self.state.snapshot());
        let kind = event.kind().as_str();
        let records = event.len();
        debug!(kind, records, "emitting push event");
        self.sink.on_event(event);
        self.metrics.record_push_event(kind, records);
    }
}

impl Tick for TickWorker {
    async fn tick(&mut self) {
        self.run_once().await;
    }

    fn on_panic(&mut self, message: &str) {
        self.metrics.inc_tick_panic();
        warn!(panic = %message, "tick panicked; markers left as of the last completed pass");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use healthlink_config::DedupStrategy;
    use healthlink_events::PushPayload;
    use healthlink_test_support::{
        FakeProvider, ManualClock, RecordingSink, ScriptedFailure, heart_rate_record, step_record,
    };

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn worker(provider: &Arc<FakeProvider>, sink: &RecordingSink) -> TickWorker {
        TickWorker::new(
            ProviderHandle::with_provider(provider.clone()),
            Arc::new(sink.clone()),
            PollerState::new(DedupStrategy::LastId),
            PollerSettings::default(),
            Arc::new(ManualClock::new(noon())),
            Metrics::new().expect("metrics"),
        )
    }

    #[tokio::test]
    async fn steps_pass_emits_unseen_records_and_moves_marker() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_records(
            RecordType::Steps,
            vec![
                step_record("A", noon(), 10),
                step_record("B", noon(), 20),
                step_record("C", noon(), 30),
            ],
        );
        let sink = RecordingSink::new();
        let mut worker = worker(&provider, &sink);

        worker.run_once().await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record_ids(), vec!["A", "B", "C"]);
        assert_eq!(worker.state().steps.last_record_id(), Some("C"));
        assert_eq!(worker.state().heart_rate.last_record_id(), None);
    }

    #[tokio::test]
    async fn heart_rate_entries_are_flattened_per_sample() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_records(
            RecordType::HeartRate,
            vec![
                heart_rate_record("h1", &[(noon(), 60), (noon(), 62)]),
                heart_rate_record("h2", &[(noon(), 70)]),
            ],
        );
        let sink = RecordingSink::new();
        let mut worker = worker(&provider, &sink);

        worker.run_once().await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let PushPayload::HeartRate(entries) = &events[0].payload else {
            panic!("expected heart rate payload");
        };
        let bpm: Vec<u32> = entries.iter().map(|entry| entry.bpm).collect();
        assert_eq!(bpm, vec![60, 62, 70]);
        assert_eq!(entries[1].record_id, "h1");
        assert_eq!(worker.state().heart_rate.last_record_id(), Some("h2"));
    }

    #[tokio::test]
    async fn failed_read_leaves_marker_and_counts_failure() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_records(RecordType::Steps, vec![step_record("A", noon(), 5)]);
        let sink = RecordingSink::new();
        let mut worker = worker(&provider, &sink);
        worker.run_once().await;

        provider.set_records(RecordType::Steps, vec![step_record("B", noon(), 7)]);
        provider.fail_reads(RecordType::Steps, ScriptedFailure::Unavailable);
        worker.run_once().await;

        assert_eq!(sink.len(), 1);
        assert_eq!(worker.state().steps.last_record_id(), Some("A"));
        assert_eq!(worker.metrics.read_failures("steps"), 1);
    }

    #[tokio::test]
    async fn panicking_steps_pass_still_runs_heart_rate() {
        let provider = Arc::new(FakeProvider::new());
        provider.fail_reads(RecordType::Steps, ScriptedFailure::Panic);
        provider.set_records(
            RecordType::HeartRate,
            vec![heart_rate_record("h1", &[(noon(), 71)])],
        );
        let sink = RecordingSink::new();
        let mut worker = worker(&provider, &sink);

        worker.run_once().await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record_ids(), vec!["h1"]);
        assert_eq!(worker.state().steps.last_record_id(), None);
        assert_eq!(worker.state().heart_rate.last_record_id(), Some("h1"));
        assert_eq!(worker.metrics.read_failures("steps"), 1);
        assert_eq!(worker.metrics.snapshot().poller_tick_panics_total, 1);
    }

    #[tokio::test]
    async fn missing_provider_skips_the_tick() {
        let sink = RecordingSink::new();
        let mut worker = TickWorker::new(
            ProviderHandle::new(),
            Arc::new(sink.clone()),
            PollerState::new(DedupStrategy::LastId),
            PollerSettings::default(),
            Arc::new(ManualClock::new(noon())),
            Metrics::new().expect("metrics"),
        );
        worker.run_once().await;
        assert_eq!(sink.len(), 0);
        assert_eq!(worker.metrics.snapshot().poller_ticks_total, 1);
    }

    #[tokio::test]
    async fn reads_cover_the_lookback_window() {
        let provider = Arc::new(FakeProvider::new());
        let sink = RecordingSink::new();
        let mut worker = worker(&provider, &sink);
        worker.run_once().await;

        let windows = provider.read_windows();
        assert_eq!(windows.len(), 2);
        for (_, window) in windows {
            assert_eq!(window.end, noon());
            assert_eq!(window.end - window.start, chrono::TimeDelta::minutes(15));
        }
    }

    #[tokio::test]
    async fn marker_channel_tracks_emitted_ids() {
        let provider = Arc::new(FakeProvider::new());
        provider.set_records(RecordType::Steps, vec![step_record("S9", noon(), 1)]);
        let sink = RecordingSink::new();
        let (sender, receiver) = watch::channel(MarkerSnapshot::default());
        let mut worker = worker(&provider, &sink).with_marker_channel(sender);

        worker.run_once().await;

        assert_eq!(
            receiver.borrow().last_steps_record_id.as_deref(),
            Some("S9")
        );
    }
}
