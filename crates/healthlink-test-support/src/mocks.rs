//! Scripted provider and recording sink.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use healthlink_events::{EventSink, PushEvent};
use healthlink_provider::{
    Capability, HealthProvider, MetricRecord, ProviderError, ProviderResult, RecordType,
    TimeWindow,
};

/// Failure a [`FakeProvider`] can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Read capability revoked.
    PermissionDenied,
    /// Store not reachable.
    Unavailable,
    /// Response could not be decoded.
    Malformed,
    /// The read panics instead of returning.
    Panic,
}

impl ScriptedFailure {
    fn into_error(self, record_type: RecordType) -> ProviderError {
        match self {
            Self::PermissionDenied => ProviderError::PermissionDenied {
                capability: record_type.read_capability(),
            },
            Self::Unavailable | Self::Panic => ProviderError::Unavailable {
                detail: "scripted outage".to_string(),
            },
            Self::Malformed => ProviderError::Malformed {
                record_type,
                detail: "scripted garbage".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct Script {
    records: HashMap<RecordType, Vec<MetricRecord>>,
    failures: HashMap<RecordType, ScriptedFailure>,
    granted: BTreeSet<Capability>,
    capability_failure: Option<ScriptedFailure>,
    delay: Duration,
    started: HashMap<RecordType, usize>,
    completed: HashMap<RecordType, usize>,
    windows: Vec<(RecordType, TimeWindow)>,
}

/// In-memory provider whose responses are scripted by the test.
#[derive(Default)]
pub struct FakeProvider {
    script: Mutex<Script>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeProvider {
    /// Provider with no records and no granted capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the response for `record_type`.
    pub fn set_records(&self, record_type: RecordType, records: Vec<MetricRecord>) {
        self.script().records.insert(record_type, records);
    }

    /// Make every read of `record_type` fail until cleared.
    pub fn fail_reads(&self, record_type: RecordType, failure: ScriptedFailure) {
        self.script().failures.insert(record_type, failure);
    }

    /// Let reads of `record_type` succeed again.
    pub fn clear_failure(&self, record_type: RecordType) {
        self.script().failures.remove(&record_type);
    }

    /// Replace the granted capability set.
    pub fn grant(&self, capabilities: impl IntoIterator<Item = Capability>) {
        self.script().granted = capabilities.into_iter().collect();
    }

    /// Make capability lookups fail (or succeed again with `None`).
    pub fn fail_capabilities(&self, failure: Option<ScriptedFailure>) {
        self.script().capability_failure = failure;
    }

    /// Delay applied to every read before it answers.
    pub fn set_delay(&self, delay: Duration) {
        self.script().delay = delay;
    }

    /// Reads of `record_type` that have begun.
    #[must_use]
    pub fn reads_started(&self, record_type: RecordType) -> usize {
        self.script()
            .started
            .get(&record_type)
            .copied()
            .unwrap_or_default()
    }

    /// Reads of `record_type` that ran to completion.
    #[must_use]
    pub fn reads_completed(&self, record_type: RecordType) -> usize {
        self.script()
            .completed
            .get(&record_type)
            .copied()
            .unwrap_or_default()
    }

    /// Windows requested so far, in call order.
    #[must_use]
    pub fn read_windows(&self) -> Vec<(RecordType, TimeWindow)> {
        self.script().windows.clone()
    }

    /// Highest number of reads that were in flight at the same time.
    #[must_use]
    pub fn peak_concurrent_reads(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthProvider for FakeProvider {
    async fn read_records(
        &self,
        record_type: RecordType,
        window: TimeWindow,
    ) -> ProviderResult<Vec<MetricRecord>> {
        let delay = {
            let mut script = self.script();
            *script.started.entry(record_type).or_default() += 1;
            script.windows.push((record_type, window));
            script.delay
        };
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(active, Ordering::SeqCst);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let mut script = self.script();
            *script.completed.entry(record_type).or_default() += 1;
            match script.failures.get(&record_type) {
                Some(failure) => Err(*failure),
                None => Ok(script.records.get(&record_type).cloned().unwrap_or_default()),
            }
        };
        match outcome {
            Ok(records) => Ok(records),
            Err(ScriptedFailure::Panic) => panic!("scripted provider panic"),
            Err(failure) => Err(failure.into_error(record_type)),
        }
    }

    async fn granted_capabilities(&self) -> ProviderResult<BTreeSet<Capability>> {
        let script = self.script();
        match script.capability_failure {
            Some(failure) => Err(failure.into_error(RecordType::Steps)),
            None => Ok(script.granted.clone()),
        }
    }
}

/// Sink that keeps every delivered event.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<PushEvent>>>,
}

impl RecordingSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<PushEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` events arrived. Returns `false` on timeout.
    pub async fn wait_for(&self, count: usize, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            while self.len() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .is_ok()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: PushEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
