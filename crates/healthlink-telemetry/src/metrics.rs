//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters the poller and query paths record; failures that are never surfaced
//!   to subscribers still show up here.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    poller_ticks_total: IntCounter,
    poller_tick_panics_total: IntCounter,
    provider_read_failures_total: IntCounterVec,
    push_events_emitted_total: IntCounterVec,
    push_records_emitted_total: IntCounterVec,
    query_requests_total: IntCounterVec,
    poller_running: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Ticks executed since start.
    pub poller_ticks_total: u64,
    /// Ticks that panicked and were contained.
    pub poller_tick_panics_total: u64,
    /// Whether the poller loop is currently running.
    pub poller_running: bool,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let poller_ticks_total = counter("poller_ticks_total", "Poller ticks executed")?;
        let poller_tick_panics_total = counter(
            "poller_tick_panics_total",
            "Poller ticks that panicked and were contained",
        )?;
        let provider_read_failures_total = counter_vec(
            "provider_read_failures_total",
            "Provider reads that failed inside the poller, by metric",
            &["metric"],
        )?;
        let push_events_emitted_total = counter_vec(
            "push_events_emitted_total",
            "Push events delivered to subscribers, by kind",
            &["kind"],
        )?;
        let push_records_emitted_total = counter_vec(
            "push_records_emitted_total",
            "Entries carried by delivered push events, by kind",
            &["kind"],
        )?;
        let query_requests_total = counter_vec(
            "query_requests_total",
            "One-shot query requests by operation and outcome",
            &["operation", "outcome"],
        )?;
        let poller_running = IntGauge::with_opts(Opts::new(
            "poller_running",
            "Whether the poller loop is running (1) or stopped (0)",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "poller_running",
            source,
        })?;

        register(&registry, "poller_ticks_total", &poller_ticks_total)?;
        register(&registry, "poller_tick_panics_total", &poller_tick_panics_total)?;
        register(
            &registry,
            "provider_read_failures_total",
            &provider_read_failures_total,
        )?;
        register(
            &registry,
            "push_events_emitted_total",
            &push_events_emitted_total,
        )?;
        register(
            &registry,
            "push_records_emitted_total",
            &push_records_emitted_total,
        )?;
        register(&registry, "query_requests_total", &query_requests_total)?;
        register(&registry, "poller_running", &poller_running)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                poller_ticks_total,
                poller_tick_panics_total,
                provider_read_failures_total,
                push_events_emitted_total,
                push_records_emitted_total,
                query_requests_total,
                poller_running,
            }),
        })
    }

    /// Increment the tick counter.
    pub fn inc_tick(&self) {
        self.inner.poller_ticks_total.inc();
    }

    /// Increment the contained-panic counter.
    pub fn inc_tick_panic(&self) {
        self.inner.poller_tick_panics_total.inc();
    }

    /// Record a failed provider read for `metric`.
    pub fn inc_read_failure(&self, metric: &str) {
        self.inner
            .provider_read_failures_total
            .with_label_values(&[metric])
            .inc();
    }

    /// Record a delivered push event of `kind` carrying `records` entries.
    pub fn record_push_event(&self, kind: &str, records: usize) {
        self.inner
            .push_events_emitted_total
            .with_label_values(&[kind])
            .inc();
        self.inner
            .push_records_emitted_total
            .with_label_values(&[kind])
            .inc_by(u64::try_from(records).unwrap_or(u64::MAX));
    }

    /// Record a one-shot query and its outcome (`ok`, `unavailable`, or an error code).
    pub fn inc_query(&self, operation: &str, outcome: &str) {
        self.inner
            .query_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Flip the poller-running gauge.
    pub fn set_poller_running(&self, running: bool) {
        self.inner.poller_running.set(i64::from(running));
    }

    /// Failed reads recorded for `metric`.
    #[must_use]
    pub fn read_failures(&self, metric: &str) -> u64 {
        self.inner
            .provider_read_failures_total
            .with_label_values(&[metric])
            .get()
    }

    /// Push events recorded for `kind`.
    #[must_use]
    pub fn events_emitted(&self, kind: &str) -> u64 {
        self.inner
            .push_events_emitted_total
            .with_label_values(&[kind])
            .get()
    }

    /// Queries recorded for `operation` with `outcome`.
    #[must_use]
    pub fn queries(&self, operation: &str, outcome: &str) -> u64 {
        self.inner
            .query_requests_total
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            poller_ticks_total: self.inner.poller_ticks_total.get(),
            poller_tick_panics_total: self.inner.poller_tick_panics_total.get(),
            poller_running: self.inner.poller_running.get() > 0,
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
