//! Attach/detach lifecycle for the update poller.
//!
//! At most one timer loop exists at a time. Attaching while running stops the previous loop
//! first; detaching waits for the loop to exit so nothing is delivered afterwards.

use std::sync::Arc;

use healthlink_config::{MarkerPolicy, PollerSettings};
use healthlink_events::EventSink;
use healthlink_provider::{Clock, ProviderHandle, SystemClock};
use healthlink_telemetry::Metrics;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dedup::{MarkerSnapshot, PollerState};
use crate::timer::{PeriodicTimer, TimerHandle};
use crate::worker::TickWorker;

/// Streams newly observed records to a single attached subscriber.
pub struct UpdatePoller {
    provider: ProviderHandle,
    settings: PollerSettings,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    idle: PollerState,
    running: Option<TimerHandle<TickWorker>>,
    markers: watch::Sender<MarkerSnapshot>,
}

impl UpdatePoller {
    /// Poller reading through `provider` with wall-clock time.
    #[must_use]
    pub fn new(provider: ProviderHandle, settings: PollerSettings, metrics: Metrics) -> Self {
        let idle = PollerState::new(settings.dedup);
        let (markers, _) = watch::channel(idle.snapshot());
        Self {
            provider,
            settings,
            clock: Arc::new(SystemClock),
            metrics,
            idle,
            running: None,
            markers,
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Start streaming to `sink`, replacing any current subscriber.
    ///
    /// The first tick runs immediately. Must be called from within a tokio runtime.
    pub async fn attach(&mut self, sink: Arc<dyn EventSink>) {
        if self.detach().await {
            info!("previous subscriber replaced");
        }

        let mut state =
            std::mem::replace(&mut self.idle, PollerState::new(self.settings.dedup));
        if self.settings.marker_policy == MarkerPolicy::ResetOnAttach {
            state.reset();
        }

        let worker = TickWorker::new(
            self.provider.clone(),
            sink,
            state,
            self.settings,
            Arc::clone(&self.clock),
            self.metrics.clone(),
        )
        .with_marker_channel(self.markers.clone());
        self.running = Some(PeriodicTimer::new(self.settings.interval).start(worker));
        self.metrics.set_poller_running(true);
        info!(
            interval_ms = u64::try_from(self.settings.interval.as_millis()).unwrap_or(u64::MAX),
            policy = ?self.settings.marker_policy,
            "poller attached"
        );
    }

    /// Stop streaming. Returns `false` if nothing was attached.
    ///
    /// Once this resolves the previous subscriber receives no further events.
    pub async fn detach(&mut self) -> bool {
        let Some(handle) = self.running.take() else {
            return false;
        };
        self.idle = match handle.stop().await {
            Some(worker) => worker.into_state(),
            None => {
                warn!("poller loop ended abnormally; markers cleared");
                PollerState::new(self.settings.dedup)
            }
        };
        self.markers.send_replace(self.idle.snapshot());
        self.metrics.set_poller_running(false);
        info!("poller detached");
        true
    }

    /// Whether a subscriber is attached and its loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Last-seen ids as of the most recent emission.
    #[must_use]
    pub fn markers(&self) -> MarkerSnapshot {
        self.markers.borrow().clone()
    }

    /// Receiver that observes marker changes.
    #[must_use]
    pub fn watch_markers(&self) -> watch::Receiver<MarkerSnapshot> {
        self.markers.subscribe()
    }

    /// Detach and drop this poller's hold on the provider.
    pub async fn shutdown(&mut self) {
        self.detach().await;
        if self.provider.release() {
            info!("poller released provider handle");
        }
    }
}

impl std::fmt::Debug for UpdatePoller {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("UpdatePoller")
            .field("settings", &self.settings)
            .field("running", &self.running.is_some())
            .field("markers", &self.markers())
            .finish_non_exhaustive()
    }
}
