//! Event channel: listen/cancel lifecycle and JSON encoding of push events.

use std::sync::Arc;

use healthlink_events::{EventSink, PushEvent};
use healthlink_poller::{MarkerSnapshot, UpdatePoller};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::channel::EVENT_CHANNEL;
use crate::error::BridgeError;

/// Maps host listen/cancel callbacks onto the poller's attach/detach.
pub struct StreamHandler {
    poller: Mutex<UpdatePoller>,
}

impl StreamHandler {
    /// Handler driving `poller`.
    #[must_use]
    pub fn new(poller: UpdatePoller) -> Self {
        Self {
            poller: Mutex::new(poller),
        }
    }

    /// A subscriber started listening; any previous one is replaced.
    pub async fn on_listen(&self, sink: Arc<dyn EventSink>) {
        info!(channel = EVENT_CHANNEL, "subscriber listening");
        self.poller.lock().await.attach(sink).await;
    }

    /// The subscriber went away. Returns `false` if nobody was listening.
    pub async fn on_cancel(&self) -> bool {
        let detached = self.poller.lock().await.detach().await;
        if detached {
            info!(channel = EVENT_CHANNEL, "subscriber cancelled");
        }
        detached
    }

    /// Whether a subscriber is currently attached.
    pub async fn is_streaming(&self) -> bool {
        self.poller.lock().await.is_running()
    }

    /// Poller markers.
    pub async fn markers(&self) -> MarkerSnapshot {
        self.poller.lock().await.markers()
    }

    /// Stop streaming and release the poller's provider reference.
    pub async fn shutdown(&self) {
        self.poller.lock().await.shutdown().await;
    }
}

impl std::fmt::Debug for StreamHandler {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StreamHandler")
            .field("channel", &EVENT_CHANNEL)
            .finish_non_exhaustive()
    }
}

/// Sink that encodes each event into its host JSON shape before forwarding it.
pub struct JsonEventSink<F> {
    forward: F,
}

impl<F> JsonEventSink<F>
where
    F: Fn(Value) + Send + Sync,
{
    /// Sink forwarding encoded events to `forward`.
    pub const fn new(forward: F) -> Self {
        Self { forward }
    }
}

impl<F> EventSink for JsonEventSink<F>
where
    F: Fn(Value) + Send + Sync,
{
    fn on_event(&self, event: PushEvent) {
        let kind = event.kind().as_str();
        match serde_json::to_value(&event)
            .map_err(|source| BridgeError::EncodeEvent { kind, source })
        {
            Ok(value) => (self.forward)(value),
            Err(err) => warn!(error = %err, kind, "dropping unencodable push event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::PoisonError;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use healthlink_config::PollerSettings;
    use healthlink_provider::{ProviderHandle, RecordType};
    use healthlink_telemetry::Metrics;
    use healthlink_test_support::{FakeProvider, ManualClock, step_record};

    fn handler(provider: Arc<FakeProvider>) -> StreamHandler {
        let emitted = Utc
            .timestamp_millis_opt(1_700_000_000_000)
            .single()
            .expect("valid instant");
        let poller = UpdatePoller::new(
            ProviderHandle::with_provider(provider),
            PollerSettings::default(),
            Metrics::new().expect("metrics"),
        )
        .with_clock(Arc::new(ManualClock::new(emitted)));
        StreamHandler::new(poller)
    }

    #[tokio::test]
    async fn listen_streams_encoded_events_until_cancel() {
        let provider = Arc::new(FakeProvider::new());
        let at = Utc
            .timestamp_millis_opt(1_699_999_999_000)
            .single()
            .expect("valid instant");
        provider.set_records(RecordType::Steps, vec![step_record("s-1", at, 12)]);
        let handler = handler(provider);

        let received = Arc::new(std::sync::Mutex::new(Vec::<Value>::new()));
        let collector = Arc::clone(&received);
        let sink = JsonEventSink::new(move |value| {
            collector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(value);
        });

        handler.on_listen(Arc::new(sink)).await;
        assert!(handler.is_streaming().await);
        tokio::time::timeout(Duration::from_secs(2), async {
            while received.lock().unwrap_or_else(PoisonError::into_inner).is_empty() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("event delivered");
        assert!(handler.on_cancel().await);
        assert!(!handler.on_cancel().await);

        let values = received.lock().unwrap_or_else(PoisonError::into_inner).clone();
        assert_eq!(
            values,
            vec![serde_json::json!({
                "steps": [{
                    "type": "steps",
                    "timestamp": 1_699_999_999_000_i64,
                    "count": 12,
                    "recordId": "s-1",
                }],
                "timestamp": 1_700_000_000_000_i64,
            })]
        );
        assert_eq!(
            handler.markers().await.last_steps_record_id.as_deref(),
            Some("s-1")
        );
    }

    #[tokio::test]
    async fn shutdown_stops_streaming() {
        let handler = handler(Arc::new(FakeProvider::new()));
        handler.on_listen(Arc::new(JsonEventSink::new(|_| {}))).await;
        handler.shutdown().await;
        assert!(!handler.is_streaming().await);
    }
}
