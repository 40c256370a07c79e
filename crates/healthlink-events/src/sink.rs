//! Subscriber interface and a channel-backed implementation.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::{SinkError, SinkResult};
use crate::payloads::PushEvent;

/// Receiver of push events.
///
/// Calls never overlap for a given attachment and stop once the poller has been detached.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn on_event(&self, event: PushEvent);
}

impl<F> EventSink for F
where
    F: Fn(PushEvent) + Send + Sync,
{
    fn on_event(&self, event: PushEvent) {
        self(event);
    }
}

/// Sink that forwards events into a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<PushEvent>,
}

impl ChannelSink {
    /// Create a sink and the stream that drains it.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, EventStream) {
        assert!(capacity > 0, "event sink capacity must be positive");
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, EventStream { receiver })
    }

    /// Attempt to enqueue an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Full`] when the buffer is exhausted and [`SinkError::Closed`] when the
    /// stream has been dropped.
    pub fn try_deliver(&self, event: PushEvent) -> SinkResult<()> {
        let event_kind = event.kind().as_str();
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => SinkError::Full { event_kind },
            TrySendError::Closed(_) => SinkError::Closed { event_kind },
        })
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: PushEvent) {
        if let Err(err) = self.try_deliver(event) {
            debug!(error = %err, kind = err.event_kind(), "dropping push event");
        }
    }
}

/// Consuming side of a [`ChannelSink`].
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::Receiver<PushEvent>,
}

impl EventStream {
    /// Wait for the next event; `None` once every sink clone has been dropped.
    pub async fn next(&mut self) -> Option<PushEvent> {
        self.receiver.recv().await
    }

    /// Take an already-buffered event without waiting.
    pub fn try_next(&mut self) -> Option<PushEvent> {
        self.receiver.try_recv().ok()
    }

    /// Adapt into a `tokio_stream::Stream`.
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<PushEvent> {
        ReceiverStream::new(self.receiver)
    }
}
