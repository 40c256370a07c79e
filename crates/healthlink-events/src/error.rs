//! Event sink error primitives.

use std::fmt::{self, Display, Formatter};

/// Error emitted when an event cannot be handed to a channel-backed sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The channel buffer is full.
    Full {
        /// Event kind string for filtering in logs.
        event_kind: &'static str,
    },
    /// The receiving side has been dropped.
    Closed {
        /// Event kind string for filtering in logs.
        event_kind: &'static str,
    },
}

impl SinkError {
    /// Event kind string associated with the failed delivery.
    #[must_use]
    pub const fn event_kind(&self) -> &'static str {
        match self {
            Self::Full { event_kind } | Self::Closed { event_kind } => event_kind,
        }
    }
}

impl Display for SinkError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full { .. } => formatter.write_str("event sink buffer full"),
            Self::Closed { .. } => formatter.write_str("event sink closed"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Result wrapper for sink deliveries.
pub type SinkResult<T> = Result<T, SinkError>;
