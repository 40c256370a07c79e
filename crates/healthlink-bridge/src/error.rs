//! Bridge encoding errors.

use thiserror::Error;

/// Failure translating results or events into host values.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A method result could not be encoded.
    #[error("failed to encode method result")]
    EncodeResult {
        /// Method whose result failed to encode.
        method: &'static str,
        /// Serializer failure.
        #[source]
        source: serde_json::Error,
    },
    /// A push event could not be encoded.
    #[error("failed to encode push event")]
    EncodeEvent {
        /// Event kind.
        kind: &'static str,
        /// Serializer failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias for bridge results.
pub type BridgeResult<T> = Result<T, BridgeError>;
