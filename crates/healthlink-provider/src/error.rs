//! Error types for provider reads.

use std::error::Error;
use std::time::Duration;

use thiserror::Error;

use crate::model::{Capability, RecordType};

/// Failure reported by (or on behalf of) a health data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The capability required for the read has not been granted.
    #[error("provider permission denied")]
    PermissionDenied {
        /// Capability that was missing.
        capability: Capability,
    },
    /// The backing store could not be reached.
    #[error("provider unavailable")]
    Unavailable {
        /// Backend-supplied detail.
        detail: String,
    },
    /// The provider returned data that does not match the request.
    #[error("malformed provider response")]
    Malformed {
        /// Record type that was requested.
        record_type: RecordType,
        /// Description of the mismatch.
        detail: String,
    },
    /// The read did not complete within the configured bound.
    #[error("provider read timed out")]
    Timeout {
        /// Record type that was requested.
        record_type: RecordType,
        /// Bound that elapsed.
        timeout: Duration,
    },
    /// Any other backend failure.
    #[error("provider operation failed")]
    Backend {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl ProviderError {
    /// Human-readable detail combining the error kind with its context fields.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::PermissionDenied { capability } => format!("{self}: {capability}"),
            Self::Unavailable { detail } => format!("{self}: {detail}"),
            Self::Malformed {
                record_type,
                detail,
            } => format!("{self} for {record_type}: {detail}"),
            Self::Timeout {
                record_type,
                timeout,
            } => format!("{self} for {record_type} after {}ms", timeout.as_millis()),
            Self::Backend { operation, source } => format!("{self} ({operation}): {source}"),
        }
    }
}

/// Convenience alias for provider results.
pub type ProviderResult<T> = Result<T, ProviderError>;
