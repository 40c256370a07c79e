//! Tagged errors returned to one-shot callers.

use healthlink_provider::ProviderError;
use thiserror::Error;

/// Failure of a one-shot query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Looking up or requesting permissions failed.
    #[error("permission lookup failed")]
    Permission {
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
    /// Reading records failed.
    #[error("record read failed")]
    Read {
        /// Query that issued the read.
        operation: &'static str,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
}

impl QueryError {
    /// Wire tag for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Permission { .. } => "PERMISSION_ERROR",
            Self::Read { .. } => "READ_ERROR",
        }
    }

    /// Message forwarded to the caller alongside [`Self::code`].
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Permission { source } | Self::Read { source, .. } => source.detail(),
        }
    }
}

/// Convenience alias for query results.
pub type QueryResult<T> = Result<T, QueryError>;
