//! Error types for telemetry operations.

use std::string::FromUtf8Error;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while setting up logging or working with the metrics registry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured log level is not a valid filter directive.
    #[error("invalid log level directive")]
    InvalidLogLevel {
        /// Directive as configured.
        level: String,
        /// Filter parse failure.
        source: ParseError,
    },
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying install failure.
        source: TryInitError,
    },
    /// A collector could not be built.
    #[error("failed to build metric collector")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Prometheus failure.
        source: prometheus::Error,
    },
    /// A collector could not be registered.
    #[error("failed to register metric collector")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Prometheus failure.
        source: prometheus::Error,
    },
    /// The exposition encoder failed.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Prometheus failure.
        source: prometheus::Error,
    },
    /// Encoded metrics were not UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Conversion failure.
        source: FromUtf8Error,
    },
}

impl TelemetryError {
    /// Metric name tied to the failure, when there is one.
    #[must_use]
    pub const fn metric(&self) -> Option<&'static str> {
        match self {
            Self::MetricsCollector { name, .. } | Self::MetricsRegister { name, .. } => Some(name),
            _ => None,
        }
    }
}
