//! Default values and environment variable names.
//!
//! # Design
//! - Centralize defaults so the poller, query service, and binary agree on timing.
//! - Keep durations explicit for auditability.

use std::time::Duration;

/// Delay between the end of one poller tick and the start of the next.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Look-back window read on every poller tick.
pub const POLL_LOOKBACK: Duration = Duration::from_secs(15 * 60);
/// Look-back window for the latest heart-rate query.
pub const HEART_RATE_LOOKBACK: Duration = Duration::from_secs(60 * 60);
/// Upper bound on a single provider read.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Largest accepted poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Largest accepted look-back for either the poller or the heart-rate query.
pub const MAX_LOOKBACK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Largest accepted provider read timeout.
pub const MAX_READ_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// Default log level when neither `RUST_LOG` nor the config variable is set.
pub const LOG_LEVEL: &str = "info";

/// Environment variable holding the poll interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "HEALTHLINK_POLL_INTERVAL_MS";
/// Environment variable holding the poll look-back in seconds.
pub const ENV_POLL_LOOKBACK_SECS: &str = "HEALTHLINK_POLL_LOOKBACK_SECS";
/// Environment variable holding the heart-rate query look-back in seconds.
pub const ENV_HEART_RATE_LOOKBACK_SECS: &str = "HEALTHLINK_HEART_RATE_LOOKBACK_SECS";
/// Environment variable holding the provider read timeout in milliseconds.
pub const ENV_READ_TIMEOUT_MS: &str = "HEALTHLINK_READ_TIMEOUT_MS";
/// Environment variable selecting the marker policy (`preserve` or `reset`).
pub const ENV_MARKER_POLICY: &str = "HEALTHLINK_MARKER_POLICY";
/// Environment variable selecting the dedup strategy (`last-id` or `recent:<n>`).
pub const ENV_DEDUP: &str = "HEALTHLINK_DEDUP";
/// Environment variable holding the log level.
pub const ENV_LOG_LEVEL: &str = "HEALTHLINK_LOG_LEVEL";
/// Environment variable selecting the log format (`json` or `pretty`).
pub const ENV_LOG_FORMAT: &str = "HEALTHLINK_LOG_FORMAT";
/// Environment variable toggling the simulated provider in the binary.
pub const ENV_SIMULATE: &str = "HEALTHLINK_SIMULATE";
