//! Typed configuration models.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// What happens to the last-seen markers when a new subscriber attaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Markers survive detach/attach cycles for the process lifetime.
    #[default]
    Preserve,
    /// Markers are cleared on every attach, so each subscriber sees the full window first.
    ResetOnAttach,
}

impl MarkerPolicy {
    /// Parse the environment representation (`preserve` or `reset`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" => Some(Self::Preserve),
            "reset" | "reset-on-attach" | "reset_on_attach" => Some(Self::ResetOnAttach),
            _ => None,
        }
    }
}

/// How the poller decides which records it has already emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Exclude only the single most recently emitted id per metric.
    #[default]
    LastId,
    /// Exclude every id in a bounded ring of recently emitted ids.
    RecentIds {
        /// Number of ids retained per metric.
        capacity: usize,
    },
}

/// Log output format selected through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatSetting {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

impl LogFormatSetting {
    /// Parse the environment representation (`json` or `pretty`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Settings for the update poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Delay between the end of one tick and the start of the next.
    pub interval: Duration,
    /// Window read on each tick, ending at the tick's `now`.
    pub lookback: Duration,
    /// Upper bound on each provider read.
    pub read_timeout: Duration,
    /// Marker handling on attach.
    pub marker_policy: MarkerPolicy,
    /// Dedup strategy applied per metric.
    pub dedup: DedupStrategy,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: defaults::POLL_INTERVAL,
            lookback: defaults::POLL_LOOKBACK,
            read_timeout: defaults::READ_TIMEOUT,
            marker_policy: MarkerPolicy::default(),
            dedup: DedupStrategy::default(),
        }
    }
}

/// Settings for one-shot queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Window searched by the latest heart-rate query.
    pub heart_rate_lookback: Duration,
    /// Upper bound on each provider read.
    pub read_timeout: Duration,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            heart_rate_lookback: defaults::HEART_RATE_LOOKBACK,
            read_timeout: defaults::READ_TIMEOUT,
        }
    }
}

/// Logging settings handed to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (e.g. `info`, `debug`).
    pub level: String,
    /// Explicit format; `None` lets the telemetry crate infer one from the build profile.
    pub format: Option<LogFormatSetting>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthlinkConfig {
    /// Poller settings.
    pub poller: PollerSettings,
    /// Query settings.
    pub query: QuerySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Whether the binary installs the simulated provider.
    pub simulate: bool,
}

impl Default for HealthlinkConfig {
    fn default() -> Self {
        Self {
            poller: PollerSettings::default(),
            query: QuerySettings::default(),
            logging: LoggingSettings::default(),
            simulate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_timing() {
        let config = HealthlinkConfig::default();
        assert_eq!(config.poller.interval, Duration::from_secs(5));
        assert_eq!(config.poller.lookback, Duration::from_secs(900));
        assert_eq!(config.query.heart_rate_lookback, Duration::from_secs(3600));
        assert_eq!(config.poller.marker_policy, MarkerPolicy::Preserve);
        assert_eq!(config.poller.dedup, DedupStrategy::LastId);
    }

    #[test]
    fn policies_parse_case_insensitively() {
        assert_eq!(MarkerPolicy::parse(" Reset "), Some(MarkerPolicy::ResetOnAttach));
        assert_eq!(MarkerPolicy::parse("preserve"), Some(MarkerPolicy::Preserve));
        assert_eq!(MarkerPolicy::parse("forget"), None);
        assert_eq!(LogFormatSetting::parse("JSON"), Some(LogFormatSetting::Json));
    }

    #[test]
    fn dedup_strategy_serializes_tagged() {
        let value = serde_json::to_value(DedupStrategy::RecentIds { capacity: 8 })
            .expect("serialize strategy");
        assert_eq!(
            value,
            serde_json::json!({"strategy": "recent_ids", "capacity": 8})
        );
    }
}
