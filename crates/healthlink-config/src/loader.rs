//! Environment parsing and validation.

use std::time::Duration;

use tracing::debug;

use crate::defaults::{
    self, ENV_DEDUP, ENV_HEART_RATE_LOOKBACK_SECS, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_MARKER_POLICY,
    ENV_POLL_INTERVAL_MS, ENV_POLL_LOOKBACK_SECS, ENV_READ_TIMEOUT_MS, ENV_SIMULATE,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    DedupStrategy, HealthlinkConfig, LogFormatSetting, LoggingSettings, MarkerPolicy,
    PollerSettings, QuerySettings,
};

impl HealthlinkConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a variable is present but malformed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup; unset keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a value is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();
        let read_timeout = duration_var(
            &lookup,
            ENV_READ_TIMEOUT_MS,
            Duration::from_millis,
            base.poller.read_timeout,
            defaults::MAX_READ_TIMEOUT,
        )?;

        let poller = PollerSettings {
            interval: duration_var(
                &lookup,
                ENV_POLL_INTERVAL_MS,
                Duration::from_millis,
                base.poller.interval,
                defaults::MAX_POLL_INTERVAL,
            )?,
            lookback: duration_var(
                &lookup,
                ENV_POLL_LOOKBACK_SECS,
                Duration::from_secs,
                base.poller.lookback,
                defaults::MAX_LOOKBACK,
            )?,
            read_timeout,
            marker_policy: lookup(ENV_MARKER_POLICY).map_or(Ok(MarkerPolicy::default()), |raw| {
                MarkerPolicy::parse(&raw)
                    .ok_or_else(|| ConfigError::invalid(ENV_MARKER_POLICY, &raw, "unknown_policy"))
            })?,
            dedup: lookup(ENV_DEDUP).map_or(Ok(DedupStrategy::default()), |raw| {
                parse_dedup(&raw)
            })?,
        };

        let query = QuerySettings {
            heart_rate_lookback: duration_var(
                &lookup,
                ENV_HEART_RATE_LOOKBACK_SECS,
                Duration::from_secs,
                base.query.heart_rate_lookback,
                defaults::MAX_LOOKBACK,
            )?,
            read_timeout,
        };

        let logging = LoggingSettings {
            level: lookup(ENV_LOG_LEVEL)
                .map(|raw| raw.trim().to_string())
                .filter(|level| !level.is_empty())
                .unwrap_or(base.logging.level),
            format: lookup(ENV_LOG_FORMAT)
                .map(|raw| {
                    LogFormatSetting::parse(&raw)
                        .ok_or_else(|| ConfigError::invalid(ENV_LOG_FORMAT, &raw, "unknown_format"))
                })
                .transpose()?,
        };

        let simulate = lookup(ENV_SIMULATE).map_or(base.simulate, |raw| {
            env_flag_value(Some(raw.as_str()))
        });

        let config = Self {
            poller,
            query,
            logging,
            simulate,
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

fn duration_var<F>(
    lookup: &F,
    field: &'static str,
    unit: fn(u64) -> Duration,
    default: Duration,
    max: Duration,
) -> ConfigResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(field) else {
        return Ok(default);
    };
    let amount = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, &raw, "not_an_integer"))?;
    if amount == 0 {
        return Err(ConfigError::invalid(field, &raw, "zero"));
    }
    let value = unit(amount);
    if value > max {
        return Err(ConfigError::invalid(field, &raw, "too_large"));
    }
    Ok(value)
}

fn parse_dedup(raw: &str) -> ConfigResult<DedupStrategy> {
    let normalized = raw.trim().to_ascii_lowercase();
    if matches!(normalized.as_str(), "last-id" | "last_id" | "last") {
        return Ok(DedupStrategy::LastId);
    }
    let Some(capacity) = normalized.strip_prefix("recent:") else {
        return Err(ConfigError::invalid(ENV_DEDUP, raw, "unknown_strategy"));
    };
    let capacity = capacity
        .parse::<usize>()
        .map_err(|_| ConfigError::invalid(ENV_DEDUP, raw, "not_an_integer"))?;
    if capacity == 0 {
        return Err(ConfigError::invalid(ENV_DEDUP, raw, "zero"));
    }
    Ok(DedupStrategy::RecentIds { capacity })
}

fn env_flag_value(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = HealthlinkConfig::from_lookup(|_| None).expect("defaults load");
        assert_eq!(config, HealthlinkConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = HealthlinkConfig::from_lookup(lookup_from(&[
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_POLL_LOOKBACK_SECS, "60"),
            (ENV_READ_TIMEOUT_MS, "1500"),
            (ENV_MARKER_POLICY, "reset"),
            (ENV_DEDUP, "recent:16"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_SIMULATE, "off"),
        ]))
        .expect("overrides load");

        assert_eq!(config.poller.interval, Duration::from_millis(250));
        assert_eq!(config.poller.lookback, Duration::from_secs(60));
        assert_eq!(config.poller.read_timeout, Duration::from_millis(1500));
        assert_eq!(config.query.read_timeout, Duration::from_millis(1500));
        assert_eq!(config.poller.marker_policy, MarkerPolicy::ResetOnAttach);
        assert_eq!(
            config.poller.dedup,
            DedupStrategy::RecentIds { capacity: 16 }
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, Some(LogFormatSetting::Json));
        assert!(!config.simulate);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = HealthlinkConfig::from_lookup(lookup_from(&[(ENV_POLL_INTERVAL_MS, "0")]))
            .expect_err("zero interval must fail");
        assert_eq!(
            err,
            ConfigError::InvalidField {
                field: ENV_POLL_INTERVAL_MS,
                value: "0".into(),
                reason: "zero",
            }
        );
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let err = HealthlinkConfig::from_lookup(lookup_from(&[(
            ENV_POLL_LOOKBACK_SECS,
            "18446744073709551615",
        )]))
        .expect_err("unbounded look-back must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: ENV_POLL_LOOKBACK_SECS,
                reason: "too_large",
                ..
            }
        ));

        let week = HealthlinkConfig::from_lookup(lookup_from(&[(
            ENV_HEART_RATE_LOOKBACK_SECS,
            "604800",
        )]))
        .expect("a week is accepted");
        assert_eq!(week.query.heart_rate_lookback, defaults::MAX_LOOKBACK);
        assert!(
            HealthlinkConfig::from_lookup(lookup_from(&[(ENV_READ_TIMEOUT_MS, "600001")]))
                .is_err()
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(
            HealthlinkConfig::from_lookup(lookup_from(&[(ENV_READ_TIMEOUT_MS, "soon")])).is_err()
        );
        assert!(HealthlinkConfig::from_lookup(lookup_from(&[(ENV_DEDUP, "recent:0")])).is_err());
        assert!(HealthlinkConfig::from_lookup(lookup_from(&[(ENV_DEDUP, "all")])).is_err());
        assert!(
            HealthlinkConfig::from_lookup(lookup_from(&[(ENV_MARKER_POLICY, "sometimes")]))
                .is_err()
        );
    }

    #[test]
    fn env_flag_accepts_common_truthy_values() {
        assert!(env_flag_value(Some("YES")));
        assert!(env_flag_value(Some(" 1 ")));
        assert!(!env_flag_value(Some("0")));
        assert!(!env_flag_value(None));
    }
}
