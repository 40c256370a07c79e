//! Method channel dispatch onto the query service.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use healthlink_query::{QueryResult, QueryService};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::channel::HostMethod;
use crate::error::BridgeError;

const ENCODE_ERROR: &str = "ENCODE_ERROR";

/// Result of one method call, shaped for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    /// Call succeeded; `Value::Null` means "no data".
    Success(Value),
    /// Call failed with a tagged error.
    Error {
        /// `PERMISSION_ERROR`, `READ_ERROR` or `ENCODE_ERROR`.
        code: &'static str,
        /// Detail for the caller.
        message: String,
    },
    /// The method name is not recognised.
    NotImplemented,
}

impl MethodOutcome {
    /// Host envelope: `{"success": ..}`, `{"error": {"code", "message"}}` or
    /// `{"notImplemented": true}`.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Success(value) => json!({ "success": value }),
            Self::Error { code, message } => {
                json!({ "error": { "code": code, "message": message } })
            }
            Self::NotImplemented => json!({ "notImplemented": true }),
        }
    }
}

/// Routes method-channel calls to a [`QueryService`].
pub struct MethodRouter<Tz = Local> {
    queries: Arc<QueryService<Tz>>,
}

impl<Tz> Clone for MethodRouter<Tz> {
    fn clone(&self) -> Self {
        Self {
            queries: Arc::clone(&self.queries),
        }
    }
}

impl<Tz> MethodRouter<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    /// Router answering from `queries`.
    #[must_use]
    pub const fn new(queries: Arc<QueryService<Tz>>) -> Self {
        Self { queries }
    }

    /// Handle the call named `method_name`.
    pub async fn dispatch(&self, method_name: &str) -> MethodOutcome {
        let Some(method) = HostMethod::parse(method_name) else {
            debug!(method = method_name, "method not implemented");
            return MethodOutcome::NotImplemented;
        };
        match method {
            HostMethod::CheckPermissions => {
                respond(method, self.queries.check_permissions().await)
            }
            HostMethod::RequestPermissions => {
                encode(method, &self.queries.request_permissions())
            }
            HostMethod::GetTodaySteps => respond(method, self.queries.get_today_steps().await),
            HostMethod::GetLatestHeartRate => {
                respond(method, self.queries.get_latest_heart_rate().await)
            }
        }
    }
}

fn respond<T: Serialize>(method: HostMethod, result: QueryResult<T>) -> MethodOutcome {
    match result {
        Ok(value) => encode(method, &value),
        Err(err) => MethodOutcome::Error {
            code: err.code(),
            message: err.message(),
        },
    }
}

fn encode<T: Serialize>(method: HostMethod, value: &T) -> MethodOutcome {
    serde_json::to_value(value)
        .map_err(|source| BridgeError::EncodeResult {
            method: method.as_str(),
            source,
        })
        .map_or_else(
            |err| {
                warn!(error = %err, method = %method, "dropping unencodable result");
                MethodOutcome::Error {
                    code: ENCODE_ERROR,
                    message: err.to_string(),
                }
            },
            MethodOutcome::Success,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use healthlink_config::QuerySettings;
    use healthlink_provider::{ProviderHandle, RecordType};
    use healthlink_telemetry::Metrics;
    use healthlink_test_support::{
        FakeProvider, ManualClock, ScriptedFailure, heart_rate_record, step_record,
    };

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn router(handle: ProviderHandle) -> MethodRouter<Utc> {
        let service = QueryService::new(
            handle,
            QuerySettings::default(),
            Metrics::new().expect("metrics"),
        )
        .with_clock(Arc::new(ManualClock::new(noon())))
        .with_time_zone(Utc);
        MethodRouter::new(Arc::new(service))
    }

    #[tokio::test]
    async fn success_payloads_use_host_keys() {
        let provider = Arc::new(FakeProvider::new());
        provider.grant([RecordType::HeartRate.read_capability()]);
        provider.set_records(RecordType::Steps, vec![step_record("s", noon(), 321)]);
        provider.set_records(
            RecordType::HeartRate,
            vec![heart_rate_record("hr", &[(noon(), 61)])],
        );
        let router = router(ProviderHandle::with_provider(provider));

        assert_eq!(
            router.dispatch("checkPermissions").await,
            MethodOutcome::Success(json!({"stepsGranted": false, "heartRateGranted": true}))
        );
        assert_eq!(
            router.dispatch("requestPermissions").await,
            MethodOutcome::Success(json!(true))
        );
        assert_eq!(
            router.dispatch("getTodaySteps").await,
            MethodOutcome::Success(json!(321))
        );
        assert_eq!(
            router.dispatch("getLatestHeartRate").await,
            MethodOutcome::Success(json!({
                "timestamp": noon().timestamp_millis(),
                "bpm": 61,
                "recordId": "hr",
            }))
        );
    }

    #[tokio::test]
    async fn absent_provider_answers_with_defaults() {
        let router = router(ProviderHandle::new());
        assert_eq!(
            router.dispatch("getTodaySteps").await,
            MethodOutcome::Success(json!(0))
        );
        assert_eq!(
            router.dispatch("getLatestHeartRate").await,
            MethodOutcome::Success(Value::Null)
        );
    }

    #[tokio::test]
    async fn failures_become_tagged_errors() {
        let provider = Arc::new(FakeProvider::new());
        provider.fail_reads(RecordType::Steps, ScriptedFailure::Unavailable);
        provider.fail_capabilities(Some(ScriptedFailure::Unavailable));
        let router = router(ProviderHandle::with_provider(provider));

        assert!(matches!(
            router.dispatch("getTodaySteps").await,
            MethodOutcome::Error { code: "READ_ERROR", .. }
        ));
        assert!(matches!(
            router.dispatch("checkPermissions").await,
            MethodOutcome::Error { code: "PERMISSION_ERROR", .. }
        ));
    }

    #[test]
    fn outcomes_wrap_into_host_envelopes() {
        assert_eq!(
            MethodOutcome::Success(Value::Null).into_json(),
            json!({"success": null})
        );
        assert_eq!(
            MethodOutcome::Error {
                code: "READ_ERROR",
                message: "provider unavailable".into(),
            }
            .into_json(),
            json!({"error": {"code": "READ_ERROR", "message": "provider unavailable"}})
        );
        assert_eq!(
            MethodOutcome::NotImplemented.into_json(),
            json!({"notImplemented": true})
        );
    }

    #[tokio::test]
    async fn unknown_methods_are_not_implemented() {
        let router = router(ProviderHandle::new());
        assert_eq!(
            router.dispatch("deleteAllData").await,
            MethodOutcome::NotImplemented
        );
    }
}
