//! Provider trait implemented by health data adapters and the shared handle used to reach it.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::model::{Capability, MetricRecord, RecordType, TimeWindow};

/// Read-only capability over a device-local health data store.
#[async_trait]
pub trait HealthProvider: Send + Sync {
    /// Read every record of `record_type` that falls inside `window`, oldest first.
    async fn read_records(
        &self,
        record_type: RecordType,
        window: TimeWindow,
    ) -> ProviderResult<Vec<MetricRecord>>;

    /// Capabilities the user has currently granted to this application.
    async fn granted_capabilities(&self) -> ProviderResult<BTreeSet<Capability>>;
}

/// Shared, possibly-empty reference to the active provider.
///
/// The provider's own lifecycle is managed elsewhere; the handle only tracks whether one has been
/// installed and lets components drop their hold on it at teardown.
#[derive(Clone, Default)]
pub struct ProviderHandle {
    slot: Arc<RwLock<Option<Arc<dyn HealthProvider>>>>,
}

impl ProviderHandle {
    /// Handle with no provider installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that already holds `provider`.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn HealthProvider>) -> Self {
        let handle = Self::new();
        handle.install(provider);
        handle
    }

    /// Install (or replace) the provider.
    pub fn install(&self, provider: Arc<dyn HealthProvider>) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(provider);
    }

    /// Drop the held provider reference. Returns `true` if one was held.
    pub fn release(&self) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.take().is_some()
    }

    /// The provider, if one is installed.
    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn HealthProvider>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a provider is installed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ProviderHandle")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Read records, failing with [`ProviderError::Timeout`] if the provider exceeds `timeout`.
///
/// # Errors
///
/// Propagates provider failures and reports elapsed bounds as timeouts.
pub async fn read_bounded(
    provider: &dyn HealthProvider,
    record_type: RecordType,
    window: TimeWindow,
    timeout: Duration,
) -> ProviderResult<Vec<MetricRecord>> {
    tokio::time::timeout(timeout, provider.read_records(record_type, window))
        .await
        .map_err(|_| ProviderError::Timeout {
            record_type,
            timeout,
        })?
}
