#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Provider-agnostic health data interfaces and record types.
//!
//! Layout: `model.rs` (records, windows, capabilities), `service.rs` (provider trait and shared
//! handle), `clock.rs` (time source), `error.rs` (provider failures).

pub mod clock;
pub mod error;
pub mod model;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use error::{ProviderError, ProviderResult};
pub use model::{
    Capability, HeartRateRecord, HeartRateSample, MetricRecord, RecordType, StepRecord,
    TimeWindow, collect_heart_rate, collect_steps,
};
pub use service::{HealthProvider, ProviderHandle, read_bounded};
