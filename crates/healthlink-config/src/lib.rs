#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-driven configuration for the poller, query service, and logging.
//!
//! Layout: `defaults.rs` (default values and variable names), `model.rs` (typed settings),
//! `loader.rs` (environment parsing and validation), `error.rs` (configuration failures).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    DedupStrategy, HealthlinkConfig, LogFormatSetting, LoggingSettings, MarkerPolicy,
    PollerSettings, QuerySettings,
};
