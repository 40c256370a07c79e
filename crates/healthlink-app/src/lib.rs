#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Healthlink application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `output.rs` (JSON-lines host transcript),
//! `simulated.rs` (synthetic provider).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// JSON-lines writer standing in for the host transport.
pub mod output;
/// Deterministic synthetic health data.
pub mod simulated;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
