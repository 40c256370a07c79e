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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (record builders, manual clock), mocks.rs (scripted provider, recording sink).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{ManualClock, heart_rate_record, step_record};
pub use mocks::{FakeProvider, RecordingSink, ScriptedFailure};
