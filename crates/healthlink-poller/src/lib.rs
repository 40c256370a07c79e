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

//! Incremental update poller that streams new health records to a single subscriber.
//!
//! Layout: `timer.rs` (cancellable periodic loop), `dedup.rs` (per-metric last-seen markers),
//! `worker.rs` (tick logic and failure isolation), `poller.rs` (attach/detach lifecycle).

pub mod dedup;
pub mod poller;
pub mod timer;
pub mod worker;

pub use dedup::{MarkerSnapshot, PollerState, RecordMarker};
pub use poller::UpdatePoller;
pub use timer::{PeriodicTimer, Tick, TimerHandle};
pub use worker::TickWorker;
