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

//! Push events streamed to health-data subscribers.
//!
//! A [`PushEvent`] carries the records discovered by one poller sub-tick. Subscribers implement
//! [`EventSink`]; [`ChannelSink`] adapts a bounded `tokio::mpsc` channel for consumers that prefer
//! pulling events as a stream. When the channel is full the newest event is dropped and logged,
//! so a slow consumer never stalls the poller.

pub mod error;
pub mod payloads;
pub mod sink;

pub use error::{SinkError, SinkResult};
pub use payloads::{EventKind, HeartRateEntry, PushEvent, PushPayload, StepsEntry};
pub use sink::{ChannelSink, EventSink, EventStream};
