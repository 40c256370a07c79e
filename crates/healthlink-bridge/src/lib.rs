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

//! Host-facing surface: a method channel answering the four one-shot queries and an event
//! channel that attaches the update poller.
//! Layout: `channel.rs` (names and method identifiers), `router.rs` (request/response),
//! `stream.rs` (listen/cancel and JSON event encoding), `error.rs`.

pub mod channel;
pub mod error;
pub mod router;
pub mod stream;

pub use channel::{EVENT_CHANNEL, HostMethod, METHOD_CHANNEL};
pub use error::{BridgeError, BridgeResult};
pub use router::{MethodOutcome, MethodRouter};
pub use stream::{JsonEventSink, StreamHandler};
