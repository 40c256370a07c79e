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

//! One-shot health queries: permission state, today's step total, latest heart rate.

pub mod error;
pub mod model;
pub mod service;

pub use error::{QueryError, QueryResult};
pub use model::{HeartRateReading, PermissionStatus};
pub use service::QueryService;
