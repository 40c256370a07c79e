//! JSON-lines transcript of host traffic.
//!
//! Each line is one object tagged with the channel it belongs to. Write failures are logged and
//! the line is dropped; the stream keeps running.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Value, json};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Shared line writer; clones append to the same destination.
pub struct TranscriptWriter<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for TranscriptWriter<W> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

impl TranscriptWriter<io::Stdout> {
    /// Writer targeting standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TranscriptWriter<W> {
    /// Writer targeting `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Record the answer to a method-channel call.
    pub fn method_result(&self, channel: &str, method: &str, outcome: Value) {
        self.write_line(&json!({ "channel": channel, "method": method, "result": outcome }));
    }

    /// Record a push event delivered on the event channel.
    pub fn event(&self, channel: &str, event: Value) {
        self.write_line(&json!({ "channel": channel, "event": event }));
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the destination rejects the flush.
    pub fn flush(&self) -> AppResult<()> {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(|err| AppError::io("transcript.flush", err))
    }

    fn write_line(&self, value: &Value) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let written = serde_json::to_writer(&mut *out, value)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"));
        if let Err(err) = written {
            warn!(error = %err, "dropping transcript line");
        }
    }
}

impl<W: Write> TranscriptWriter<W>
where
    W: Clone,
{
    /// Copy of everything written so far.
    #[must_use]
    pub fn contents(&self) -> W {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
