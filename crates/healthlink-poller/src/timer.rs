//! Cancellable fixed-delay timer loop.
//!
//! # Design
//! - The worker runs its tick to completion before the delay starts, so ticks never overlap.
//! - The stop signal is a `watch` channel; dropping the [`TimerHandle`] stops the loop too.
//! - A panicking tick is contained and reported to the worker; the loop keeps its schedule.
//! - Stopping hands the worker back so callers can recover state it owned while running.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Unit of work driven by a [`PeriodicTimer`].
pub trait Tick: Send + 'static {
    /// Run one tick.
    fn tick(&mut self) -> impl Future<Output = ()> + Send + '_;

    /// Called after a tick panicked; the loop continues afterwards.
    fn on_panic(&mut self, message: &str) {
        let _ = message;
    }
}

/// Fixed-delay scheduler: tick, wait `interval`, tick again.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTimer {
    interval: Duration,
}

impl PeriodicTimer {
    /// Timer that waits `interval` between the end of one tick and the start of the next.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Configured inter-tick delay.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the loop onto the current tokio runtime. The first tick fires immediately.
    #[must_use]
    pub fn start<W: Tick>(self, worker: W) -> TimerHandle<W> {
        let (stop, mut stopped) = watch::channel(false);
        let interval = self.interval;
        let join = tokio::spawn(async move {
            let mut worker = worker;
            loop {
                if *stopped.borrow() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    outcome = AssertUnwindSafe(worker.tick()).catch_unwind() => {
                        if let Err(payload) = outcome {
                            let message = panic_message(payload.as_ref());
                            warn!(panic = %message, "timer tick panicked; continuing");
                            worker.on_panic(&message);
                        }
                    }
                }
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
            worker
        });
        TimerHandle { stop, join }
    }
}

/// Handle to a running timer loop.
pub struct TimerHandle<W> {
    stop: watch::Sender<bool>,
    join: JoinHandle<W>,
}

impl<W> TimerHandle<W> {
    /// Signal the loop and wait for it to finish.
    ///
    /// An in-flight tick is dropped at its next suspension point. Returns the worker, or `None`
    /// if the loop task itself failed.
    pub async fn stop(self) -> Option<W> {
        let _ = self.stop.send(true);
        match self.join.await {
            Ok(worker) => Some(worker),
            Err(err) => {
                warn!(error = %err, "timer loop join failed");
                None
            }
        }
    }

    /// Whether the loop task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
