use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Interrupted, is_cancellation};

/// One attempt of a unit of work driven by [`FiniteCommand`] or [`InfiniteCommand`].
#[async_trait::async_trait]
pub trait Runnable: Send {
    async fn run(&mut self, token: &CancellationToken) -> eyre::Result<()>;

    /// Called after every failed attempt with the number of consecutive failures.
    fn on_failure(&mut self, _error: &eyre::Report, _consecutive: u32) {}
}

/// Retries `runnable` every `interval` until it succeeds once or the scope is cancelled.
pub struct FiniteCommand<R> {
    pub interval: Duration,
    pub runnable: R,
}

impl<R: Runnable> FiniteCommand<R> {
    pub fn new(interval: Duration, runnable: R) -> Self {
        Self { interval, runnable }
    }

    /// Hands the runnable back on success so callers can read what it collected.
    pub async fn run(mut self, token: CancellationToken) -> eyre::Result<R> {
        let mut failures = 0;
        loop {
            match self.runnable.run(&token).await {
                Ok(()) => return Ok(self.runnable),
                Err(e) if is_cancellation(&e) => return Err(e),
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Command attempt {failures} failed: {e:?}");
                    self.runnable.on_failure(&e, failures);
                }
            }
            tokio::select! {
                _ = token.cancelled() => return Err(Interrupted::Cancelled.into()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Runs `runnable` every `interval` until the scope is cancelled. Failures never stop the loop.
pub struct InfiniteCommand<R> {
    pub interval: Duration,
    pub runnable: R,
}

impl<R: Runnable> InfiniteCommand<R> {
    pub fn new(interval: Duration, runnable: R) -> Self {
        Self { interval, runnable }
    }

    pub async fn run(mut self, token: CancellationToken) -> R {
        let mut failures = 0;
        while !token.is_cancelled() {
            // An in-flight attempt always runs to completion.
            match self.runnable.run(&token).await {
                Ok(()) => failures = 0,
                Err(e) if is_cancellation(&e) => break,
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Periodic command failed ({failures} in a row): {e:?}");
                    self.runnable.on_failure(&e, failures);
                }
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        self.runnable
    }
}
