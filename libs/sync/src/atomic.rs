use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::TaskError;

/// Task group where the first failing task cancels its siblings.
///
/// Only the first error is kept. A cancellation error never displaces a real
/// one, so siblings unwinding after the cancel cannot mask the root cause.
#[derive(Clone, Debug)]
pub struct AtomicGroup {
    cancel: CancellationToken,
    tracker: TaskTracker,
    error: Arc<Mutex<Option<TaskError>>>,
}

impl AtomicGroup {
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tracker: TaskTracker::new(),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn add<F, Fut>(&self, command: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        let future = command(self.cancel.clone());
        let group = self.clone();
        self.tracker.spawn(async move {
            if let Err(e) = future.await {
                group.fail(e);
            }
        });
    }

    pub(crate) fn fail(&self, report: eyre::Report) {
        let error = TaskError::from(report);
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        let replace = match slot.as_ref() {
            None => true,
            Some(first) => first.is_cancelled() && !error.is_cancelled(),
        };
        if replace {
            tracing::debug!("Atomic group failed: {error}");
            *slot = Some(error);
            self.cancel.cancel();
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn error(&self) -> Option<TaskError> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn wait(&self) -> Result<(), TaskError> {
        self.tracker.close();
        self.tracker.wait().await;
        match self.error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub async fn stop(&self) -> Result<(), TaskError> {
        self.cancel.cancel();
        self.wait().await
    }
}
