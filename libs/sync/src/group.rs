use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Independent tasks sharing one cancellable scope. Errors are logged, not aggregated.
#[derive(Clone, Debug)]
pub struct Group {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Group {
    pub fn new(parent: &CancellationToken) -> Self {
        Self { cancel: parent.child_token(), tracker: TaskTracker::new() }
    }

    pub fn add<F, Fut>(&self, command: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        let future = command(self.cancel.clone());
        self.tracker.spawn(async move {
            if let Err(e) = future.await {
                tracing::debug!("Group task exited with error: {e:?}");
            }
        });
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits until every task added so far (and any they add) has exited.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        self.wait().await;
    }
}
