use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::atomic::AtomicGroup;
use crate::error::TaskError;

type PendingCommand = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = eyre::Result<()>> + Send>>
        + Send,
>;

#[derive(Default)]
struct Queue {
    running: usize,
    pending: VecDeque<PendingCommand>,
}

/// [`AtomicGroup`] with a ceiling on concurrently running tasks.
/// Tasks over the limit wait in FIFO order for a running one to finish.
#[derive(Clone)]
pub struct QueuedAtomicGroup {
    group: AtomicGroup,
    limit: usize,
    queue: Arc<Mutex<Queue>>,
}

impl QueuedAtomicGroup {
    pub fn new(parent: &CancellationToken, limit: usize) -> Self {
        Self {
            group: AtomicGroup::new(parent),
            limit: limit.max(1),
            queue: Arc::new(Mutex::new(Queue::default())),
        }
    }

    pub fn add<F, Fut>(&self, command: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        let pending: PendingCommand = Box::new(move |token| Box::pin(command(token)));
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.running < self.limit {
            queue.running += 1;
            drop(queue);
            self.launch(pending);
        } else {
            queue.pending.push_back(pending);
        }
    }

    fn launch(&self, pending: PendingCommand) {
        let this = self.clone();
        self.group.add(move |token| async move {
            if let Err(e) = pending(token).await {
                this.group.fail(e);
            }
            this.on_finish();
            Ok(())
        });
    }

    fn on_finish(&self) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if self.group.is_cancelled() {
            // Queued work would only observe the cancellation.
            queue.pending.clear();
        }
        match queue.pending.pop_front() {
            Some(next) => {
                drop(queue);
                self.launch(next);
            }
            None => queue.running -= 1,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).pending.len()
    }

    pub fn token(&self) -> &CancellationToken {
        self.group.token()
    }

    pub fn error(&self) -> Option<TaskError> {
        self.group.error()
    }

    pub async fn wait(&self) -> Result<(), TaskError> {
        self.group.wait().await
    }

    pub async fn stop(&self) -> Result<(), TaskError> {
        self.group.stop().await
    }
}
