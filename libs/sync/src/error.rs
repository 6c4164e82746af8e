use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
}

/// First error reported by a task of an atomic group. Cheap to clone.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TaskError(Arc<eyre::Report>);

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        is_cancellation(&self.0)
    }

    pub fn report(&self) -> &eyre::Report {
        &self.0
    }
}

impl From<eyre::Report> for TaskError {
    fn from(report: eyre::Report) -> Self {
        Self(Arc::new(report))
    }
}

pub fn is_cancellation(report: &eyre::Report) -> bool {
    match report.downcast_ref::<TaskError>() {
        Some(inner) => inner.is_cancelled(),
        None => report.downcast_ref::<Interrupted>().is_some(),
    }
}

/// Resolves `future` unless `token` is cancelled first.
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> eyre::Result<T>
where
    F: Future<Output = eyre::Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Interrupted::Cancelled.into()),
        result = future => result,
    }
}
