use std::sync::Arc;

use eyre::Result;
use store::Transfer;

use crate::downloader::handle::BatchDownloader;

/// One range query issued by [`IterativeDownloader::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub from: u64,
    pub to: u64,
    pub transfers: Vec<Transfer>,
}

/// Walks `[from, to]` backward in fixed-size ranges.
pub struct IterativeDownloader {
    downloader: Arc<dyn BatchDownloader>,
    batch_size: u64,
    from: u64,
    to: u64,
    previous: u64,
}

impl IterativeDownloader {
    pub fn new(downloader: Arc<dyn BatchDownloader>, batch_size: u64, from: u64, to: u64) -> Self {
        Self { downloader, batch_size: batch_size.max(1), from, to, previous: to }
    }

    pub fn finished(&self) -> bool {
        self.to <= self.from
    }

    /// Lowest block not yet covered, or `from` once finished.
    pub fn cursor(&self) -> u64 {
        self.to
    }

    pub async fn next(&mut self) -> Result<Batch> {
        let start = self.to.saturating_sub(self.batch_size).max(self.from);
        let transfers = self.downloader.get_transfers_in_range(start, self.to).await?;
        let batch = Batch { from: start, to: self.to, transfers };
        self.previous = self.to;
        self.to = start;
        Ok(batch)
    }

    /// Undoes the last `next`, so the same range is fetched again.
    pub fn revert(&mut self) {
        self.to = self.previous;
    }
}
