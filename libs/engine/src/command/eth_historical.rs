use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::Address;
use eyre::Result;
use store::{SyncOption, Transfer};
use sync::{Interrupted, Runnable};
use tokio_util::sync::CancellationToken;

use crate::args::EthBackfill;
use crate::command::history::{Fill, HistoryRange, commit_history, resolve_ranges};
use crate::context::SyncContext;
use crate::downloader::bisect::{
    BinaryIterativeDownloader, Bisection, ConcurrentDownloader, download_eth_concurrently,
};
use crate::downloader::eth::EthTransferDownloader;
use crate::event::{Event, EventType};

/// Native-coin history of one account up to `target`: the blocks missed since
/// its latest `ETH` header, then down from its earliest one to the floor.
pub struct EthHistoricalCommand {
    ctx: Arc<SyncContext>,
    address: Address,
    target: u64,
    ranges: Option<VecDeque<HistoryRange>>,
    iterator: Option<BinaryIterativeDownloader>,
}

impl EthHistoricalCommand {
    pub fn new(ctx: Arc<SyncContext>, address: Address, target: u64) -> Self {
        Self { ctx, address, target, ranges: None, iterator: None }
    }

    fn bisection(&self) -> Arc<Bisection> {
        let downloader = EthTransferDownloader::new(
            self.ctx.client.clone(),
            self.ctx.cache.clone(),
            vec![self.address],
        );
        Arc::new(Bisection {
            client: self.ctx.client.clone(),
            cache: self.ctx.cache.clone(),
            downloader: Arc::new(downloader),
            store: self.ctx.store.clone(),
            address: self.address,
        })
    }

    fn notify(&self, block_number: u64, transfers: &[Transfer]) {
        if !transfers.is_empty() {
            let event =
                Event::new(EventType::NewHistory, Some(block_number), vec![self.address]);
            self.ctx.feed.send(event);
        }
    }

    async fn commit(
        &self,
        numbers: &[u64],
        transfers: &[Transfer],
        option: SyncOption,
    ) -> Result<()> {
        commit_history(&self.ctx, self.address, numbers, transfers, option).await
    }

    async fn run_concurrent(&self, token: &CancellationToken, range: HistoryRange) -> Result<()> {
        let started = Instant::now();
        let concurrent = ConcurrentDownloader::new(token, self.ctx.args.bisect_concurrency);
        download_eth_concurrently(&concurrent, self.bisection(), range.from, range.to);
        concurrent.wait().await?;

        // Leaves are already persisted; only the cursors are left.
        self.commit(&[range.from, range.to], &[], SyncOption::ETH).await?;
        let transfers = concurrent.transfers();
        tracing::info!(
            "Native history of {} in {range:?} done: {} transfers in blocks {:?} ({:?})",
            self.address,
            transfers.len(),
            concurrent.blocks(),
            started.elapsed()
        );
        self.notify(range.from, &transfers);
        Ok(())
    }

    async fn run_resumable(
        &mut self,
        token: &CancellationToken,
        range: HistoryRange,
    ) -> Result<()> {
        let mut iterator = match self.iterator.take() {
            Some(iterator) => iterator,
            None => {
                if range.fill == Fill::Backward {
                    // Marks where the walk down starts.
                    self.commit(&[range.to], &[], SyncOption::ETH).await?;
                }
                BinaryIterativeDownloader::new(self.bisection(), range.from, range.to)
            }
        };
        let result = self.drive(token, range, &mut iterator).await;
        self.iterator = Some(iterator);
        result?;
        if range.fill == Fill::Gap {
            self.commit(&[range.to], &[], SyncOption::ETH).await?;
        }
        Ok(())
    }

    async fn drive(
        &self,
        token: &CancellationToken,
        range: HistoryRange,
        iterator: &mut BinaryIterativeDownloader,
    ) -> Result<()> {
        while !iterator.finished() {
            if token.is_cancelled() {
                return Err(Interrupted::Cancelled.into());
            }
            let step = iterator.next().await?;
            if iterator.high() == step.high {
                continue;
            }
            let cursor = match range.fill {
                Fill::Backward => vec![iterator.high()],
                Fill::Gap => Vec::new(),
            };
            let option = range.step_option(SyncOption::ETH);
            if let Err(e) = self.commit(&cursor, &step.transfers, option).await {
                iterator.revert();
                tracing::error!("Failed to persist native history step {step:?}: {e:?}");
                return Err(e);
            }
            self.notify(iterator.high(), &step.transfers);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for EthHistoricalCommand {
    async fn run(&mut self, token: &CancellationToken) -> Result<()> {
        if self.ranges.is_none() {
            let ranges =
                resolve_ranges(&self.ctx, self.address, SyncOption::ETH, self.target).await?;
            self.ranges = Some(ranges.into());
        }
        while let Some(range) = self.ranges.as_ref().and_then(|ranges| ranges.front().copied()) {
            match self.ctx.args.eth_backfill {
                EthBackfill::Concurrent => self.run_concurrent(token, range).await?,
                EthBackfill::Resumable => self.run_resumable(token, range).await?,
            }
            self.iterator = None;
            if let Some(ranges) = self.ranges.as_mut() {
                ranges.pop_front();
            }
        }
        tracing::debug!("Native history of {} is complete", self.address);
        Ok(())
    }

    fn on_failure(&mut self, _error: &eyre::Report, consecutive: u32) {
        self.ctx.report_failure(consecutive, Some(self.target), &[self.address]);
    }
}
